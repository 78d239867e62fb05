use crate::math::{self as m, Pose};

/// The physical shape of a collider.
///
/// Boxes store their side lengths halved because this makes intersection tests easier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Sphere {
        r: f64,
    },
    /// A box that stays aligned with the world axes regardless of its body's rotation.
    Aabb {
        half_extents: m::Vec3,
    },
    /// An oriented box. The orientation is carried along but currently ignored by collision
    /// detection and ray casts, which treat the box as axis-aligned.
    Obb {
        half_extents: m::Vec3,
        orientation: m::Rotor3,
    },
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Sphere { r: 1.0 }
    }
}

impl Shape {
    /// Diagonal of the principal moment of inertia tensor divided by mass.
    pub fn inertia_coef(&self) -> m::Vec3 {
        // from https://en.wikipedia.org/wiki/List_of_moments_of_inertia
        match self {
            Shape::Sphere { r } => {
                let i = 2.0 / 5.0 * r * r;
                m::Vec3::new(i, i, i)
            }
            Shape::Aabb { half_extents: h } | Shape::Obb { half_extents: h, .. } => {
                // (w² + d²) / 12 with full side lengths
                let sq = m::mul_elem(*h, *h) * 4.0;
                m::Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) / 12.0
            }
        }
    }

    /// Half extents of the axis-aligned box bounding this shape.
    pub fn bounding_half_extents(&self) -> m::Vec3 {
        match self {
            Shape::Sphere { r } => m::Vec3::new(*r, *r, *r),
            Shape::Aabb { half_extents } | Shape::Obb { half_extents, .. } => *half_extents,
        }
    }
}

/// A shape attached to a body with an offset from the body's origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Collider {
    pub shape: Shape,
    /// Offset from the body origin, in body-local space.
    pub offset: m::Vec3,
}

impl Collider {
    /// Create a sphere collider from a radius.
    pub fn new_sphere(radius: f64) -> Self {
        Collider {
            shape: Shape::Sphere { r: radius },
            offset: m::Vec3::zero(),
        }
    }

    /// Create a cube collider with all sides set to the same length.
    pub fn new_cube(side_length: f64) -> Self {
        Collider::new_aabb(m::Vec3::broadcast(side_length / 2.0))
    }

    /// Create an axis-aligned box collider from its half extents.
    pub fn new_aabb(half_extents: m::Vec3) -> Self {
        Collider {
            shape: Shape::Aabb { half_extents },
            offset: m::Vec3::zero(),
        }
    }

    /// Create an oriented box collider from its half extents and orientation.
    pub fn new_obb(half_extents: m::Vec3, orientation: m::Rotor3) -> Self {
        Collider {
            shape: Shape::Obb {
                half_extents,
                orientation,
            },
            offset: m::Vec3::zero(),
        }
    }

    /// Set the offset from the body origin in a builder-like chain.
    pub fn with_offset(mut self, offset: m::Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Position of the shape's center in world space given the pose of its body.
    #[inline]
    pub fn world_center(&self, pose: &Pose) -> m::Vec3 {
        pose.translation + pose.rotation * self.offset
    }

    /// The world-space bounding box of the shape given the pose of its body.
    pub fn world_aabb(&self, pose: &Pose) -> AABB {
        AABB::from_center(self.world_center(pose), self.shape.bounding_half_extents())
    }
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AABB {
    pub min: m::Vec3,
    pub max: m::Vec3,
}

impl AABB {
    pub fn from_center(center: m::Vec3, half_extents: m::Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    #[inline]
    pub fn center(&self) -> m::Vec3 {
        (self.min + self.max) / 2.0
    }

    #[inline]
    pub fn half_extents(&self) -> m::Vec3 {
        (self.max - self.min) / 2.0
    }

    /// Check whether two boxes overlap or touch.
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, p: m::Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// Serializable description of a collider shape, tagged by `type`.
///
/// Unrecognized types deserialize to [`Unknown`][ColliderDesc::Unknown],
/// which turns into a unit sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", rename_all = "snake_case")
)]
pub enum ColliderDesc {
    Sphere {
        radius: f64,
    },
    Aabb {
        #[cfg_attr(feature = "serde-types", serde(with = "m::serde_vec3"))]
        half_extents: m::Vec3,
    },
    Obb {
        #[cfg_attr(feature = "serde-types", serde(with = "m::serde_vec3"))]
        half_extents: m::Vec3,
        #[cfg_attr(
            feature = "serde-types",
            serde(with = "m::serde_rotor3", default = "m::Rotor3::identity")
        )]
        rotation: m::Rotor3,
    },
    #[cfg_attr(feature = "serde-types", serde(other))]
    Unknown,
}

impl Default for ColliderDesc {
    fn default() -> Self {
        ColliderDesc::Sphere { radius: 1.0 }
    }
}

impl ColliderDesc {
    pub fn shape(&self) -> Shape {
        match *self {
            ColliderDesc::Sphere { radius } => Shape::Sphere { r: radius },
            ColliderDesc::Aabb { half_extents } => Shape::Aabb { half_extents },
            ColliderDesc::Obb {
                half_extents,
                rotation,
            } => Shape::Obb {
                half_extents,
                orientation: rotation,
            },
            ColliderDesc::Unknown => {
                log::warn!("unknown collider type, falling back to a unit sphere");
                Shape::default()
            }
        }
    }
}

impl From<Shape> for ColliderDesc {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Sphere { r } => ColliderDesc::Sphere { radius: r },
            Shape::Aabb { half_extents } => ColliderDesc::Aabb { half_extents },
            Shape::Obb {
                half_extents,
                orientation,
            } => ColliderDesc::Obb {
                half_extents,
                rotation: orientation,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_body_rotation() {
        let coll = Collider::new_sphere(0.5).with_offset(m::Vec3::unit_x());
        let pose = Pose::new(
            m::Vec3::new(0.0, 2.0, 0.0),
            m::rotor_from_scaled_axis(m::Vec3::unit_y() * std::f64::consts::PI),
        );
        let c = coll.world_center(&pose);
        assert!((c - m::Vec3::new(-1.0, 2.0, 0.0)).mag() < 1e-9);
    }

    #[test]
    fn obb_bounds_ignore_orientation() {
        let he = m::Vec3::new(1.0, 2.0, 3.0);
        let coll = Collider::new_obb(
            he,
            m::rotor_from_scaled_axis(m::Vec3::unit_z() * 0.7),
        );
        let aabb = coll.world_aabb(&Pose::identity());
        assert_eq!(aabb.min, -he);
        assert_eq!(aabb.max, he);
    }

    #[test]
    fn unknown_desc_is_unit_sphere() {
        assert_eq!(ColliderDesc::Unknown.shape(), Shape::Sphere { r: 1.0 });
    }

    #[test]
    fn touching_boxes_overlap() {
        let a = AABB::from_center(m::Vec3::zero(), m::Vec3::broadcast(1.0));
        let b = AABB::from_center(m::Vec3::new(2.0, 0.0, 0.0), m::Vec3::broadcast(1.0));
        let c = AABB::from_center(m::Vec3::new(2.1, 0.0, 0.0), m::Vec3::broadcast(1.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
