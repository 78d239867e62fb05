//! Exact shape-vs-shape intersection tests.
//!
//! These are pure functions of shapes and poses and never touch bodies.

use super::collider::{Collider, Shape};
use crate::math::{self as m, Pose, Unit};

/// Axis used as the contact normal when the geometry doesn't define one,
/// e.g. for two spheres at the exact same position.
pub const FALLBACK_AXIS: m::Vec3 = m::Vec3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};

/// The result of an intersection test between two shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeContact {
    /// The normal, facing away from the first shape towards the second.
    pub normal: Unit<m::Vec3>,
    /// Penetration depth, never negative.
    pub penetration: f64,
    /// Approximate point of contact in world space.
    pub point: m::Vec3,
}

impl ShapeContact {
    fn flipped(self) -> Self {
        ShapeContact {
            normal: -self.normal,
            ..self
        }
    }
}

/// Checks two colliders for intersection.
///
/// Oriented boxes are treated as axis-aligned boxes with the same half extents.
pub fn intersection_check(
    pose1: &Pose,
    coll1: &Collider,
    pose2: &Pose,
    coll2: &Collider,
) -> Option<ShapeContact> {
    let c1 = coll1.world_center(pose1);
    let c2 = coll2.world_center(pose2);
    shape_shape(c1, &coll1.shape, c2, &coll2.shape)
}

/// Checks two shapes positioned at the given world-space centers for intersection.
pub fn shape_shape(c1: m::Vec3, s1: &Shape, c2: m::Vec3, s2: &Shape) -> Option<ShapeContact> {
    use Shape::*;
    match (*s1, *s2) {
        (Sphere { r: r1 }, Sphere { r: r2 }) => sphere_sphere(c1, r1, c2, r2),
        (
            Aabb { half_extents: h1 } | Obb { half_extents: h1, .. },
            Aabb { half_extents: h2 } | Obb { half_extents: h2, .. },
        ) => aabb_aabb(c1, h1, c2, h2),
        (Aabb { half_extents } | Obb { half_extents, .. }, Sphere { r }) => {
            aabb_sphere(c1, half_extents, c2, r)
        }
        (Sphere { r }, Aabb { half_extents } | Obb { half_extents, .. }) => {
            aabb_sphere(c2, half_extents, c1, r).map(ShapeContact::flipped)
        }
    }
}

//
// SPHERE <-> SPHERE
//

pub fn sphere_sphere(c1: m::Vec3, r1: f64, c2: m::Vec3, r2: f64) -> Option<ShapeContact> {
    let delta = c2 - c1;
    let dist = delta.mag();
    let r_sum = r1 + r2;
    if dist >= r_sum {
        return None;
    }

    // same position, consider penetration to be on the fallback axis
    let normal = Unit::try_new(delta).unwrap_or(Unit::new_unchecked(FALLBACK_AXIS));

    Some(ShapeContact {
        normal,
        penetration: r_sum - dist,
        point: c1 + *normal * r1,
    })
}

//
// AABB <-> AABB
//

/// Separation axis is the one with the least overlap.
/// Contact point is the midpoint between the two centers, which is only an approximation.
pub fn aabb_aabb(c1: m::Vec3, h1: m::Vec3, c2: m::Vec3, h2: m::Vec3) -> Option<ShapeContact> {
    let delta = c2 - c1;

    // overlaps in terms of full side lengths, i.e. twice the actual overlap
    let overlaps = [
        2.0 * (h1.x + h2.x) - 2.0 * delta.x.abs(),
        2.0 * (h1.y + h2.y) - 2.0 * delta.y.abs(),
        2.0 * (h1.z + h2.z) - 2.0 * delta.z.abs(),
    ];
    if overlaps.iter().any(|&o| o <= 0.0) {
        return None;
    }

    // ties go to the earlier axis
    let mut axis_i = 0;
    if overlaps[1] < overlaps[axis_i] {
        axis_i = 1;
    }
    if overlaps[2] < overlaps[axis_i] {
        axis_i = 2;
    }

    let axis_units = [m::Vec3::unit_x(), m::Vec3::unit_y(), m::Vec3::unit_z()];
    let delta_comps = [delta.x, delta.y, delta.z];
    // orient the axis towards obj2
    let sign = if delta_comps[axis_i] < 0.0 { -1.0 } else { 1.0 };

    Some(ShapeContact {
        normal: Unit::new_unchecked(axis_units[axis_i] * sign),
        penetration: overlaps[axis_i] / 2.0,
        point: (c1 + c2) / 2.0,
    })
}

//
// AABB <-> SPHERE
//

/// Normal points from the box towards the sphere.
pub fn aabb_sphere(
    c_box: m::Vec3,
    half_extents: m::Vec3,
    c_sphere: m::Vec3,
    r: f64,
) -> Option<ShapeContact> {
    let min = c_box - half_extents;
    let max = c_box + half_extents;
    let closest = m::Vec3::new(
        c_sphere.x.clamp(min.x, max.x),
        c_sphere.y.clamp(min.y, max.y),
        c_sphere.z.clamp(min.z, max.z),
    );

    let to_center = c_sphere - closest;
    let dist = to_center.mag();
    if dist >= r {
        return None;
    }

    // center inside the box, no well-defined direction
    let normal = Unit::try_new(to_center).unwrap_or(Unit::new_unchecked(FALLBACK_AXIS));

    Some(ShapeContact {
        normal,
        penetration: r - dist,
        point: closest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64, z: f64) -> m::Vec3 {
        m::Vec3::new(x, y, z)
    }

    #[test]
    fn spheres_apart_and_overlapping() {
        assert!(sphere_sphere(v(0., 0., 0.), 1.0, v(3., 0., 0.), 1.0).is_none());
        // exactly touching is not a contact
        assert!(sphere_sphere(v(0., 0., 0.), 1.0, v(2., 0., 0.), 1.0).is_none());

        let c = sphere_sphere(v(0., 0., 0.), 1.0, v(1.5, 0., 0.), 1.0).unwrap();
        assert_eq!(*c.normal, m::Vec3::unit_x());
        assert!((c.penetration - 0.5).abs() < 1e-12);
        assert_eq!(c.point, v(1., 0., 0.));
    }

    #[test]
    fn coincident_spheres_use_fallback_axis() {
        let c = sphere_sphere(v(1., 1., 1.), 0.5, v(1., 1., 1.), 0.5).unwrap();
        assert_eq!(*c.normal, FALLBACK_AXIS);
        assert!((c.penetration - 1.0).abs() < 1e-12);
        assert!(!c.normal.x.is_nan());
    }

    #[test]
    fn aabb_min_overlap_axis() {
        // overlapping by 0.5 in x, 1.5 in y, 2 in z
        let c = aabb_aabb(
            v(0., 0., 0.),
            v(1., 1., 1.),
            v(1.5, -0.5, 0.),
            v(1., 1., 1.),
        )
        .unwrap();
        assert_eq!(*c.normal, m::Vec3::unit_x());
        assert!((c.penetration - 0.5).abs() < 1e-12);
        assert_eq!(c.point, v(0.75, -0.25, 0.));

        let c = aabb_aabb(
            v(0., 0., 0.),
            v(1., 1., 1.),
            v(0.2, -1.8, 0.1),
            v(1., 1., 1.),
        )
        .unwrap();
        assert_eq!(*c.normal, -m::Vec3::unit_y());
        assert!((c.penetration - 0.2).abs() < 1e-12);
    }

    #[test]
    fn aabb_ties_prefer_earlier_axis() {
        // equal overlap on all axes picks x
        let c = aabb_aabb(v(0., 0., 0.), v(1., 1., 1.), v(1., 1., 1.), v(1., 1., 1.)).unwrap();
        assert_eq!(*c.normal, m::Vec3::unit_x());
        // y and z tie, x is larger: picks y
        let c = aabb_aabb(v(0., 0., 0.), v(1., 1., 1.), v(0., 1., 1.), v(1., 1., 1.)).unwrap();
        assert_eq!(*c.normal, m::Vec3::unit_y());
    }

    #[test]
    fn separated_aabbs() {
        assert!(aabb_aabb(v(0., 0., 0.), v(1., 1., 1.), v(0., 0., 2.5), v(1., 1., 1.)).is_none());
    }

    #[test]
    fn sphere_above_box() {
        let c = aabb_sphere(v(0., -1., 0.), v(5., 1., 5.), v(0., 0.9, 0.), 1.0).unwrap();
        assert_eq!(*c.normal, m::Vec3::unit_y());
        assert!((c.penetration - 0.1).abs() < 1e-12);
        assert_eq!(c.point, v(0., 0., 0.));

        assert!(aabb_sphere(v(0., -1., 0.), v(5., 1., 5.), v(0., 1.0, 0.), 1.0).is_none());
    }

    #[test]
    fn sphere_box_order_flips_normal() {
        let sphere = Shape::Sphere { r: 1.0 };
        let cube = Shape::Aabb {
            half_extents: v(1., 1., 1.),
        };
        let box_first = shape_shape(v(0., 0., 0.), &cube, v(1.5, 0., 0.), &sphere).unwrap();
        let sphere_first = shape_shape(v(1.5, 0., 0.), &sphere, v(0., 0., 0.), &cube).unwrap();
        assert_eq!(*box_first.normal, m::Vec3::unit_x());
        assert_eq!(*sphere_first.normal, -m::Vec3::unit_x());
        assert_eq!(box_first.penetration, sphere_first.penetration);
    }

    #[test]
    fn obb_collides_like_aabb() {
        let he = v(1., 1., 1.);
        let obb = Shape::Obb {
            half_extents: he,
            orientation: m::rotor_from_scaled_axis(v(0., 0., 0.6)),
        };
        let aabb = Shape::Aabb { half_extents: he };
        let a = shape_shape(v(0., 0., 0.), &obb, v(1.5, 0.2, 0.), &aabb);
        let b = shape_shape(v(0., 0., 0.), &aabb, v(1.5, 0.2, 0.), &aabb);
        assert_eq!(a, b);
    }
}
