//! Intersection queries for points, rays, etc. vs. colliders.

use super::collider::{Collider, Shape};
use crate::math::{self as m, Pose, Unit};

/// A ray with a start point and a normalized direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub start: m::Vec3,
    pub dir: Unit<m::Vec3>,
}

impl Ray {
    /// Create a ray, returning `None` if the direction is zero.
    pub fn new(start: m::Vec3, dir: m::Vec3) -> Option<Self> {
        Unit::try_new(dir).map(|dir| Ray { start, dir })
    }

    #[inline]
    pub fn point_at_t(&self, t: f64) -> m::Vec3 {
        self.start + t * *self.dir
    }
}

/// Check whether a point is inside a collider.
pub fn point_collider_bool(point: m::Vec3, pose: &Pose, coll: &Collider) -> bool {
    let p_wrt_c = point - coll.world_center(pose);
    match coll.shape {
        Shape::Sphere { r } => p_wrt_c.mag_sq() < r * r,
        Shape::Aabb { half_extents: h } | Shape::Obb { half_extents: h, .. } => {
            p_wrt_c.x.abs() < h.x && p_wrt_c.y.abs() < h.y && p_wrt_c.z.abs() < h.z
        }
    }
}

/// Find the distance along the ray to the first point where it enters the collider,
/// or where it exits if the ray starts inside.
///
/// Oriented boxes are treated as axis-aligned.
pub fn ray_collider(ray: Ray, pose: &Pose, coll: &Collider) -> Option<f64> {
    let center = coll.world_center(pose);
    match coll.shape {
        Shape::Sphere { r } => ray_sphere(ray, center, r),
        Shape::Aabb { half_extents } | Shape::Obb { half_extents, .. } => {
            ray_aabb(ray, center - half_extents, center + half_extents)
        }
    }
}

/// Analytic ray-sphere intersection by solving the quadratic.
pub fn ray_sphere(ray: Ray, center: m::Vec3, r: f64) -> Option<f64> {
    let to_start = ray.start - center;
    // direction is unit length so the quadratic's a = 1
    let b = to_start.dot(*ray.dir);
    let c = to_start.mag_sq() - r * r;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let t_enter = -b - sqrt_d;
    let t_exit = -b + sqrt_d;
    if t_enter >= 0.0 {
        Some(t_enter)
    } else if t_exit >= 0.0 {
        Some(t_exit)
    } else {
        None
    }
}

/// Ray-box intersection with the slab method.
pub fn ray_aabb(ray: Ray, min: m::Vec3, max: m::Vec3) -> Option<f64> {
    let start = [ray.start.x, ray.start.y, ray.start.z];
    let dir = [ray.dir.x, ray.dir.y, ray.dir.z];
    let mins = [min.x, min.y, min.z];
    let maxs = [max.x, max.y, max.z];

    let mut t_min = f64::NEG_INFINITY;
    let mut t_max = f64::INFINITY;
    for axis in 0..3 {
        if dir[axis] == 0.0 {
            // parallel to the slab, miss unless the start is between the planes
            if start[axis] < mins[axis] || start[axis] > maxs[axis] {
                return None;
            }
            continue;
        }
        let inv_d = 1.0 / dir[axis];
        let mut t0 = (mins[axis] - start[axis]) * inv_d;
        let mut t1 = (maxs[axis] - start[axis]) * inv_d;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_max < t_min {
            return None;
        }
    }

    if t_min >= 0.0 {
        Some(t_min)
    } else if t_max >= 0.0 {
        Some(t_max)
    } else {
        None
    }
}
