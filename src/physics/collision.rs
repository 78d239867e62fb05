mod collider;
pub use collider::{Collider, ColliderDesc, Shape, AABB};

pub mod narrowphase;
pub use narrowphase::{intersection_check, ShapeContact};

pub mod query;
pub use query::Ray;

pub mod spatial_hash;
pub use spatial_hash::SpatialHash;

use super::BodyKey;
use crate::math::{self as m, Unit};

/// An intersection between two bodies found during a step.
///
/// Contacts are recomputed every step and never carried over to the next one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub body_a: BodyKey,
    pub body_b: BodyKey,
    /// The normal, facing away from `body_a` towards `body_b`.
    pub normal: Unit<m::Vec3>,
    /// Penetration depth, never negative.
    pub penetration: f64,
    /// Approximate point of contact in world space.
    pub point: m::Vec3,
}

impl Contact {
    pub(crate) fn from_shape_contact(body_a: BodyKey, body_b: BodyKey, sc: ShapeContact) -> Self {
        Contact {
            body_a,
            body_b,
            normal: sc.normal,
            penetration: sc.penetration,
            point: sc.point,
        }
    }

    /// Check whether the given body participates in this contact.
    #[inline]
    pub fn involves(&self, body: BodyKey) -> bool {
        self.body_a == body || self.body_b == body
    }
}
