//! Types of physical constraints.

use super::{collision::narrowphase::FALLBACK_AXIS, BodyKey, BodySet};
use crate::math::{self as m, Unit};

/// Corrections smaller than this don't count as changing anything.
pub const CONSTRAINT_EPSILON: f64 = 1e-6;

/// A constraint restricts the relative motion of two bodies
/// by directly correcting their positions.
///
/// [`ConstraintBuilder`][self::ConstraintBuilder] is the preferred
/// way to create these, but the fields are public to allow in-place editing
/// for advanced users.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constraint {
    pub body_a: BodyKey,
    pub body_b: BodyKey,
    /// Attachment points on each body, in body-local space.
    pub anchors: [m::Vec3; 2],
    /// Fraction of the error corrected per solver pass, between 0 and 1.
    pub stiffness: f64,
    /// Type of the constraint.
    pub ty: ConstraintType,
}

/// Type-specific variables for constraints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConstraintType {
    /// Pulls the two anchor points together.
    Point,
    /// Keeps the anchor points at a specific distance from each other.
    Distance {
        /// The desired distance.
        distance: f64,
    },
    /// Anchors coincide like with `Point`.
    Fixed,
}

impl Constraint {
    /// World-space positions of both anchors.
    pub fn world_anchors(&self, bodies: &BodySet) -> Option<[m::Vec3; 2]> {
        let a = bodies.get(self.body_a)?;
        let b = bodies.get(self.body_b)?;
        Some([
            world_point(a.pose(), self.anchors[0]),
            world_point(b.pose(), self.anchors[1]),
        ])
    }

    /// Run one position correction pass, returning whether either body moved
    /// by more than [`CONSTRAINT_EPSILON`].
    ///
    /// The correction is split evenly between bodies that can move.
    /// Bodies with infinite mass are never moved.
    pub fn solve(&self, bodies: &mut BodySet) -> bool {
        let (a, b) = match bodies.get2_mut(self.body_a, self.body_b) {
            Some(pair) => pair,
            None => return false,
        };
        let movable = [a.inverse_mass() > 0.0, b.inverse_mass() > 0.0];
        let shares = match movable {
            [true, true] => [0.5, 0.5],
            [true, false] => [1.0, 0.0],
            [false, true] => [0.0, 1.0],
            [false, false] => return false,
        };

        let anchor_a = world_point(a.pose(), self.anchors[0]);
        let anchor_b = world_point(b.pose(), self.anchors[1]);
        let delta = anchor_b - anchor_a;

        let error = match self.ty {
            ConstraintType::Point | ConstraintType::Fixed => delta,
            ConstraintType::Distance { distance } => {
                let dir = Unit::try_new(delta)
                    .map(Unit::into_inner)
                    .unwrap_or(FALLBACK_AXIS);
                dir * (delta.mag() - distance)
            }
        };
        let correction = error * self.stiffness;

        // a moves towards b when the anchors are too far apart and vice versa
        let moves = [correction * shares[0], -correction * shares[1]];
        let mut changed = false;
        for (rb, &can_move, offset) in itertools::izip!([a, b], &movable, &moves) {
            if !can_move {
                continue;
            }
            rb.translate(*offset);
            if offset.mag() > CONSTRAINT_EPSILON {
                changed = true;
                rb.wake();
            }
        }
        changed
    }
}

#[inline]
fn world_point(pose: &m::Pose, local: m::Vec3) -> m::Vec3 {
    pose.translation + pose.rotation * local
}

/// A builder that allows ergonomic construction of different constraints.
#[derive(Clone, Copy, Debug)]
pub struct ConstraintBuilder {
    body_a: BodyKey,
    body_b: BodyKey,
    anchors: [m::Vec3; 2],
    stiffness: f64,
}

impl ConstraintBuilder {
    /// Start building a constraint between two bodies.
    /// Anchors default to the body origins.
    pub fn new(body_a: BodyKey, body_b: BodyKey) -> Self {
        Self {
            body_a,
            body_b,
            anchors: [m::Vec3::zero(); 2],
            stiffness: 1.0,
        }
    }

    /// Set the attachment point on the first body, relative to its origin.
    pub fn with_anchor_a(mut self, point: m::Vec3) -> Self {
        self.anchors[0] = point;
        self
    }

    /// Set the attachment point on the second body, relative to its origin.
    pub fn with_anchor_b(mut self, point: m::Vec3) -> Self {
        self.anchors[1] = point;
        self
    }

    /// Set the fraction of error corrected per pass. Clamped to `[0, 1]`.
    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness.clamp(0.0, 1.0);
        self
    }

    /// Build a point constraint, forcing the anchors to overlap.
    pub fn build_point(self) -> Constraint {
        self.build(ConstraintType::Point)
    }

    /// Build a distance constraint.
    pub fn build_distance(self, distance: f64) -> Constraint {
        self.build(ConstraintType::Distance {
            distance: distance.max(0.0),
        })
    }

    /// Build a fixed constraint.
    pub fn build_fixed(self) -> Constraint {
        self.build(ConstraintType::Fixed)
    }

    fn build(self, ty: ConstraintType) -> Constraint {
        Constraint {
            body_a: self.body_a,
            body_b: self.body_b,
            anchors: self.anchors,
            stiffness: self.stiffness,
            ty,
        }
    }
}
