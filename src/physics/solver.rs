//! Contact resolution and the position relaxation loop.
//!
//! Contacts are resolved once per step with positional correction followed by
//! an impulse along the normal and a clamped friction impulse along the tangent.
//! After that, constraints and contacts are relaxed together by projecting positions
//! until nothing moves anymore or the iteration limit is hit.

use super::{
    collision::{intersection_check, Contact},
    constraint::CONSTRAINT_EPSILON,
    BodySet, ConstraintSet, RigidBody,
};
use crate::math::{self as m, Unit};

/// Tangential speeds below this don't produce friction.
const FRICTION_SPEED_EPSILON: f64 = 1e-9;

/// Resolve a single contact between two bodies.
///
/// Bodies with zero inverse mass are never written to,
/// so their position and velocity stay exactly as they were.
pub fn resolve_contact(a: &mut RigidBody, b: &mut RigidBody, contact: &Contact) {
    let inv_mass_sum = a.inverse_mass() + b.inverse_mass();
    if inv_mass_sum == 0.0 {
        return;
    }

    correct_positions(a, b, contact.normal, contact.penetration);

    let n = *contact.normal;
    let rel_vel = b.velocity.linear - a.velocity.linear;
    let vel_along_normal = rel_vel.dot(n);
    if vel_along_normal > 0.0 {
        // already separating
        return;
    }

    let e = a.material.restitution_with(&b.material);
    let j = -(1.0 + e) * vel_along_normal / inv_mass_sum;
    apply_pair_impulse(a, b, n * j);

    // friction from the relative velocity after the normal impulse
    let rel_vel = b.velocity.linear - a.velocity.linear;
    let tangent_vel = rel_vel - n * rel_vel.dot(n);
    let tangent_speed = tangent_vel.mag();
    if tangent_speed < FRICTION_SPEED_EPSILON {
        return;
    }
    let tangent = tangent_vel / tangent_speed;
    let mu = a.material.friction_with(&b.material);
    let max_friction = j * mu;
    let jt = (-rel_vel.dot(tangent) / inv_mass_sum).clamp(-max_friction, max_friction);
    apply_pair_impulse(a, b, tangent * jt);
}

/// Push two bodies apart along the normal by the penetration depth,
/// split by each body's share of the total inverse mass.
///
/// Returns false without doing anything if neither body can move.
pub fn correct_positions(
    a: &mut RigidBody,
    b: &mut RigidBody,
    normal: Unit<m::Vec3>,
    penetration: f64,
) -> bool {
    let inv_mass_a = a.inverse_mass();
    let inv_mass_b = b.inverse_mass();
    let inv_mass_sum = inv_mass_a + inv_mass_b;
    if inv_mass_sum == 0.0 {
        return false;
    }
    let correction = *normal * penetration;
    if inv_mass_a > 0.0 {
        a.translate(-correction * (inv_mass_a / inv_mass_sum));
    }
    if inv_mass_b > 0.0 {
        b.translate(correction * (inv_mass_b / inv_mass_sum));
    }
    true
}

/// Apply `impulse` to b and its negation to a.
fn apply_pair_impulse(a: &mut RigidBody, b: &mut RigidBody, impulse: m::Vec3) {
    if a.inverse_mass() > 0.0 {
        a.velocity.linear -= impulse * a.inverse_mass();
    }
    if b.inverse_mass() > 0.0 {
        b.velocity.linear += impulse * b.inverse_mass();
    }
}

/// Test a previously found contact pair again with current poses
/// and push the bodies apart if they still penetrate.
fn recheck_contact(bodies: &mut BodySet, contact: &Contact) -> bool {
    let (a, b) = match bodies.get2_mut(contact.body_a, contact.body_b) {
        Some(pair) => pair,
        None => return false,
    };
    match intersection_check(&a.pose, &a.collider, &b.pose, &b.collider) {
        Some(sc) if sc.penetration > CONSTRAINT_EPSILON => {
            correct_positions(a, b, sc.normal, sc.penetration)
        }
        _ => false,
    }
}

/// Run up to `iterations` passes over all constraints in insertion order
/// followed by all contacts of the current step.
/// Stops early after a pass where nothing changed.
///
/// Returns the number of passes run.
pub(crate) fn relax(
    bodies: &mut BodySet,
    constraints: &ConstraintSet,
    contacts: &[Contact],
    iterations: usize,
) -> usize {
    let _span = tracy_span!("relax constraints", "relax");

    for pass in 0..iterations {
        let mut changed = false;
        for constraint in constraints.iter() {
            changed |= constraint.solve(bodies);
        }
        for contact in contacts {
            changed |= recheck_contact(bodies, contact);
        }
        if !changed {
            return pass + 1;
        }
    }
    iterations
}
