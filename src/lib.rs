//! A small real-time rigid body physics engine for 3D scenes.
//!
//! Create a [`World`], add bodies described by [`BodyDesc`]s,
//! and call [`World::step`] once per frame with the frame's duration.
//! Read body poses back afterwards to position whatever visuals they drive.

/// Open a profiling span that lasts until the returned value is dropped.
/// Does nothing unless the `tracy` feature is enabled and a profiler is connected.
macro_rules! tracy_span {
    ($name:expr, $fn_name:expr) => {
        tracy_client::Client::running()
            .map(|client| client.span_alloc(Some($name), $fn_name, file!(), line!(), 0))
    };
}

pub mod math;
#[cfg(feature = "serde-types")]
pub use math::{serde_rotor3, serde_vec3};
pub use math::{uv, Pose, Rotor3, Unit, Vec3};

pub mod physics;
pub use physics::{
    body::{BodyDesc, BodyType, Mass, PhysicsMaterial, RigidBody},
    collision::{self, Collider, ColliderDesc, Contact, Ray, Shape, AABB},
    constraint::{Constraint, ConstraintBuilder, ConstraintType},
    BodyKey, BodySet, ConstraintKey, ConstraintSet, ParamsError, RayHit, Velocity, World,
    WorldParams,
};
