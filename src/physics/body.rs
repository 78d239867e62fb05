use super::{collision::ColliderDesc, Collider, Velocity};
use crate::math::{self as m, Pose};

/// Bodies moving slower than this, both linearly and angularly, count as resting.
pub const SLEEP_VELOCITY_THRESHOLD: f64 = 0.01;
/// Seconds a body needs to rest before it falls asleep.
pub const SLEEP_TIME_THRESHOLD: f64 = 0.5;

/// The type of a rigid body determines how it is treated in physics updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyType {
    /// Never moves and is never affected by forces or collisions.
    Static,
    /// Moved by the host application. Ignores forces and collision responses
    /// but other bodies still collide with it.
    Kinematic,
    /// The default type of body; responds to forces and collisions.
    Dynamic,
}

/// Mass or moment of inertia of a body, which can be infinite.
///
/// This stores both a mass value and its inverse, because the inverse
/// is what's needed in almost every physics calculation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mass {
    Finite { mass: f64, inverse: f64 },
    Infinite,
}

impl From<f64> for Mass {
    /// Non-positive masses are treated as infinite.
    #[inline]
    fn from(mass: f64) -> Self {
        if mass > 0.0 {
            Mass::Finite {
                mass,
                inverse: 1.0 / mass,
            }
        } else {
            Mass::Infinite
        }
    }
}

impl Mass {
    /// Get the inverse of the mass, which is zero if the mass is infinite.
    #[inline]
    pub fn inv(&self) -> f64 {
        match self {
            Mass::Finite { inverse, .. } => *inverse,
            Mass::Infinite => 0.0,
        }
    }

    /// Get the mass if it's finite.
    #[inline]
    pub fn value(&self) -> Option<f64> {
        match self {
            Mass::Finite { mass, .. } => Some(*mass),
            Mass::Infinite => None,
        }
    }
}

/// Determines how the surface of a body responds to collisions.
///
/// Using a simplified model where each material has its own coefficients
/// and pairs combine them, rather than every pair of materials having its own.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicsMaterial {
    /// Fraction of normal velocity preserved in a collision, between 0 and 1.
    pub restitution: f64,
    pub friction: f64,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        PhysicsMaterial {
            restitution: 0.5,
            friction: 0.5,
        }
    }
}

impl PhysicsMaterial {
    /// Restitution between two materials is the smaller of the two.
    #[inline]
    pub fn restitution_with(&self, other: &Self) -> f64 {
        self.restitution.min(other.restitution)
    }

    /// Friction between two materials is the average of the two.
    #[inline]
    pub fn friction_with(&self, other: &Self) -> f64 {
        (self.friction + other.friction) / 2.0
    }
}

/// Parameters to create a body with.
///
/// Every field has a sensible default, so typically you'd start from
/// [`BodyDesc::new`] and change only what you need.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct BodyDesc {
    #[cfg_attr(feature = "serde-types", serde(with = "m::serde_vec3"))]
    pub position: m::Vec3,
    #[cfg_attr(feature = "serde-types", serde(with = "m::serde_rotor3"))]
    pub rotation: m::Rotor3,
    #[cfg_attr(feature = "serde-types", serde(with = "m::serde_vec3"))]
    pub velocity: m::Vec3,
    #[cfg_attr(feature = "serde-types", serde(with = "m::serde_vec3"))]
    pub angular_velocity: m::Vec3,
    pub mass: f64,
    pub restitution: f64,
    pub friction: f64,
    pub is_static: bool,
    pub is_kinematic: bool,
    pub collider: ColliderDesc,
    #[cfg_attr(feature = "serde-types", serde(with = "m::serde_vec3"))]
    pub collider_offset: m::Vec3,
    /// Multiplier applied to linear velocity every step. 1 means no damping.
    pub linear_damping: f64,
    /// Multiplier applied to angular velocity every step. 1 means no damping.
    pub angular_damping: f64,
    /// Whether the body is allowed to fall asleep when resting.
    pub can_sleep: bool,
    /// Arbitrary data for the host application, e.g. an id of the visual it drives.
    pub user_data: u64,
}

impl Default for BodyDesc {
    fn default() -> Self {
        BodyDesc {
            position: m::Vec3::zero(),
            rotation: m::Rotor3::identity(),
            velocity: m::Vec3::zero(),
            angular_velocity: m::Vec3::zero(),
            mass: 1.0,
            restitution: 0.5,
            friction: 0.5,
            is_static: false,
            is_kinematic: false,
            collider: ColliderDesc::default(),
            collider_offset: m::Vec3::zero(),
            linear_damping: 1.0,
            angular_damping: 1.0,
            can_sleep: true,
            user_data: 0,
        }
    }
}

impl BodyDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: m::Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: m::Rotor3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_velocity(mut self, velocity: m::Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: m::Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Make the body static. Static bodies take precedence over kinematic ones.
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_kinematic(mut self, is_kinematic: bool) -> Self {
        self.is_kinematic = is_kinematic;
        self
    }

    pub fn with_collider(mut self, collider: impl Into<ColliderDesc>) -> Self {
        self.collider = collider.into();
        self
    }

    pub fn with_collider_offset(mut self, offset: m::Vec3) -> Self {
        self.collider_offset = offset;
        self
    }

    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_sleeping_allowed(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    fn body_type(&self) -> BodyType {
        if self.is_static {
            BodyType::Static
        } else if self.is_kinematic {
            BodyType::Kinematic
        } else {
            BodyType::Dynamic
        }
    }
}

/// A rigid body can collide with other rigid bodies and respond to physical forces.
#[derive(Clone, Debug)]
pub struct RigidBody {
    pub(crate) pose: Pose,
    pub(crate) velocity: Velocity,
    // scratch values from the last integration, kept around for inspection
    linear_acceleration: m::Vec3,
    angular_acceleration: m::Vec3,
    pub(crate) ty: BodyType,
    mass: Mass,
    // diagonal of the inverse inertia tensor in the body's local frame
    inverse_inertia: m::Vec3,
    pub(crate) material: PhysicsMaterial,
    pub(crate) collider: Collider,
    linear_damping: f64,
    angular_damping: f64,
    net_force: m::Vec3,
    net_torque: m::Vec3,
    is_sleeping: bool,
    sleep_timer: f64,
    can_sleep: bool,
    pub user_data: u64,
}

impl RigidBody {
    /// Create a body from a description.
    ///
    /// Static and kinematic bodies get infinite mass regardless of the given mass,
    /// so collision responses never move them.
    pub fn new(desc: &BodyDesc) -> Self {
        let ty = desc.body_type();
        let collider = Collider {
            shape: desc.collider.shape(),
            offset: desc.collider_offset,
        };
        let mass = match ty {
            BodyType::Dynamic => Mass::from(desc.mass),
            BodyType::Static | BodyType::Kinematic => Mass::Infinite,
        };
        let inverse_inertia = match mass {
            Mass::Finite { mass, .. } => {
                let inertia = collider.shape.inertia_coef() * mass;
                m::Vec3::new(
                    inv_or_zero(inertia.x),
                    inv_or_zero(inertia.y),
                    inv_or_zero(inertia.z),
                )
            }
            Mass::Infinite => m::Vec3::zero(),
        };
        let velocity = match ty {
            BodyType::Static => Velocity::default(),
            _ => Velocity {
                linear: desc.velocity,
                angular: desc.angular_velocity,
            },
        };

        RigidBody {
            pose: Pose::new(desc.position, desc.rotation.normalized()),
            velocity,
            linear_acceleration: m::Vec3::zero(),
            angular_acceleration: m::Vec3::zero(),
            ty,
            mass,
            inverse_inertia,
            material: PhysicsMaterial {
                restitution: desc.restitution.clamp(0.0, 1.0),
                friction: desc.friction.max(0.0),
            },
            collider,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            net_force: m::Vec3::zero(),
            net_torque: m::Vec3::zero(),
            is_sleeping: false,
            sleep_timer: 0.0,
            can_sleep: desc.can_sleep,
            user_data: desc.user_data,
        }
    }

    //
    // accessors
    //

    #[inline]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    #[inline]
    pub fn position(&self) -> m::Vec3 {
        self.pose.translation
    }

    #[inline]
    pub fn rotation(&self) -> m::Rotor3 {
        self.pose.rotation
    }

    #[inline]
    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    #[inline]
    pub fn linear_acceleration(&self) -> m::Vec3 {
        self.linear_acceleration
    }

    #[inline]
    pub fn angular_acceleration(&self) -> m::Vec3 {
        self.angular_acceleration
    }

    #[inline]
    pub fn body_type(&self) -> BodyType {
        self.ty
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.ty == BodyType::Static
    }

    #[inline]
    pub fn is_kinematic(&self) -> bool {
        self.ty == BodyType::Kinematic
    }

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.is_sleeping
    }

    #[inline]
    pub fn sleep_timer(&self) -> f64 {
        self.sleep_timer
    }

    /// Check whether the body can currently be moved by the simulation.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.ty != BodyType::Static && !self.is_sleeping
    }

    /// Returns the mass of the body if finite, otherwise None.
    #[inline]
    pub fn mass(&self) -> Option<f64> {
        self.mass.value()
    }

    /// Returns the inverse mass of the body, which is zero if the mass is infinite.
    #[inline]
    pub fn inverse_mass(&self) -> f64 {
        self.mass.inv()
    }

    /// Diagonal of the inverse inertia tensor in body-local space.
    #[inline]
    pub fn inverse_inertia(&self) -> m::Vec3 {
        self.inverse_inertia
    }

    #[inline]
    pub fn material(&self) -> &PhysicsMaterial {
        &self.material
    }

    #[inline]
    pub fn collider(&self) -> &Collider {
        &self.collider
    }

    #[inline]
    pub fn linear_damping(&self) -> f64 {
        self.linear_damping
    }

    #[inline]
    pub fn angular_damping(&self) -> f64 {
        self.angular_damping
    }

    /// Force accumulated since the last integration.
    #[inline]
    pub fn net_force(&self) -> m::Vec3 {
        self.net_force
    }

    /// Torque accumulated since the last integration.
    #[inline]
    pub fn net_torque(&self) -> m::Vec3 {
        self.net_torque
    }

    //
    // external control
    //

    /// Teleport the body. Static bodies can be repositioned this way too.
    pub fn set_position(&mut self, position: m::Vec3) {
        self.pose.translation = position;
    }

    pub fn set_rotation(&mut self, rotation: m::Rotor3) {
        self.pose.rotation = rotation.normalized();
    }

    /// Set the linear velocity. Wakes the body up. No-op for static bodies.
    pub fn set_velocity(&mut self, velocity: m::Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.linear = velocity;
        self.wake();
    }

    /// Set the angular velocity. Wakes the body up. No-op for static bodies.
    pub fn set_angular_velocity(&mut self, angular_velocity: m::Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.angular = angular_velocity;
        self.wake();
    }

    pub fn set_material(&mut self, material: PhysicsMaterial) {
        self.material = material;
    }

    /// Accumulate a force to be applied at the next integration.
    /// No-op for static and sleeping bodies.
    pub fn add_force(&mut self, force: m::Vec3) {
        if self.is_static() || self.is_sleeping {
            return;
        }
        self.net_force += force;
    }

    /// Accumulate a torque to be applied at the next integration.
    /// No-op for static and sleeping bodies.
    pub fn add_torque(&mut self, torque: m::Vec3) {
        if self.is_static() || self.is_sleeping {
            return;
        }
        self.net_torque += torque;
    }

    /// Immediately change velocity by an impulse.
    /// Wakes the body up if the impulse is non-zero. No-op for static bodies.
    pub fn apply_impulse(&mut self, impulse: m::Vec3) {
        if self.is_static() || impulse == m::Vec3::zero() {
            return;
        }
        self.velocity.linear += impulse * self.mass.inv();
        self.wake();
    }

    /// Immediately change angular velocity by an angular impulse.
    /// Wakes the body up if the impulse is non-zero. No-op for static bodies.
    pub fn apply_angular_impulse(&mut self, impulse: m::Vec3) {
        if self.is_static() || impulse == m::Vec3::zero() {
            return;
        }
        self.velocity.angular +=
            m::apply_diagonal_in_frame(self.pose.rotation, self.inverse_inertia, impulse);
        self.wake();
    }

    /// Move the body by an offset. Used by position correction.
    #[inline]
    pub(crate) fn translate(&mut self, offset: m::Vec3) {
        self.pose.translation += offset;
    }

    /// Wake the body up and reset its sleep timer.
    pub fn wake(&mut self) {
        self.is_sleeping = false;
        self.sleep_timer = 0.0;
    }

    /// Put the body to sleep, stopping it.
    pub fn sleep(&mut self) {
        if self.is_static() {
            return;
        }
        self.is_sleeping = true;
        self.velocity = Velocity::default();
    }

    //
    // simulation
    //

    /// Advance the body by one step with semi-implicit Euler integration.
    ///
    /// Accumulated forces and torques are cleared afterwards in every case.
    pub fn integrate(&mut self, dt: f64) {
        if self.ty == BodyType::Dynamic && !self.is_sleeping {
            let inv_mass = self.mass.inv();
            self.linear_acceleration = self.net_force * inv_mass;
            self.velocity.linear += self.linear_acceleration * dt;
            self.velocity.linear *= self.linear_damping;
            self.pose.translation += self.velocity.linear * dt;

            self.angular_acceleration = m::apply_diagonal_in_frame(
                self.pose.rotation,
                self.inverse_inertia,
                self.net_torque,
            );
            self.velocity.angular += self.angular_acceleration * dt;
            self.velocity.angular *= self.angular_damping;
            if self.velocity.angular.mag_sq() > 0.0 {
                let delta = m::rotor_from_scaled_axis(self.velocity.angular * dt);
                self.pose.rotation = delta * self.pose.rotation;
                // counter drift from accumulated rounding errors
                self.pose.rotation.normalize();
            }
        }

        self.net_force = m::Vec3::zero();
        self.net_torque = m::Vec3::zero();
    }

    /// Track how long the body has been resting and put it to sleep
    /// once it has rested long enough.
    pub fn update_sleep(&mut self, dt: f64) {
        if self.ty != BodyType::Dynamic || self.is_sleeping || !self.can_sleep {
            return;
        }
        if self.velocity.linear.mag() < SLEEP_VELOCITY_THRESHOLD
            && self.velocity.angular.mag() < SLEEP_VELOCITY_THRESHOLD
        {
            self.sleep_timer += dt;
            if self.sleep_timer > SLEEP_TIME_THRESHOLD {
                self.sleep();
            }
        } else {
            self.sleep_timer = 0.0;
        }
    }
}

#[inline]
fn inv_or_zero(x: f64) -> f64 {
    if x > 0.0 {
        1.0 / x
    } else {
        0.0
    }
}
