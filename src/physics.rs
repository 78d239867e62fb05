use crate::math::{self as m, Unit};

//

pub mod body;
pub use body::{BodyDesc, BodyType, Mass, PhysicsMaterial, RigidBody};

pub mod body_set;
pub use body_set::{BodyKey, BodySet};

pub mod collision;
use collision::intersection_check;
pub use collision::{Collider, ColliderDesc, Contact, Ray, Shape, SpatialHash, AABB};

pub mod constraint;
pub use constraint::{Constraint, ConstraintBuilder, ConstraintType};

pub mod constraint_set;
pub use constraint_set::{ConstraintKey, ConstraintSet};

pub mod solver;

//

/// Velocity of an object.
///
// Equivalent to a pair of Vec3s but with names for the translational and rotational part.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Velocity {
    /// Linear velocity in metres per second.
    pub linear: m::Vec3,
    /// Angular velocity as a scaled axis in radians per second.
    pub angular: m::Vec3,
}

/// Tunable parameters of a [`World`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct WorldParams {
    /// Acceleration applied to every awake dynamic body.
    #[cfg_attr(feature = "serde-types", serde(with = "m::serde_vec3"))]
    pub gravity: m::Vec3,
    /// Length of a single simulation step in seconds.
    pub fixed_timestep: f64,
    /// Maximum number of simulation steps run by a single call to [`World::step`].
    /// Time beyond that is dropped.
    pub max_substeps: usize,
    /// Maximum number of constraint relaxation passes per step.
    pub solver_iterations: usize,
    /// Cell size of the broad phase spatial hash.
    pub cell_size: f64,
}

impl Default for WorldParams {
    fn default() -> Self {
        WorldParams {
            gravity: m::Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 10,
            solver_iterations: 10,
            cell_size: 1.0,
        }
    }
}

impl WorldParams {
    /// Check that the parameters describe a world that can be simulated.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(ParamsError::InvalidTimestep(self.fixed_timestep));
        }
        if self.max_substeps == 0 {
            return Err(ParamsError::ZeroSubsteps);
        }
        if self.solver_iterations == 0 {
            return Err(ParamsError::ZeroIterations);
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ParamsError::InvalidCellSize(self.cell_size));
        }
        let g = self.gravity;
        if !(g.x.is_finite() && g.y.is_finite() && g.z.is_finite()) {
            return Err(ParamsError::NonFiniteGravity([g.x, g.y, g.z]));
        }
        Ok(())
    }
}

/// Errors from creating a [`World`] with invalid [`WorldParams`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum ParamsError {
    #[error("Fixed timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),
    #[error("At least one substep per step is required")]
    ZeroSubsteps,
    #[error("At least one solver iteration per step is required")]
    ZeroIterations,
    #[error("Spatial hash cell size must be positive and finite, got {0}")]
    InvalidCellSize(f64),
    #[error("Gravity must be finite, got {0:?}")]
    NonFiniteGravity([f64; 3]),
}

/// A body hit by a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub body: BodyKey,
    /// Distance along the ray from its origin.
    pub distance: f64,
    /// Point where the ray enters the body's collider,
    /// or exits it if the ray started inside.
    pub point: m::Vec3,
}

impl RayHit {
    /// Sort hits from nearest to farthest.
    /// [`World::raycast`] returns hits in no particular order.
    pub fn sort_by_distance(hits: &mut [RayHit]) {
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }
}

type CollisionCallback = Box<dyn FnMut(&Contact)>;

/// A physics world owning bodies and constraints and stepping them forward in time.
pub struct World {
    params: WorldParams,
    bodies: BodySet,
    constraints: ConstraintSet,
    spatial_hash: SpatialHash,
    accumulator: f64,
    // results of the latest simulation step, kept for inspection
    contacts: Vec<Contact>,
    pairs: Vec<[BodyKey; 2]>,
    collision_callback: Option<CollisionCallback>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("params", &self.params)
            .field("bodies", &self.bodies.len())
            .field("constraints", &self.constraints.len())
            .field("accumulator", &self.accumulator)
            .field("contacts", &self.contacts.len())
            .field("has_collision_callback", &self.collision_callback.is_some())
            .finish()
    }
}

impl World {
    /// Create a world with default parameters.
    pub fn new() -> Self {
        Self::from_valid_params(WorldParams::default())
    }

    /// Create a world with custom parameters, failing if they are invalid.
    pub fn with_params(params: WorldParams) -> Result<Self, ParamsError> {
        if let Err(err) = params.validate() {
            log::warn!("Rejected world parameters: {}", err);
            return Err(err);
        }
        Ok(Self::from_valid_params(params))
    }

    fn from_valid_params(params: WorldParams) -> Self {
        World {
            params,
            bodies: BodySet::new(),
            constraints: ConstraintSet::new(),
            spatial_hash: SpatialHash::new(params.cell_size),
            accumulator: 0.0,
            contacts: Vec::new(),
            pairs: Vec::new(),
            collision_callback: None,
        }
    }

    #[inline]
    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    //
    // bodies
    //

    /// Create a body and add it to the world.
    pub fn add_body(&mut self, desc: &BodyDesc) -> BodyKey {
        let key = self.bodies.insert(RigidBody::new(desc));
        log::debug!("Added body {} ({:?})", key.id(), desc.collider);
        key
    }

    /// Remove a body, returning it if it still existed.
    /// Constraints attached to the body are removed with it.
    pub fn remove_body(&mut self, key: BodyKey) -> Option<RigidBody> {
        let body = self.bodies.remove(key)?;
        let dropped = self.constraints.remove_attached_to(key);
        log::debug!(
            "Removed body {} and {} constraint(s) attached to it",
            key.id(),
            dropped
        );
        Some(body)
    }

    #[inline]
    pub fn body(&self, key: BodyKey) -> Option<&RigidBody> {
        self.bodies.get(key)
    }

    #[inline]
    pub fn body_mut(&mut self, key: BodyKey) -> Option<&mut RigidBody> {
        self.bodies.get_mut(key)
    }

    #[inline]
    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    //
    // constraints
    //

    /// Add a constraint. Returns a key that can be used to remove it later.
    ///
    /// Constraints referring to bodies that don't exist are not added.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Option<ConstraintKey> {
        if !self.bodies.contains(constraint.body_a) || !self.bodies.contains(constraint.body_b) {
            log::warn!("Tried to add a constraint referring to a removed body");
            return None;
        }
        let key = self.constraints.insert(constraint);
        log::debug!("Added {:?} constraint", constraint.ty);
        Some(key)
    }

    /// Remove a constraint from the world, returning it if it still existed.
    ///
    /// Constraints can also disappear on their own if the bodies they're attached to
    /// are removed, so it's not guaranteed the constraint will exist
    /// even if it hasn't been explicitly removed before.
    pub fn remove_constraint(&mut self, key: ConstraintKey) -> Option<Constraint> {
        self.constraints.remove(key)
    }

    #[inline]
    pub fn constraint(&self, key: ConstraintKey) -> Option<&Constraint> {
        self.constraints.get(key)
    }

    #[inline]
    pub fn constraint_mut(&mut self, key: ConstraintKey) -> Option<&mut Constraint> {
        self.constraints.get_mut(key)
    }

    #[inline]
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    //
    // global settings and events
    //

    pub fn set_gravity(&mut self, gravity: m::Vec3) {
        self.params.gravity = gravity;
    }

    #[inline]
    pub fn gravity(&self) -> m::Vec3 {
        self.params.gravity
    }

    /// Set a function to call for every contact found during a step.
    ///
    /// The callback runs in the middle of a step and has no access to the world.
    /// Changes to the world in response to a collision must be deferred
    /// until after [`step`][Self::step] returns.
    pub fn on_collision(&mut self, callback: impl FnMut(&Contact) + 'static) {
        self.collision_callback = Some(Box::new(callback));
    }

    pub fn clear_collision_callback(&mut self) {
        self.collision_callback = None;
    }

    /// Contacts found during the latest simulation step.
    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Candidate pairs the broad phase produced during the latest simulation step.
    #[inline]
    pub fn broad_phase_pairs(&self) -> &[[BodyKey; 2]] {
        &self.pairs
    }

    /// Simulation time waiting to be stepped.
    #[inline]
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Remove all bodies and constraints, keeping parameters and the collision callback.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
        self.spatial_hash.clear();
        self.contacts.clear();
        self.pairs.clear();
        self.accumulator = 0.0;
    }

    //
    // simulation
    //

    /// Advance the world by real time `dt` in fixed-size steps.
    ///
    /// Leftover time smaller than a step is carried over to the next call.
    /// If the step limit is hit, the remaining time is dropped instead
    /// so that a long frame doesn't make every following frame even longer.
    ///
    /// Returns the number of fixed steps run.
    pub fn step(&mut self, dt: f64) -> usize {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("Ignoring invalid time step {}", dt);
            return 0;
        }

        let fixed_dt = self.params.fixed_timestep;
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= fixed_dt && substeps < self.params.max_substeps {
            self.simulate(fixed_dt);
            self.accumulator -= fixed_dt;
            substeps += 1;
        }
        if substeps == self.params.max_substeps && self.accumulator > 0.0 {
            log::debug!(
                "Step limit reached, dropping {:.4}s of simulation time",
                self.accumulator
            );
            self.accumulator = 0.0;
        }
        substeps
    }

    /// Run a single simulation step of length `dt`, ignoring the accumulator.
    pub fn simulate(&mut self, dt: f64) {
        let gravity = self.params.gravity;
        for (_, rb) in self.bodies.iter_mut() {
            if rb.ty == BodyType::Dynamic && !rb.is_sleeping() {
                if let Some(mass) = rb.mass() {
                    rb.add_force(gravity * mass);
                }
            }
            rb.integrate(dt);
        }

        self.pairs = self.find_pairs();
        let contacts = self.find_contacts();

        if let Some(callback) = &mut self.collision_callback {
            for contact in &contacts {
                callback(contact);
            }
        }

        {
            let _span = tracy_span!("resolve contacts", "simulate");
            for contact in &contacts {
                if let Some((a, b)) = self.bodies.get2_mut(contact.body_a, contact.body_b) {
                    solver::resolve_contact(a, b, contact);
                }
            }
        }

        let passes = solver::relax(
            &mut self.bodies,
            &self.constraints,
            &contacts,
            self.params.solver_iterations,
        );

        for contact in &contacts {
            for key in [contact.body_a, contact.body_b] {
                if let Some(rb) = self.bodies.get_mut(key) {
                    if rb.is_sleeping() {
                        rb.wake();
                    }
                }
            }
        }

        for (_, rb) in self.bodies.iter_mut() {
            rb.update_sleep(dt);
        }

        log::trace!(
            "Simulated {:.4}s: {} candidate pairs, {} contacts, {} relaxation passes",
            dt,
            self.pairs.len(),
            contacts.len(),
            passes
        );
        self.contacts = contacts;
    }

    /// Rebuild the spatial hash from current poses and collect candidate pairs.
    fn find_pairs(&mut self) -> Vec<[BodyKey; 2]> {
        let _span = tracy_span!("broad phase", "find_pairs");

        self.spatial_hash.clear();
        let mut keys: Vec<BodyKey> = Vec::with_capacity(self.bodies.len());
        for (idx, (key, rb)) in self.bodies.iter().enumerate() {
            keys.push(key);
            self.spatial_hash
                .insert(idx, rb.collider.world_aabb(&rb.pose), rb.is_static());
        }
        self.spatial_hash
            .pairs()
            .into_iter()
            .map(|[i, j]| [keys[i], keys[j]])
            .collect()
    }

    /// Run exact intersection tests on the candidate pairs.
    /// Pairs where neither body can currently move are skipped.
    fn find_contacts(&self) -> Vec<Contact> {
        let _span = tracy_span!("narrow phase", "find_contacts");

        self.pairs
            .iter()
            .filter_map(|&[key_a, key_b]| {
                let a = self.bodies.get(key_a)?;
                let b = self.bodies.get(key_b)?;
                if !a.is_active() && !b.is_active() {
                    return None;
                }
                intersection_check(&a.pose, &a.collider, &b.pose, &b.collider)
                    .map(|sc| Contact::from_shape_contact(key_a, key_b, sc))
            })
            .collect()
    }

    //
    // queries
    //

    /// Find every body the ray hits within `max_distance`, or any distance if `None`.
    ///
    /// Hits are not sorted, see [`RayHit::sort_by_distance`].
    /// A zero direction hits nothing.
    pub fn raycast(
        &self,
        origin: m::Vec3,
        direction: m::Vec3,
        max_distance: Option<f64>,
    ) -> Vec<RayHit> {
        let ray = match Ray::new(origin, direction) {
            Some(ray) => ray,
            None => return Vec::new(),
        };
        let max_distance = max_distance.unwrap_or(f64::INFINITY);
        self.bodies
            .iter()
            .filter_map(|(key, rb)| {
                let t = collision::query::ray_collider(ray, &rb.pose, &rb.collider)?;
                (t <= max_distance).then(|| RayHit {
                    body: key,
                    distance: t,
                    point: ray.point_at_t(t),
                })
            })
            .collect()
    }

    /// Find every body overlapping a sphere.
    pub fn query_sphere(&self, center: m::Vec3, radius: f64) -> Vec<BodyKey> {
        self.query_shape(center, Collider::new_sphere(radius.max(0.0)))
    }

    /// Find every body overlapping an axis-aligned box given by two corners.
    pub fn query_aabb(&self, min: m::Vec3, max: m::Vec3) -> Vec<BodyKey> {
        // accept the corners in either order
        let lo = min.min_by_component(max);
        let hi = min.max_by_component(max);
        let bounds = AABB { min: lo, max: hi };
        self.query_shape(bounds.center(), Collider::new_aabb(bounds.half_extents()))
    }

    /// Find every body whose collider contains the point.
    pub fn query_point(&self, point: m::Vec3) -> Vec<BodyKey> {
        self.bodies
            .iter()
            .filter(|(_, rb)| collision::query::point_collider_bool(point, &rb.pose, &rb.collider))
            .map(|(key, _)| key)
            .collect()
    }

    fn query_shape(&self, center: m::Vec3, coll: Collider) -> Vec<BodyKey> {
        let pose = m::Pose::new(center, m::Rotor3::identity());
        let bounds = coll.world_aabb(&pose);
        self.bodies
            .iter()
            .filter(|(_, rb)| {
                rb.collider.world_aabb(&rb.pose).overlaps(&bounds)
                    && intersection_check(&pose, &coll, &rb.pose, &rb.collider).is_some()
            })
            .map(|(key, _)| key)
            .collect()
    }
}

/// Get the normal of a contact as seen from the given body,
/// i.e. pointing away from it.
pub fn normal_from(contact: &Contact, body: BodyKey) -> Option<Unit<m::Vec3>> {
    if contact.body_a == body {
        Some(contact.normal)
    } else if contact.body_b == body {
        Some(-contact.normal)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    fn ground(world: &mut World) -> BodyKey {
        world.add_body(
            &BodyDesc::new()
                .with_static(true)
                .with_position(m::Vec3::new(0.0, -1.0, 0.0))
                .with_collider(Collider::new_aabb(m::Vec3::new(10.0, 1.0, 10.0)).shape),
        )
    }

    #[test]
    fn invalid_params_are_rejected() {
        let ok = World::with_params(WorldParams::default());
        assert!(ok.is_ok());

        let err = World::with_params(WorldParams {
            fixed_timestep: 0.0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ParamsError::InvalidTimestep(0.0));

        let err = World::with_params(WorldParams {
            max_substeps: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ParamsError::ZeroSubsteps);

        let err = World::with_params(WorldParams {
            cell_size: -1.0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ParamsError::InvalidCellSize(-1.0));

        let err = World::with_params(WorldParams {
            gravity: m::Vec3::new(0.0, f64::NAN, 0.0),
            ..Default::default()
        });
        assert!(matches!(err, Err(ParamsError::NonFiniteGravity(_))));
    }

    #[test]
    fn accumulator_carries_leftover_time() {
        let mut world = World::new();
        let dt = world.params().fixed_timestep;
        assert_eq!(world.step(dt * 0.5), 0);
        assert!((world.accumulator() - dt * 0.5).abs() < 1e-12);
        assert_eq!(world.step(dt * 0.75), 1);
        assert!((world.accumulator() - dt * 0.25).abs() < 1e-12);
        assert_eq!(world.step(-1.0), 0);
        assert_eq!(world.step(f64::NAN), 0);
    }

    #[test]
    fn step_limit_drops_excess_time() {
        let mut world = World::new();
        let falling = world.add_body(&BodyDesc::new());
        assert_eq!(world.step(5.0), 10);
        assert_eq!(world.accumulator(), 0.0);
        // only 10 steps of falling happened
        let vy = world.body(falling).unwrap().velocity().linear.y;
        assert!((vy + 9.81 * 10.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn gravity_skips_static_and_sleeping_bodies() {
        let mut world = World::new();
        world.set_gravity(m::Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(world.gravity(), m::Vec3::new(0.0, 0.0, -1.0));
        let st = world.add_body(&BodyDesc::new().with_static(true));
        let sleeper =
            world.add_body(&BodyDesc::new().with_position(m::Vec3::new(10.0, 0.0, 0.0)));
        world.body_mut(sleeper).unwrap().sleep();
        world.simulate(0.1);
        assert_eq!(world.body(st).unwrap().position(), m::Vec3::zero());
        assert_eq!(world.body(sleeper).unwrap().position(), m::Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn callback_sees_every_contact() {
        let mut world = World::new();
        ground(&mut world);
        let ball = world.add_body(&BodyDesc::new().with_position(m::Vec3::new(0.0, 0.5, 0.0)));

        let seen: Rc<RefCell<Vec<Contact>>> = Rc::default();
        let seen_in_cb = Rc::clone(&seen);
        world.on_collision(move |c| seen_in_cb.borrow_mut().push(*c));
        world.simulate(1.0 / 60.0);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen.as_slice(), world.contacts());
        assert!(seen[0].involves(ball));
        let n = normal_from(&seen[0], ball).unwrap();
        assert!((n.y - (-1.0)).abs() < 1e-12);

        world.clear_collision_callback();
        world.simulate(1.0 / 60.0);
    }

    #[test]
    fn removing_body_removes_its_constraints() {
        let mut world = World::new();
        let a = world.add_body(&BodyDesc::new());
        let b = world.add_body(&BodyDesc::new().with_position(m::Vec3::new(3.0, 0.0, 0.0)));
        let c = world
            .add_constraint(ConstraintBuilder::new(a, b).build_distance(1.0))
            .unwrap();
        assert!(world.constraint(c).is_some());
        assert!(world.remove_body(b).is_some());
        assert!(world.constraint(c).is_none());
        assert!(world.remove_body(b).is_none());
        assert!(world
            .add_constraint(ConstraintBuilder::new(a, b).build_point())
            .is_none());
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn overlap_queries() {
        let mut world = World::with_params(WorldParams {
            gravity: m::Vec3::zero(),
            ..Default::default()
        })
        .unwrap();
        let near = world.add_body(&BodyDesc::new().with_position(m::Vec3::new(2.0, 0.0, 0.0)));
        let far = world.add_body(&BodyDesc::new().with_position(m::Vec3::new(20.0, 0.0, 0.0)));
        let boxed = world.add_body(
            &BodyDesc::new()
                .with_position(m::Vec3::new(0.0, 5.0, 0.0))
                .with_collider(Collider::new_cube(2.0).shape),
        );

        assert_eq!(world.query_sphere(m::Vec3::zero(), 1.5), vec![near]);
        let mut hits = world.query_sphere(m::Vec3::new(0.0, 3.0, 0.0), 2.8);
        hits.sort_by_key(|k| k.id());
        assert_eq!(hits, vec![near, boxed]);

        // corners given in reverse order
        let hits = world.query_aabb(
            m::Vec3::new(21.0, 1.0, 1.0),
            m::Vec3::new(19.5, -1.0, -1.0),
        );
        assert_eq!(hits, vec![far]);

        assert_eq!(world.query_point(m::Vec3::new(0.5, 5.5, -0.5)), vec![boxed]);
        assert!(world.query_point(m::Vec3::new(0.0, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn raycast_respects_max_distance() {
        let mut world = World::new();
        let near = world.add_body(&BodyDesc::new().with_static(true));
        let far = world.add_body(
            &BodyDesc::new()
                .with_static(true)
                .with_position(m::Vec3::new(0.0, -10.0, 0.0)),
        );
        let origin = m::Vec3::new(0.0, 10.0, 0.0);
        let down = m::Vec3::new(0.0, -1.0, 0.0);

        let mut hits = world.raycast(origin, down, None);
        assert_eq!(hits.len(), 2);
        RayHit::sort_by_distance(&mut hits);
        assert_eq!(hits[0].body, near);
        assert_eq!(hits[1].body, far);
        assert!((hits[1].distance - 19.0).abs() < 1e-12);

        let hits = world.raycast(origin, down, Some(10.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].body, near);

        assert!(world.raycast(origin, m::Vec3::zero(), None).is_empty());
    }

    #[test]
    fn clear_empties_the_world() {
        let mut world = World::new();
        ground(&mut world);
        world.add_body(&BodyDesc::new().with_position(m::Vec3::new(0.0, 0.5, 0.0)));
        world.step(1.0 / 60.0 + 0.001);
        assert!(!world.contacts().is_empty());
        world.clear();
        assert_eq!(world.body_count(), 0);
        assert!(world.contacts().is_empty());
        assert!(world.broad_phase_pairs().is_empty());
        assert_eq!(world.accumulator(), 0.0);
    }
}
