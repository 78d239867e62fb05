use super::RigidBody;

use thunderdome as td;

/// Key type to look up a body stored in the physics world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyKey(pub(super) td::Index);

impl BodyKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    /// Useful for creating your own mappings from bodies to other things.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }

    /// Integer id of the body. Stable for the body's lifetime and never shared
    /// with another live body, but may be reused after the body is removed.
    #[inline]
    pub fn id(&self) -> u32 {
        self.0.slot()
    }
}

/// Storage for the bodies of a physics world.
#[derive(Clone, Debug, Default)]
pub struct BodySet {
    pub(super) bodies: td::Arena<RigidBody>,
}

impl BodySet {
    #[inline]
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Access a body in the physics world, if it still exists.
    #[inline]
    pub fn get(&self, key: BodyKey) -> Option<&RigidBody> {
        self.bodies.get(key.0)
    }

    /// Mutably access a body in the physics world, if it still exists.
    #[inline]
    pub fn get_mut(&mut self, key: BodyKey) -> Option<&mut RigidBody> {
        self.bodies.get_mut(key.0)
    }

    /// Mutably access two different bodies at once.
    /// Returns `None` if either one doesn't exist or the keys are the same.
    pub fn get2_mut(
        &mut self,
        a: BodyKey,
        b: BodyKey,
    ) -> Option<(&mut RigidBody, &mut RigidBody)> {
        if a == b {
            return None;
        }
        match self.bodies.get2_mut(a.0, b.0) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, key: BodyKey) -> bool {
        self.bodies.contains(key.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Iterate over all bodies in slot order.
    pub fn iter(&self) -> impl '_ + Iterator<Item = (BodyKey, &RigidBody)> {
        self.bodies.iter().map(|(idx, rb)| (BodyKey(idx), rb))
    }

    /// Mutably iterate over all bodies in slot order.
    pub fn iter_mut(&mut self) -> impl '_ + Iterator<Item = (BodyKey, &mut RigidBody)> {
        self.bodies.iter_mut().map(|(idx, rb)| (BodyKey(idx), rb))
    }

    #[inline]
    pub(super) fn insert(&mut self, body: RigidBody) -> BodyKey {
        BodyKey(self.bodies.insert(body))
    }

    #[inline]
    pub(super) fn remove(&mut self, key: BodyKey) -> Option<RigidBody> {
        self.bodies.remove(key.0)
    }

    // not exposed to users, must use through World::clear
    pub(super) fn clear(&mut self) {
        self.bodies.clear();
    }
}
