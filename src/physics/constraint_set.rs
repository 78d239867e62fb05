use super::{BodyKey, Constraint};

use thunderdome as td;

/// Key type to look up a constraint stored in the physics world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstraintKey(pub(super) td::Index);

/// Manager struct holding constraints inside of a physics world.
///
/// Constraints are solved in the order they were inserted,
/// so that order is tracked next to the arena.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet {
    pub(super) constraints: td::Arena<Constraint>,
    // may hold keys of removed constraints, skipped by generation check
    // and compacted once they outnumber the live ones
    order: Vec<ConstraintKey>,
}

impl ConstraintSet {
    #[inline]
    pub(super) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(super) fn insert(&mut self, constraint: Constraint) -> ConstraintKey {
        let key = ConstraintKey(self.constraints.insert(constraint));
        self.order.push(key);
        key
    }

    /// Access a Constraint in the physics world, if it still exists.
    #[inline]
    pub fn get(&self, key: ConstraintKey) -> Option<&Constraint> {
        self.constraints.get(key.0)
    }

    /// Mutably access a Constraint in the physics world, if it still exists.
    #[inline]
    pub fn get_mut(&mut self, key: ConstraintKey) -> Option<&mut Constraint> {
        self.constraints.get_mut(key.0)
    }

    /// Remove a constraint, returning it if it still existed.
    ///
    /// Constraints can also disappear on their own if the bodies they're associated with
    /// are removed, so it's not guaranteed the constraint will exist
    /// even if it hasn't been explicitly removed before.
    pub(super) fn remove(&mut self, key: ConstraintKey) -> Option<Constraint> {
        let removed = self.constraints.remove(key.0)?;
        if self.order.len() > 2 * self.constraints.len() + 8 {
            let constraints = &self.constraints;
            self.order.retain(|k| constraints.contains(k.0));
        }
        Some(removed)
    }

    /// Remove every constraint attached to the given body,
    /// returning how many were removed.
    pub(super) fn remove_attached_to(&mut self, body: BodyKey) -> usize {
        let constraints = &mut self.constraints;
        let before = constraints.len();
        self.order.retain(|key| {
            let attached = constraints
                .get(key.0)
                .map_or(true, |c| c.body_a == body || c.body_b == body);
            if attached {
                constraints.remove(key.0);
            }
            !attached
        });
        before - constraints.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Iterate over constraints in insertion order.
    pub fn iter(&self) -> impl '_ + Iterator<Item = &Constraint> {
        self.order
            .iter()
            .filter_map(move |key| self.constraints.get(key.0))
    }

    #[inline]
    pub(super) fn clear(&mut self) {
        self.constraints.clear();
        self.order.clear();
    }
}
