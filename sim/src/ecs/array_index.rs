//! Dense row allocation for component data arrays.
//!
//! A component manager pairs one [`ArrayIndex`] with any number of parallel
//! `Vec`s; the index hands out a stable row per live entity and recycles rows
//! of destroyed ones.

use std::collections::HashMap;

use super::id::{Type, ID};
use super::scope::{Entity, ScopeId, Watcher};
use crate::error::EcsError;

#[derive(Debug, Default, Clone)]
pub struct ArrayIndex {
    scope: Option<ScopeId>,
    ids: Vec<ID>,
    ix: HashMap<ID, usize>,
    free: Vec<usize>,
}

impl ArrayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a scope up front; otherwise the first insert binds it.
    pub fn with_scope(scope: ScopeId) -> Self {
        Self {
            scope: Some(scope),
            ..Self::default()
        }
    }

    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Drop all rows and unbind the scope.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.ix.clear();
        self.free.clear();
        self.scope = None;
    }

    /// Allocated rows, live or free.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Rows currently holding a live entity.
    pub fn used(&self) -> usize {
        self.ids.len() - self.free.len()
    }

    fn bind(&mut self, ent: Entity) {
        match self.scope {
            None => self.scope = Some(ent.scope()),
            Some(scope) if scope != ent.scope() => panic!(
                "multi-scope use of ArrayIndex: {}",
                EcsError::ForeignEntity {
                    scope: scope.raw(),
                    entity_scope: ent.scope().raw(),
                }
            ),
            Some(_) => {}
        }
    }

    /// Assign a row to `ent`, preferring a recycled one.
    pub fn insert(&mut self, ent: Entity) -> usize {
        self.bind(ent);
        let row = match self.free.pop() {
            Some(row) => {
                self.ids[row] = ent.id();
                row
            }
            None => {
                self.ids.push(ent.id());
                self.ids.len() - 1
            }
        };
        self.ix.insert(ent.id(), row);
        row
    }

    /// Release the entity's row, returning it if the entity had one.
    pub fn delete(&mut self, ent: Entity) -> Option<usize> {
        if self.scope.is_some() {
            self.bind(ent);
        }
        let row = self.ix.remove(&ent.id())?;
        self.ids[row] = ID::ZERO;
        self.free.push(row);
        Some(row)
    }

    pub fn get(&self, ent: Entity) -> Option<usize> {
        match self.scope {
            Some(scope) if scope != ent.scope() => None,
            _ => self.get_id(ent.id()),
        }
    }

    pub fn get_id(&self, id: ID) -> Option<usize> {
        self.ix.get(&id).copied()
    }

    /// Entity stored at `row`, or [`Entity::NONE`] for free or unknown rows.
    pub fn entity(&self, row: usize) -> Entity {
        match (self.scope, self.id(row)) {
            (Some(scope), id) if !id.is_zero() => Entity::new(scope, id),
            _ => Entity::NONE,
        }
    }

    pub fn id(&self, row: usize) -> ID {
        self.ids.get(row).copied().unwrap_or(ID::ZERO)
    }

    /// Live `(row, id)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, ID)> + '_ {
        self.ids
            .iter()
            .enumerate()
            .filter(|(_, id)| !id.is_zero())
            .map(|(row, &id)| (row, id))
    }
}

impl Watcher for ArrayIndex {
    fn entity_created(&mut self, ent: Entity, _typ: Type) {
        self.insert(ent);
    }

    fn entity_destroyed(&mut self, ent: Entity, _typ: Type) {
        self.delete(ent);
    }
}
