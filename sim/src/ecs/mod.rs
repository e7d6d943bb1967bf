//! Entity-component core.
//!
//! - [`Scope`] owns entity identity and component type masks, and notifies
//!   registered [`Watcher`]s as types change.
//! - [`ArrayIndex`] maps live entities onto dense rows for component data.
//! - [`EntityRelation`] stores edges between entities as entities of their
//!   own, with cascading deletes.

pub mod array_index;
pub mod id;
pub mod relation;
pub mod scope;

pub use array_index::ArrayIndex;
pub use id::{Type, ID};
pub use relation::{EntityRelation, TYPE_ENTITY_RELATION};
pub use scope::{shared, Entities, Entity, OnCreate, OnDestroy, Scope, ScopeId, Watcher, WatcherRef};
