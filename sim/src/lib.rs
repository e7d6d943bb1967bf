//! worldcore - generational ECS core and a deterministic world automaton.
//!
//! Two independent halves share this crate:
//!
//! - [`ecs`] and [`spatial`]: scopes of generational entity handles with
//!   type-mask watchers, dense row indexes, entity relations with cascading
//!   deletes, and a Morton-ordered spatial index.
//! - [`Automaton`]: integer-only plates, quakes, slides, watershed and
//!   water regulation on a Hilbert-ordered toroidal grid.

pub mod api;
pub mod config;
pub mod ecs;
pub mod error;
pub mod grid;
pub mod int;
pub mod pid;
pub mod profiler;
pub mod spatial;
pub mod stats;
pub mod systems;
pub mod world;

pub use api::Automaton;
pub use config::AutomatonConfig;
pub use ecs::{ArrayIndex, Entities, Entity, EntityRelation, Scope, Type, Watcher, ID};
pub use error::{ConfigError, EcsError, SimError};
pub use grid::Grid;
pub use pid::{Gain, Pid, PidConfig};
pub use profiler::Profiler;
pub use spatial::{Point, Rect, SpatialIndex};
pub use stats::Stats64;
pub use world::{FlowCounters, Snapshot, SnapshotView};
