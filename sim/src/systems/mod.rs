//! Pipeline stages of the world automaton.
//!
//! A tick runs the stages in a fixed order, each skipped when disabled in
//! the config:
//!
//! 1. **Plates** - `plates`: lottery reassignment of plate ids
//! 2. **Quakes** - `quakes`: earth pushed along plate drift, gated by the
//!    earth controller
//! 3. **Slides** - `slides`: east then south settling toward the angle of
//!    repose
//! 4. **Watershed** - `watershed`: water sheds downhill, eroding earth
//! 5. **Water coverage** - `water_coverage`: rain from the water controller,
//!    then evaporation
//!
//! ## Gather, then scatter
//!
//! Every stage first gathers each cell's stencil into a wide scratch array
//! and computes per-cell deltas from that read-only copy. The deltas are
//! then committed by zeroing the target field and scatter-adding, so no
//! cell observes a neighbour's update from the same pass.
//!
//! ## Parallel Feature
//!
//! With `--features parallel`, the gather and delta phases use rayon. Commits
//! stay sequential and integer sums are order independent, so results are
//! identical with and without the feature.

pub mod plates;
pub mod quakes;
pub mod random;
pub mod serialization;
pub mod slides;
pub mod water_coverage;
pub mod watershed;

pub use plates::{draw_lottery, measure_plate_sizes, write_next_plates, write_random_plates};
pub use quakes::{quake, write_quake_vectors, QuakeParams};
pub use random::{advance, seed_entropy, write_next_random};
pub use serialization::*;
pub use slides::{slide, slide_pass};
pub use water_coverage::{adjust_water, measure_coverage, Adjustment};
pub use watershed::{shed, watershed, ShedTotals};
