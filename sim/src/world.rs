//! Snapshot types for the automaton.
//!
//! [`SnapshotView`] borrows the automaton's arrays for cheap per-tick reads;
//! [`Snapshot`] owns copies and serializes to JSON for tooling and replay
//! comparison. Cell arrays are in Hilbert order; the `raster_*` helpers
//! convert to row-major.

use serde::{Deserialize, Serialize};

use crate::grid::raster_hilbert;
use crate::stats::Stats64;

/// Magnitudes moved by each stage during the last tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCounters {
    pub quake: i64,
    pub slide: i64,
    /// Water moved by the watershed.
    pub water: i64,
    /// Earth carried along by the watershed.
    pub erosion: i64,
    pub precipitation: i64,
    /// Net change from evaporation, zero or negative.
    pub evaporation: i64,
}

/// Read-only view of the automaton after a tick.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotView<'a> {
    pub generation: u64,
    pub order: u32,
    pub num_plates: usize,
    pub earth: &'a [i64],
    pub water: &'a [i64],
    pub plates: &'a [u8],
    pub earth_stats: Stats64,
    pub water_stats: Stats64,
    pub water_coverage: i64,
    pub flows: FlowCounters,
    pub earth_control: i64,
    pub water_control: i64,
}

impl SnapshotView<'_> {
    pub fn length(&self) -> usize {
        1 << self.order
    }

    /// Copy the view into an owned snapshot.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            generation: self.generation,
            order: self.order,
            num_plates: self.num_plates,
            earth: self.earth.to_vec(),
            water: self.water.to_vec(),
            plates: self.plates.to_vec(),
            earth_stats: self.earth_stats,
            water_stats: self.water_stats,
            water_coverage: self.water_coverage,
            flows: self.flows,
            earth_control: self.earth_control,
            water_control: self.water_control,
        }
    }
}

/// Owned automaton state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generation: u64,
    pub order: u32,
    pub num_plates: usize,
    /// Elevation by Hilbert index.
    pub earth: Vec<i64>,
    /// Water depth by Hilbert index.
    pub water: Vec<i64>,
    /// Plate id by Hilbert index.
    pub plates: Vec<u8>,
    pub earth_stats: Stats64,
    pub water_stats: Stats64,
    pub water_coverage: i64,
    pub flows: FlowCounters,
    /// Output of the earth controller (quake odds numerator).
    pub earth_control: i64,
    /// Output of the water controller (rain scale).
    pub water_control: i64,
}

impl Snapshot {
    pub fn length(&self) -> usize {
        1 << self.order
    }

    /// Earth in row-major order.
    pub fn raster_earth(&self) -> Vec<i64> {
        self.raster(&self.earth)
    }

    /// Water in row-major order.
    pub fn raster_water(&self) -> Vec<i64> {
        self.raster(&self.water)
    }

    /// Plates in row-major order.
    pub fn raster_plates(&self) -> Vec<u8> {
        self.raster(&self.plates)
    }

    fn raster<T: Copy + Default>(&self, values: &[T]) -> Vec<T> {
        let mut out = vec![T::default(); values.len()];
        raster_hilbert(&mut out, values, self.length());
        out
    }

    /// Serialize snapshot to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to a pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
