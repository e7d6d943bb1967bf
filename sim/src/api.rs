//! Public API for the world automaton.
//!
//! [`Automaton`] owns every per-cell field and runs the stage pipeline one
//! generation per [`Automaton::tick`]. All arrays are allocated at
//! construction and reused, so ticking does not allocate.
//!
//! ## Determinism
//!
//! The only randomness is the per-cell entropy field, seeded from the cell
//! index (plus the configured seed) and advanced after every stage that
//! reads it. Two automata built from the same config produce identical
//! fields tick for tick, with or without the `parallel` feature.

use crate::config::AutomatonConfig;
use crate::error::SimError;
use crate::grid::{add_stencil3, write_stencil3, write_stencil5, Grid};
use crate::int::{clamp, mag};
use crate::pid::Pid;
use crate::profiler::Profiler;
use crate::spatial::Point;
use crate::stats::Stats64;
use crate::systems::slides::{EAST, SOUTH};
use crate::systems::*;
use crate::world::{FlowCounters, Snapshot, SnapshotView};

/// The world automaton: plates, earth and water on a Hilbert-ordered torus.
pub struct Automaton {
    config: AutomatonConfig,
    grid: Grid,
    generation: u64,

    entropy: Vec<u64>,

    plates: Vec<u8>,
    plate5s: Vec<[u8; 5]>,
    plate_sizes: Vec<usize>,
    quake_vectors: Vec<Point>,

    earth: Vec<i64>,
    earth3s: Vec<[i64; 3]>,
    repose: Vec<i64>,
    earth_stats: Stats64,
    earth_pid: Pid,

    water: Vec<i64>,
    water3s: Vec<[i64; 3]>,
    water_stats: Stats64,
    water_coverage: i64,
    water_pid: Pid,

    /// Scatter deltas for the field being committed.
    temp3s: Vec<[i64; 3]>,
    /// Earth deltas carried by the watershed.
    erosion3s: Vec<[i64; 3]>,

    flows: FlowCounters,
    profiler: Profiler,
}

impl Automaton {
    /// Automaton with default options on a `2^order` grid.
    pub fn new(order: u32, num_plates: usize) -> Result<Self, SimError> {
        if !(1..=crate::config::MAX_ORDER).contains(&order) {
            return Err(SimError::InvalidArgument(format!("grid order {order} is not supported")));
        }
        if !(1..=crate::config::MAX_PLATES).contains(&num_plates) {
            return Err(SimError::InvalidArgument(format!("{num_plates} plates is not supported")));
        }
        Self::with_config(AutomatonConfig::new(order, num_plates))
    }

    pub fn with_config(config: AutomatonConfig) -> Result<Self, SimError> {
        config.validate()?;

        let grid = Grid::new(config.order);
        let area = grid.area;
        let mut automaton = Self {
            grid,
            generation: 0,
            entropy: vec![0; area],
            plates: vec![0; area],
            plate5s: vec![[0; 5]; area],
            plate_sizes: vec![0; config.num_plates],
            quake_vectors: vec![Point::default(); config.num_plates],
            earth: vec![0; area],
            earth3s: vec![[0; 3]; area],
            repose: vec![config.repose; area],
            earth_stats: Stats64::default(),
            earth_pid: Pid::new(config.earth_pid),
            water: vec![0; area],
            water3s: vec![[0; 3]; area],
            water_stats: Stats64::default(),
            water_coverage: 0,
            water_pid: Pid::new(config.water_pid()),
            temp3s: vec![[0; 3]; area],
            erosion3s: vec![[0; 3]; area],
            flows: FlowCounters::default(),
            profiler: Profiler::new(),
            config,
        };
        automaton.reset();

        tracing::info!(
            order = automaton.config.order,
            area,
            plates = automaton.config.num_plates,
            "automaton created"
        );
        Ok(automaton)
    }

    /// Return to generation zero: flat dry earth, fresh entropy and plates.
    pub fn reset(&mut self) {
        self.generation = 0;
        self.earth.fill(0);
        self.water.fill(0);
        self.repose.fill(self.config.repose);
        self.earth_pid.reset();
        self.water_pid.reset();
        self.water_coverage = 0;
        self.flows = FlowCounters::default();

        seed_entropy(&mut self.entropy, self.config.seed);
        write_quake_vectors(&mut self.quake_vectors);
        write_random_plates(&mut self.plates, &self.entropy, self.config.num_plates);
        measure_plate_sizes(&mut self.plate_sizes, &self.plates);
        self.measure();
    }

    /// Load the fields of a snapshot taken from an automaton of the same shape.
    ///
    /// Earth, water, plates and the generation are copied. Entropy is
    /// reseeded from the configured seed plus the generation and both
    /// controllers restart, so a restored run diverges from the one that
    /// produced the snapshot.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SimError> {
        check_snapshot(snapshot)?;
        if snapshot.order != self.config.order || snapshot.num_plates != self.config.num_plates {
            return Err(SimError::InvalidArgument(format!(
                "snapshot is order {} with {} plates, automaton is order {} with {}",
                snapshot.order, snapshot.num_plates, self.config.order, self.config.num_plates
            )));
        }

        self.reset();
        seed_entropy(&mut self.entropy, self.config.seed.wrapping_add(snapshot.generation));
        self.generation = snapshot.generation;
        self.earth.copy_from_slice(&snapshot.earth);
        self.water.copy_from_slice(&snapshot.water);
        self.plates.copy_from_slice(&snapshot.plates);
        measure_plate_sizes(&mut self.plate_sizes, &self.plates);
        self.water_coverage = measure_coverage(&self.water, self.config.significant_water);
        self.measure();

        tracing::info!(generation = self.generation, "automaton restored");
        Ok(())
    }

    /// Advance one generation.
    pub fn tick(&mut self) {
        self.flows = FlowCounters::default();

        if !self.config.disable_plates {
            self.run_stage("plates", Self::tick_plates);
        }
        if !self.config.disable_quakes {
            self.run_stage("quakes", Self::tick_quakes);
        }
        if !self.config.disable_slides {
            self.run_stage("slides", Self::tick_slides);
        }
        if !self.config.disable_watershed {
            self.run_stage("watershed", Self::tick_watershed);
        }
        if !self.config.disable_water_coverage {
            self.run_stage("water_coverage", Self::tick_water_coverage);
        }

        let center = self.grid.area / 2;
        if self.config.enable_faucet {
            self.water[center] += self.config.faucet_volume;
        }
        if self.config.enable_drain {
            self.water[0] = 0;
        }

        self.generation += 1;
        self.measure();

        #[cfg(feature = "profile")]
        self.profiler.tick();

        tracing::debug!(
            generation = self.generation,
            quake = self.flows.quake,
            slide = self.flows.slide,
            water = self.flows.water,
            erosion = self.flows.erosion,
            precipitation = self.flows.precipitation,
            evaporation = self.flows.evaporation,
            coverage = self.water_coverage,
            earth_control = self.earth_pid.control,
            water_control = self.water_pid.control,
            "tick"
        );
    }

    /// Run `n` ticks.
    pub fn run(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    #[cfg_attr(not(feature = "profile"), allow(unused_variables))]
    fn run_stage(&mut self, name: &'static str, stage: fn(&mut Self)) {
        #[cfg(feature = "profile")]
        let start = std::time::Instant::now();

        stage(self);

        #[cfg(feature = "profile")]
        self.profiler.record(name, start.elapsed());
    }

    fn tick_plates(&mut self) {
        write_stencil5(&mut self.plate5s, &self.plates, &self.grid.stencil5);
        write_next_plates(&mut self.plates, &self.plate5s, &self.entropy, &self.plate_sizes);
        measure_plate_sizes(&mut self.plate_sizes, &self.plates);
        write_next_random(&mut self.entropy);
    }

    fn tick_quakes(&mut self) {
        self.earth_stats.measure(&self.earth);
        let ctrl_max = self.earth_pid.max();
        let control = clamp(self.earth_pid.tick(self.earth_stats.spread()), 0, ctrl_max);
        let params = QuakeParams {
            control,
            ctrl_max,
            magnitude: self.config.quake_magnitude,
        };

        write_stencil3(&mut self.earth3s, &self.earth, &self.grid.stencil3);
        self.flows.quake = quake(
            &mut self.temp3s,
            &self.earth3s,
            &self.plates,
            &self.quake_vectors,
            params,
            &self.entropy,
        );
        commit(&mut self.earth, &self.temp3s, &self.grid);
        write_next_random(&mut self.entropy);
    }

    fn tick_slides(&mut self) {
        // the east pass moves half, damping back-and-forth with the south pass
        for (mute, other) in [(2, EAST), (1, SOUTH)] {
            write_stencil3(&mut self.earth3s, &self.earth, &self.grid.stencil3);
            self.flows.slide += slide_pass(&mut self.temp3s, &self.earth3s, &self.repose, mute, other);
            commit(&mut self.earth, &self.temp3s, &self.grid);
            write_next_random(&mut self.entropy);
        }
    }

    fn tick_watershed(&mut self) {
        write_stencil3(&mut self.earth3s, &self.earth, &self.grid.stencil3);
        write_stencil3(&mut self.water3s, &self.water, &self.grid.stencil3);
        let totals = watershed(
            &mut self.temp3s,
            &mut self.erosion3s,
            &self.water3s,
            &self.earth3s,
            &self.entropy,
        );
        self.flows.water = totals.water;
        self.flows.erosion = totals.erosion;
        commit(&mut self.water, &self.temp3s, &self.grid);
        commit(&mut self.earth, &self.erosion3s, &self.grid);
        write_next_random(&mut self.entropy);
    }

    fn tick_water_coverage(&mut self) {
        self.water_stats.measure(&self.water);
        self.water_coverage = measure_coverage(&self.water, self.config.significant_water);
        let control = self.water_pid.tick(self.water_coverage);
        let adjustment = adjust_water(
            &mut self.water,
            control,
            self.config.water_adjustment_volume,
            &self.entropy,
        );
        self.flows.precipitation = adjustment.precipitation;
        self.flows.evaporation = adjustment.evaporation;
        write_next_random(&mut self.entropy);
    }

    fn measure(&mut self) {
        self.earth_stats.measure(&self.earth);
        self.water_stats.measure(&self.water);
    }

    /// A single column of `1000` in the centre cell on flat ground.
    pub fn set_tower_test_pattern(&mut self) {
        self.earth.fill(0);
        self.earth[self.grid.area / 2] = 1000;
        self.measure();
    }

    /// A square pyramid peaking at `L` in the middle of the grid.
    pub fn set_mountain_test_pattern(&mut self) {
        let z = self.grid.length as i64;
        for (e, p) in self.earth.iter_mut().zip(&self.grid.points) {
            *e = z - mag(p.x - z / 2) - mag(p.y - z / 2);
        }
        self.measure();
    }

    /// Elevation equal to the Hilbert index.
    pub fn set_hilbert_mountain_test_pattern(&mut self) {
        for (i, e) in self.earth.iter_mut().enumerate() {
            *e = i as i64;
        }
        self.measure();
    }

    /// Borrowed view of the current state.
    pub fn snapshot(&self) -> SnapshotView<'_> {
        SnapshotView {
            generation: self.generation,
            order: self.config.order,
            num_plates: self.config.num_plates,
            earth: &self.earth,
            water: &self.water,
            plates: &self.plates,
            earth_stats: self.earth_stats,
            water_stats: self.water_stats,
            water_coverage: self.water_coverage,
            flows: self.flows,
            earth_control: self.earth_pid.control,
            water_control: self.water_pid.control,
        }
    }

    /// Owned copy of the current state.
    pub fn capture(&self) -> Snapshot {
        self.snapshot().to_snapshot()
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&self) -> String {
        self.capture().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Earth, water and plates as little-endian bytes, for hashing.
    pub fn digest_bytes(&self) -> Vec<u8> {
        state_bytes(&self.earth, &self.water, &self.plates)
    }

    pub fn set_faucet(&mut self, enabled: bool) {
        self.config.enable_faucet = enabled;
    }

    pub fn set_drain(&mut self, enabled: bool) {
        self.config.enable_drain = enabled;
    }

    pub fn config(&self) -> &AutomatonConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn earth(&self) -> &[i64] {
        &self.earth
    }

    /// Mutable earth for seeding custom initial conditions.
    pub fn earth_mut(&mut self) -> &mut [i64] {
        &mut self.earth
    }

    pub fn water(&self) -> &[i64] {
        &self.water
    }

    pub fn water_mut(&mut self) -> &mut [i64] {
        &mut self.water
    }

    pub fn plates(&self) -> &[u8] {
        &self.plates
    }

    pub fn plate_sizes(&self) -> &[usize] {
        &self.plate_sizes
    }

    pub fn quake_vectors(&self) -> &[Point] {
        &self.quake_vectors
    }

    pub fn entropy(&self) -> &[u64] {
        &self.entropy
    }

    pub fn flows(&self) -> FlowCounters {
        self.flows
    }

    pub fn earth_stats(&self) -> Stats64 {
        self.earth_stats
    }

    pub fn water_stats(&self) -> Stats64 {
        self.water_stats
    }

    pub fn water_coverage(&self) -> i64 {
        self.water_coverage
    }

    pub fn earth_pid(&self) -> &Pid {
        &self.earth_pid
    }

    pub fn water_pid(&self) -> &Pid {
        &self.water_pid
    }

    /// Stage timings; populated with the `profile` feature.
    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn profiler_mut(&mut self) -> &mut Profiler {
        &mut self.profiler
    }
}

/// Zero `field`, then scatter-add the stencil-3 deltas.
fn commit(field: &mut [i64], deltas: &[[i64; 3]], grid: &Grid) {
    field.fill(0);
    add_stencil3(field, deltas, &grid.stencil3);
}
