//! Automaton configuration.
//!
//! Every option has a default, so a JSON document only needs the keys it
//! changes:
//!
//! ```json
//! { "order": 6, "num_plates": 5, "disable_watershed": true }
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pid::{Gain, PidConfig};

/// Largest supported grid order; `2^15 x 2^15` cells.
pub const MAX_ORDER: u32 = 15;
/// Plate ids are stored as `u8`.
pub const MAX_PLATES: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomatonConfig {
    /// Grid exponent: the grid is `2^order` cells on a side.
    pub order: u32,
    pub num_plates: usize,
    /// Largest earth displacement a single quake moves per cell.
    pub quake_magnitude: i64,
    /// Water above this depth counts toward coverage.
    pub significant_water: i64,
    /// Baseline rain volume per cell, scaled by the water controller.
    pub water_adjustment_volume: i64,
    /// Uniform angle of repose for every cell.
    pub repose: i64,
    pub faucet_volume: i64,
    /// Added to each cell's index before the entropy field is first advanced.
    pub seed: u64,

    pub disable_plates: bool,
    pub disable_quakes: bool,
    pub disable_slides: bool,
    pub disable_watershed: bool,
    pub disable_water_coverage: bool,
    pub enable_faucet: bool,
    pub enable_drain: bool,

    /// Drives quake frequency from the spread of elevations.
    pub earth_pid: PidConfig,
    /// Drives rain from water coverage. `None` targets half the grid.
    pub water_pid: Option<PidConfig>,
}

impl Default for AutomatonConfig {
    fn default() -> Self {
        Self {
            order: 8,
            num_plates: 8,
            quake_magnitude: 1,
            significant_water: 0xf,
            water_adjustment_volume: 0xf,
            repose: 0xf,
            faucet_volume: 0x1000,
            seed: 0,
            disable_plates: false,
            disable_quakes: false,
            disable_slides: false,
            disable_watershed: false,
            disable_water_coverage: false,
            enable_faucet: false,
            enable_drain: false,
            earth_pid: default_earth_pid(),
            water_pid: None,
        }
    }
}

pub fn default_earth_pid() -> PidConfig {
    PidConfig {
        setpoint: 0xff,
        kp: Gain::whole(0xfff),
        ki: Gain::whole(0xfff),
        kd: Gain::whole(0xfff),
        min: 0,
        max: 0xfff_ffff,
    }
}

pub fn default_water_pid(area: usize) -> PidConfig {
    PidConfig {
        setpoint: (area / 2) as i64,
        kp: Gain::whole(0xf),
        ki: Gain::whole(0xf),
        kd: Gain::whole(1),
        min: 0,
        max: 0xffff_ffff,
    }
}

impl AutomatonConfig {
    /// Defaults with the two required options set.
    pub fn new(order: u32, num_plates: usize) -> Self {
        Self {
            order,
            num_plates,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        tracing::info!(path = %path.display(), order = config.order, plates = config.num_plates, "loaded automaton config");
        Ok(config)
    }

    pub fn length(&self) -> usize {
        1 << self.order
    }

    pub fn area(&self) -> usize {
        1 << (2 * self.order)
    }

    /// The water controller, with the default derived from the grid area.
    pub fn water_pid(&self) -> PidConfig {
        self.water_pid.unwrap_or_else(|| default_water_pid(self.area()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ORDER).contains(&self.order) {
            return Err(invalid(format!("order {} outside 1..={MAX_ORDER}", self.order)));
        }
        if !(1..=MAX_PLATES).contains(&self.num_plates) {
            return Err(invalid(format!(
                "num_plates {} outside 1..={MAX_PLATES}",
                self.num_plates
            )));
        }
        for (name, v) in [
            ("quake_magnitude", self.quake_magnitude),
            ("significant_water", self.significant_water),
            ("water_adjustment_volume", self.water_adjustment_volume),
            ("repose", self.repose),
            ("faucet_volume", self.faucet_volume),
        ] {
            if v < 0 {
                return Err(invalid(format!("{name} must not be negative, got {v}")));
            }
        }
        validate_pid("earth_pid", &self.earth_pid)?;
        validate_pid("water_pid", &self.water_pid())?;
        Ok(())
    }
}

fn validate_pid(name: &str, pid: &PidConfig) -> Result<(), ConfigError> {
    for (term, gain) in [("kp", pid.kp), ("ki", pid.ki), ("kd", pid.kd)] {
        if gain.under == 0 {
            return Err(invalid(format!("{name}.{term} has a zero denominator")));
        }
    }
    if pid.min > pid.max {
        return Err(invalid(format!("{name} min {} exceeds max {}", pid.min, pid.max)));
    }
    Ok(())
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::Invalid(msg)
}
