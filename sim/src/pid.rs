//! Integer PID controller.
//!
//! Gains are fractions of integers so the loop is exact and reproducible.
//! The differential term is taken on the measured value rather than on the
//! error, so a setpoint change does not kick the output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::int::clamp;

/// Integer fraction `over / under`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gain {
    pub over: i64,
    pub under: i64,
}

impl Gain {
    /// Removes a term from the controller.
    pub const ZERO: Gain = Gain { over: 0, under: 1 };

    pub const fn new(over: i64, under: i64) -> Self {
        Self { over, under }
    }

    /// Whole-number gain.
    pub const fn whole(over: i64) -> Self {
        Self { over, under: 1 }
    }

    /// `n * over / under`, truncating toward zero and saturating on overflow.
    pub fn mul(self, n: i64) -> i64 {
        let v = n as i128 * self.over as i128 / self.under as i128;
        v.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Static controller definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidConfig {
    pub setpoint: i64,
    pub kp: Gain,
    pub ki: Gain,
    pub kd: Gain,
    pub min: i64,
    pub max: i64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            setpoint: 0,
            kp: Gain::ZERO,
            ki: Gain::ZERO,
            kd: Gain::ZERO,
            min: 0,
            max: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pid {
    pub config: PidConfig,
    /// Value seen on the previous tick.
    pub prior: i64,
    pub proportional: i64,
    pub integral: i64,
    pub differential: i64,
    pub control: i64,
}

impl Pid {
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn setpoint(&self) -> i64 {
        self.config.setpoint
    }

    pub fn set_setpoint(&mut self, setpoint: i64) {
        self.config.setpoint = setpoint;
    }

    pub fn min(&self) -> i64 {
        self.config.min
    }

    pub fn max(&self) -> i64 {
        self.config.max
    }

    /// Feed the measured `value` and update `control`.
    pub fn tick(&mut self, value: i64) -> i64 {
        let PidConfig { setpoint, kp, ki, kd, min, max } = self.config;
        let err = setpoint.saturating_sub(value);
        self.proportional = kp.mul(err);
        self.differential = kd.mul(value.saturating_sub(self.prior));
        self.integral = clamp(
            self.integral
                .saturating_add(ki.mul(err))
                .saturating_add(self.differential),
            min,
            max,
        );
        self.control = clamp(
            self.proportional
                .saturating_add(self.integral)
                .saturating_add(self.differential),
            min,
            max,
        );
        self.prior = value;
        self.control
    }

    /// Forget accumulated state, keeping the configuration.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P:{} I:{} D:{} SP:{} PV:{} CP:{}",
            self.proportional, self.integral, self.differential, self.config.setpoint, self.prior, self.control
        )
    }
}
