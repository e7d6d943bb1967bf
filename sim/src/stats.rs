//! Running min/max/sum summary over an `i64` vector.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats64 {
    pub min: i64,
    pub max: i64,
    pub sum: i64,
    pub count: i64,
}

impl Default for Stats64 {
    fn default() -> Self {
        Self {
            min: i64::MAX,
            max: i64::MIN,
            sum: 0,
            count: 0,
        }
    }
}

impl Stats64 {
    /// Summary of every value in `values`.
    pub fn from_slice(values: &[i64]) -> Self {
        let mut stats = Self::default();
        stats.measure(values);
        stats
    }

    /// Widen min and max to the opposite extremes and zero the totals.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Reset, then add every value.
    pub fn measure(&mut self, values: &[i64]) {
        self.reset();
        for &v in values {
            self.add(v);
        }
    }

    pub fn add(&mut self, v: i64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.sum = self.sum.wrapping_add(v);
        self.count += 1;
    }

    /// Gap between the highest and lowest value; zero when empty.
    pub fn spread(&self) -> i64 {
        if self.count == 0 {
            return 0;
        }
        self.max - self.min
    }

    /// Map `from` in `min..=max` onto `0..=into`.
    pub fn project(&self, from: i64, into: i64) -> i64 {
        let spread = self.spread();
        if spread == 0 {
            return 0;
        }
        (from - self.min) * into / spread
    }

    /// Floating mean, for display only.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum as f64 / self.count as f64
    }
}

impl fmt::Display for Stats64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...{:.3}...{}", self.min, self.mean(), self.max)
    }
}
