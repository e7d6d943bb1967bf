//! Earthquakes: plates push earth along their drift vector.
//!
//! Each plate drifts along a fixed direction. A quaking cell moves a little
//! earth to its east or south neighbour, picking the axis at random in
//! proportion to the components of its plate's vector. How often cells
//! quake is set by the earth controller.

use crate::int::{clamp, mag};
use crate::spatial::Point;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Length of a plate drift vector.
pub const QUAKE_VECTOR_RESOLUTION: f64 = 4096.0;

/// Drift vector of plate `p` points at angle `2 pi p / P`.
pub fn write_quake_vectors(vectors: &mut [Point]) {
    let arc = std::f64::consts::TAU / vectors.len() as f64;
    for (p, v) in vectors.iter_mut().enumerate() {
        let angle = arc * p as f64;
        *v = Point::new(
            (angle.cos() * QUAKE_VECTOR_RESOLUTION) as i64,
            (angle.sin() * QUAKE_VECTOR_RESOLUTION) as i64,
        );
    }
}

/// Parameters shared by every cell in one quake pass.
#[derive(Debug, Clone, Copy)]
pub struct QuakeParams {
    /// Quake odds are `control / ctrl_max`.
    pub control: i64,
    pub ctrl_max: i64,
    /// Largest displacement per cell.
    pub magnitude: i64,
}

/// Deltas for one cell: `[self, east, south]`. Returns the magnitude moved.
pub fn quake_cell(dst: &mut [i64; 3], earth: i64, vector: Point, params: QuakeParams, entropy: u64) -> i64 {
    *dst = [earth, 0, 0];
    if params.ctrl_max <= 0 || (entropy % params.ctrl_max as u64) as i64 >= params.control {
        return 0;
    }
    let (ax, ay) = (mag(vector.x), mag(vector.y));
    if ax + ay == 0 {
        return 0;
    }
    let (slot, component) = if entropy % ((ax + ay) as u64) < (ax as u64) {
        (1, vector.x)
    } else {
        (2, vector.y)
    };
    let del = clamp(component, -params.magnitude, params.magnitude);
    dst[0] -= del;
    dst[slot] += del;
    mag(del)
}

/// Fill `dst` with quake deltas for every cell; returns the total moved.
pub fn quake(
    dst: &mut [[i64; 3]],
    earth3s: &[[i64; 3]],
    plates: &[u8],
    vectors: &[Point],
    params: QuakeParams,
    entropy: &[u64],
) -> i64 {
    #[cfg(feature = "parallel")]
    {
        dst.par_iter_mut()
            .zip(earth3s.par_iter())
            .zip(plates.par_iter())
            .zip(entropy.par_iter())
            .map(|(((d, src), &p), &s)| quake_cell(d, src[0], vectors[p as usize], params, s))
            .sum()
    }

    #[cfg(not(feature = "parallel"))]
    {
        dst.iter_mut()
            .zip(earth3s)
            .zip(plates)
            .zip(entropy)
            .map(|(((d, src), &p), &s)| quake_cell(d, src[0], vectors[p as usize], params, s))
            .sum()
    }
}
