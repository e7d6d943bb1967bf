//! Water-coverage regulation: rain when too little of the grid is wet,
//! evaporate a little everywhere, always.

use crate::int::mul_frac;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fixed-point bits of the rain control value.
pub const RAIN_FRACTIONAL_BITS: u32 = 32;

/// Cells whose water is deeper than `significant`.
pub fn measure_coverage(water: &[i64], significant: i64) -> i64 {
    water.iter().filter(|&&w| w > significant).count() as i64
}

/// Precipitation and evaporation from one adjustment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Adjustment {
    /// Water added by rain.
    pub precipitation: i64,
    /// Water change from evaporation; never positive for non-negative water.
    pub evaporation: i64,
}

impl std::ops::Add for Adjustment {
    type Output = Adjustment;

    fn add(self, rhs: Adjustment) -> Adjustment {
        Adjustment {
            precipitation: self.precipitation + rhs.precipitation,
            evaporation: self.evaporation + rhs.evaporation,
        }
    }
}

fn adjust_cell(water: &mut i64, control: i64, volume: i64, entropy: u64) -> Adjustment {
    let mut adjustment = Adjustment::default();
    if control > 0 {
        let rain = mul_frac(volume, control, RAIN_FRACTIONAL_BITS, entropy);
        *water += rain;
        adjustment.precipitation = rain;
    }
    let next = (*water as i128 * 0xfe / 0xff) as i64;
    adjustment.evaporation = next - *water;
    *water = next;
    adjustment
}

/// Rain `volume * control / 2^32` on every cell when `control` is positive,
/// then evaporate `1/255` of every column.
pub fn adjust_water(water: &mut [i64], control: i64, volume: i64, entropy: &[u64]) -> Adjustment {
    #[cfg(feature = "parallel")]
    {
        water
            .par_iter_mut()
            .zip(entropy.par_iter())
            .map(|(w, &s)| adjust_cell(w, control, volume, s))
            .reduce(Adjustment::default, |a, b| a + b)
    }

    #[cfg(not(feature = "parallel"))]
    {
        water
            .iter_mut()
            .zip(entropy)
            .map(|(w, &s)| adjust_cell(w, control, volume, s))
            .fold(Adjustment::default(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_counts_strictly_deeper() {
        assert_eq!(measure_coverage(&[0, 15, 16, 100, -3], 15), 2);
        assert_eq!(measure_coverage(&[], 15), 0);
    }

    #[test]
    fn test_evaporation_without_rain() {
        let mut water = vec![255, 510, 0, 1];
        let adj = adjust_water(&mut water, 0, 0xf, &[0; 4]);
        assert_eq!(water, vec![254, 508, 0, 0]);
        assert_eq!(adj.precipitation, 0);
        assert_eq!(adj.evaporation, -4);
    }

    #[test]
    fn test_rain_scales_with_control() {
        // control 2^32 rains the whole volume on every cell
        let mut water = vec![0; 3];
        let adj = adjust_water(&mut water, 1 << 32, 255, &[0, 1, 2]);
        assert_eq!(adj.precipitation, 3 * 255);
        assert_eq!(water, vec![254; 3]);
        assert_eq!(adj.evaporation, -3);

        // half control rains half, rounding on the entropy bits
        let mut water = vec![0; 2];
        let adj = adjust_water(&mut water, 1 << 31, 3, &[0, u64::MAX]);
        assert_eq!(adj.precipitation, 2 + 1);
    }

    #[test]
    fn test_negative_control_only_evaporates() {
        let mut water = vec![1000; 4];
        let adj = adjust_water(&mut water, -5000, 0xf, &[0; 4]);
        assert_eq!(adj.precipitation, 0);
        assert!(water.iter().all(|&w| w == 996));
    }
}
