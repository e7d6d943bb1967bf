//! Watershed: water runs downhill over earth and carries some earth along.
//!
//! Each cell compares its combined height (earth plus water) against its
//! east and south neighbours and sheds water toward one of them. The axis
//! is drawn at random in proportion to the two candidate flows. An eighth
//! of the water moved, stochastically rounded, erodes earth in the same
//! direction.

use crate::int::{mag, mul_frac};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Water to move from left to right (negative moves it back), levelling
/// the combined heights without taking more water than a side holds.
pub fn shed(left_water: i64, right_water: i64, left_earth: i64, right_earth: i64) -> i64 {
    let left = left_earth + left_water;
    let right = right_earth + right_water;
    let mean = (left + right) / 2;
    if left > right {
        (left - mean).min(left_water)
    } else if right > left {
        let flow = mean - right;
        if -flow > right_water {
            -right_water
        } else {
            flow
        }
    } else {
        0
    }
}

/// Water and earth moved by a watershed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShedTotals {
    pub water: i64,
    pub erosion: i64,
}

impl std::ops::Add for ShedTotals {
    type Output = ShedTotals;

    fn add(self, rhs: ShedTotals) -> ShedTotals {
        ShedTotals {
            water: self.water + rhs.water,
            erosion: self.erosion + rhs.erosion,
        }
    }
}

/// Water and earth deltas for one cell.
pub fn shed_cell(
    water_dst: &mut [i64; 3],
    earth_dst: &mut [i64; 3],
    water: &[i64; 3],
    earth: &[i64; 3],
    entropy: u64,
) -> ShedTotals {
    *water_dst = [water[0], 0, 0];
    *earth_dst = [earth[0], 0, 0];

    let deltas = [
        shed(water[0] / 2, water[1] / 2, earth[0], earth[1]),
        shed(water[0] / 2, water[2] / 2, earth[0], earth[2]),
    ];
    let magnitudes = [mag(deltas[0]) as u64, mag(deltas[1]) as u64];
    let total = magnitudes[0] + magnitudes[1];
    let choice = if total == 0 {
        (entropy & 1) as usize
    } else if entropy % total < magnitudes[0] {
        0
    } else {
        1
    };

    let delta = deltas[choice];
    water_dst[0] -= delta;
    water_dst[1 + choice] += delta;

    let erosion = mul_frac(delta, 1, 3, entropy);
    earth_dst[0] -= erosion;
    earth_dst[1 + choice] += erosion;

    ShedTotals {
        water: mag(delta),
        erosion: mag(erosion),
    }
}

/// Fill the water and earth delta arrays for every cell.
pub fn watershed(
    water_dst: &mut [[i64; 3]],
    earth_dst: &mut [[i64; 3]],
    water3s: &[[i64; 3]],
    earth3s: &[[i64; 3]],
    entropy: &[u64],
) -> ShedTotals {
    #[cfg(feature = "parallel")]
    {
        water_dst
            .par_iter_mut()
            .zip(earth_dst.par_iter_mut())
            .zip(water3s.par_iter())
            .zip(earth3s.par_iter())
            .zip(entropy.par_iter())
            .map(|((((wd, ed), w), e), &s)| shed_cell(wd, ed, w, e, s))
            .reduce(ShedTotals::default, |a, b| a + b)
    }

    #[cfg(not(feature = "parallel"))]
    {
        water_dst
            .iter_mut()
            .zip(earth_dst.iter_mut())
            .zip(water3s)
            .zip(earth3s)
            .zip(entropy)
            .map(|((((wd, ed), w), e), &s)| shed_cell(wd, ed, w, e, s))
            .fold(ShedTotals::default(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_shed_table() {
        // (left earth, left water, right earth, right water, want)
        let cases = [
            (0, 0, 0, 0, 0),
            (0, 100, 0, 0, 50),
            (0, 0, 0, 100, -50),
            (100, 0, 0, 100, 0),
            (0, 100, 100, 0, 0),
            (50, 50, 0, 100, 0),
            (0, 100, 50, 50, 0),
            (10, 10, 0, 0, 10),
            (0, 0, 10, 10, -10),
            (10, 10, 10, 0, 5),
            (100, 10, 0, 0, 10),
            (0, 0, 100, 10, -10),
            (1, 1, 0, 0, 1),
            (0, 0, 1, 1, -1),
        ];
        for (le, lw, re, rw, want) in cases {
            assert_eq!(shed(lw, rw, le, re), want, "shed(wL={lw}, wR={rw}, eL={le}, eR={re})");
        }
    }

    #[test]
    fn test_cell_prefers_the_larger_flow() {
        // east candidate 25, south candidate 0: always east
        let water = [100, 0, 100];
        let earth = [0, 0, 0];
        for e in 0..16 {
            let (mut wd, mut ed) = ([0; 3], [0; 3]);
            let totals = shed_cell(&mut wd, &mut ed, &water, &earth, e);
            assert_eq!(wd, [75, 25, 0]);
            assert_eq!(totals.water, 25);
            assert_eq!(ed[2], 0);
            assert_eq!(ed[0] + ed[1], 0);
        }
    }

    #[test]
    fn test_erosion_uses_cell_entropy() {
        // 20 water east is 2.5 earth: rounding follows the low three bits
        let water = [80, 0, 80];
        let earth = [0, 0, 0];
        let mut seen = std::collections::BTreeSet::new();
        for e in 0..8 {
            let (mut wd, mut ed) = ([0; 3], [0; 3]);
            let totals = shed_cell(&mut wd, &mut ed, &water, &earth, e);
            assert_eq!(wd[1], 20);
            assert_eq!(totals.erosion, ed[1]);
            assert_eq!(ed[0], -ed[1]);
            seen.insert(ed[1]);
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_pass_conserves_water_and_earth() {
        let grid = crate::grid::Grid::new(3);
        let water: Vec<i64> = (0..grid.area as i64).map(|i| (i * 37) % 101).collect();
        let earth: Vec<i64> = (0..grid.area as i64).map(|i| (i * 53) % 89 - 40).collect();
        let entropy: Vec<u64> = (0..grid.area as u64).map(crate::systems::random::advance).collect();
        let mut water3s = vec![[0; 3]; grid.area];
        let mut earth3s = vec![[0; 3]; grid.area];
        crate::grid::write_stencil3(&mut water3s, &water, &grid.stencil3);
        crate::grid::write_stencil3(&mut earth3s, &earth, &grid.stencil3);

        let mut wd = vec![[0; 3]; grid.area];
        let mut ed = vec![[0; 3]; grid.area];
        let totals = watershed(&mut wd, &mut ed, &water3s, &earth3s, &entropy);
        assert!(totals.water > 0);

        let mut water2 = vec![0; grid.area];
        let mut earth2 = vec![0; grid.area];
        crate::grid::add_stencil3(&mut water2, &wd, &grid.stencil3);
        crate::grid::add_stencil3(&mut earth2, &ed, &grid.stencil3);
        assert_eq!(water2.iter().sum::<i64>(), water.iter().sum::<i64>());
        assert_eq!(earth2.iter().sum::<i64>(), earth.iter().sum::<i64>());
    }

    proptest! {
        #[test]
        fn test_shed_never_overdraws(
            lw in 0i64..1_000_000,
            rw in 0i64..1_000_000,
            le in -1_000_000i64..1_000_000,
            re in -1_000_000i64..1_000_000,
        ) {
            let flow = shed(lw, rw, le, re);
            prop_assert!(lw - flow >= 0);
            prop_assert!(rw + flow >= 0);
        }
    }
}
