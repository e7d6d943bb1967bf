//! Tectonic plate reassignment.
//!
//! Every cell holds a lottery among the plates of its five-cell
//! neighbourhood. A plate's ticket count is the square of how many of the
//! five cells it holds, times the square of a handicap that favours plates
//! that are globally small:
//!
//! ```text
//! weight(p) = count(p)^2 * (area - size(p) + 1)^2
//! ```
//!
//! Plates absent from the neighbourhood hold no tickets, so only the (at
//! most five) distinct local plates are visited, in plate order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Scatter cells uniformly over `num_plates` plates.
pub fn write_random_plates(plates: &mut [u8], entropy: &[u64], num_plates: usize) {
    for (plate, &s) in plates.iter_mut().zip(entropy) {
        *plate = (s % num_plates as u64) as u8;
    }
}

/// Count the cells held by each plate.
pub fn measure_plate_sizes(sizes: &mut [usize], plates: &[u8]) {
    sizes.fill(0);
    for &p in plates {
        sizes[p as usize] += 1;
    }
}

/// Pick a slot with probability proportional to its weight.
///
/// Returns `None` when every weight is zero.
pub fn draw_lottery(weights: &[u128], entropy: u64) -> Option<usize> {
    let total: u128 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    let choice = entropy as u128 % total;
    let mut thresh = 0;
    for (slot, &w) in weights.iter().enumerate() {
        thresh += w;
        if choice < thresh {
            return Some(slot);
        }
    }
    None
}

/// Winner of one cell's lottery, or its current plate if nothing can win.
pub fn next_plate(stencil: &[u8; 5], entropy: u64, sizes: &[usize], area: usize) -> u8 {
    let mut local = *stencil;
    local.sort_unstable();

    let mut candidates = [0u8; 5];
    let mut weights = [0u128; 5];
    let mut n = 0;
    for (k, &p) in local.iter().enumerate() {
        if k > 0 && local[k - 1] == p {
            weights[n - 1] += 1;
            continue;
        }
        candidates[n] = p;
        weights[n] = 1;
        n += 1;
    }
    for (w, &p) in weights[..n].iter_mut().zip(&candidates[..n]) {
        let handicap = (area - sizes[p as usize].min(area)) as u128 + 1;
        *w = *w * *w * handicap * handicap;
    }

    match draw_lottery(&weights[..n], entropy) {
        Some(slot) => candidates[slot],
        None => {
            tracing::warn!(plate = stencil[0], "plate lottery without tickets, keeping plate");
            stencil[0]
        }
    }
}

/// Run the lottery for every cell against the previous plate sizes.
pub fn write_next_plates(plates: &mut [u8], plate5s: &[[u8; 5]], entropy: &[u64], sizes: &[usize]) {
    let area = plates.len();

    #[cfg(feature = "parallel")]
    {
        plates
            .par_iter_mut()
            .zip(plate5s.par_iter())
            .zip(entropy.par_iter())
            .for_each(|((plate, stencil), &s)| *plate = next_plate(stencil, s, sizes, area));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for ((plate, stencil), &s) in plates.iter_mut().zip(plate5s).zip(entropy) {
            *plate = next_plate(stencil, s, sizes, area);
        }
    }
}
