//! Per-cell random field.
//!
//! Each cell owns a 64-bit state: an LCG step followed by an xorshift
//! scramble. The whole field advances together after every stage that
//! consumes it, so a run is a pure function of the initial seed.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Next state after `state`.
#[inline]
pub fn advance(state: u64) -> u64 {
    let mut s = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    s ^= s >> 12;
    s ^= s << 25;
    s ^= s >> 27;
    s
}

/// Advance every cell once.
pub fn write_next_random(entropy: &mut [u64]) {
    #[cfg(feature = "parallel")]
    {
        entropy.par_iter_mut().for_each(|s| *s = advance(*s));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for s in entropy.iter_mut() {
            *s = advance(*s);
        }
    }
}

/// `entropy[i] = seed + i`, then one advance so no cell starts at zero.
pub fn seed_entropy(entropy: &mut [u64], seed: u64) {
    for (i, s) in entropy.iter_mut().enumerate() {
        *s = seed.wrapping_add(i as u64);
    }
    write_next_random(entropy);
}
