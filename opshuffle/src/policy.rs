// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wave ordering policies.

use rand::RngCore;
use rand::seq::SliceRandom;

use crate::operation::OpId;

/// Decides the order in which one wave of ready operations is emitted.
///
/// Every operation in a wave is independent of the others, so any
/// permutation yields a valid schedule. The scheduler hands the wave over in
/// the order its members became ready.
///
/// # Example
///
/// ```
/// use opshuffle::{OpId, StableWaves, WavePolicy};
///
/// let mut wave = [OpId::new(4), OpId::new(1), OpId::new(3)];
/// StableWaves.order_wave(&mut wave);
/// assert_eq!(wave, [OpId::new(1), OpId::new(3), OpId::new(4)]);
/// ```
pub trait WavePolicy {
    /// Reorders `wave` in place.
    fn order_wave(&mut self, wave: &mut [OpId]);
}

impl<P: WavePolicy + ?Sized> WavePolicy for &mut P {
    fn order_wave(&mut self, wave: &mut [OpId]) {
        (**self).order_wave(wave);
    }
}

/// Uniform random permutation of every wave.
///
/// Draws from a caller-supplied random source, so a seeded generator gives a
/// reproducible schedule.
///
/// # Example
///
/// ```
/// use opshuffle::{OpId, ShuffleWaves, WavePolicy};
/// use rand::rngs::StdRng;
/// use rand::{RngCore, SeedableRng};
///
/// let mut a = ShuffleWaves::new(StdRng::seed_from_u64(7));
/// let mut b = ShuffleWaves::new(StdRng::seed_from_u64(7));
///
/// let mut x: Vec<OpId> = (0..16).map(OpId::new).collect();
/// let mut y = x.clone();
/// a.order_wave(&mut x);
/// b.order_wave(&mut y);
/// assert_eq!(x, y);
///
/// // The generator can be taken back, advanced by the same amount.
/// let (mut ra, mut rb) = (a.into_inner(), b.into_inner());
/// assert_eq!(ra.next_u64(), rb.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct ShuffleWaves<R> {
    rng: R,
}

impl<R: RngCore> ShuffleWaves<R> {
    /// Wraps a random source.
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Returns the random source.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: RngCore> WavePolicy for ShuffleWaves<R> {
    fn order_wave(&mut self, wave: &mut [OpId]) {
        wave.shuffle(&mut self.rng);
    }
}

/// Ascending admission order within each wave.
///
/// Useful to reproduce the input layout as closely as the waves allow, for
/// diffs and tests.
#[derive(Copy, Clone, Debug, Default)]
pub struct StableWaves;

impl WavePolicy for StableWaves {
    fn order_wave(&mut self, wave: &mut [OpId]) {
        wave.sort_unstable();
    }
}
