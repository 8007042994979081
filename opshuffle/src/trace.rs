// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observation hooks for scheduling.
//!
//! The scheduler does not keep any record of how it arrived at an order. When
//! that matters (tests, debugging a surprising layout) pass a
//! [`ScheduleTrace`] to [`Scheduler::with_trace`](crate::Scheduler::with_trace).
//! [`WaveRecorder`] keeps every wave so it can be inspected afterwards.

use alloc::vec::Vec;

use crate::operation::OpId;

/// A callback sink for scheduler events.
pub trait ScheduleTrace {
    /// Called once per emitted wave, after the wave policy ordered it.
    ///
    /// `depth` is the loop nesting depth of the block being scheduled and
    /// `round` counts the waves of that block from 0. A loop shows up in
    /// `ops` as its `FOR_BEGIN` marker.
    fn wave(&mut self, depth: usize, round: usize, ops: &[OpId]);

    /// Called before the body of the loop opened by `begin` is scheduled.
    fn loop_entered(&mut self, depth: usize, begin: OpId) {
        let _ = (depth, begin);
    }
}

impl<T: ScheduleTrace + ?Sized> ScheduleTrace for &mut T {
    fn wave(&mut self, depth: usize, round: usize, ops: &[OpId]) {
        (**self).wave(depth, round, ops);
    }

    fn loop_entered(&mut self, depth: usize, begin: OpId) {
        (**self).loop_entered(depth, begin);
    }
}

/// Trace sink that ignores everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoTrace;

impl ScheduleTrace for NoTrace {
    #[inline]
    fn wave(&mut self, _depth: usize, _round: usize, _ops: &[OpId]) {}
}

/// One emitted wave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedWave {
    /// Loop nesting depth the wave was emitted at.
    pub depth: usize,
    /// Position of the wave within its block.
    pub round: usize,
    /// Members in emission order.
    pub ops: Vec<OpId>,
}

/// Records every wave in emission order.
#[derive(Clone, Debug, Default)]
pub struct WaveRecorder {
    waves: Vec<RecordedWave>,
    loops: Vec<OpId>,
}

impl WaveRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded waves, oldest first.
    #[must_use]
    pub fn waves(&self) -> &[RecordedWave] {
        &self.waves
    }

    /// `FOR_BEGIN` markers of the loop bodies entered, in order.
    #[must_use]
    pub fn loops_entered(&self) -> &[OpId] {
        &self.loops
    }

    /// Index into [`waves`](Self::waves) of the wave `id` was emitted in.
    #[must_use]
    pub fn wave_of(&self, id: OpId) -> Option<usize> {
        self.waves.iter().position(|w| w.ops.contains(&id))
    }

    /// Round of the wave `id` was emitted in, counted within its own block.
    #[must_use]
    pub fn round_of(&self, id: OpId) -> Option<usize> {
        self.wave_of(id).map(|i| self.waves[i].round)
    }

    /// Clears everything recorded.
    pub fn clear(&mut self) {
        self.waves.clear();
        self.loops.clear();
    }
}

impl ScheduleTrace for WaveRecorder {
    fn wave(&mut self, depth: usize, round: usize, ops: &[OpId]) {
        self.waves.push(RecordedWave {
            depth,
            round,
            ops: ops.to_vec(),
        });
    }

    fn loop_entered(&mut self, _depth: usize, begin: OpId) {
        self.loops.push(begin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_finds_wave_index() {
        let mut rec = WaveRecorder::new();
        rec.wave(0, 0, &[OpId::new(0), OpId::new(2)]);
        rec.wave(1, 0, &[OpId::new(3)]);
        rec.wave(0, 1, &[OpId::new(1)]);
        assert_eq!(rec.wave_of(OpId::new(2)), Some(0));
        assert_eq!(rec.wave_of(OpId::new(1)), Some(2));
        assert_eq!(rec.round_of(OpId::new(1)), Some(1));
        assert_eq!(rec.round_of(OpId::new(3)), Some(0));
        assert_eq!(rec.wave_of(OpId::new(9)), None);

        rec.clear();
        assert!(rec.waves().is_empty());
    }
}
