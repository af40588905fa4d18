// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler's pool of runners: a fixed list plus a seedable uniform
//! choice among them, so runner selection is reproducible end to end in
//! tests while defaulting to real randomness in production.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scheduler_core::{JobRunner, RunnerSource};
use std::sync::Arc;

pub struct SeededRunnerSource {
    runners: Vec<Arc<dyn JobRunner>>,
    rng: Mutex<StdRng>,
}

impl SeededRunnerSource {
    /// Seeds from the OS entropy source; used in production.
    pub fn new(runners: Vec<Arc<dyn JobRunner>>) -> Self {
        Self { runners, rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Fixes the seed, so the exact sequence of runner choices is
    /// reproducible; used in tests.
    pub fn with_seed(runners: Vec<Arc<dyn JobRunner>>, seed: u64) -> Self {
        Self { runners, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl RunnerSource for SeededRunnerSource {
    fn all_runners(&self) -> Vec<Arc<dyn JobRunner>> {
        self.runners.clone()
    }

    fn pick_random(&self, n: usize) -> usize {
        self.rng.lock().gen_range(0..n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::test_support::RecordingRunner;

    #[test]
    fn same_seed_picks_the_same_sequence() {
        let runners: Vec<Arc<dyn JobRunner>> = vec![
            Arc::new(RecordingRunner::default()),
            Arc::new(RecordingRunner::default()),
            Arc::new(RecordingRunner::default()),
        ];
        let a = SeededRunnerSource::with_seed(runners.clone(), 7);
        let b = SeededRunnerSource::with_seed(runners, 7);
        let picks_a: Vec<usize> = (0..5).map(|_| a.pick_random(3)).collect();
        let picks_b: Vec<usize> = (0..5).map(|_| b.pick_random(3)).collect();
        assert_eq!(picks_a, picks_b);
    }
}
