//! Randomized pacing between sends.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PacingConfig;

/// Pick a delay uniformly from `[min, max]` milliseconds, inclusive.
///
/// A reversed range collapses to `min`.
pub fn random_delay<R: Rng + ?Sized>(rng: &mut R, min_ms: u64, max_ms: u64) -> Duration {
    let max_ms = max_ms.max(min_ms);
    Duration::from_millis(rng.gen_range(min_ms..=max_ms))
}

/// Per-run pacing state: the per-message delay and the batch pause.
#[derive(Debug)]
pub struct RateController {
    config: PacingConfig,
    rng: StdRng,
    in_batch: u32,
    batch_target: u32,
}

impl RateController {
    /// Create a controller seeded from the OS.
    pub fn new(config: PacingConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a controller with a fixed seed.
    pub fn seeded(config: PacingConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: PacingConfig, mut rng: StdRng) -> Self {
        let batch_target = pick_batch_size(&mut rng, &config);
        Self {
            config,
            rng,
            in_batch: 0,
            batch_target,
        }
    }

    /// Delay to wait before the next message.
    pub fn message_delay(&mut self) -> Duration {
        random_delay(
            &mut self.rng,
            self.config.min_delay_ms,
            self.config.max_delay_ms,
        )
    }

    /// Count one processed recipient. Returns the pause to take when the
    /// current batch is full, then starts a new batch with a fresh size.
    pub fn record_processed(&mut self) -> Option<Duration> {
        self.in_batch += 1;
        if self.in_batch < self.batch_target {
            return None;
        }

        self.in_batch = 0;
        self.batch_target = pick_batch_size(&mut self.rng, &self.config);
        Some(random_delay(
            &mut self.rng,
            self.config.batch_delay_ms_min,
            self.config.batch_delay_ms_max,
        ))
    }

    /// Size of the batch currently being filled.
    pub fn batch_target(&self) -> u32 {
        self.batch_target
    }
}

fn pick_batch_size<R: Rng + ?Sized>(rng: &mut R, config: &PacingConfig) -> u32 {
    let min = config.batch_size_min.max(1);
    let max = config.batch_size_max.max(min);
    rng.gen_range(min..=max)
}
