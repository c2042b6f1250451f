#![forbid(unsafe_code)]

//! Deterministic building blocks for harness runs.
//!
//! Every harness scenario runs on a [`VirtualClock`]: no wall-clock reads,
//! no sleeping. Randomness comes from [`XorShift64`] with an explicit seed,
//! so the same seed and the same fixture always produce the same trace.

use web_time::{Duration, Instant};

/// Seed used when neither the CLI nor the environment supplies one.
pub const DEFAULT_SEED: u64 = 0x6761_7a65;

/// Virtual timeline anchored at a real [`Instant`].
///
/// The anchor is only used to mint `Instant`s; elapsed time advances purely
/// through [`advance`](Self::advance).
#[derive(Debug, Clone, Copy)]
pub struct VirtualClock {
    epoch: Instant,
    elapsed_ms: u64,
}

impl VirtualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    #[must_use]
    pub fn starting_at(epoch: Instant) -> Self {
        Self {
            epoch,
            elapsed_ms: 0,
        }
    }

    /// Instant for `elapsed_ms == 0`.
    #[inline]
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Current virtual instant.
    #[inline]
    pub fn now(&self) -> Instant {
        self.at(self.elapsed_ms)
    }

    /// Instant `ms` after the epoch.
    #[inline]
    pub fn at(&self, ms: u64) -> Instant {
        self.epoch + Duration::from_millis(ms)
    }

    /// Move forward by `ms` and return the new instant.
    pub fn advance(&mut self, ms: u64) -> Instant {
        self.elapsed_ms = self.elapsed_ms.saturating_add(ms);
        self.now()
    }

    /// Move forward to `ms` if it lies ahead. Never runs backwards.
    pub fn advance_to(&mut self, ms: u64) -> Instant {
        self.elapsed_ms = self.elapsed_ms.max(ms);
        self.now()
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Xorshift64 generator. Not cryptographic; reproducible across platforms.
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// A zero seed would lock the generator at zero, so it is mapped to 1.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform in `[-magnitude, magnitude)`.
    pub fn jitter(&mut self, magnitude: f32) -> f32 {
        (self.next_f32() * 2.0 - 1.0) * magnitude
    }

    /// `true` with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }
}

/// Choose a seed from the environment or use the provided default.
pub fn fixture_seed(default_seed: u64) -> u64 {
    env_u64("GAZE_SEED")
        .or_else(|| env_u64("E2E_SEED"))
        .unwrap_or(default_seed)
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
