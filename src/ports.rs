//! Injectable time and randomness
//!
//! Everything that reads the wall clock or draws a random number goes through
//! these two traits so award amounts, bonus rolls, and message picks are
//! reproducible in tests.

use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// ---------------------------------------------------------------------------
/// Clock
/// ---------------------------------------------------------------------------

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  /// Calendar date used for day/week boundaries
  fn today(&self) -> NaiveDate {
    self.now().date_naive()
  }
}

/// Wall clock; calendar boundaries follow the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn today(&self) -> NaiveDate {
    Local::now().date_naive()
  }
}

/// Frozen clock; calendar boundaries follow UTC
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.0
  }
}

/// ---------------------------------------------------------------------------
/// Random Source
/// ---------------------------------------------------------------------------

pub trait RandomSource: Send {
  /// Uniform draw in [0, 1)
  fn next_f64(&mut self) -> f64;

  /// Uniform integer in [-spread, spread]
  fn spread(&mut self, spread: i64) -> i64 {
    if spread <= 0 {
      return 0;
    }
    let buckets = (2 * spread + 1) as f64;
    let idx = (self.next_f64() * buckets).floor() as i64;
    idx.clamp(0, 2 * spread) - spread
  }

  /// Uniform index in [0, len); `len` must be non-zero
  fn pick(&mut self, len: usize) -> usize {
    let idx = (self.next_f64() * len as f64).floor() as usize;
    idx.min(len.saturating_sub(1))
  }
}

/// Thread-local entropy for production use
#[derive(Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
  fn next_f64(&mut self) -> f64 {
    rand::thread_rng().gen::<f64>()
  }
}

/// Deterministic stream, same seed gives same awards
#[derive(Debug, Clone)]
pub struct SeededRandom(ChaCha8Rng);

impl SeededRandom {
  pub fn new(seed: u64) -> Self {
    Self(ChaCha8Rng::seed_from_u64(seed))
  }
}

impl RandomSource for SeededRandom {
  fn next_f64(&mut self) -> f64 {
    self.0.gen::<f64>()
  }
}

/// Always returns the same draw. 0.5 yields zero variance.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
  fn next_f64(&mut self) -> f64 {
    self.0
  }
}
