//! Deterministic [`Environment`] for simulation.
//!
//! There is no literal `sim_env.rs` to port in the retrieval pack (the
//! teacher's `lockframe-harness` references one from its `lib.rs` module
//! list, but the file itself isn't in the corpus) — this is grounded
//! instead on the inline `TestEnv` pattern used throughout
//! `lockframe-core`'s own test modules, generalized into a standalone,
//! reusable, seeded environment: a virtual clock that only advances when
//! told to (never via wall-clock time), and a `ChaCha8Rng` seeded for
//! byte-for-byte reproducible runs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use sonicframe_core::Environment;

/// A seeded, virtual-clock [`Environment`] for deterministic simulation.
///
/// `now()` never advances on its own; `sleep()` advances it by exactly the
/// requested duration and resolves immediately, so a simulated run
/// completes in real time regardless of how many simulated seconds it
/// represents.
#[derive(Clone)]
pub struct SimEnv {
    clock: Arc<Mutex<Duration>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
    unix_epoch: u64,
}

impl SimEnv {
    /// Build a simulation environment seeded for reproducibility, with the
    /// virtual clock starting at `unix_epoch` (seconds).
    #[must_use]
    pub fn new(seed: u64, unix_epoch: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(Duration::ZERO)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            unix_epoch,
        }
    }

    /// Move the virtual clock forward by `dt`, as if `dt` had elapsed.
    pub fn advance(&self, dt: Duration) {
        // No other thread can panic while holding this lock; the guard
        // never escapes a single-statement critical section.
        #[allow(clippy::expect_used)]
        let mut clock = self.clock.lock().expect("SimEnv clock mutex poisoned");
        *clock += dt;
    }

    /// Offset from `unix_epoch`, as of the current virtual clock reading.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        #[allow(clippy::expect_used)]
        *self.clock.lock().expect("SimEnv clock mutex poisoned")
    }
}

impl Environment for SimEnv {
    /// `Duration` doubles as the virtual instant: it's `Copy + Ord` and
    /// both `Sub`/`Add` against another `Duration` yield a `Duration`,
    /// which is exactly the arithmetic [`SessionTable`](sonicframe_core::SessionTable)
    /// needs for its deadline bookkeeping.
    type Instant = Duration;

    fn now(&self) -> Duration {
        #[allow(clippy::expect_used)]
        *self.clock.lock().expect("SimEnv clock mutex poisoned")
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        // No other thread can panic while holding this lock.
        #[allow(clippy::expect_used)]
        self.rng.lock().expect("SimEnv rng mutex poisoned").fill_bytes(buffer);
    }

    fn unix_seconds(&self) -> u64 {
        self.unix_epoch + self.elapsed().as_secs()
    }
}
