//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system resources (time, randomness, wall
//! clock). Lets [`sonicframe-harness`] drive the exact same sender/receiver
//! code against a virtual clock and seeded RNG that it uses in production
//! against real ones.
//!
//! [`sonicframe-harness`]: https://docs.rs/sonicframe-harness

use std::time::Duration;

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards.
/// - `random_bytes()` uses cryptographically secure entropy in production.
/// - Methods are infallible except in exceptional circumstances (e.g. OS
///   entropy exhaustion, misconfigured simulation).
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulation
    /// environments use a virtual instant so timeouts advance instantly.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::ops::Sub<Output = Duration>
        + std::ops::Add<Duration, Output = Self::Instant>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// Subsequent calls within a single execution context MUST return
    /// non-decreasing values.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the only async method in the trait; only driver code (never
    /// the pure session state machines) should call it.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills `buffer` with random bytes.
    ///
    /// # Invariants
    ///
    /// Given the same RNG seed, this produces the same sequence of bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`, e.g. for a session nonce.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Current wall-clock time, seconds since the Unix epoch.
    ///
    /// Used only to build the `⟨unix-seconds⟩` component of a session
    /// identifier (§3); unrelated to `now()`'s monotonic instant.
    fn unix_seconds(&self) -> u64;
}
