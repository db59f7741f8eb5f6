//! Production [`Environment`] using real system time and OS RNG.
//!
//! Mirrors [`sonicframe-harness::SimEnv`] exactly, except every method talks
//! to the real clock and a cryptographic entropy source instead of a virtual
//! one. This is what [`sonicframe-cli`] runs against.
//!
//! [`sonicframe-harness::SimEnv`]: https://docs.rs/sonicframe-harness
//! [`sonicframe-cli`]: https://docs.rs/sonicframe-cli

use std::time::Duration;

use crate::env::Environment;

/// Production environment: `std::time::Instant`, `tokio::time::sleep`, and
/// `getrandom` for cryptographic randomness.
///
/// # Panics
///
/// `random_bytes` panics if the OS RNG fails. A session layer that can't get
/// real entropy for its nonces and IDs shouldn't fall back to something
/// weaker silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        // A broken OS RNG means the platform is unusable; there is no
        // weaker fallback worth falling back to.
        #[allow(clippy::expect_used)]
        getrandom::fill(buffer).expect("OS RNG failure");
    }

    fn unix_seconds(&self) -> u64 {
        // The Unix epoch is always in the past on any real system clock.
        #[allow(clippy::expect_used)]
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock is after the Unix epoch")
            .as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic_across_two_calls() {
        let env = SystemEnv::new();
        let first = env.now();
        let second = env.now();
        assert!(second >= first);
    }

    #[test]
    fn random_bytes_fills_the_whole_buffer_and_varies() {
        let env = SystemEnv::new();
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        env.random_bytes(&mut a);
        env.random_bytes(&mut b);
        assert_ne!(a, b, "two draws from OS entropy should not collide");
    }

    #[test]
    fn unix_seconds_is_plausibly_current() {
        let env = SystemEnv::new();
        assert!(env.unix_seconds() > 1_700_000_000);
    }
}
