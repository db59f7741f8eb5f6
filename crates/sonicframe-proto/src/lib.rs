//! Wire grammar, codec utilities, and FEC engine for the sonicframe
//! acoustic transport protocol.
//!
//! This crate is pure: no I/O, no clocks, no randomness. Everything here is
//! a function of its inputs, which is what lets [`sonicframe-core`] drive it
//! deterministically from an `Environment`.
//!
//! [`sonicframe-core`]: https://docs.rs/sonicframe-core

pub mod codec;
pub mod fec;
pub mod packet;

/// Size, in bytes, of one `DATA`/`PARITY` payload before base64 (§2).
pub const CHUNK_SIZE: usize = 75;

/// Floor for a session's adaptive timeout, regardless of chunk count (§6).
pub const MIN_SESSION_TIMEOUT_MS: u64 = 60_000;

/// Fixed component of the adaptive session timeout (§6).
pub const BASE_TIMEOUT_MS: u64 = 30_000;

/// Per-chunk component of the adaptive session timeout (§6).
pub const PER_PACKET_TIMEOUT_MS: u64 = 5_000;

/// Largest sequence number a `DATA`/`PARITY` packet may carry (§2).
pub const MAX_SEQ: u32 = 9_999_999;

/// Length, in base64 characters, of an MD5 digest (§2).
pub const MD5_B64_LEN: usize = 24;

// The full adaptive-timeout formula also depends on `speed_mult`, which is a
// function of the sender's protocol tag — a session-layer concept, not a
// wire concept. See `sonicframe_core::receiver::session_timeout`.

/// Tunable session limits, factored out of the `pub const`s above so an
/// embedder can build a [`SendSession`](https://docs.rs/sonicframe-core)
/// or [`SessionTable`](https://docs.rs/sonicframe-core) tuned to its own
/// transport instead of living with the wire defaults (§5 "Configuration").
///
/// [`Default`] reproduces the hardcoded constants exactly, so existing
/// callers see no behavior change unless they opt into a custom value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Size, in bytes, of one `DATA`/`PARITY` payload before base64.
    pub chunk_size: usize,
    /// Floor for a session's adaptive timeout, regardless of chunk count.
    pub min_session_timeout_ms: u64,
    /// Fixed component of the adaptive session timeout.
    pub base_timeout_ms: u64,
    /// Per-chunk component of the adaptive session timeout.
    pub per_packet_timeout_ms: u64,
    /// Largest sequence number a `DATA`/`PARITY` packet may carry.
    pub max_seq: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            min_session_timeout_ms: MIN_SESSION_TIMEOUT_MS,
            base_timeout_ms: BASE_TIMEOUT_MS,
            per_packet_timeout_ms: PER_PACKET_TIMEOUT_MS,
            max_seq: MAX_SEQ,
        }
    }
}
