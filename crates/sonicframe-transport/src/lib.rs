//! The acoustic transport contract (C1) and a reference in-memory
//! implementation.
//!
//! The real acoustic modem — tone mapping, Reed-Solomon at the audio layer —
//! is explicitly out of scope (Non-goal). `sonicframe-core` never speaks to
//! it directly; it only knows the opaque, capability-set contract
//! described below, the same way the teacher's client crate keeps QUIC
//! behind a thin channel-based [`transport`] shim instead of threading
//! `quinn` types through its Sans-IO state machines.
//!
//! [`transport`]: https://docs.rs/lockframe-client

pub mod in_memory;

use sonicframe_core::ProtocolTag;
use thiserror::Error;

/// Errors surfaced by an [`AcousticTransport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport was closed (peer gone, device unplugged) mid-send.
    #[error("transport closed")]
    Closed,
}

/// Adapter interface consumed by the core (§6): a send primitive that
/// resolves when playback completes, paced one frame at a time.
///
/// Implementations MUST enforce the ≤140-character ASCII frame limit (C1)
/// or reject frames that exceed it; the core's own packet encoding never
/// produces longer frames, but a transport should not silently truncate.
pub trait AcousticTransport: Send + Sync {
    /// Play `frame` (at most 140 ASCII characters) using `protocol_tag`'s
    /// modem preset, resolving once playback finishes.
    fn transmit(
        &self,
        frame: &str,
        protocol_tag: &ProtocolTag,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}

/// Adapter interface consumed by the core (§6): a receive primitive that
/// yields decoded ASCII frames, silently dropping anything the modem
/// couldn't decode (there is no feedback channel to request a repeat).
pub trait FrameSource: Send {
    /// Wait for and return the next decoded frame, or `None` once the
    /// source is closed.
    fn recv_frame(&mut self) -> impl std::future::Future<Output = Option<String>> + Send;
}

/// The acoustic library's own capability set (§9 "ad-hoc `any` typing of
/// the acoustic library"), modelled narrowly so the core never depends on
/// anything more than this.
///
/// No implementation of the actual tone/DSP layer lives in this crate —
/// see the module doc. This trait exists so a real acoustic library can be
/// plugged in behind [`AcousticTransport`] without the core (or this
/// crate's reference transport) needing to know its shape.
pub trait AcousticLibrary: Send + Sync {
    /// One-time setup (opening an audio device, loading tone tables).
    fn init(&self) -> Result<(), TransportError>;

    /// Encode `text` into a playable frame for `protocol_tag`'s preset.
    fn encode(&self, text: &str, protocol_tag: &ProtocolTag) -> Vec<f32>;

    /// Decode a burst of audio samples into ASCII frame bytes, or `None`
    /// if the burst didn't decode (noise, partial capture, wrong preset).
    fn decode(&self, audio_samples: &[f32]) -> Option<Vec<u8>>;

    /// Protocol tag names this library recognizes, in the sender's
    /// preference order.
    fn list_protocols(&self) -> Vec<String>;
}
