//! The `protocol_tag` knob that trades throughput for reliability margin.
//!
//! Shared between the sender (inter-packet pacing, §4.3 step 7) and the
//! receiver (adaptive session timeout, §4.4) so the two stay consistent.

use std::time::Duration;

/// The acoustic modem's named speed presets.
///
/// `Other` covers any protocol name this build doesn't recognize; both the
/// pacing delay and the timeout speed multiplier treat it the same as a
/// literal unknown token (§4.3, §4.4: "otherwise → …", "unknown → 1").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProtocolTag {
    /// Conservative default.
    #[default]
    Normal,
    /// Faster, less robust modem preset.
    Fast,
    /// Fastest, least robust modem preset.
    Fastest,
    /// Any other protocol name.
    Other(String),
}

impl ProtocolTag {
    /// Parse a wire protocol tag string into its typed form.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "NORMAL" => Self::Normal,
            "FAST" => Self::Fast,
            "FASTEST" => Self::Fastest,
            other => Self::Other(other.to_string()),
        }
    }

    /// Pause between consecutive frame emissions (§4.3 step 7).
    #[must_use]
    pub fn inter_packet_delay(&self) -> Duration {
        match self {
            Self::Normal => Duration::from_millis(1000),
            Self::Fast => Duration::from_millis(500),
            Self::Fastest => Duration::from_millis(200),
            Self::Other(_) => Duration::ZERO,
        }
    }

    /// Multiplier applied to the per-packet timeout component (§4.4).
    #[must_use]
    pub fn speed_mult(&self) -> u64 {
        match self {
            Self::Normal => 3,
            Self::Fast => 2,
            Self::Fastest => 1,
            Self::Other(_) => 1,
        }
    }
}
