//! The four wire packet kinds: `START`, `DATA`, `PARITY`, `END`.
//!
//! All packets are colon-delimited ASCII, total length bounded by the
//! transport's 140-character frame. Parsing never panics on malformed input;
//! callers treat a parse error as "drop this frame, log a diagnostic" (§7),
//! never as a reason to tear down a session.

use thiserror::Error;

use crate::codec::{self, CodecError};

/// Errors produced while parsing a wire frame into a [`Packet`].
///
/// None of these are session-fatal: the receiver drops the offending frame
/// and waits for the next one.
#[derive(Error, Debug)]
pub enum PacketError {
    /// The frame does not start with a recognized kind prefix
    /// (`S:`, `D:`, `P:`, `E:`). The caller should try the `FILE:` /
    /// plaintext-message path instead of treating this as an error.
    #[error("not a structured packet")]
    NotAPacket,

    /// The frame has the right kind prefix but the wrong field shape.
    #[error("malformed {kind} frame: {reason}")]
    Malformed {
        /// Packet kind that failed to parse (`S`, `D`, `P`, `E`).
        kind: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A field that should have been a base-64 payload failed validation or
    /// decode.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] CodecError),

    /// A field that should have been a decimal integer did not parse.
    #[error("invalid integer field {field}: {value:?}")]
    InvalidInteger {
        /// Field name, for diagnostics.
        field: &'static str,
        /// Raw text that failed to parse.
        value: String,
    },
}

/// Flags carried by a `START` packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartFlags {
    /// `C` token: payload is gzip-compressed before chunking.
    pub compressed: bool,
    /// `F{SCHEME}` token: FEC scheme name, verbatim wire token.
    pub fec_scheme: Option<String>,
}

impl StartFlags {
    fn parse(raw: &str) -> Self {
        let mut flags = Self::default();
        for token in raw.split(',').filter(|t| !t.is_empty()) {
            if token == "C" {
                flags.compressed = true;
            } else if let Some(scheme) = token.strip_prefix('F') {
                flags.fec_scheme = Some(scheme.to_string());
            }
            // Unknown flags are ignored, per §7.
        }
        flags
    }

    fn render(&self) -> Option<String> {
        let mut tokens = Vec::new();
        if self.compressed {
            tokens.push("C".to_string());
        }
        if let Some(scheme) = &self.fec_scheme {
            tokens.push(format!("F{scheme}"));
        }
        if tokens.is_empty() { None } else { Some(tokens.join(",")) }
    }
}

/// One of the four wire packet kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// `S:{sid}::{hash}:{total}[:{flags}]`
    Start {
        /// Session identifier.
        sid: String,
        /// Base-64 MD5 of the transmitted byte stream.
        hash: String,
        /// Total chunk count.
        total: u32,
        /// Parsed flag tokens.
        flags: StartFlags,
    },
    /// `D:{sid}:{seq}:{b64(chunk)}`
    Data {
        /// Session identifier.
        sid: String,
        /// 1-based sequence number.
        seq: u32,
        /// Decoded chunk bytes.
        payload: Vec<u8>,
    },
    /// `P:{sid}:{parity-id}:{b64(parity)}`
    Parity {
        /// Session identifier.
        sid: String,
        /// Raw (not yet normalized) parity identifier.
        parity_id: String,
        /// Decoded parity bytes.
        payload: Vec<u8>,
    },
    /// `E:{sid}::` — advisory, reassembly never depends on it.
    End {
        /// Session identifier.
        sid: String,
    },
}

impl Packet {
    /// Session identifier carried by any packet kind.
    #[must_use]
    pub fn sid(&self) -> &str {
        match self {
            Self::Start { sid, .. }
            | Self::Data { sid, .. }
            | Self::Parity { sid, .. }
            | Self::End { sid } => sid,
        }
    }

    /// A stable duplicate-suppression key, `"{kind}:{sid}:{field3}"`.
    #[must_use]
    pub fn packet_id(&self) -> String {
        match self {
            Self::Start { sid, .. } => format!("S:{sid}:0"),
            Self::Data { sid, seq, .. } => format!("D:{sid}:{seq}"),
            Self::Parity { sid, parity_id, .. } => format!("P:{sid}:{parity_id}"),
            Self::End { sid } => format!("E:{sid}:0"),
        }
    }

    /// Serialize this packet to its wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Start { sid, hash, total, flags } => {
                let mut out = format!("S:{sid}::{hash}:{total}");
                if let Some(rendered) = flags.render() {
                    out.push(':');
                    out.push_str(&rendered);
                }
                out
            },
            Self::Data { sid, seq, payload } => {
                format!("D:{sid}:{seq}:{}", codec::b64_encode(payload))
            },
            Self::Parity { sid, parity_id, payload } => {
                format!("P:{sid}:{parity_id}:{}", codec::b64_encode(payload))
            },
            Self::End { sid } => format!("E:{sid}::"),
        }
    }

    /// Parse a wire frame. Returns [`PacketError::NotAPacket`] for anything
    /// that doesn't start with a known kind prefix — the caller should then
    /// attempt the plaintext/`FILE:` path rather than treat that as failure.
    pub fn parse(raw: &str) -> Result<Self, PacketError> {
        if let Some(rest) = raw.strip_prefix("S:") {
            Self::parse_start(rest)
        } else if let Some(rest) = raw.strip_prefix("D:") {
            Self::parse_data(rest)
        } else if let Some(rest) = raw.strip_prefix("P:") {
            Self::parse_parity(rest)
        } else if let Some(rest) = raw.strip_prefix("E:") {
            Self::parse_end(rest)
        } else {
            Err(PacketError::NotAPacket)
        }
    }

    fn parse_start(rest: &str) -> Result<Self, PacketError> {
        // rest = "{sid}::{hash}:{total}[:{flags}]"; splitn's final element
        // rejoins any remaining colons, so a flags token could (in theory)
        // contain one without corrupting the hash/total fields.
        let parts: Vec<&str> = rest.splitn(5, ':').collect();
        if parts.len() < 4 {
            return Err(PacketError::Malformed {
                kind: "S",
                reason: format!("expected at least 4 fields, got {}", parts.len()),
            });
        }
        let sid = parts[0].to_string();
        let hash = parts[2].to_string();
        let total: u32 = parts[3].parse().map_err(|_| PacketError::InvalidInteger {
            field: "total",
            value: parts[3].to_string(),
        })?;
        let flags = parts.get(4).map(|s| StartFlags::parse(s)).unwrap_or_default();
        Ok(Self::Start { sid, hash, total, flags })
    }

    fn parse_data(rest: &str) -> Result<Self, PacketError> {
        let parts: Vec<&str> = rest.splitn(3, ':').collect();
        if parts.len() != 3 {
            return Err(PacketError::Malformed {
                kind: "D",
                reason: format!("expected 3 fields, got {}", parts.len()),
            });
        }
        let sid = parts[0].to_string();
        let seq: u32 = parts[1]
            .parse()
            .map_err(|_| PacketError::InvalidInteger { field: "seq", value: parts[1].to_string() })?;
        let payload = codec::b64_decode_validated(parts[2])?;
        Ok(Self::Data { sid, seq, payload })
    }

    fn parse_parity(rest: &str) -> Result<Self, PacketError> {
        let parts: Vec<&str> = rest.splitn(3, ':').collect();
        if parts.len() != 3 {
            return Err(PacketError::Malformed {
                kind: "P",
                reason: format!("expected 3 fields, got {}", parts.len()),
            });
        }
        let sid = parts[0].to_string();
        let parity_id = parts[1].to_string();
        let payload = codec::b64_decode_validated(parts[2])?;
        Ok(Self::Parity { sid, parity_id, payload })
    }

    fn parse_end(rest: &str) -> Result<Self, PacketError> {
        let sid = rest.splitn(2, ':').next().unwrap_or("").to_string();
        if sid.is_empty() {
            return Err(PacketError::Malformed { kind: "E", reason: "empty sid".to_string() });
        }
        Ok(Self::End { sid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_roundtrip_no_flags() {
        let pkt = Packet::Start {
            sid: "1734567890-000123".to_string(),
            hash: "1B2M2Y8AsgTpgAmY7PhCfg==".to_string(),
            total: 4,
            flags: StartFlags::default(),
        };
        let wire = pkt.encode();
        assert_eq!(wire, "S:1734567890-000123::1B2M2Y8AsgTpgAmY7PhCfg==:4");
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn start_roundtrip_with_flags() {
        let pkt = Packet::Start {
            sid: "sid1".to_string(),
            hash: "hash==".to_string(),
            total: 10,
            flags: StartFlags { compressed: true, fec_scheme: Some("BASIC_4".to_string()) },
        };
        let wire = pkt.encode();
        assert_eq!(wire, "S:sid1::hash==:10:C,FBASIC_4");
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn data_roundtrip() {
        let pkt = Packet::Data { sid: "sid1".to_string(), seq: 3, payload: b"hello".to_vec() };
        let wire = pkt.encode();
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn parity_roundtrip() {
        let pkt = Packet::Parity {
            sid: "sid1".to_string(),
            parity_id: "2-4-O0".to_string(),
            payload: vec![0u8; 75],
        };
        let wire = pkt.encode();
        assert_eq!(wire, format!("P:sid1:2-4-O0:{}", codec::b64_encode(&[0u8; 75])));
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn end_roundtrip() {
        let pkt = Packet::End { sid: "sid1".to_string() };
        let wire = pkt.encode();
        assert_eq!(wire, "E:sid1::");
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn non_packet_is_not_an_error_to_distinguish() {
        assert!(matches!(Packet::parse("hello there"), Err(PacketError::NotAPacket)));
    }

    #[test]
    fn data_rejects_bad_base64() {
        assert!(matches!(
            Packet::parse("D:sid1:1:not-valid-b64!"),
            Err(PacketError::InvalidBase64(_))
        ));
    }

    #[test]
    fn packet_id_distinguishes_kind_and_field() {
        let a = Packet::Data { sid: "s".to_string(), seq: 1, payload: vec![] };
        let b = Packet::Data { sid: "s".to_string(), seq: 2, payload: vec![] };
        assert_ne!(a.packet_id(), b.packet_id());
    }
}
