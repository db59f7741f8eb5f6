//! Receiver / session manager (C6): per-session reassembly, duplicate
//! suppression, FEC-triggered recovery, timeout, integrity check, delivery.
//!
//! Mirrors the action-pattern state machine used by the teacher's
//! `Connection<I>`: `SessionTable<I>` holds no clock and no transport, only
//! time passed as a parameter, so it can be driven by a virtual clock in
//! simulation and by `std::time::Instant` in production with the same
//! code path.

use std::{
    collections::{HashMap, HashSet},
    ops::{Add, Sub},
    time::Duration,
};

use sonicframe_proto::fec::{self, FecScheme};
use sonicframe_proto::packet::Packet;
use sonicframe_proto::{codec, SessionLimits};

use crate::protocol_tag::ProtocolTag;
use crate::sender::ProgressKind;

/// The adaptive per-session timeout: `max(MIN, BASE + total * PER_PACKET *
/// speed_mult)` (§4.4).
#[must_use]
pub fn session_timeout(total: u32, protocol_tag: &ProtocolTag, limits: &SessionLimits) -> Duration {
    let scaled = limits.base_timeout_ms
        + limits.per_packet_timeout_ms * u64::from(total) * protocol_tag.speed_mult();
    Duration::from_millis(scaled.max(limits.min_session_timeout_ms))
}

/// A fully reassembled and integrity-checked message, or a routed `FILE:`
/// batch (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveredPayload {
    /// Plain text (or binary-as-text) message for `on_text_cb`.
    Text(Vec<u8>),
    /// A `FILE:{batchId}:{filename}:{b64(zip)}` payload, routed to the file
    /// adapter instead of `on_text_cb` (§6).
    File {
        /// Batch identifier.
        batch_id: String,
        /// Original filename.
        filename: String,
        /// Decoded zip bytes.
        zip: Vec<u8>,
    },
}

/// Observable outcomes of feeding frames into a [`SessionTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// A session (or a direct non-fragmented frame) completed and was
    /// delivered.
    Delivered {
        /// Session id, or `"<direct>"` for a frame that needed no
        /// reassembly.
        sid: String,
        /// The delivered payload.
        payload: DeliveredPayload,
    },
    /// A session was deleted without delivering (hash mismatch or
    /// timeout).
    Aborted {
        /// Session identifier.
        sid: String,
        /// Why the session was aborted.
        reason: String,
    },
    /// A DATA or PARITY packet advanced reassembly of an open session
    /// (§6 `on_progress_cb`).
    Progress {
        /// Session identifier.
        sid: String,
        /// Which kind of packet triggered this update.
        kind: ProgressKind,
        /// Chunks reconstructed so far (post-FEC), including this update.
        current: u32,
        /// Total chunks the session expects.
        total: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiveState {
    Open,
    Delivered,
    Aborted,
}

/// Per-`sid` reassembly state (§3 "Receive session").
#[derive(Debug, Clone)]
struct ReceiveSession<I> {
    total: u32,
    expected_hash: String,
    compressed: bool,
    fec_scheme: FecScheme,
    chunks: HashMap<u32, Vec<u8>>,
    parity: HashMap<String, Vec<u8>>,
    timeout_deadline: I,
    seen_packet_ids: HashSet<String>,
    state: ReceiveState,
}

fn parse_file_frame(raw: &[u8]) -> Option<DeliveredPayload> {
    let text = std::str::from_utf8(raw).ok()?;
    let rest = text.strip_prefix("FILE:")?;
    let parts: Vec<&str> = rest.splitn(3, ':').collect();
    if parts.len() != 3 {
        return None;
    }
    let zip = codec::b64_decode_validated(parts[2]).ok()?;
    Some(DeliveredPayload::File {
        batch_id: parts[0].to_string(),
        filename: parts[1].to_string(),
        zip,
    })
}

/// Owns every in-flight receive session, keyed by `sid`.
///
/// Generic over `I` (the instant type) exactly like the teacher's
/// `Connection<I>`, so the same code drives both real and virtual clocks.
#[derive(Debug, Clone)]
pub struct SessionTable<I>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    sessions: HashMap<String, ReceiveSession<I>>,
    limits: SessionLimits,
}

impl<I> Default for SessionTable<I>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I> SessionTable<I>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Create an empty session table with the default wire limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(SessionLimits::default())
    }

    /// Create an empty session table tuned to `limits` (§5
    /// "Configuration"), for an embedder that wants non-default chunk
    /// size, timeout, or sequence bounds.
    #[must_use]
    pub fn with_limits(limits: SessionLimits) -> Self {
        Self { sessions: HashMap::new(), limits }
    }

    /// Number of sessions currently open. For diagnostics/tests only.
    #[must_use]
    pub fn open_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Entry point for one decoded frame (§4.4).
    ///
    /// `protocol_tag` is the tag of the *sending* session; since the
    /// receiver has no handshake, it is passed in from whatever the frame
    /// transport associates with the inbound stream (in practice, a fixed
    /// configured default).
    pub fn on_frame(
        &mut self,
        raw: &str,
        now: I,
        protocol_tag: &ProtocolTag,
    ) -> Vec<ReceiverEvent> {
        if raw.starts_with("FILE:") {
            return match parse_file_frame(raw.as_bytes()) {
                Some(payload) => {
                    vec![ReceiverEvent::Delivered { sid: "<direct>".to_string(), payload }]
                },
                None => {
                    tracing::debug!("dropped malformed direct FILE: frame");
                    Vec::new()
                },
            };
        }

        match Packet::parse(raw) {
            Ok(packet) => self.handle_packet(packet, now, protocol_tag),
            Err(sonicframe_proto::packet::PacketError::NotAPacket) => {
                vec![ReceiverEvent::Delivered {
                    sid: "<direct>".to_string(),
                    payload: DeliveredPayload::Text(raw.as_bytes().to_vec()),
                }]
            },
            Err(e) => {
                tracing::debug!(frame = raw, error = %e, "dropped malformed structured frame");
                Vec::new()
            },
        }
    }

    fn handle_packet(
        &mut self,
        packet: Packet,
        now: I,
        protocol_tag: &ProtocolTag,
    ) -> Vec<ReceiverEvent> {
        match packet {
            Packet::Start { sid, hash, total, flags } => {
                self.handle_start(sid, hash, total, flags.compressed, flags.fec_scheme, now, protocol_tag);
                Vec::new()
            },
            Packet::Data { sid, seq, payload } => self.handle_data(&sid, seq, payload),
            Packet::Parity { sid, parity_id, payload } => self.handle_parity(&sid, parity_id, payload),
            Packet::End { .. } => Vec::new(),
        }
    }

    fn handle_start(
        &mut self,
        sid: String,
        hash: String,
        total: u32,
        compressed: bool,
        fec_scheme_token: Option<String>,
        now: I,
        protocol_tag: &ProtocolTag,
    ) {
        // Last START wins: replacing any existing session for this `sid`
        // implicitly cancels its timer (I5) since the old entry is dropped.
        let fec_scheme = fec::scheme::resolve_or_default(fec_scheme_token.as_deref());
        let deadline_offset = session_timeout(total, protocol_tag, &self.limits);
        self.sessions.insert(
            sid,
            ReceiveSession {
                total,
                expected_hash: hash,
                compressed,
                fec_scheme,
                chunks: HashMap::new(),
                parity: HashMap::new(),
                timeout_deadline: advance(now, deadline_offset),
                seen_packet_ids: HashSet::new(),
                state: ReceiveState::Open,
            },
        );
    }

    fn handle_data(&mut self, sid: &str, seq: u32, payload: Vec<u8>) -> Vec<ReceiverEvent> {
        let packet_id = format!("D:{sid}:{seq}");
        let Some(session) = self.sessions.get_mut(sid) else {
            tracing::debug!(sid, seq, "DATA for unknown session; dropped");
            return Vec::new();
        };
        if session.state != ReceiveState::Open {
            return Vec::new();
        }
        if seq < 1 || seq > session.total || seq > self.limits.max_seq {
            tracing::debug!(sid, seq, total = session.total, "DATA seq out of range; dropped");
            return Vec::new();
        }
        if !session.seen_packet_ids.insert(packet_id) {
            return Vec::new();
        }
        session.chunks.insert(seq, payload);
        let mut events = self.after_packet(sid);
        self.push_progress(sid, ProgressKind::Data, &mut events);
        events
    }

    fn handle_parity(
        &mut self,
        sid: &str,
        raw_parity_id: String,
        payload: Vec<u8>,
    ) -> Vec<ReceiverEvent> {
        let parity_id = fec::normalize_parity_id(&raw_parity_id);
        let packet_id = format!("P:{sid}:{parity_id}");
        let Some(session) = self.sessions.get_mut(sid) else {
            tracing::debug!(sid, parity_id, "PARITY for unknown session; dropped");
            return Vec::new();
        };
        if session.state != ReceiveState::Open {
            return Vec::new();
        }
        if payload.len() != self.limits.chunk_size {
            tracing::debug!(sid, parity_id, len = payload.len(), "PARITY wrong length; dropped");
            return Vec::new();
        }
        if !session.seen_packet_ids.insert(packet_id) {
            return Vec::new();
        }
        session.parity.insert(parity_id, payload);
        let mut events = self.after_packet(sid);
        self.push_progress(sid, ProgressKind::Parity, &mut events);
        events
    }

    /// If `sid` is still open after `events` (i.e. it wasn't just
    /// delivered or aborted), append a [`ReceiverEvent::Progress`]
    /// reflecting chunks reconstructed so far.
    fn push_progress(&self, sid: &str, kind: ProgressKind, events: &mut Vec<ReceiverEvent>) {
        if !events.is_empty() {
            return;
        }
        if let Some(session) = self.sessions.get(sid) {
            events.push(ReceiverEvent::Progress {
                sid: sid.to_string(),
                kind,
                current: session.chunks.len() as u32,
                total: session.total,
            });
        }
    }

    /// Re-run FEC recovery and, if complete, finish the session (§4.2,
    /// §4.4). Idempotent: safe to call after every DATA/PARITY arrival.
    fn after_packet(&mut self, sid: &str) -> Vec<ReceiverEvent> {
        let Some(session) = self.sessions.get_mut(sid) else { return Vec::new() };

        let fec_errors = fec::recover_all(
            session.total,
            &session.fec_scheme,
            &mut session.chunks,
            &session.parity,
            self.limits.chunk_size,
        );
        for err in fec_errors {
            tracing::warn!(sid, error = %err, "FEC recovery fell back on a singular group");
        }

        if (session.chunks.len() as u32) < session.total {
            return Vec::new();
        }

        let Some(mut session) = self.sessions.remove(sid) else { return Vec::new() };

        // `chunks.len() == total` and every key was validated into
        // `1..=total` on insertion, so the key set is exactly `1..=total`:
        // sorting by key reproduces the original byte stream.
        let mut ordered: Vec<(u32, Vec<u8>)> = session.chunks.drain().collect();
        ordered.sort_unstable_by_key(|(seq, _)| *seq);
        let concatenated: Vec<u8> = ordered.into_iter().flat_map(|(_, bytes)| bytes).collect();

        let actual_hash = codec::md5_base64(&concatenated);
        if actual_hash != session.expected_hash {
            session.state = ReceiveState::Aborted;
            tracing::warn!(sid, expected = %session.expected_hash, actual = %actual_hash, "hash mismatch");
            return vec![ReceiverEvent::Aborted {
                sid: sid.to_string(),
                reason: "hash mismatch".to_string(),
            }];
        }

        let final_bytes = if session.compressed {
            match codec::gunzip(&concatenated) {
                Ok(decompressed) => decompressed,
                Err(e) => {
                    tracing::warn!(sid, error = %e, "gunzip failed; delivering raw bytes");
                    concatenated
                },
            }
        } else {
            concatenated
        };

        session.state = ReceiveState::Delivered;

        let payload = parse_file_frame(&final_bytes)
            .unwrap_or_else(|| DeliveredPayload::Text(final_bytes));

        vec![ReceiverEvent::Delivered { sid: sid.to_string(), payload }]
    }

    /// Delete every session whose deadline has passed (§4.4, P8).
    ///
    /// The driver should call this periodically (there is no per-session
    /// timer object; the deadline is just a field checked here).
    pub fn expire_timeouts(&mut self, now: I) -> Vec<ReceiverEvent> {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.state == ReceiveState::Open && now >= s.timeout_deadline)
            .map(|(sid, _)| sid.clone())
            .collect();

        expired
            .into_iter()
            .map(|sid| {
                self.sessions.remove(&sid);
                tracing::warn!(sid, "session timed out");
                ReceiverEvent::Aborted { sid, reason: "timeout".to_string() }
            })
            .collect()
    }
}

fn advance<I: Copy + Add<Duration, Output = I>>(now: I, offset: Duration) -> I {
    now + offset
}
