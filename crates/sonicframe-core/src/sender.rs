//! Sender (C5): drives a single transmission.
//!
//! `SendSession` is a pure value: everything `send()` needs to compute
//! (chunks, hash, FEC parity, packet order) is derived once at
//! construction. Emission itself — awaiting the transport and pacing
//! between frames — is driver I/O and lives in `sonicframe-client`, not
//! here; this type only knows what to emit and in what order, which keeps
//! it trivially testable.

use std::collections::{HashMap, HashSet};

use sonicframe_proto::codec;
use sonicframe_proto::fec::{FecScheme, group_plan, parity};
use sonicframe_proto::packet::{Packet, StartFlags};
use sonicframe_proto::SessionLimits;

use crate::env::Environment;
use crate::error::SenderError;
use crate::protocol_tag::ProtocolTag;

/// One packet-emission event, reported to the caller's progress callback
/// (§4.3 step 8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Which kind of packet this event reports.
    pub kind: ProgressKind,
    /// How many packets of `kind` have been emitted so far, including this
    /// one (1-based). For `Start`/`End` this is always `1`.
    pub current: u32,
    /// Total count of packets of `kind` this session will emit.
    pub total: u32,
    /// Session identifier.
    pub sid: String,
    /// The wire-encoded packet that was just emitted.
    pub packet: String,
    /// The parity id, for `Parity` events; `None` otherwise (§4.3 step 8
    /// `fec_info`).
    pub fec_info: Option<String>,
}

/// Discriminates the four packet kinds for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    /// The single `START` packet.
    Start,
    /// One `DATA` packet.
    Data,
    /// One `PARITY` packet.
    Parity,
    /// The single `END` packet.
    End,
}

fn parity_bytes_for(
    entry: &sonicframe_proto::fec::PlanEntry,
    chunks: &[(u32, Vec<u8>)],
    chunk_size: usize,
) -> Vec<u8> {
    let members: Vec<(u32, Vec<u8>)> = chunks
        .iter()
        .filter(|(seq, _)| *seq >= entry.start && *seq <= entry.end)
        .cloned()
        .collect();
    match entry.parity_type.as_str() {
        "1" => parity::secondary(&members, entry.start, chunk_size),
        "2" => parity::tertiary(&members, entry.start, chunk_size),
        _ => parity::primary(&members, chunk_size),
    }
}

/// A single outbound transmission: its chunks, parity, and emission plan.
///
/// Retained (by `sonicframe-client`) after sending completes so that
/// `RetransmitStore` can replay individual packets on request.
#[derive(Debug, Clone)]
pub struct SendSession<I> {
    session_id: String,
    chunks: Vec<(u32, Vec<u8>)>,
    parity: Vec<(String, Vec<u8>)>,
    total: u32,
    sent_chunks: HashSet<u32>,
    sent_parity: HashSet<String>,
    protocol_tag: ProtocolTag,
    fec_scheme: FecScheme,
    full_hash: String,
    compressed: bool,
    created_at: I,
}

impl<I: Copy> SendSession<I> {
    /// Build a send session with the default wire limits. See
    /// [`Self::with_limits`].
    ///
    /// # Errors
    ///
    /// Returns [`SenderError::EmptyPlan`] only if chunking somehow produces
    /// zero chunks, which [`codec::chunk`]'s empty-input convention should
    /// never allow.
    pub fn new<E: Environment<Instant = I>>(
        env: &E,
        message_bytes: &[u8],
        protocol_tag: ProtocolTag,
        compress: bool,
        fec_scheme: FecScheme,
    ) -> Result<Self, SenderError> {
        Self::with_limits(env, message_bytes, protocol_tag, compress, fec_scheme, SessionLimits::default())
    }

    /// Build a send session tuned to `limits` (§5 "Configuration"):
    /// allocate `sid`, optionally gzip, hash, chunk, and eagerly compute
    /// every parity symbol (§4.3 steps 1-5).
    ///
    /// # Errors
    ///
    /// Returns [`SenderError::EmptyPlan`] only if chunking somehow produces
    /// zero chunks, which [`codec::chunk`]'s empty-input convention should
    /// never allow.
    pub fn with_limits<E: Environment<Instant = I>>(
        env: &E,
        message_bytes: &[u8],
        protocol_tag: ProtocolTag,
        compress: bool,
        fec_scheme: FecScheme,
        limits: SessionLimits,
    ) -> Result<Self, SenderError> {
        let session_id = Self::allocate_sid(env);

        let (payload, compressed) = if compress {
            (codec::gzip(message_bytes), true)
        } else {
            (message_bytes.to_vec(), false)
        };

        let full_hash = codec::md5_base64(&payload);

        let chunks: Vec<(u32, Vec<u8>)> = codec::chunk(&payload, limits.chunk_size)
            .into_iter()
            .enumerate()
            .map(|(i, bytes)| (i as u32 + 1, bytes.to_vec()))
            .collect();
        if chunks.is_empty() {
            return Err(SenderError::EmptyPlan);
        }
        let total = chunks.len() as u32;

        let plan = group_plan(total, &fec_scheme);
        let parity: Vec<(String, Vec<u8>)> = plan
            .iter()
            .map(|entry| {
                let bytes = parity_bytes_for(entry, &chunks, limits.chunk_size);
                (entry.parity_id(), bytes)
            })
            .collect();

        Ok(Self {
            session_id,
            chunks,
            parity,
            total,
            sent_chunks: HashSet::new(),
            sent_parity: HashSet::new(),
            protocol_tag,
            fec_scheme,
            full_hash,
            compressed,
            created_at: env.now(),
        })
    }

    fn allocate_sid<E: Environment<Instant = I>>(env: &E) -> String {
        let nonce = env.random_u64() % 1_000_000;
        format!("{}-{:06}", env.unix_seconds(), nonce)
    }

    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Total chunk count.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> I {
        self.created_at
    }

    /// The protocol tag this session was built with.
    #[must_use]
    pub fn protocol_tag(&self) -> &ProtocolTag {
        &self.protocol_tag
    }

    fn start_packet(&self) -> Packet {
        Packet::Start {
            sid: self.session_id.clone(),
            hash: self.full_hash.clone(),
            total: self.total,
            flags: StartFlags {
                compressed: self.compressed,
                fec_scheme: (self.fec_scheme.group_size > 0)
                    .then(|| self.fec_scheme.name.to_string()),
            },
        }
    }

    /// The full ordered packet sequence (§4.3 step 6): one `START`, every
    /// `DATA` packet by ascending `seq`, every `PARITY` packet in plan
    /// order, then one `END`.
    #[must_use]
    pub fn packets(&self) -> Vec<Packet> {
        let mut out = Vec::with_capacity(self.chunks.len() + self.parity.len() + 2);
        out.push(self.start_packet());
        for (seq, bytes) in &self.chunks {
            out.push(Packet::Data { sid: self.session_id.clone(), seq: *seq, payload: bytes.clone() });
        }
        for (parity_id, bytes) in &self.parity {
            out.push(Packet::Parity {
                sid: self.session_id.clone(),
                parity_id: parity_id.clone(),
                payload: bytes.clone(),
            });
        }
        out.push(Packet::End { sid: self.session_id.clone() });
        out
    }

    /// Record that `packet` (previously returned by [`Self::packets`]) was
    /// emitted, updating `sent_chunks`/`sent_parity` bookkeeping.
    pub fn mark_sent(&mut self, packet: &Packet) {
        match packet {
            Packet::Data { seq, .. } => {
                self.sent_chunks.insert(*seq);
            },
            Packet::Parity { parity_id, .. } => {
                self.sent_parity.insert(parity_id.clone());
            },
            Packet::Start { .. } | Packet::End { .. } => {},
        }
    }

    /// Every chunk keyed by sequence number, for retransmit lookups.
    #[must_use]
    pub fn chunk_map(&self) -> HashMap<u32, Vec<u8>> {
        self.chunks.iter().cloned().collect()
    }

    /// Every parity symbol keyed by canonical parity id, for retransmit
    /// lookups.
    #[must_use]
    pub fn parity_map(&self) -> HashMap<String, Vec<u8>> {
        self.parity.iter().cloned().collect()
    }
}
