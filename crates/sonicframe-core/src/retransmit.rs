//! Retransmit store (C7): retains completed send sessions so specific
//! fragments or parity can be replayed on caller request (§4.5).
//!
//! There is no feedback channel in this protocol — nothing here is
//! triggered automatically. A caller (operator, or a future side-channel)
//! decides what to replay and when.

use std::collections::HashMap;

use sonicframe_proto::packet::Packet;

use crate::error::RetransmitError;
use crate::protocol_tag::ProtocolTag;
use crate::sender::SendSession;

/// One retained record of a completed (or in-flight) send.
#[derive(Debug, Clone)]
struct Record<I> {
    chunks: HashMap<u32, Vec<u8>>,
    parity: HashMap<String, Vec<u8>>,
    total: u32,
    protocol_tag: ProtocolTag,
    created_at: I,
}

/// Sender-side store of every session retained for replay.
#[derive(Debug, Clone)]
pub struct RetransmitStore<I> {
    sessions: HashMap<String, Record<I>>,
}

impl<I: Copy + Ord> Default for RetransmitStore<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Copy + Ord> RetransmitStore<I> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { sessions: HashMap::new() }
    }

    /// Retain a session's chunks, parity, and metadata for future replay.
    pub fn retain(&mut self, session: &SendSession<I>) {
        self.sessions.insert(
            session.session_id().to_string(),
            Record {
                chunks: session.chunk_map(),
                parity: session.parity_map(),
                total: session.total(),
                protocol_tag: session.protocol_tag().clone(),
                created_at: session.created_at(),
            },
        );
    }

    /// Session ids currently retained, newest-first.
    #[must_use]
    pub fn list_send_sessions(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &Record<I>)> = self.sessions.iter().collect();
        entries.sort_unstable_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        entries.into_iter().map(|(sid, _)| sid.clone()).collect()
    }

    /// Replay the `DATA` packets for `seq_list`, in the given order, using
    /// the session's original protocol tag (§4.5).
    ///
    /// # Errors
    ///
    /// [`RetransmitError::UnknownSession`] if `sid` is not retained;
    /// [`RetransmitError::UnknownChunk`] if a requested `seq` was never
    /// part of this session.
    pub fn resend_chunks(
        &self,
        sid: &str,
        seq_list: &[u32],
    ) -> Result<(Vec<Packet>, ProtocolTag), RetransmitError> {
        let record = self
            .sessions
            .get(sid)
            .ok_or_else(|| RetransmitError::UnknownSession { sid: sid.to_string() })?;

        let packets = seq_list
            .iter()
            .map(|seq| {
                record.chunks.get(seq).map(|bytes| Packet::Data {
                    sid: sid.to_string(),
                    seq: *seq,
                    payload: bytes.clone(),
                }).ok_or_else(|| RetransmitError::UnknownChunk { sid: sid.to_string(), seq: *seq })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((packets, record.protocol_tag.clone()))
    }

    /// Replay the `PARITY` packets for `parity_id_list`, in the given order
    /// (§4.5).
    ///
    /// # Errors
    ///
    /// [`RetransmitError::UnknownSession`] if `sid` is not retained;
    /// [`RetransmitError::UnknownParity`] if a requested id was never
    /// computed for this session.
    pub fn resend_parity(
        &self,
        sid: &str,
        parity_id_list: &[String],
    ) -> Result<(Vec<Packet>, ProtocolTag), RetransmitError> {
        let record = self
            .sessions
            .get(sid)
            .ok_or_else(|| RetransmitError::UnknownSession { sid: sid.to_string() })?;

        let packets = parity_id_list
            .iter()
            .map(|parity_id| {
                record.parity.get(parity_id).map(|bytes| Packet::Parity {
                    sid: sid.to_string(),
                    parity_id: parity_id.clone(),
                    payload: bytes.clone(),
                }).ok_or_else(|| RetransmitError::UnknownParity {
                    sid: sid.to_string(),
                    parity_id: parity_id.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((packets, record.protocol_tag.clone()))
    }

    /// Drop every session older than `max_age`, measured against `now`.
    pub fn clear_old(&mut self, now: I, max_age: std::time::Duration)
    where
        I: std::ops::Sub<Output = std::time::Duration>,
    {
        self.sessions.retain(|_, r| now - r.created_at <= max_age);
    }

    /// Remove one session by id.
    ///
    /// # Errors
    ///
    /// [`RetransmitError::UnknownSession`] if `sid` is not retained.
    pub fn delete(&mut self, sid: &str) -> Result<(), RetransmitError> {
        self.sessions
            .remove(sid)
            .map(|_| ())
            .ok_or_else(|| RetransmitError::UnknownSession { sid: sid.to_string() })
    }

    /// Remove every retained session.
    pub fn clear_all(&mut self) {
        self.sessions.clear();
    }
}
