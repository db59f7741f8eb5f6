//! Orchestration layer (C5 + C6 driver): awaits the acoustic transport and
//! paces emission, the way the teacher's `lockframe-client` bridges its
//! Sans-IO `Client` state machine to real QUIC I/O — except here the
//! "connection" is a single unidirectional send or receive loop with no
//! handshake.
//!
//! Everything reusable and pure stays in `sonicframe-core`; this crate only
//! adds the `await`s.

use std::time::Duration;

use sonicframe_core::{
    Environment, ProgressEvent, ProgressKind, ProtocolTag, ReceiverError, ReceiverEvent,
    RetransmitError, RetransmitStore, SendSession, SenderError, SessionTable,
};
use sonicframe_proto::packet::Packet;
use sonicframe_transport::{AcousticTransport, FrameSource, TransportError};
use thiserror::Error;

/// Errors surfaced to a caller of [`Client::send`] or the retransmit
/// operations (§4.3 "Failure semantics", §4.5 "Failure of a requested
/// resend propagates").
#[derive(Debug, Error)]
pub enum ClientError {
    /// Building the send session failed.
    #[error(transparent)]
    Sender(#[from] SenderError),

    /// A requested retransmit referenced an unknown session, chunk, or
    /// parity id.
    #[error(transparent)]
    Retransmit(#[from] RetransmitError),

    /// A receiver operation was attempted on a session that is no longer
    /// open.
    #[error(transparent)]
    Receiver(#[from] ReceiverError),

    /// The acoustic transport failed mid-emission; per §4.3 this
    /// propagates upward and the already-built session stays in the
    /// retransmit store for a later explicit resend.
    #[error("transport failure while sending: {0}")]
    Transport(#[from] TransportError),
}

fn progress_event(sid: &str, packet: &Packet, current: u32, total: u32) -> ProgressEvent {
    let (kind, fec_info) = match packet {
        Packet::Start { .. } => (ProgressKind::Start, None),
        Packet::Data { .. } => (ProgressKind::Data, None),
        Packet::Parity { parity_id, .. } => (ProgressKind::Parity, Some(parity_id.clone())),
        Packet::End { .. } => (ProgressKind::End, None),
    };
    ProgressEvent { kind, current, total, sid: sid.to_string(), packet: packet.encode(), fec_info }
}

/// Drives sends and retransmits for one environment/transport pair, and
/// retains completed sessions for replay (§4.5).
pub struct Client<E: Environment, T: AcousticTransport> {
    env: E,
    transport: T,
    retransmit: RetransmitStore<E::Instant>,
}

impl<E: Environment, T: AcousticTransport> Client<E, T> {
    /// Build a client over `env` and `transport`, with an empty retransmit
    /// store.
    pub fn new(env: E, transport: T) -> Self {
        Self { env, transport, retransmit: RetransmitStore::new() }
    }

    /// `send(payload, protocol_tag, compress, fec_scheme, progress_cb)`
    /// (§6, §4.3): builds the session, emits every packet in order,
    /// pacing by `protocol_tag`'s inter-packet delay, then retains the
    /// session for replay.
    ///
    /// # Errors
    ///
    /// Propagates [`SenderError`] from session construction or
    /// [`TransportError`] from a failed emission (§4.3 "Failure
    /// semantics": the partially-sent session remains retained so the
    /// caller can finish it with explicit retransmit calls).
    pub async fn send(
        &mut self,
        message_bytes: &[u8],
        protocol_tag: ProtocolTag,
        compress: bool,
        fec_scheme: sonicframe_proto::fec::FecScheme,
        mut progress_cb: impl FnMut(ProgressEvent),
    ) -> Result<String, ClientError> {
        let mut session =
            SendSession::new(&self.env, message_bytes, protocol_tag.clone(), compress, fec_scheme)?;
        let sid = session.session_id().to_string();

        let packets = session.packets();
        let total = packets.len() as u32;
        let delay = protocol_tag.inter_packet_delay();

        for (i, packet) in packets.iter().enumerate() {
            let wire = packet.encode();
            let outcome = self.transport.transmit(&wire, &protocol_tag).await;
            // Retain whatever was already sent even on failure so the
            // caller can finish the session via explicit resends.
            self.retransmit.retain(&session);
            outcome?;

            session.mark_sent(packet);
            progress_cb(progress_event(&sid, packet, i as u32 + 1, total));

            if delay > Duration::ZERO {
                self.env.sleep(delay).await;
            }
        }

        self.retransmit.retain(&session);
        Ok(sid)
    }

    /// Replay previously sent `DATA` packets for `seq_list` (§4.5),
    /// re-emitting them over the transport using the session's original
    /// protocol tag.
    ///
    /// # Errors
    ///
    /// [`RetransmitError`] if `sid` or a requested `seq` is unknown;
    /// [`TransportError`] if emission fails.
    pub async fn resend_chunks(&mut self, sid: &str, seq_list: &[u32]) -> Result<(), ClientError> {
        let (packets, tag) = self.retransmit.resend_chunks(sid, seq_list)?;
        for packet in &packets {
            self.transport.transmit(&packet.encode(), &tag).await?;
        }
        Ok(())
    }

    /// Replay previously computed `PARITY` packets for `parity_id_list`
    /// (§4.5).
    ///
    /// # Errors
    ///
    /// [`RetransmitError`] if `sid` or a requested parity id is unknown;
    /// [`TransportError`] if emission fails.
    pub async fn resend_parity(
        &mut self,
        sid: &str,
        parity_id_list: &[String],
    ) -> Result<(), ClientError> {
        let (packets, tag) = self.retransmit.resend_parity(sid, parity_id_list)?;
        for packet in &packets {
            self.transport.transmit(&packet.encode(), &tag).await?;
        }
        Ok(())
    }

    /// Delete the retained session `sid`.
    ///
    /// # Errors
    ///
    /// [`RetransmitError::UnknownSession`] if `sid` is not retained.
    pub fn delete_retained(&mut self, sid: &str) -> Result<(), ClientError> {
        self.retransmit.delete(sid).map_err(ClientError::from)
    }

    /// Session ids retained for replay, newest-first.
    #[must_use]
    pub fn retained_sessions(&self) -> Vec<String> {
        self.retransmit.list_send_sessions()
    }
}

/// How often [`start_receive`] sweeps for expired sessions between frame
/// arrivals (§4.4, P8). Well under [`sonicframe_proto::MIN_SESSION_TIMEOUT_MS`]
/// so a stalled sender's session is reliably aborted close to its deadline
/// instead of waiting indefinitely on the next frame.
const TIMEOUT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// `start_receive(on_text_cb, on_progress_cb)` (§6): pulls decoded frames
/// from `source` until it closes, feeding each into `table` and reporting
/// every event to `on_event` — including [`ReceiverEvent::Progress`], which
/// plays the role of `on_progress_cb` from the upward adapter interface, so
/// a single sum-type callback covers both halves of that interface.
///
/// Races frame arrival against a periodic sweep (the way the teacher's
/// connection driver ticks a timer) so a session whose sender goes silent
/// still transitions `Open -> Aborted` on its deadline (§4.4, P8) instead of
/// sitting open forever waiting on a frame that never arrives.
pub async fn start_receive<E, F>(
    env: &E,
    table: &mut SessionTable<E::Instant>,
    mut source: F,
    protocol_tag: ProtocolTag,
    mut on_event: impl FnMut(ReceiverEvent),
) where
    E: Environment,
    F: FrameSource,
{
    let mut sweep = tokio::time::interval(TIMEOUT_SWEEP_INTERVAL);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = source.recv_frame() => {
                let Some(frame) = frame else { break };
                let now = env.now();
                for event in table.on_frame(&frame, now, &protocol_tag) {
                    on_event(event);
                }
            }
            _ = sweep.tick() => {
                let now = env.now();
                for event in table.expire_timeouts(now) {
                    on_event(event);
                }
            }
        }
    }
}
