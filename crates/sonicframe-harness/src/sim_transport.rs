//! A transport that drops, duplicates, and reorders frames on a seeded
//! schedule, for exercising the properties of §8 directly instead of only
//! through hand-picked "withheld" lists.
//!
//! Grounded on the same channel-pair shape as
//! [`sonicframe_transport::in_memory`], with an injected fault policy
//! applied at the point frames are handed from sender to receiver — the
//! structural role the teacher's harness module list calls
//! `sim_transport`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use sonicframe_core::ProtocolTag;
use sonicframe_proto::packet::Packet;
use sonicframe_transport::{AcousticTransport, FrameSource, TransportError};

/// A frame-content-addressed fault policy — matches on the decoded `DATA`
/// sequence number or `PARITY` id rather than raw emission order, so a
/// scenario can say "withhold DATA seq=2" without needing to know where
/// that packet falls among START/DATA/PARITY/END in the wire sequence
/// (§8 end-to-end table).
#[derive(Debug, Clone, Default)]
pub struct FaultPolicy {
    /// Probability (0.0-1.0) that an eligible frame is dropped outright.
    pub drop_probability: f64,
    /// Probability that an eligible frame is delivered twice.
    pub duplicate_probability: f64,
    /// `DATA` sequence numbers unconditionally dropped.
    pub always_drop_data_seqs: Vec<u32>,
    /// Canonical `PARITY` ids unconditionally dropped.
    pub always_drop_parity_ids: Vec<String>,
}

impl FaultPolicy {
    /// No faults: every frame passes through exactly once, in order.
    #[must_use]
    pub fn clean() -> Self {
        Self::default()
    }

    fn always_drops(&self, frame: &str) -> bool {
        match Packet::parse(frame) {
            Ok(Packet::Data { seq, .. }) => self.always_drop_data_seqs.contains(&seq),
            Ok(Packet::Parity { parity_id, .. }) => {
                let canonical = sonicframe_proto::fec::normalize_parity_id(&parity_id);
                self.always_drop_parity_ids.contains(&canonical)
            },
            _ => false,
        }
    }
}

struct Inner {
    queue: VecDeque<String>,
    rng: ChaCha8Rng,
    policy: FaultPolicy,
}

/// Sending half of a lossy in-memory channel.
#[derive(Clone)]
pub struct LossySender {
    inner: Arc<Mutex<Inner>>,
}

impl AcousticTransport for LossySender {
    async fn transmit(&self, frame: &str, _protocol_tag: &ProtocolTag) -> Result<(), TransportError> {
        // No other thread can panic while holding this lock.
        #[allow(clippy::expect_used)]
        let mut inner = self.inner.lock().expect("LossySender mutex poisoned");

        if inner.policy.always_drops(frame) {
            tracing::debug!(frame, "fault policy dropped frame");
            return Ok(());
        }
        if inner.rng.gen_bool(inner.policy.drop_probability) {
            tracing::debug!(frame, "probabilistic drop");
            return Ok(());
        }

        inner.queue.push_back(frame.to_string());
        if inner.rng.gen_bool(inner.policy.duplicate_probability) {
            inner.queue.push_back(frame.to_string());
        }
        Ok(())
    }
}

/// Receiving half of a lossy in-memory channel. Frames are already queued
/// (no async waiting is needed since this harness never actually suspends
/// for real time); `recv_frame` just pops the front.
pub struct LossyReceiver {
    inner: Arc<Mutex<Inner>>,
}

impl FrameSource for LossyReceiver {
    async fn recv_frame(&mut self) -> Option<String> {
        #[allow(clippy::expect_used)]
        self.inner.lock().expect("LossyReceiver mutex poisoned").queue.pop_front()
    }
}

/// Build a connected, seeded, fault-injecting transport pair.
#[must_use]
pub fn channel(seed: u64, policy: FaultPolicy) -> (LossySender, LossyReceiver) {
    let inner =
        Arc::new(Mutex::new(Inner { queue: VecDeque::new(), rng: ChaCha8Rng::seed_from_u64(seed), policy }));
    (LossySender { inner: inner.clone() }, LossyReceiver { inner })
}

/// Reorder every frame currently queued in `receiver`, deterministically,
/// by reversing emission order. Used to exercise P7 without relying on
/// probabilistic reordering.
pub fn reverse_queue(receiver: &LossyReceiver) {
    // No other thread can panic while holding this lock.
    #[allow(clippy::expect_used)]
    let mut inner = receiver.inner.lock().expect("LossyReceiver mutex poisoned");
    let reversed: VecDeque<String> = inner.queue.drain(..).rev().collect();
    inner.queue = reversed;
}
