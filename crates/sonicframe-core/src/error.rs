//! Error types for session-layer operations.
//!
//! Mirrors the policy table in §7 of the protocol: most conditions are
//! handled in-band (drop, recover, abort) and never surface as a `Result`
//! error. These types exist for the conditions that §7 classifies as
//! "Report" — caller-visible failures — plus construction-time misuse.

use thiserror::Error;

/// Errors from building or driving a [`crate::sender::SendSession`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SenderError {
    /// The message produced zero chunks and zero is not a valid `total`.
    #[error("message produced no chunks")]
    EmptyPlan,

    /// A requested resend referenced a sequence number outside `1..=total`.
    #[error("sequence {seq} out of range 1..={total}")]
    SeqOutOfRange {
        /// Requested sequence number.
        seq: u32,
        /// Session's chunk count.
        total: u32,
    },

    /// A requested resend referenced a parity id this session never
    /// computed.
    #[error("unknown parity id {parity_id}")]
    UnknownParityId {
        /// The parity id that was requested.
        parity_id: String,
    },
}

/// Errors from driving a [`crate::receiver::ReceiveSession`].
///
/// Per §7, most malformed input is a silent drop (logged, not an `Err`).
/// These variants cover the handful of conditions that are programmer
/// errors rather than adversarial-input conditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiverError {
    /// A method that requires an `Open` session was called on one that has
    /// already transitioned to `Delivered` or `Aborted`.
    #[error("session {sid} is no longer open")]
    SessionClosed {
        /// Session identifier.
        sid: String,
    },
}

/// Errors from [`crate::retransmit::RetransmitStore`] operations (§4.5,
/// §7 "Report" policy).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetransmitError {
    /// `resend_*` or `delete` referenced a `sid` the store does not hold.
    #[error("unknown session id {sid}")]
    UnknownSession {
        /// The requested, unrecognized session id.
        sid: String,
    },

    /// `resend_chunks` referenced a sequence number the session never sent.
    #[error("session {sid} has no chunk {seq}")]
    UnknownChunk {
        /// Session identifier.
        sid: String,
        /// Requested, unrecognized sequence number.
        seq: u32,
    },

    /// `resend_parity` referenced a parity id the session never computed.
    #[error("session {sid} has no parity {parity_id}")]
    UnknownParity {
        /// Session identifier.
        sid: String,
        /// Requested, unrecognized parity id.
        parity_id: String,
    },
}
