//! Session-layer state machines for the sonicframe protocol: the sender,
//! the receiver's session table, and the retransmit store.
//!
//! Everything in [`sonicframe-proto`] is pure wire format and FEC math with
//! no notion of time or identity. This crate adds the session concepts that
//! sit on top of it — protocol tags, adaptive timeouts, sequence tracking —
//! and drives them through the [`Environment`](env::Environment)
//! abstraction so the same code runs against a real clock in production and
//! a deterministic simulated clock under test.
//!
//! [`sonicframe-proto`]: https://docs.rs/sonicframe-proto

pub mod env;
pub mod error;
pub mod protocol_tag;
pub mod receiver;
pub mod retransmit;
pub mod sender;
pub mod system_env;

pub use env::Environment;
pub use error::{ReceiverError, RetransmitError, SenderError};
pub use protocol_tag::ProtocolTag;
pub use receiver::{session_timeout, DeliveredPayload, ReceiverEvent, SessionTable};
pub use retransmit::RetransmitStore;
pub use sender::{ProgressEvent, ProgressKind, SendSession};
pub use system_env::SystemEnv;
