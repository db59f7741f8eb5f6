//! Deterministic simulation harness: a virtual-clock [`Environment`], a
//! seeded fault-injecting transport, and scenario-driving helpers, in the
//! spirit of the teacher's `lockframe-harness` (`sim_env`, `sim_transport`,
//! `scenario` modules) — rebuilt from that module shape rather than ported
//! line-for-line, since the teacher's own `sim_env.rs` isn't present in
//! this retrieval pack (see `DESIGN.md`).
//!
//! [`Environment`]: sonicframe_core::Environment

pub mod scenario;
pub mod sim_env;
pub mod sim_transport;

pub use sim_env::SimEnv;
pub use sim_transport::{channel, reverse_queue, FaultPolicy, LossyReceiver, LossySender};
