//! Drives one send/receive scenario end-to-end against a [`SimEnv`] and a
//! [`LossySender`]/[`LossyReceiver`] pair, and collects what the receiver
//! observed. Shared by the scenario tests in `tests/` so each one only
//! states its payload, scheme, and fault policy (§8 end-to-end table).

use sonicframe_client::{start_receive, Client};
use sonicframe_core::{ProtocolTag, ReceiverEvent, SessionTable};
use sonicframe_proto::fec::FecScheme;

use crate::sim_env::SimEnv;
use crate::sim_transport::{channel, FaultPolicy};

/// One scenario's outcome: every event the receiver produced, in order.
pub struct Outcome {
    /// Events reported by [`SessionTable::on_frame`] while draining the
    /// transport.
    pub events: Vec<ReceiverEvent>,
}

/// Send `message` once under `scheme`/`compress`/`protocol_tag` through a
/// transport governed by `policy`, then drain the receiver until the
/// channel closes (i.e. every in-flight frame has been consumed).
pub async fn run(
    message: &[u8],
    protocol_tag: ProtocolTag,
    compress: bool,
    scheme: FecScheme,
    policy: FaultPolicy,
    seed: u64,
) -> Outcome {
    let env = SimEnv::new(seed, 1_700_000_000);
    let (sender, receiver) = channel(seed, policy);
    let mut client = Client::new(env.clone(), sender);

    // A scenario's own send leg never hits a transport failure: the
    // transport here is the in-process fault-injecting channel, which
    // never returns `Err` from `transmit` (it drops/duplicates instead).
    #[allow(clippy::expect_used)]
    client.send(message, protocol_tag.clone(), compress, scheme, |_| {}).await.expect("send");

    let mut table: SessionTable<_> = SessionTable::new();
    let mut events = Vec::new();
    start_receive(&env, &mut table, receiver, protocol_tag, |event| events.push(event)).await;
    Outcome { events }
}
