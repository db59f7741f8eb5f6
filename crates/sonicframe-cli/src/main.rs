//! Demo CLI: encodes a message through one end of an in-memory acoustic
//! transport, decodes it on the other, and logs what happened along the
//! way. There is no real modem here — `sonicframe-transport::in_memory`
//! stands in for it — so this exists to exercise the full send/receive
//! stack end to end the way `lockframe-server`'s binary exercises its
//! `Server`.

use std::time::Duration;

use clap::Parser;
use sonicframe_client::{start_receive, Client};
use sonicframe_core::{DeliveredPayload, ProtocolTag, ReceiverEvent, SessionTable, SystemEnv};
use sonicframe_proto::fec::scheme;
use sonicframe_transport::in_memory;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sonicframe-cli")]
#[command(about = "Send a message over an in-memory acoustic transport and print what arrives")]
#[command(version)]
struct Args {
    /// Message text to send.
    #[arg(short, long, default_value = "Hello over sonicframe!")]
    message: String,

    /// Protocol speed preset: NORMAL, FAST, or FASTEST.
    #[arg(short, long, default_value = "NORMAL")]
    protocol_tag: String,

    /// FEC scheme token: NONE, BASIC_2, BASIC_4, OVERLAPPING_3, or
    /// STRONG_OVERLAPPING_3.
    #[arg(short, long, default_value = "STRONG_OVERLAPPING_3")]
    fec_scheme: String,

    /// Gzip-compress the message before chunking.
    #[arg(short, long)]
    compress: bool,

    /// Tracing log level, used when `RUST_LOG` isn't set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let protocol_tag = ProtocolTag::parse(&args.protocol_tag);
    let fec_scheme = scheme::lookup(&args.fec_scheme).unwrap_or(scheme::DEFAULT);

    let (sender, mut receiver) = in_memory::channel(64);
    let env = SystemEnv::new();

    let receive_env = env.clone();
    let receive_protocol_tag = protocol_tag.clone();
    let receive_task = tokio::spawn(async move {
        let mut table: SessionTable<std::time::Instant> = SessionTable::new();
        let mut delivered = None;
        loop {
            let Some(frame) = tokio::time::timeout(Duration::from_secs(5), receiver.recv_frame())
                .await
                .ok()
                .flatten()
            else {
                // No frame within the window: sweep for timed-out sessions
                // (§4.4, P8) before trying again, the way `start_receive`
                // races its own periodic sweep against frame arrival.
                let now = receive_env.now();
                for event in table.expire_timeouts(now) {
                    if let ReceiverEvent::Aborted { sid, reason } = event {
                        tracing::warn!(sid, reason, "session aborted");
                    }
                }
                break;
            };
            let now = receive_env.now();
            for event in table.on_frame(&frame, now, &receive_protocol_tag) {
                match event {
                    ReceiverEvent::Delivered { sid, payload } => {
                        tracing::info!(sid, "delivered");
                        delivered = Some(payload);
                    },
                    ReceiverEvent::Aborted { sid, reason } => {
                        tracing::warn!(sid, reason, "session aborted");
                    },
                    ReceiverEvent::Progress { sid, kind, current, total } => {
                        tracing::debug!(sid, ?kind, current, total, "receive progress");
                    },
                }
            }
            if delivered.is_some() {
                break;
            }
        }
        delivered
    });

    let mut client = Client::new(env, sender);
    let sid = client
        .send(args.message.as_bytes(), protocol_tag, args.compress, fec_scheme, |event| {
            tracing::debug!(?event, "progress");
        })
        .await?;
    tracing::info!(sid, "send complete");

    match receive_task.await? {
        Some(DeliveredPayload::Text(bytes)) => {
            tracing::info!(message = %String::from_utf8_lossy(&bytes), "delivered");
        },
        Some(DeliveredPayload::File { batch_id, filename, .. }) => {
            tracing::info!(batch_id, filename, "delivered file frame");
        },
        None => {
            tracing::warn!("no delivery within the timeout");
        },
    }

    Ok(())
}
