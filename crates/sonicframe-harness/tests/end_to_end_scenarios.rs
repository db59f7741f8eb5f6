//! The six end-to-end scenarios of §8, driven through the full
//! `sonicframe-client` + `SimEnv` + fault-injecting transport stack.

use sonicframe_core::receiver::DeliveredPayload;
use sonicframe_core::{ProtocolTag, ReceiverEvent, SessionTable};
use sonicframe_harness::scenario;
use sonicframe_harness::sim_transport::FaultPolicy;
use sonicframe_proto::fec::scheme;

fn only_delivered(outcome: &scenario::Outcome) -> Option<&DeliveredPayload> {
    outcome.events.iter().find_map(|e| match e {
        ReceiverEvent::Delivered { payload, .. } => Some(payload),
        ReceiverEvent::Aborted { .. } | ReceiverEvent::Progress { .. } => None,
    })
}

#[tokio::test]
async fn scenario_1_plain_message_no_loss_delivers_unchanged() {
    let message = b"Hello World! This is a test message.";
    let outcome =
        scenario::run(message, ProtocolTag::Normal, false, scheme::NONE, FaultPolicy::clean(), 1)
            .await;
    assert_eq!(only_delivered(&outcome), Some(&DeliveredPayload::Text(message.to_vec())));
}

#[tokio::test]
async fn scenario_2_one_lost_chunk_recovers_via_basic_4_parity() {
    let message = b"Lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod te.".repeat(4);
    let policy = FaultPolicy { always_drop_data_seqs: vec![2], ..FaultPolicy::clean() };
    let outcome = scenario::run(&message, ProtocolTag::Normal, false, scheme::BASIC_4, policy, 2).await;
    assert_eq!(only_delivered(&outcome), Some(&DeliveredPayload::Text(message.clone())));
}

#[tokio::test]
async fn scenario_3_three_losses_within_a_group_recover_under_strong_overlapping() {
    let message = serde_like_json_payload();
    // STRONG_OVERLAPPING_3 groups chunks 3 at a time with primary+secondary+
    // tertiary parity, so a main group of (1,3) can absorb all 3 losses.
    let policy = FaultPolicy { always_drop_data_seqs: vec![1, 2, 3], ..FaultPolicy::clean() };
    let outcome =
        scenario::run(&message, ProtocolTag::Normal, true, scheme::STRONG_OVERLAPPING_3, policy, 3)
            .await;
    assert_eq!(only_delivered(&outcome), Some(&DeliveredPayload::Text(message)));
}

#[tokio::test]
async fn scenario_4_two_adjacent_losses_crossing_a_group_boundary_recover_via_overlap() {
    let message = b"x".repeat(10_000);
    // OVERLAPPING_3 with group_size 3: main groups are (1,3),(4,6),...
    // Losing seq 3 and seq 4 crosses that boundary; each is independently
    // the sole loss in its own main group, and overlap groups like (3,5)
    // cover the same span as a second recovery path.
    let policy = FaultPolicy { always_drop_data_seqs: vec![3, 4], ..FaultPolicy::clean() };
    let outcome =
        scenario::run(&message, ProtocolTag::Normal, true, scheme::OVERLAPPING_3, policy, 4).await;
    assert_eq!(only_delivered(&outcome), Some(&DeliveredPayload::Text(message)));
}

#[tokio::test]
async fn scenario_5_corrupted_hash_aborts_without_delivering() {
    // A corrupted START hash can't be expressed through the fault-injection
    // transport (it only drops/duplicates real frames), so this exercises
    // the receiver directly, matching the table's own framing: "hash
    // deliberately corrupted in START".
    let message = b"short payload";
    let total = sonicframe_proto::codec::chunk(message, sonicframe_proto::CHUNK_SIZE).len() as u32;

    let mut table: SessionTable<std::time::Instant> = SessionTable::new();
    let now = std::time::Instant::now();
    let start = sonicframe_proto::packet::Packet::Start {
        sid: "sid-corrupt".to_string(),
        hash: "not-the-real-hash=======".to_string(),
        total,
        flags: sonicframe_proto::packet::StartFlags::default(),
    }
    .encode();
    table.on_frame(&start, now, &ProtocolTag::Normal);

    let mut events = Vec::new();
    for (i, chunk) in sonicframe_proto::codec::chunk(message, sonicframe_proto::CHUNK_SIZE)
        .iter()
        .enumerate()
    {
        let wire = sonicframe_proto::packet::Packet::Data {
            sid: "sid-corrupt".to_string(),
            seq: i as u32 + 1,
            payload: chunk.to_vec(),
        }
        .encode();
        events.extend(table.on_frame(&wire, now, &ProtocolTag::Normal));
    }

    assert_eq!(
        events,
        vec![ReceiverEvent::Aborted {
            sid: "sid-corrupt".to_string(),
            reason: "hash mismatch".to_string(),
        }]
    );
}

#[tokio::test]
async fn scenario_6_direct_file_frame_bypasses_text_delivery() {
    let mut table: SessionTable<std::time::Instant> = SessionTable::new();
    let events = table.on_frame("FILE:b-1:a.zip:AAAA", std::time::Instant::now(), &ProtocolTag::Normal);

    assert_eq!(events.len(), 1);
    match &events[0] {
        ReceiverEvent::Delivered { payload: DeliveredPayload::File { batch_id, .. }, .. } => {
            assert_eq!(batch_id, "b-1");
        },
        other => panic!("expected a File delivery, got {other:?}"),
    }
}

fn serde_like_json_payload() -> Vec<u8> {
    let mut out = String::from(r#"{"records":["#);
    for i in 0..60 {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!(r#"{{"id":{i},"name":"entry-{i}","active":true}}"#));
    }
    out.push_str("]}");
    out.into_bytes()
}
