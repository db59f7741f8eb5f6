//! Property tests for packet encode/decode and parity-id normalization (P9).

use proptest::prelude::*;
use sonicframe_proto::fec::{normalize_parity_id, parse_parity_id};
use sonicframe_proto::packet::{Packet, StartFlags};

proptest! {
    #[test]
    fn data_packet_roundtrips_through_wire_encoding(
        sid in "[a-zA-Z0-9-]{1,32}",
        seq in 1u32..1_000_000,
        payload in prop::collection::vec(any::<u8>(), 0..75),
    ) {
        let pkt = Packet::Data { sid, seq, payload };
        let wire = pkt.encode();
        prop_assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn parity_packet_roundtrips_through_wire_encoding(
        sid in "[a-zA-Z0-9-]{1,32}",
        start in 1u32..1000,
        span in 0u32..5,
        payload in prop::collection::vec(any::<u8>(), 0..75),
    ) {
        let parity_id = format!("{start}-{}-0", start + span);
        let pkt = Packet::Parity { sid, parity_id, payload };
        let wire = pkt.encode();
        prop_assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn start_packet_roundtrips_with_arbitrary_flags(
        sid in "[a-zA-Z0-9-]{1,32}",
        hash in "[A-Za-z0-9+/]{22}==",
        total in 1u32..10_000_000,
        compressed in any::<bool>(),
        scheme in prop::option::of("[A-Z0-9_]{3,24}"),
    ) {
        let pkt = Packet::Start {
            sid,
            hash,
            total,
            flags: StartFlags { compressed, fec_scheme: scheme },
        };
        let wire = pkt.encode();
        prop_assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn normalization_is_idempotent(start in 1u32..1000, end in 1u32..1000, ty in "[0-2]|O[0-9]{1,2}") {
        let raw = format!("{start}-{end}-{ty}");
        let once = normalize_parity_id(&raw);
        let twice = normalize_parity_id(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn two_field_id_normalizes_to_type_zero(start in 1u32..1000, end in 1u32..1000) {
        let raw = format!("{start}-{end}");
        let normalized = normalize_parity_id(&raw);
        prop_assert_eq!(parse_parity_id(&normalized), Some((start, end, "0".to_string())));
    }
}
