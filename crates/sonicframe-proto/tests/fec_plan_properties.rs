//! Property tests for the FEC group-plan generator (P3: determinism).

use proptest::prelude::*;
use sonicframe_proto::fec::{group_plan, scheme};

fn any_scheme() -> impl Strategy<Value = sonicframe_proto::fec::FecScheme> {
    prop_oneof![
        Just(scheme::NONE),
        Just(scheme::BASIC_2),
        Just(scheme::BASIC_4),
        Just(scheme::OVERLAPPING_3),
        Just(scheme::STRONG_OVERLAPPING_3),
    ]
}

proptest! {
    #[test]
    fn plan_is_deterministic(total in 0u32..500, scheme in any_scheme()) {
        let a = group_plan(total, &scheme);
        let b = group_plan(total, &scheme);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn every_main_group_entry_stays_within_total(total in 1u32..500, scheme in any_scheme()) {
        let plan = group_plan(total, &scheme);
        for entry in &plan {
            prop_assert!(entry.start >= 1);
            prop_assert!(entry.end <= total);
            prop_assert!(entry.start <= entry.end);
        }
    }

    #[test]
    fn main_groups_cover_every_chunk_at_least_once(total in 1u32..200, scheme in any_scheme()) {
        if scheme.group_size == 0 {
            return Ok(());
        }
        let plan = group_plan(total, &scheme);
        let mut covered = vec![false; (total + 1) as usize];
        for entry in plan.iter().filter(|e| e.parity_type == "0") {
            for s in entry.start..=entry.end {
                covered[s as usize] = true;
            }
        }
        for s in 1..=total {
            prop_assert!(covered[s as usize], "chunk {} not covered by any main group", s);
        }
    }

    #[test]
    fn parity_ids_are_unique_within_a_plan(total in 1u32..200, scheme in any_scheme()) {
        let plan = group_plan(total, &scheme);
        let mut ids: Vec<String> = plan.iter().map(|e| e.parity_id()).collect();
        let original_len = ids.len();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), original_len);
    }
}
