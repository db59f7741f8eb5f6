//! Deterministic FEC group-layout generator.
//!
//! This is a pure function of `(total, scheme)` (invariant I3): the sender
//! and receiver both call it and must get byte-for-byte the same sequence,
//! including the overlapping scheme's `oIndex`-always-increments quirk
//! (§4.2, property P3).

use super::scheme::FecScheme;

/// One entry in the emission-ordered group plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// First chunk sequence number in the group (inclusive, 1-based).
    pub start: u32,
    /// Last chunk sequence number in the group (inclusive).
    pub end: u32,
    /// Parity type suffix: `"0"`, `"1"`, `"2"`, or `"O{i}"`.
    pub parity_type: String,
}

impl PlanEntry {
    /// Canonical parity id for this entry, `"{start}-{end}-{type}"`.
    #[must_use]
    pub fn parity_id(&self) -> String {
        format!("{}-{}-{}", self.start, self.end, self.parity_type)
    }
}

/// Generate the group plan for `total` chunks under `scheme`, in the exact
/// order packets are emitted on the wire.
#[must_use]
pub fn group_plan(total: u32, scheme: &FecScheme) -> Vec<PlanEntry> {
    if scheme.group_size == 0 || total == 0 {
        return Vec::new();
    }

    if scheme.overlap {
        overlapping_plan(total, scheme)
    } else {
        standard_plan(total, scheme)
    }
}

fn standard_plan(total: u32, scheme: &FecScheme) -> Vec<PlanEntry> {
    let mut entries = Vec::new();
    let mut i = 0u32;
    while i < total {
        let start = i + 1;
        let end = (i + scheme.group_size).min(total);
        for p in 0..scheme.parity_count {
            entries.push(PlanEntry { start, end, parity_type: p.to_string() });
        }
        i += scheme.group_size;
    }
    entries
}

fn overlapping_plan(total: u32, scheme: &FecScheme) -> Vec<PlanEntry> {
    let mut entries = Vec::new();
    let mut seen = std::collections::HashSet::new();

    // Phase 1: main groups, type "0" (plus "1"/"2" for strong schemes).
    let mut start = 1u32;
    while start <= total {
        let end = (start + scheme.group_size - 1).min(total);
        seen.insert((start, end));
        for p in 0..scheme.parity_count {
            entries.push(PlanEntry { start, end, parity_type: p.to_string() });
        }
        start += scheme.group_size;
    }

    // Phase 2: overlapping groups, type "O{i}". `o_index` increments on
    // every candidate `i`, whether or not it was actually emitted — this
    // quirk must be reproduced exactly so sender and receiver agree on ids.
    let mut o_index = 0u32;
    let mut i = 2u32;
    while i + scheme.group_size - 1 <= total {
        let end = i + scheme.group_size - 1;
        let candidate = (i, end);
        if !seen.contains(&candidate) {
            entries.push(PlanEntry { start: i, end, parity_type: format!("O{o_index}") });
        }
        o_index += 1;
        i += 1;
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fec::scheme;

    #[test]
    fn none_scheme_has_no_plan() {
        assert!(group_plan(10, &scheme::NONE).is_empty());
    }

    #[test]
    fn basic_4_groups_of_four_single_parity() {
        let plan = group_plan(10, &scheme::BASIC_4);
        let groups: Vec<(u32, u32, String)> =
            plan.into_iter().map(|e| (e.start, e.end, e.parity_type)).collect();
        assert_eq!(
            groups,
            vec![
                (1, 4, "0".to_string()),
                (5, 8, "0".to_string()),
                (9, 10, "0".to_string()),
            ]
        );
    }

    #[test]
    fn overlapping_3_main_groups_and_overlap_quirk() {
        // total = 7: main groups (1,3),(4,6),(7,7) [seen].
        // overlap phase i=2..=5 (i+2<=7):
        //   i=2 -> (2,4) not seen -> O0
        //   i=3 -> (3,5) not seen -> O1
        //   i=4 -> (4,6) seen -> skipped, oIndex still advances to 2 (unused)
        //   i=5 -> (5,7) not seen -> O3 (oIndex incremented unconditionally)
        let plan = group_plan(7, &scheme::OVERLAPPING_3);
        let main: Vec<(u32, u32, String)> = plan
            .iter()
            .filter(|e| e.parity_type == "0")
            .map(|e| (e.start, e.end, e.parity_type.clone()))
            .collect();
        assert_eq!(
            main,
            vec![(1, 3, "0".to_string()), (4, 6, "0".to_string()), (7, 7, "0".to_string())]
        );

        let overlap: Vec<(u32, u32, String)> = plan
            .iter()
            .filter(|e| e.parity_type.starts_with('O'))
            .map(|e| (e.start, e.end, e.parity_type.clone()))
            .collect();
        assert_eq!(
            overlap,
            vec![
                (2, 4, "O0".to_string()),
                (3, 5, "O1".to_string()),
                (5, 7, "O3".to_string()),
            ]
        );
    }

    #[test]
    fn strong_overlapping_emits_three_parities_per_main_group() {
        let plan = group_plan(6, &scheme::STRONG_OVERLAPPING_3);
        let main_group_one: Vec<&PlanEntry> =
            plan.iter().filter(|e| e.start == 1 && e.end == 3).collect();
        let types: Vec<&str> = main_group_one.iter().map(|e| e.parity_type.as_str()).collect();
        assert_eq!(types, vec!["0", "1", "2"]);
    }

    #[test]
    fn plan_is_pure_function_of_total_and_scheme() {
        let a = group_plan(37, &scheme::STRONG_OVERLAPPING_3);
        let b = group_plan(37, &scheme::STRONG_OVERLAPPING_3);
        assert_eq!(a, b);
    }
}
