//! FEC engine: group layout, parity generation, and recovery (C4).

pub mod parity;
pub mod plan;
pub mod recover;
pub mod scheme;

use std::collections::{HashMap, HashSet};

pub use plan::{PlanEntry, group_plan};
pub use scheme::FecScheme;

/// Errors surfaced by the FEC recovery engine (§4.2).
///
/// Recovery never aborts a session by itself: [`recover_all`] returns every
/// error it hit alongside whatever bytes it could still recover, leaving
/// the decision of whether a degraded recovery is acceptable to the
/// receiver session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FecError {
    /// A group's 3x3 recovery system was numerically singular; the raw
    /// (unmixed) primary/secondary/tertiary parity bytes were used in
    /// place of a solved value for that group.
    #[error("FEC group [{start}, {end}] hit a singular 3x3 system; used raw parity fallback")]
    SingularGroup {
        /// First sequence number of the affected group.
        start: u32,
        /// Last sequence number of the affected group.
        end: u32,
    },
}

/// Normalize a parity id to canonical form: any `"{start}-{end}"` becomes
/// `"{start}-{end}-0"` (invariant I4).
#[must_use]
pub fn normalize_parity_id(raw: &str) -> String {
    match raw.splitn(3, '-').count() {
        2 => format!("{raw}-0"),
        _ => raw.to_string(),
    }
}

/// Parse a (already-normalized-or-not) parity id into its `(start, end,
/// type)` components.
#[must_use]
pub fn parse_parity_id(raw: &str) -> Option<(u32, u32, String)> {
    let normalized = normalize_parity_id(raw);
    let parts: Vec<&str> = normalized.splitn(3, '-').collect();
    if parts.len() != 3 {
        return None;
    }
    let start = parts[0].parse().ok()?;
    let end = parts[1].parse().ok()?;
    Some((start, end, parts[2].to_string()))
}

fn groups_from_parity_ids<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<(u32, u32)> {
    let mut groups: Vec<(u32, u32)> =
        ids.filter_map(|id| parse_parity_id(id)).map(|(s, e, _)| (s, e)).collect();
    groups.sort_unstable();
    groups.dedup();
    groups
}

fn parity_for_group<'a>(
    parity: &'a HashMap<String, Vec<u8>>,
    start: u32,
    end: u32,
) -> recover::GroupParity<'a> {
    let mut out = HashMap::new();
    for (id, bytes) in parity {
        if let Some((s, e, ty)) = parse_parity_id(id) {
            if s == start && e == end {
                out.insert(ty, bytes);
            }
        }
    }
    out
}

/// Run standard (plan-driven) FEC recovery passes to a fixpoint, then the
/// aggressive single-parity fallback pass (§4.2). Mutates `chunks` in
/// place with every chunk that becomes recoverable; idempotent and safe to
/// call after every newly arrived packet. Returns every [`FecError`] hit
/// along the way — recovery still proceeds with whatever it could solve.
#[must_use]
pub fn recover_all(
    total: u32,
    scheme: &FecScheme,
    chunks: &mut HashMap<u32, Vec<u8>>,
    parity: &HashMap<String, Vec<u8>>,
    chunk_size: usize,
) -> Vec<FecError> {
    let mut plan_groups: Vec<(u32, u32)> =
        group_plan(total, scheme).into_iter().map(|e| (e.start, e.end)).collect();
    plan_groups.sort_unstable();
    plan_groups.dedup();

    let mut errors = run_to_fixpoint(&plan_groups, chunks, parity, chunk_size);

    // Aggressive fallback: consider every group the receiver can derive
    // from parity ids it actually holds, regardless of the declared plan.
    let held_groups = groups_from_parity_ids(parity.keys());
    let in_range: Vec<(u32, u32)> =
        held_groups.into_iter().filter(|(s, e)| *s >= 1 && *e >= *s && *e <= total).collect();
    errors.extend(run_to_fixpoint(&in_range, chunks, parity, chunk_size));
    errors
}

fn run_to_fixpoint(
    groups: &[(u32, u32)],
    chunks: &mut HashMap<u32, Vec<u8>>,
    parity: &HashMap<String, Vec<u8>>,
    chunk_size: usize,
) -> Vec<FecError> {
    let mut errors = Vec::new();
    loop {
        let mut progressed = false;
        for &(start, end) in groups {
            let group_parity = parity_for_group(parity, start, end);
            let (recovered, group_errors) =
                recover::recover_group(start, end, chunks, &group_parity, chunk_size);
            errors.extend(group_errors);
            for (seq, bytes) in recovered {
                if chunks.insert(seq, bytes).is_none() {
                    progressed = true;
                }
            }
        }
        if !progressed {
            break;
        }
    }
    errors
}

/// All group keys (distinct `(start, end)` pairs) this group plan contains.
#[must_use]
pub fn distinct_groups(total: u32, scheme: &FecScheme) -> HashSet<(u32, u32)> {
    group_plan(total, scheme).into_iter().map(|e| (e.start, e.end)).collect()
}
