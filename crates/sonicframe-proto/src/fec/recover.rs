//! FEC recovery solver: XOR (1 missing), 2×2 and 3×3 real-arithmetic solves
//! (2/3 missing), and the aggressive single-parity fallback (§4.2).
//!
//! # Open question
//!
//! The spec requires the 2×2/3×3 recovery to be evaluated as a real-number
//! linear system with rounding and masking to bytes, rather than a true
//! GF(256) erasure code — this is the literal (and admittedly non-field)
//! wire behaviour being preserved, not a bug. See `DESIGN.md` for the exact
//! recipe chosen here (the original reference implementation was not
//! available to copy verbatim).

use std::collections::HashMap;

use super::parity::{mix, pad, strip_trailing_zeros, weight};
use super::FecError;

/// Parity bytes available for one group, keyed by raw type token (`"0"`,
/// `"1"`, `"2"`, or `"O{i}"`).
pub type GroupParity<'a> = HashMap<String, &'a Vec<u8>>;

fn primary_like<'a>(parity: &GroupParity<'a>) -> Option<&'a Vec<u8>> {
    parity
        .get("0")
        .copied()
        .or_else(|| parity.iter().find(|(k, _)| k.starts_with('O')).map(|(_, v)| *v))
}

/// Round a real accumulator value to the nearest byte, wrapping modulo 256
/// (the "masking to bytes" step).
fn round_to_byte(x: f64) -> u8 {
    let rounded = x.round() as i64;
    rounded.rem_euclid(256) as u8
}

/// Attempt to recover the missing chunks of a single group `[start, end]`.
///
/// `chunks` holds whatever chunks are currently known (unpadded, original
/// length); `parity` holds whatever parity this group has. Returns newly
/// recovered `(seq, bytes)` pairs (trailing zeros already stripped) — it
/// does not mutate `chunks` itself, so the caller controls when to merge —
/// plus any [`FecError`]s hit along the way. An error never withholds the
/// recovered bytes; it only reports that the result is degraded (§4.2).
#[must_use]
pub fn recover_group(
    start: u32,
    end: u32,
    chunks: &HashMap<u32, Vec<u8>>,
    parity: &GroupParity<'_>,
    chunk_size: usize,
) -> (Vec<(u32, Vec<u8>)>, Vec<FecError>) {
    let mut missing: Vec<u32> = (start..=end).filter(|s| !chunks.contains_key(s)).collect();
    missing.sort_unstable();

    match missing.len() {
        0 => (Vec::new(), Vec::new()),
        1 => (
            recover_one(start, end, missing[0], chunks, parity, chunk_size).into_iter().collect(),
            Vec::new(),
        ),
        2 => (
            recover_two(start, end, missing[0], missing[1], chunks, parity, chunk_size)
                .unwrap_or_default(),
            Vec::new(),
        ),
        3 => recover_three(
            start,
            end,
            missing[0],
            missing[1],
            missing[2],
            chunks,
            parity,
            chunk_size,
        ),
        _ => (Vec::new(), Vec::new()),
    }
}

fn present_members(
    start: u32,
    end: u32,
    chunks: &HashMap<u32, Vec<u8>>,
) -> Vec<(u32, Vec<u8>)> {
    (start..=end)
        .filter_map(|s| chunks.get(&s).map(|b| (s, b.clone())))
        .collect()
}

fn recover_one(
    start: u32,
    end: u32,
    missing_seq: u32,
    chunks: &HashMap<u32, Vec<u8>>,
    parity: &GroupParity<'_>,
    chunk_size: usize,
) -> Option<(u32, Vec<u8>)> {
    let primary = primary_like(parity)?;
    let mut acc = (**primary).clone();
    for (_, bytes) in present_members(start, end, chunks) {
        let padded = pad(&bytes, chunk_size);
        for (a, b) in acc.iter_mut().zip(padded.iter()) {
            *a ^= b;
        }
    }
    Some((missing_seq, strip_trailing_zeros(acc)))
}

fn recover_two(
    start: u32,
    end: u32,
    m1: u32,
    m2: u32,
    chunks: &HashMap<u32, Vec<u8>>,
    parity: &GroupParity<'_>,
    chunk_size: usize,
) -> Option<Vec<(u32, Vec<u8>)>> {
    let primary = primary_like(parity)?;
    let secondary = parity.get("1")?;

    let w1 = weight(m1, start) as f64;
    let w2 = weight(m2, start) as f64;
    if (w2 - w1).abs() < f64::EPSILON {
        return None;
    }

    let present = present_members(start, end, chunks);

    let mut c1 = vec![0u8; chunk_size];
    let mut c2 = vec![0u8; chunk_size];
    for j in 0..chunk_size {
        let mut r0 = f64::from(primary[j]);
        let mut r1 = f64::from(secondary[j]);
        for (seq, bytes) in &present {
            let padded = pad(bytes, chunk_size);
            let w = weight(*seq, start);
            r0 -= f64::from(padded[j]);
            // residual uses XOR in the real implementation but per the
            // spec's literal recipe is treated as real subtraction here.
            r1 -= f64::from(mix(padded[j], w));
        }

        let solved_c2 = (r1 - w1 * r0) / (w2 - w1);
        let solved_c1 = r0 - solved_c2;
        c1[j] = round_to_byte(solved_c1);
        c2[j] = round_to_byte(solved_c2);
    }

    Some(vec![(m1, strip_trailing_zeros(c1)), (m2, strip_trailing_zeros(c2))])
}

fn recover_three(
    start: u32,
    end: u32,
    m1: u32,
    m2: u32,
    m3: u32,
    chunks: &HashMap<u32, Vec<u8>>,
    parity: &GroupParity<'_>,
    chunk_size: usize,
) -> (Vec<(u32, Vec<u8>)>, Vec<FecError>) {
    let (Some(primary), Some(secondary), Some(tertiary)) =
        (primary_like(parity), parity.get("1"), parity.get("2"))
    else {
        return (Vec::new(), Vec::new());
    };

    let present = present_members(start, end, chunks);
    let missing = [m1, m2, m3];
    let weights: Vec<f64> = missing.iter().map(|s| weight(*s, start) as f64).collect();

    let mut solved = vec![vec![0u8; chunk_size]; 3];
    let mut singular_once = false;

    for j in 0..chunk_size {
        let mut r = [f64::from(primary[j]), f64::from(secondary[j]), f64::from(tertiary[j])];
        for (seq, bytes) in &present {
            let padded = pad(bytes, chunk_size);
            let w = weight(*seq, start);
            r[0] -= f64::from(padded[j]);
            r[1] -= f64::from(mix(padded[j], w));
            r[2] -= f64::from(mix(padded[j], w.pow(2)));
        }

        // Vandermonde-style system: row k is w_i^k for each missing index i.
        let matrix = [
            [1.0, 1.0, 1.0],
            [weights[0], weights[1], weights[2]],
            [weights[0] * weights[0], weights[1] * weights[1], weights[2] * weights[2]],
        ];

        match gaussian_solve(matrix, r) {
            Some(c) => {
                for i in 0..3 {
                    solved[i][j] = round_to_byte(c[i]);
                }
            },
            None => {
                // Singular matrix: fall back to the raw (primary, secondary,
                // tertiary) byte values, per §4.2.
                singular_once = true;
                solved[0][j] = primary[j];
                solved[1][j] = secondary[j];
                solved[2][j] = tertiary[j];
            },
        }
    }

    let recovered = missing
        .into_iter()
        .zip(solved)
        .map(|(seq, bytes)| (seq, strip_trailing_zeros(bytes)))
        .collect();
    let errors = if singular_once { vec![FecError::SingularGroup { start, end }] } else { Vec::new() };
    (recovered, errors)
}

/// Solve a 3x3 real linear system via Gaussian elimination with partial
/// pivoting. Returns `None` if the matrix is numerically singular.
fn gaussian_solve(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let mut pivot = col;
        for row in (col + 1)..3 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-6 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let diag = a[col][col];
        for k in col..3 {
            a[col][k] /= diag;
        }
        b[col] /= diag;

        for row in 0..3 {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor != 0.0 {
                for k in col..3 {
                    a[row][k] -= factor * a[col][k];
                }
                b[row] -= factor * b[col];
            }
        }
    }
    Some(b)
}
