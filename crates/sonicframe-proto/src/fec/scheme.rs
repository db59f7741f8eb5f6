//! The closed set of FEC scheme descriptors and their wire tokens.
//!
//! Wire compatibility depends on these exact tokens never changing — see
//! `spec.md` §3 ("Implementations MUST preserve these exact tokens").

/// Immutable descriptor for one FEC scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FecScheme {
    /// Wire token, e.g. `"STRONG_OVERLAPPING_3"`.
    pub name: &'static str,
    /// Size of each group (and, for overlapping schemes, the stride between
    /// main-group starts). `0` disables FEC entirely.
    pub group_size: u32,
    /// Number of parity symbols generated per main group (`0..=3`).
    pub parity_count: u8,
    /// Whether this scheme uses the two-phase overlapping group layout.
    pub overlap: bool,
}

/// FEC disabled.
pub const NONE: FecScheme = FecScheme { name: "NONE", group_size: 0, parity_count: 0, overlap: false };

/// Non-overlapping groups of 2 chunks, single (primary) parity.
pub const BASIC_2: FecScheme =
    FecScheme { name: "BASIC_2", group_size: 2, parity_count: 1, overlap: false };

/// Non-overlapping groups of 4 chunks, single (primary) parity.
pub const BASIC_4: FecScheme =
    FecScheme { name: "BASIC_4", group_size: 4, parity_count: 1, overlap: false };

/// Overlapping groups of 3 chunks, primary parity only.
pub const OVERLAPPING_3: FecScheme =
    FecScheme { name: "OVERLAPPING_3", group_size: 3, parity_count: 1, overlap: true };

/// Overlapping groups of 3 chunks, primary + secondary + tertiary parity on
/// every main group.
pub const STRONG_OVERLAPPING_3: FecScheme =
    FecScheme { name: "STRONG_OVERLAPPING_3", group_size: 3, parity_count: 3, overlap: true };

/// The default scheme used when a `START` packet's flags omit `F{SCHEME}`
/// or name a scheme token this build doesn't recognize (§4.4).
pub const DEFAULT: FecScheme = STRONG_OVERLAPPING_3;

/// Every scheme this build understands, in no particular order.
pub const REGISTRY: &[FecScheme] = &[NONE, BASIC_2, BASIC_4, OVERLAPPING_3, STRONG_OVERLAPPING_3];

/// Look up a scheme by its wire token.
#[must_use]
pub fn lookup(name: &str) -> Option<FecScheme> {
    REGISTRY.iter().copied().find(|s| s.name == name)
}

/// Resolve a wire token to a scheme, falling back to [`DEFAULT`] when the
/// token is absent or unrecognized — the "Recover" policy for an unknown
/// `F{SCHEME}` token (§7).
#[must_use]
pub fn resolve_or_default(name: Option<&str>) -> FecScheme {
    name.and_then(lookup).unwrap_or(DEFAULT)
}
