//! Interning of well-known segment identifiers.
//!
//! Standard segment ids are drawn from a closed set populated at compile
//! time.  Interning one returns a `'static` handle that compares by
//! identity; anything outside the set (custom Z-segments and friends)
//! falls back to owned storage.

use std::fmt;
use std::hash::{Hash, Hasher};

/// The closed set of standard segment identifiers, in alphabetical order.
///
/// Drawn from the HL7 v2.x segment tables common to versions 2.1 through 2.8.
static STANDARD_IDS: [&str; 62] = [
    "ACC", "ADD", "AIG", "AIL", "AIP", "AIS", "AL1", "APR", "ARQ", "BHS", "BLG", "BTS", "CON",
    "CTD", "CTI", "DG1", "DRG", "DSC", "DSP", "ERR", "EVN", "FHS", "FT1", "FTS", "GT1", "IAM",
    "IN1", "IN2", "IN3", "MRG", "MSA", "MSH", "NK1", "NTE", "OBR", "OBX", "ORC", "ORG", "PD1",
    "PDA", "PID", "PR1", "PRA", "PV1", "PV2", "QRD", "QRF", "RGS", "ROL", "RXA", "RXC", "RXD",
    "RXE", "RXG", "RXO", "RXR", "SCH", "SPM", "STF", "TQ1", "TQ2", "TXA",
];

/// Precomputed lookup into the closed set.  The match arms compile down to
/// a static decision tree, so membership checks stay O(1) with no runtime
/// table construction.
fn lookup(id: &str) -> Option<&'static str> {
    let bytes = id.as_bytes();
    if bytes.len() != 3 {
        return None;
    }
    // Binary search over the sorted table keeps this branch-predictable.
    STANDARD_IDS.binary_search(&id).ok().map(|i| STANDARD_IDS[i])
}

/// A segment identifier, either a handle into the closed standard set or
/// owned storage for custom ids.
///
/// `Known` handles point into static storage and compare by identity
/// before falling back to a byte compare, so equality checks against the
/// common ids are pointer comparisons.
#[derive(Debug, Clone)]
pub enum InternedId {
    Known(&'static str),
    Owned(String),
}

impl InternedId {
    pub fn as_str(&self) -> &str {
        match self {
            InternedId::Known(s) => s,
            InternedId::Owned(s) => s.as_str(),
        }
    }

    /// Whether this id is part of the closed standard set.
    pub fn is_standard(&self) -> bool {
        matches!(self, InternedId::Known(_))
    }
}

impl PartialEq for InternedId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Identity first: two Known handles are equal iff they are the
            // same static string.
            (InternedId::Known(a), InternedId::Known(b)) => std::ptr::eq(*a, *b) || a == b,
            _ => self.as_str() == other.as_str(),
        }
    }
}

impl Eq for InternedId {}

impl Hash for InternedId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialEq<&str> for InternedId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for InternedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Intern a segment id.  Standard ids come back as static handles; anything
/// else is copied into owned storage.
pub fn intern(id: &str) -> InternedId {
    match lookup(id) {
        Some(handle) => InternedId::Known(handle),
        None => InternedId::Owned(id.to_string()),
    }
}

/// Whether `id` belongs to the closed standard set.
pub fn is_standard(id: &str) -> bool {
    lookup(id).is_some()
}

/// The closed set itself, for schema and validator consumers.
pub fn standard_ids() -> &'static [&'static str] {
    &STANDARD_IDS
}
