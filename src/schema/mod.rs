//! The structure database: segment definitions and message-group schemas
//! for HL7 versions 2.1 through 2.8.
//!
//! Catalogs are append-only static tables.  Lookups fall back to the
//! nearest older version when a version has no entry of its own, which is
//! how the thin 2.x point releases inherit the 2.5 workhorse tables.

pub mod segments;
pub mod structures;

use std::fmt;
use std::str::FromStr;

/// The HL7 v2.x versions a header may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    V2_1,
    V2_2,
    V2_3,
    V2_3_1,
    V2_4,
    V2_5,
    V2_5_1,
    V2_6,
    V2_7,
    V2_7_1,
    V2_8,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V2_1 => "2.1",
            Version::V2_2 => "2.2",
            Version::V2_3 => "2.3",
            Version::V2_3_1 => "2.3.1",
            Version::V2_4 => "2.4",
            Version::V2_5 => "2.5",
            Version::V2_5_1 => "2.5.1",
            Version::V2_6 => "2.6",
            Version::V2_7 => "2.7",
            Version::V2_7_1 => "2.7.1",
            Version::V2_8 => "2.8",
        }
    }

    /// The next older version, the fallback chain for catalog lookups.
    pub fn prior(&self) -> Option<Version> {
        use Version::*;
        match self {
            V2_1 => None,
            V2_2 => Some(V2_1),
            V2_3 => Some(V2_2),
            V2_3_1 => Some(V2_3),
            V2_4 => Some(V2_3_1),
            V2_5 => Some(V2_4),
            V2_5_1 => Some(V2_5),
            V2_6 => Some(V2_5_1),
            V2_7 => Some(V2_6),
            V2_7_1 => Some(V2_7),
            V2_8 => Some(V2_7_1),
        }
    }

    pub fn all() -> &'static [Version] {
        use Version::*;
        static ALL: [Version; 11] = [V2_1, V2_2, V2_3, V2_3_1, V2_4, V2_5, V2_5_1, V2_6, V2_7, V2_7_1, V2_8];
        &ALL
    }
}

impl FromStr for Version {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let version = match s {
            "2.1" => Version::V2_1,
            "2.2" => Version::V2_2,
            "2.3" => Version::V2_3,
            "2.3.1" => Version::V2_3_1,
            "2.4" => Version::V2_4,
            "2.5" => Version::V2_5,
            "2.5.1" => Version::V2_5_1,
            "2.6" => Version::V2_6,
            "2.7" => Version::V2_7,
            "2.7.1" => Version::V2_7_1,
            "2.8" => Version::V2_8,
            _ => return Err(()),
        };
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Field and segment usage codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// `R` - must be present.
    Required,
    /// `O` - may be present.
    Optional,
    /// `C` - required under a condition the profile states.
    Conditional,
    /// `X` - must not be present.
    NotSupported,
    /// `B` - retained for backward compatibility only.
    Backward,
}

impl Usage {
    pub fn code(&self) -> char {
        match self {
            Usage::Required => 'R',
            Usage::Optional => 'O',
            Usage::Conditional => 'C',
            Usage::NotSupported => 'X',
            Usage::Backward => 'B',
        }
    }
}

/// `min..max` occurrence bounds; `max: None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub min: u32,
    pub max: Option<u32>,
}

impl Cardinality {
    pub const fn once() -> Cardinality {
        Cardinality { min: 1, max: Some(1) }
    }

    pub const fn optional() -> Cardinality {
        Cardinality { min: 0, max: Some(1) }
    }

    pub const fn many() -> Cardinality {
        Cardinality { min: 0, max: None }
    }

    pub const fn at_least_one() -> Cardinality {
        Cardinality { min: 1, max: None }
    }

    pub const fn bounded(min: u32, max: u32) -> Cardinality {
        Cardinality { min, max: Some(max) }
    }

    pub fn contains(&self, n: u32) -> bool {
        n >= self.min && self.max.map(|max| n <= max).unwrap_or(true)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}

/// How strictly a coded field is bound to its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStrength {
    /// Codes outside the table are errors.
    Required,
    /// Codes outside the table are warnings.
    Extensible,
    /// Codes outside the table are warnings.
    Preferred,
    /// The table is illustrative only; warnings.
    Example,
}

/// A value-set binding on a coded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableBinding {
    /// HL7 table number, e.g. 1 for administrative sex.
    pub table: u16,
    pub strength: BindingStrength,
}

/// One field position in a segment definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    /// Data-type code, e.g. `ST`, `CX`, `XPN`, `DTM`.
    pub datatype: &'static str,
    pub usage: Usage,
    pub cardinality: Cardinality,
    /// Maximum length in characters; zero when the standard leaves it open.
    pub max_length: u32,
    pub binding: Option<TableBinding>,
}

/// A segment definition: the ordered field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDef {
    pub id: &'static str,
    pub fields: &'static [FieldDef],
}

impl SegmentDef {
    /// 1-based field definition lookup.
    pub fn field(&self, index: usize) -> Option<&FieldDef> {
        if index == 0 {
            return None;
        }
        self.fields.get(index - 1)
    }
}

/// A node of a message-group schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureItem {
    /// A segment reference with usage and cardinality.
    Segment {
        id: &'static str,
        usage: Usage,
        cardinality: Cardinality,
    },
    /// A named group of items that may itself repeat.
    Group {
        name: &'static str,
        cardinality: Cardinality,
        items: &'static [StructureItem],
    },
}

/// An ordered message-group schema for one message type / trigger pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageStructure {
    /// e.g. `ADT_A01`.
    pub id: &'static str,
    pub message_type: &'static str,
    pub trigger_event: &'static str,
    pub items: &'static [StructureItem],
}

/// Look up a segment definition, walking the fallback chain.  The second
/// element is the version whose catalog actually supplied the entry.
pub fn segment_def(version: Version, id: &str) -> Option<(&'static SegmentDef, Version)> {
    let mut cursor = Some(version);
    while let Some(v) = cursor {
        if let Some(def) = segments::catalog(v).iter().find(|d| d.id == id) {
            return Some((def, v));
        }
        cursor = v.prior();
    }
    None
}

/// Look up a message structure, walking the fallback chain.
pub fn message_structure(
    version: Version,
    message_type: &str,
    trigger_event: &str,
) -> Option<(&'static MessageStructure, Version)> {
    let mut cursor = Some(version);
    while let Some(v) = cursor {
        if let Some(structure) = structures::catalog(v)
            .iter()
            .find(|s| s.message_type == message_type && s.trigger_event == trigger_event)
        {
            return Some((structure, v));
        }
        cursor = v.prior();
    }
    None
}

/// The codes of an HL7 table, for value-set validation.
pub fn table_values(table: u16) -> Option<&'static [&'static str]> {
    let values: &'static [&'static str] = match table {
        // Administrative sex
        1 => &["A", "F", "M", "N", "O", "U"],
        // Event type (the triggers this crate ships templates for)
        3 => &["A01", "A02", "A03", "A04", "A08", "O01", "R01"],
        // Acknowledgment code
        8 => &["AA", "AE", "AR", "CA", "CE", "CR"],
        // Message type
        76 => &["ACK", "ADT", "BAR", "DFT", "MDM", "ORM", "ORU", "QRY", "RAS", "RDE", "SIU", "VXU"],
        // Processing id
        103 => &["D", "P", "T"],
        // Version id
        104 => &["2.1", "2.2", "2.3", "2.3.1", "2.4", "2.5", "2.5.1", "2.6", "2.7", "2.7.1", "2.8"],
        // Value type (OBX-2)
        125 => &["AD", "CE", "CF", "CK", "CN", "CP", "CX", "DT", "ED", "FT", "ID", "MO", "NM", "PN", "RP", "SN", "ST", "TM", "TN", "TS", "TX", "XAD", "XCN", "XON", "XPN", "XTN"],
        // Observation result status
        85 => &["C", "D", "F", "I", "N", "O", "P", "R", "S", "U", "W", "X"],
        _ => return None,
    };
    Some(values)
}
