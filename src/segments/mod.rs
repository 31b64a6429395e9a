//! Segments: a three-character identifier plus an ordered list of fields.
//!
//! Field access is 1-based.  The header segments (MSH, and BHS/FHS in
//! batch files) use the special convention where field 1 is the field
//! separator itself and field 2 is the remaining encoding characters, so
//! real payload fields start at index 3 - exactly as they are counted on
//! the wire.

use crate::fields::{Field, Presence};
use crate::intern::{self, InternedId};
use crate::separators::Separators;
use std::fmt::Display;
use std::sync::Arc;

/// A single segment: one terminator-delimited line of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    id: InternedId,
    fields: Arc<Vec<Field>>,
}

impl Segment {
    /// Convert the given line of wire text into a segment.
    ///
    /// The caller decides what to do about non-standard ids; this only
    /// tokenizes.
    pub fn parse(input: &str, delims: &Separators) -> Segment {
        let mut parts = input.splitn(2, delims.field);
        let id_text = parts.next().unwrap_or("");
        let rest = parts.next();

        let id = intern::intern(id_text);
        let mut fields = Vec::new();

        if is_header_id(id.as_str()) {
            // MSH-1 is the field separator itself; MSH-2 is the remaining
            // encoding characters, stored literally so the delimiter chars
            // inside it are not tokenized.
            fields.push(Field::literal(delims.field.to_string()));
            if let Some(rest) = rest {
                let mut rest_parts = rest.splitn(2, delims.field);
                if let Some(encoding) = rest_parts.next() {
                    fields.push(Field::literal(encoding));
                }
                if let Some(payload) = rest_parts.next() {
                    fields.extend(payload.split(delims.field).map(|f| Field::parse(f, delims)));
                }
            }
        } else if let Some(rest) = rest {
            fields.extend(rest.split(delims.field).map(|f| Field::parse(f, delims)));
        }

        Segment {
            id,
            fields: Arc::new(fields),
        }
    }

    /// An empty segment with the given id.
    pub fn new(id: &str) -> Segment {
        Segment {
            id: intern::intern(id),
            fields: Arc::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &InternedId {
        &self.id
    }

    /// Whether the id belongs to the closed standard set.
    pub fn is_standard(&self) -> bool {
        self.id.is_standard()
    }

    /// Whether this is a message, batch or file header segment.
    pub fn is_header(&self) -> bool {
        is_header_id(self.id.as_str())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Checked 1-based field access.
    pub fn field(&self, index: usize) -> Presence<&Field> {
        if index == 0 || index > self.fields.len() {
            return Presence::Absent;
        }
        let field = &self.fields[index - 1];
        if field.is_empty() {
            Presence::Empty
        } else {
            Presence::Present(field)
        }
    }

    /// Raw wire text of a field, empty string for absent positions.
    pub fn field_raw(&self, index: usize, delims: &Separators) -> String {
        match self.field(index) {
            Presence::Present(f) => f.raw(delims),
            _ => String::new(),
        }
    }

    /// Replace (or grow to) the 1-based field, cloning shared storage
    /// first.
    pub fn set_field(&mut self, index: usize, field: Field) {
        assert!(index > 0, "field indices are 1-based");
        let fields = Arc::make_mut(&mut self.fields);
        while fields.len() < index {
            fields.push(Field::parse("", &Separators::default()));
        }
        fields[index - 1] = field;
    }

    pub fn push_field(&mut self, field: Field) {
        Arc::make_mut(&mut self.fields).push(field);
    }

    /// Wire form of the whole segment under `delims`.
    pub fn to_wire(&self, delims: &Separators) -> String {
        let mut out = String::from(self.id.as_str());
        let skip = if self.is_header() { 1 } else { 0 };
        for field in self.fields.iter().skip(skip) {
            out.push(delims.field);
            out.push_str(&field.raw(delims));
        }
        out
    }

    pub fn shares_storage(&self, other: &Segment) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }
}

fn is_header_id(id: &str) -> bool {
    matches!(id, "MSH" | "BHS" | "FHS")
}

impl Display for Segment {
    /// Wire form under the default separators.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_wire(&Separators::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> Separators {
        Separators::default()
    }

    #[test]
    fn ensure_fields_are_added() {
        let seg = Segment::parse("SEG|field 1|field 2|field 3", &d());
        assert_eq!(seg.field_count(), 3);
        assert_eq!(seg.field_raw(2, &d()), "field 2");
    }

    #[test]
    fn ensure_msh_counts_fields_like_the_wire() {
        let seg = Segment::parse("MSH|^~\\&|SendApp|SendFac", &d());
        assert!(seg.is_header());
        assert_eq!(seg.field_raw(1, &d()), "|");
        assert_eq!(seg.field_raw(2, &d()), "^~\\&");
        assert_eq!(seg.field_raw(3, &d()), "SendApp");
        assert_eq!(seg.field_raw(4, &d()), "SendFac");
    }

    #[test]
    fn ensure_msh_round_trips() {
        let wire = "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5";
        let seg = Segment::parse(wire, &d());
        assert_eq!(seg.to_wire(&d()), wire);
    }

    #[test]
    fn ensure_plain_segments_round_trip() {
        let wire = "PID|||MRN123^^^Hospital^MR||Doe^John";
        let seg = Segment::parse(wire, &d());
        assert_eq!(seg.to_wire(&d()), wire);
    }

    #[test]
    fn ensure_bare_msh_parses() {
        let seg = Segment::parse("MSH|^~\\&", &d());
        assert_eq!(seg.field_count(), 2);
        assert_eq!(seg.to_wire(&d()), "MSH|^~\\&");
    }

    #[test]
    fn absent_and_empty_fields_are_distinct() {
        let seg = Segment::parse("PID|1||3", &d());
        assert!(seg.field(1).is_present());
        assert!(seg.field(2).is_empty());
        assert!(seg.field(3).is_present());
        assert!(seg.field(4).is_absent());
    }

    #[test]
    fn custom_ids_are_not_standard() {
        let seg = Segment::parse("ZZZ|custom|data", &d());
        assert!(!seg.is_standard());
        assert_eq!(seg.id().as_str(), "ZZZ");
    }

    #[test]
    fn set_field_triggers_copy_on_write() {
        let original = Segment::parse("PID|1|2|3", &d());
        let mut clone = original.clone();
        assert!(original.shares_storage(&clone));

        clone.set_field(2, Field::parse("two", &d()));
        assert!(!original.shares_storage(&clone));
        assert_eq!(original.field_raw(2, &d()), "2");
        assert_eq!(clone.field_raw(2, &d()), "two");
    }

    #[test]
    fn set_field_grows_with_empties() {
        let mut seg = Segment::new("ZZZ");
        seg.set_field(3, Field::parse("three", &d()));
        assert_eq!(seg.to_wire(&d()), "ZZZ|||three");
    }
}
