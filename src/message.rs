//! The top of the node model: an ordered list of segments sharing a single
//! set of encoding characters.
//!
//! A `Message` is a value: cloning shares all storage, and the first
//! mutation through any accessor deep-copies only the touched path.

use crate::fields::{Field, Presence};
use crate::parser::{Parser, ParserConfig};
use crate::segments::Segment;
use crate::separators::Separators;
use crate::Hl7ParseError;
use std::convert::TryFrom;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

/// The versions a message header may declare.
pub const KNOWN_VERSIONS: [&str; 11] = [
    "2.1", "2.2", "2.3", "2.3.1", "2.4", "2.5", "2.5.1", "2.6", "2.7", "2.7.1", "2.8",
];

/// An entire HL7 message parsed into its constituent segments, fields,
/// repeats, components and subcomponents.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    separators: Separators,
    segments: Arc<Vec<Segment>>,
}

impl Message {
    pub(crate) fn from_parts(separators: Separators, segments: Vec<Segment>) -> Message {
        Message {
            separators,
            segments: Arc::new(segments),
        }
    }

    /// The separators this message was parsed (and will be serialized) with.
    pub fn separators(&self) -> &Separators {
        &self.separators
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// First segment with the given id.
    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id().as_str() == id)
    }

    /// All segments with the given id, in source order.
    pub fn segments_by_id(&self, id: &str) -> Vec<&Segment> {
        self.segments.iter().filter(|s| s.id().as_str() == id).collect()
    }

    /// The message header segment.  Present on every well-formed message.
    pub fn msh(&self) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id().as_str() == "MSH")
    }

    /// Checked 1-based field access on the first segment with `id`.
    pub fn field(&self, segment_id: &str, index: usize) -> Presence<&Field> {
        match self.segment(segment_id) {
            Some(segment) => segment.field(index),
            None => Presence::Absent,
        }
    }

    fn msh_token(&self, field: usize, component: usize) -> Option<&str> {
        self.msh()?
            .field(field)
            .as_option()?
            .component(component)
            .as_option()?
            .as_str()
    }

    /// MSH-9 component 1, e.g. `ADT`.
    pub fn message_type(&self) -> Option<&str> {
        self.msh_token(9, 1)
    }

    /// MSH-9 component 2, e.g. `A01`.
    pub fn trigger_event(&self) -> Option<&str> {
        self.msh_token(9, 2)
    }

    /// MSH-10.
    pub fn control_id(&self) -> Option<&str> {
        self.msh_token(10, 1)
    }

    /// MSH-11.
    pub fn processing_id(&self) -> Option<&str> {
        self.msh_token(11, 1)
    }

    /// MSH-12.
    pub fn version(&self) -> Option<&str> {
        self.msh_token(12, 1)
    }

    /// MSH-18, first repetition.  Messages carrying several charsets are
    /// decoded with the first one only.
    pub fn charset(&self) -> Option<&str> {
        let field = self.msh()?.field(18).as_option()?;
        field.first().component(1).as_option()?.as_str()
    }

    /// Whether MSH-12 declares one of the supported versions.
    pub fn has_known_version(&self) -> bool {
        match self.version() {
            Some(v) => KNOWN_VERSIONS.contains(&v),
            None => false,
        }
    }

    /// Append a segment, cloning shared storage first.
    pub fn push_segment(&mut self, segment: Segment) {
        Arc::make_mut(&mut self.segments).push(segment);
    }

    /// Mutable access to a segment by 0-based position, cloning shared
    /// storage first.
    pub fn segment_mut(&mut self, index: usize) -> Option<&mut Segment> {
        Arc::make_mut(&mut self.segments).get_mut(index)
    }

    /// True when both messages still share the same backing storage, i.e.
    /// neither side has been mutated since the clone.
    pub fn shares_storage(&self, other: &Message) -> bool {
        Arc::ptr_eq(&self.segments, &other.segments)
    }
}

impl TryFrom<&str> for Message {
    type Error = Hl7ParseError;

    /// Parse with the default configuration, discarding diagnostics.
    fn try_from(source: &str) -> Result<Self, Self::Error> {
        let (message, _) = Parser::parse_str(source, &ParserConfig::default())?;
        Ok(message)
    }
}

impl FromStr for Message {
    type Err = Hl7ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Message::try_from(source)
    }
}

impl Display for Message {
    /// Serializes back to wire form; see [`crate::serializer`].
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::serializer::serialize(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MSH|^~\\&|GHH LAB|ELAB-3|GHH OE|BLDG4|200202150930||ORU^R01|CNTRL-3456|P|2.4\rOBR|1|845439^GHH OE|55|15545^GLUCOSE";

    #[test]
    fn ensure_segments_are_added() -> Result<(), Hl7ParseError> {
        let msg = Message::try_from(SAMPLE)?;
        assert_eq!(msg.segment_count(), 2);
        Ok(())
    }

    #[test]
    fn ensure_segments_are_found_by_id() -> Result<(), Hl7ParseError> {
        let msg = Message::try_from(SAMPLE)?;
        assert_eq!(msg.segments_by_id("OBR").len(), 1);
        assert!(msg.segment("PID").is_none());
        Ok(())
    }

    #[test]
    fn ensure_msh_is_returned() -> Result<(), Hl7ParseError> {
        let msg = Message::try_from(SAMPLE)?;
        assert_eq!(msg.msh().unwrap().field_raw(1, msg.separators()), "|");
        Ok(())
    }

    #[test]
    fn ensure_header_accessors_read_msh() -> Result<(), Hl7ParseError> {
        let msg = Message::try_from(SAMPLE)?;
        assert_eq!(msg.message_type(), Some("ORU"));
        assert_eq!(msg.trigger_event(), Some("R01"));
        assert_eq!(msg.control_id(), Some("CNTRL-3456"));
        assert_eq!(msg.processing_id(), Some("P"));
        assert_eq!(msg.version(), Some("2.4"));
        assert!(msg.has_known_version());
        assert_eq!(msg.charset(), None);
        Ok(())
    }

    #[test]
    fn ensure_field_accessor_spans_segments() -> Result<(), Hl7ParseError> {
        let msg = Message::try_from(SAMPLE)?;
        let field = msg.field("OBR", 2).as_option().unwrap();
        assert_eq!(field.component(2).as_option().unwrap().as_str(), Some("GHH OE"));
        assert!(msg.field("PID", 1).is_absent());
        Ok(())
    }

    #[test]
    fn clones_share_storage_until_mutated() -> Result<(), Hl7ParseError> {
        let original = Message::try_from(SAMPLE)?;
        let clone = original.clone();
        assert!(original.shares_storage(&clone));

        let mut mutated = clone.clone();
        mutated.push_segment(Segment::parse("NTE|1||note", original.separators()));
        assert!(!original.shares_storage(&mutated));
        assert_eq!(original.segment_count(), 2);
        assert_eq!(mutated.segment_count(), 3);
        Ok(())
    }

    #[test]
    fn display_round_trips_wire_form() -> Result<(), Hl7ParseError> {
        let msg = Message::try_from(SAMPLE)?;
        assert_eq!(msg.to_string(), SAMPLE);
        Ok(())
    }
}
