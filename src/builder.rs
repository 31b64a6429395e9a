//! Fluent construction of messages.
//!
//! The builder writes straight through to the node model.  Plain-text
//! values are escaped automatically; `raw_` variants bypass escaping for
//! values that are already wire form.
//!
//! ```
//! use hl7v2_core::MessageBuilder;
//!
//! let message = MessageBuilder::new()
//!     .msh(|msh| {
//!         msh.sending_application("SendApp")
//!             .sending_facility("SendFac")
//!             .receiving_application("RecApp")
//!             .receiving_facility("RecFac")
//!             .timestamp("20230101120000")
//!             .message_type("ADT", "A01")
//!             .control_id("12345")
//!             .processing_id("P")
//!             .version("2.5")
//!     })
//!     .segment("EVN", |evn| evn.field(2, "20230101120000"))
//!     .segment("PID", |pid| {
//!         pid.raw_field(3, "MRN123^^^Hospital^MR")
//!             .component(5, 1, "Doe")
//!             .component(5, 2, "John")
//!     })
//!     .build();
//!
//! assert_eq!(message.control_id(), Some("12345"));
//! ```

use crate::escape_sequence::EscapeSequence;
use crate::fields::{Component, Field, Repetition};
use crate::message::Message;
use crate::segments::Segment;
use crate::separators::Separators;
use crate::validator::{Profile, ValidationResult, Validator};

/// Builds a message segment by segment.
pub struct MessageBuilder {
    delims: Separators,
    msh: Segment,
    segments: Vec<Segment>,
}

impl MessageBuilder {
    pub fn new() -> MessageBuilder {
        MessageBuilder::with_separators(Separators::default())
    }

    pub fn with_separators(delims: Separators) -> MessageBuilder {
        let mut msh = Segment::new("MSH");
        msh.set_field(1, Field::literal(delims.field.to_string()));
        msh.set_field(2, Field::literal(delims.to_string()));
        MessageBuilder {
            delims,
            msh,
            segments: Vec::new(),
        }
    }

    /// Build out the header through its named-field builder.
    pub fn msh(mut self, build: impl FnOnce(MshBuilder) -> MshBuilder) -> MessageBuilder {
        let msh = std::mem::replace(&mut self.msh, Segment::new("MSH"));
        let builder = build(MshBuilder {
            inner: SegmentBuilder {
                segment: msh,
                delims: self.delims,
            },
        });
        self.msh = builder.inner.segment;
        self
    }

    /// Append a segment and populate it.
    pub fn segment(mut self, id: &str, build: impl FnOnce(SegmentBuilder) -> SegmentBuilder) -> MessageBuilder {
        let builder = build(SegmentBuilder {
            segment: Segment::new(id),
            delims: self.delims,
        });
        self.segments.push(builder.segment);
        self
    }

    /// Populate the first existing segment with `id` (appending one when
    /// the skeleton does not carry it yet).
    pub fn edit(mut self, id: &str, build: impl FnOnce(SegmentBuilder) -> SegmentBuilder) -> MessageBuilder {
        let position = self.segments.iter().position(|s| s.id().as_str() == id);
        let segment = match position {
            Some(i) => self.segments.remove(i),
            None => Segment::new(id),
        };
        let builder = build(SegmentBuilder {
            segment,
            delims: self.delims,
        });
        match position {
            Some(i) => self.segments.insert(i, builder.segment),
            None => self.segments.push(builder.segment),
        }
        self
    }

    /// Assemble the message without checking it.
    pub fn build(self) -> Message {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.push(self.msh);
        segments.extend(self.segments);
        Message::from_parts(self.delims, segments)
    }

    /// Assemble and validate against the default profile; the findings
    /// come back as the error when any are at error severity.
    pub fn build_validated(self) -> Result<Message, ValidationResult> {
        let message = self.build();
        let result = Validator::validate(&message, &Profile::default());
        if result.is_valid() {
            Ok(message)
        } else {
            Err(result)
        }
    }

    // ---------------------------------------------------- templates ----

    /// Admit/visit skeleton: MSH typed `ADT^A01` plus empty EVN, PID and
    /// PV1 segments to fill through [`MessageBuilder::edit`].
    pub fn adt_a01() -> MessageBuilder {
        MessageBuilder::new()
            .msh(|msh| msh.message_type("ADT", "A01"))
            .segment("EVN", |evn| evn)
            .segment("PID", |pid| pid)
            .segment("PV1", |pv1| pv1.field(2, "I"))
    }

    /// Observation-result skeleton: MSH typed `ORU^R01` plus PID, OBR and
    /// one OBX.
    pub fn oru_r01() -> MessageBuilder {
        MessageBuilder::new()
            .msh(|msh| msh.message_type("ORU", "R01"))
            .segment("PID", |pid| pid)
            .segment("OBR", |obr| obr)
            .segment("OBX", |obx| obx.field(1, "1"))
    }

    /// Order skeleton: MSH typed `ORM^O01` plus PID and ORC.
    pub fn orm_o01() -> MessageBuilder {
        MessageBuilder::new()
            .msh(|msh| msh.message_type("ORM", "O01"))
            .segment("PID", |pid| pid)
            .segment("ORC", |orc| orc.field(1, "NW"))
    }

    /// Bare acknowledgement skeleton.
    pub fn ack() -> MessageBuilder {
        MessageBuilder::new()
            .msh(|msh| msh.message_type_bare("ACK"))
            .segment("MSA", |msa| msa.field(1, "AA"))
    }

    /// The acknowledgement answering `original`: sender and receiver are
    /// swapped, the control id is echoed into MSA-2.
    pub fn ack_for(original: &Message, ack_code: &str, control_id: &str) -> MessageBuilder {
        let delims = *original.separators();
        let original_control_id = original.control_id().unwrap_or("").to_string();
        let msh = original.msh();
        let token = |index: usize| -> String {
            msh.map(|s| s.field_raw(index, &delims)).unwrap_or_default()
        };

        let sending_app = token(5);
        let sending_fac = token(6);
        let receiving_app = token(3);
        let receiving_fac = token(4);
        let processing_id = original.processing_id().unwrap_or("P").to_string();
        let version = original.version().unwrap_or("2.5").to_string();
        let ack_code = ack_code.to_string();
        let control_id = control_id.to_string();

        MessageBuilder::with_separators(delims)
            .msh(move |m| {
                m.raw(3, &sending_app)
                    .raw(4, &sending_fac)
                    .raw(5, &receiving_app)
                    .raw(6, &receiving_fac)
                    .message_type_bare("ACK")
                    .control_id(&control_id)
                    .processing_id(&processing_id)
                    .version(&version)
            })
            .segment("MSA", move |msa| {
                msa.field(1, &ack_code).field(2, &original_control_id)
            })
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        MessageBuilder::new()
    }
}

/// General positional segment builder.
pub struct SegmentBuilder {
    segment: Segment,
    delims: Separators,
}

impl SegmentBuilder {
    fn encode(&self, value: &str) -> String {
        EscapeSequence::new(self.delims).encode(value).into_owned()
    }

    /// Set a field from plain text; delimiters in the value are escaped.
    pub fn field(mut self, index: usize, value: &str) -> SegmentBuilder {
        let encoded = self.encode(value);
        self.segment.set_field(index, Field::literal(encoded));
        self
    }

    /// Set a field from already-encoded wire text (components and repeats
    /// included), tokenized under the builder's separators.
    pub fn raw_field(mut self, index: usize, value: &str) -> SegmentBuilder {
        let field = Field::parse(value, &self.delims);
        self.segment.set_field(index, field);
        self
    }

    /// Set one component of a field from plain text.
    pub fn component(mut self, field: usize, component: usize, value: &str) -> SegmentBuilder {
        let encoded = self.encode(value);
        let mut current = match self.segment.field(field).as_option() {
            Some(existing) => existing.clone(),
            None => Field::parse("", &self.delims),
        };
        current.set_component(1, component, Component::from_raw(encoded));
        self.segment.set_field(field, current);
        self
    }

    /// Set one subcomponent of a component from plain text.
    pub fn subcomponent(
        mut self,
        field: usize,
        component: usize,
        subcomponent: usize,
        value: &str,
    ) -> SegmentBuilder {
        let encoded = self.encode(value);
        let mut current = match self.segment.field(field).as_option() {
            Some(existing) => existing.clone(),
            None => Field::parse("", &self.delims),
        };
        let mut comp = match current.component(component).as_option() {
            Some(existing) => existing.clone(),
            None => Component::default(),
        };
        comp.set_subcomponent(subcomponent, encoded);
        current.set_component(1, component, comp);
        self.segment.set_field(field, current);
        self
    }

    /// Set one repetition of a field from plain text.
    pub fn repetition(mut self, field: usize, repetition: usize, value: &str) -> SegmentBuilder {
        let encoded = self.encode(value);
        let mut current = match self.segment.field(field).as_option() {
            Some(existing) => existing.clone(),
            None => Field::parse("", &self.delims),
        };
        current.set_repetition(repetition, Repetition::from_raw(encoded));
        self.segment.set_field(field, current);
        self
    }
}

/// The header gets named fields instead of bare indices.
pub struct MshBuilder {
    inner: SegmentBuilder,
}

impl MshBuilder {
    fn set(mut self, index: usize, value: &str) -> MshBuilder {
        self.inner = self.inner.field(index, value);
        self
    }

    fn raw(mut self, index: usize, value: &str) -> MshBuilder {
        self.inner = self.inner.raw_field(index, value);
        self
    }

    pub fn sending_application(self, value: &str) -> MshBuilder {
        self.set(3, value)
    }

    pub fn sending_facility(self, value: &str) -> MshBuilder {
        self.set(4, value)
    }

    pub fn receiving_application(self, value: &str) -> MshBuilder {
        self.set(5, value)
    }

    pub fn receiving_facility(self, value: &str) -> MshBuilder {
        self.set(6, value)
    }

    /// MSH-7, an HL7 timestamp.
    pub fn timestamp(self, value: &str) -> MshBuilder {
        self.set(7, value)
    }

    pub fn security(self, value: &str) -> MshBuilder {
        self.set(8, value)
    }

    /// MSH-9 as `type^trigger`.
    pub fn message_type(mut self, message_type: &str, trigger_event: &str) -> MshBuilder {
        self.inner = self
            .inner
            .component(9, 1, message_type)
            .component(9, 2, trigger_event);
        self
    }

    /// MSH-9 without a trigger, the ACK shape.
    pub fn message_type_bare(self, message_type: &str) -> MshBuilder {
        self.set(9, message_type)
    }

    pub fn control_id(self, value: &str) -> MshBuilder {
        self.set(10, value)
    }

    pub fn processing_id(self, value: &str) -> MshBuilder {
        self.set(11, value)
    }

    pub fn version(self, value: &str) -> MshBuilder {
        self.set(12, value)
    }

    /// MSH-18.
    pub fn charset(self, value: &str) -> MshBuilder {
        self.set(18, value)
    }
}
