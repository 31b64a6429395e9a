//! Typed views over a parsed [`Message`].
//!
//! The common message families get a thin wrapper with domain accessors;
//! everything else stays a plain `Message`.  Wrappers are tagged variants
//! over the same value, not separate models: converting is free and the
//! underlying message is always reachable.

use crate::fields::composites::{Ce, Cx, Xpn};
use crate::fields::dtm::Dtm;
use crate::fields::Presence;
use crate::message::Message;
use crate::segments::Segment;

/// A message dispatched by MSH-9.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedMessage {
    Admit(AdtMessage),
    ObservationResult(OruMessage),
    Order(OrmMessage),
    Acknowledgement(AckMessage),
    Other(Message),
}

impl From<Message> for TypedMessage {
    fn from(message: Message) -> TypedMessage {
        match message.message_type() {
            Some("ADT") => TypedMessage::Admit(AdtMessage { message }),
            Some("ORU") => TypedMessage::ObservationResult(OruMessage { message }),
            Some("ORM") => TypedMessage::Order(OrmMessage { message }),
            Some("ACK") => TypedMessage::Acknowledgement(AckMessage { message }),
            _ => TypedMessage::Other(message),
        }
    }
}

impl TypedMessage {
    /// The underlying message, whatever the variant.
    pub fn message(&self) -> &Message {
        match self {
            TypedMessage::Admit(m) => &m.message,
            TypedMessage::ObservationResult(m) => &m.message,
            TypedMessage::Order(m) => &m.message,
            TypedMessage::Acknowledgement(m) => &m.message,
            TypedMessage::Other(m) => m,
        }
    }
}

fn first_component_raw<'m>(message: &'m Message, segment: &str, field: usize) -> Option<&'m str> {
    message
        .segment(segment)?
        .field(field)
        .as_option()?
        .component(1)
        .as_option()?
        .as_str()
}

/// Admit/discharge/transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct AdtMessage {
    message: Message,
}

impl AdtMessage {
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// PID-3, the first patient identifier.
    pub fn patient_id(&self) -> Option<Cx> {
        let field = self.message.segment("PID")?.field(3).as_option()?;
        let raw = field.first().raw(self.message.separators());
        Some(Cx::parse(&raw, self.message.separators()))
    }

    /// PID-5, the first patient name.
    pub fn patient_name(&self) -> Option<Xpn> {
        let field = self.message.segment("PID")?.field(5).as_option()?;
        let raw = field.first().raw(self.message.separators());
        Some(Xpn::parse(&raw, self.message.separators()))
    }

    /// EVN-2, when the event was recorded.
    pub fn recorded_at(&self) -> Option<Dtm> {
        let raw = first_component_raw(&self.message, "EVN", 2)?;
        Dtm::parse(raw).ok()
    }

    /// PV1-2.
    pub fn patient_class(&self) -> Option<&str> {
        first_component_raw(&self.message, "PV1", 2)
    }
}

/// One OBX row of a results message.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub identifier: Ce,
    pub value: String,
    pub units: Option<Ce>,
    pub status: Option<String>,
}

/// Observation result.
#[derive(Debug, Clone, PartialEq)]
pub struct OruMessage {
    message: Message,
}

impl OruMessage {
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn obx_segments(&self) -> Vec<&Segment> {
        self.message.segments_by_id("OBX")
    }

    /// Every OBX flattened to (identifier, value, units, status).
    pub fn observations(&self) -> Vec<Observation> {
        let delims = self.message.separators();
        self.obx_segments()
            .into_iter()
            .map(|obx| {
                let identifier = Ce::parse(&obx.field_raw(3, delims), delims);
                let value = match obx.field(5) {
                    Presence::Present(f) => f.value(delims),
                    _ => String::new(),
                };
                let units = match obx.field(6) {
                    Presence::Present(f) => Some(Ce::parse(&f.raw(delims), delims)),
                    _ => None,
                };
                let status = match obx.field(11) {
                    Presence::Present(f) => Some(f.raw(delims)),
                    _ => None,
                };
                Observation {
                    identifier,
                    value,
                    units,
                    status,
                }
            })
            .collect()
    }

    /// OBR-4, what was ordered.
    pub fn service_id(&self) -> Option<Ce> {
        let field = self.message.segment("OBR")?.field(4).as_option()?;
        let raw = field.first().raw(self.message.separators());
        Some(Ce::parse(&raw, self.message.separators()))
    }
}

/// Order message.
#[derive(Debug, Clone, PartialEq)]
pub struct OrmMessage {
    message: Message,
}

impl OrmMessage {
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// ORC-1, e.g. `NW` for a new order.
    pub fn order_control(&self) -> Option<&str> {
        first_component_raw(&self.message, "ORC", 1)
    }

    /// ORC-2.
    pub fn placer_order_number(&self) -> Option<&str> {
        first_component_raw(&self.message, "ORC", 2)
    }
}

/// Acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct AckMessage {
    message: Message,
}

impl AckMessage {
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// MSA-1.
    pub fn ack_code(&self) -> Option<&str> {
        first_component_raw(&self.message, "MSA", 1)
    }

    /// MSA-2, the control id of the message being answered.
    pub fn acked_control_id(&self) -> Option<&str> {
        first_component_raw(&self.message, "MSA", 2)
    }

    /// `AA` or `CA`.
    pub fn is_positive(&self) -> bool {
        matches!(self.ack_code(), Some("AA") | Some("CA"))
    }
}
