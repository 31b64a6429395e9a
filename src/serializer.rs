//! Serialization of the node model back to ER7 wire text.
//!
//! Uses the message's own separators; leaf text is stored escaped, so no
//! re-encoding happens here.  The terminator is canonicalized to the
//! separator record's segment char (CR unless the message was built with
//! something else).

use crate::message::Message;
use crate::segments::Segment;

/// Render a message to wire form, segments joined by the terminator with
/// no trailing terminator.
pub fn serialize(message: &Message) -> String {
    let delims = message.separators();
    let mut out = String::new();
    for (i, segment) in message.segments().iter().enumerate() {
        if i > 0 {
            out.push(delims.segment);
        }
        out.push_str(&segment.to_wire(delims));
    }
    out
}

/// Render a message to wire form with a terminator after every segment,
/// the shape MLLP and file transports expect.
pub fn serialize_terminated(message: &Message) -> String {
    let delims = message.separators();
    let mut out = String::new();
    for segment in message.segments() {
        out.push_str(&segment.to_wire(delims));
        out.push(delims.segment);
    }
    out
}

/// Render a single segment under the message's separators.
pub fn serialize_segment(message: &Message, segment: &Segment) -> String {
    segment.to_wire(message.separators())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    const SAMPLE: &str =
        "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5\rEVN||20230101120000\rPID|||MRN123^^^Hospital^MR||Doe^John";

    #[test]
    fn serialize_round_trips_parse_output() {
        let msg = Message::try_from(SAMPLE).unwrap();
        assert_eq!(serialize(&msg), SAMPLE);
    }

    #[test]
    fn terminated_form_ends_every_segment() {
        let msg = Message::try_from("MSH|^~\\&|A|B|C|D|20230101||ACK|1|P|2.5").unwrap();
        assert_eq!(
            serialize_terminated(&msg),
            "MSH|^~\\&|A|B|C|D|20230101||ACK|1|P|2.5\r"
        );
    }

    #[test]
    fn reparse_of_terminated_form_is_identical() {
        let msg = Message::try_from(SAMPLE).unwrap();
        let wire = serialize_terminated(&msg);
        let reparsed = Message::try_from(wire.as_str()).unwrap();
        assert_eq!(msg, reparsed);
    }
}
