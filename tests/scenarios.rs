//! End-to-end scenarios: whole messages through the framer, parser,
//! validator and builder.

use hl7v2_core::charset::CharsetCode;
use hl7v2_core::diagnostics::{DiagnosticCode, Severity};
use hl7v2_core::parser::{ErrorRecovery, Parser, ParserConfig};
use hl7v2_core::validator::{Profile, Validator};
use hl7v2_core::{EscapeSequence, Framer, Hl7ParseError, Separators};
use std::convert::TryFrom;

#[test]
fn minimal_admit_message() -> Result<(), Hl7ParseError> {
    let source = "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5\rEVN||20230101120000\rPID|||MRN123^^^Hospital^MR||Doe^John";

    let (message, diagnostics) = Parser::parse_str(source, &ParserConfig::default())?;

    assert_eq!(message.segment_count(), 3);
    assert_eq!(message.message_type(), Some("ADT"));
    assert_eq!(message.trigger_event(), Some("A01"));
    assert_eq!(message.control_id(), Some("12345"));
    assert_eq!(message.version(), Some("2.5"));

    let pid = message.segment("PID").unwrap();
    let mrn = pid.field(3).as_option().unwrap();
    assert_eq!(mrn.component(1).as_option().unwrap().as_str(), Some("MRN123"));

    assert_eq!(diagnostics.len(), 0);
    Ok(())
}

#[test]
fn escape_round_trip() {
    let codec = EscapeSequence::new(Separators::default());

    assert_eq!(codec.decode(r#"Smith\F\Jones"#), "Smith|Jones");
    assert_eq!(codec.encode("A&B"), r#"A\T\B"#);
    assert_eq!(codec.decode(r#"\X48454C4C4F\"#), "HELLO");
}

#[test]
fn mllp_chunked_feed() -> Result<(), Hl7ParseError> {
    let wire: Vec<u8> = {
        let mut bytes = vec![0x0Bu8];
        bytes.extend_from_slice(b"MSH|^~\\&|A\r");
        bytes.push(0x1C);
        bytes.push(0x0D);
        bytes
    };

    let mut framer = Framer::new();
    let mut frames = Vec::new();
    for byte in &wire {
        frames.extend(framer.feed(std::slice::from_ref(byte)));
    }

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload(), b"MSH|^~\\&|A\r");

    let (message, _) = Parser::parse(frames[0].payload(), &ParserConfig::default())?;
    assert_eq!(message.segment_count(), 1);
    assert_eq!(message.segments()[0].id().as_str(), "MSH");
    Ok(())
}

#[test]
fn non_standard_segment_with_custom_disabled() -> Result<(), Hl7ParseError> {
    let source = "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5\rZZZ|custom|data";
    let config = ParserConfig::default()
        .allow_custom_segments(false)
        .error_recovery(ErrorRecovery::SkipInvalidSegments);

    let (message, diagnostics) = Parser::parse_str(source, &config)?;

    assert_eq!(message.segment_count(), 1);
    let unknown: Vec<_> = diagnostics.with_code(DiagnosticCode::UnknownSegment).collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].path.segment_id.as_deref(), Some("ZZZ"));
    Ok(())
}

#[test]
fn character_set_mismatch() -> Result<(), Hl7ParseError> {
    let source = "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5||||||UNICODE UTF-8";
    let config = ParserConfig::default()
        .encoding(CharsetCode::Iso8859_1)
        .validate_encoding(true);

    let (message, diagnostics) = Parser::parse_str(source, &config)?;

    assert_eq!(message.charset(), Some("UNICODE UTF-8"));
    let mismatches: Vec<_> = diagnostics.with_code(DiagnosticCode::CharsetMismatch).collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].severity, Severity::Warning);
    assert_eq!(diagnostics.len(), 1);
    Ok(())
}

#[test]
fn cardinality_violation_on_duplicate_evn() -> Result<(), Hl7ParseError> {
    let source = "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5\rEVN||20230101120000\rEVN||20230101120001\rPID|1||MRN123^^^Hospital^MR||Doe^John\rPV1|1|I";

    let (message, parse_diags) = Parser::parse_str(source, &ParserConfig::default())?;
    assert_eq!(message.segment_count(), 5);
    assert!(parse_diags.is_empty());

    let result = Validator::validate(&message, &Profile::default());
    let violations: Vec<_> = result.with_code(DiagnosticCode::CardinalityViolation).collect();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::Error);
    assert_eq!(violations[0].path.segment_index, Some(2));
    assert_eq!(violations[0].path.segment_id.as_deref(), Some("EVN"));
    Ok(())
}

#[test]
fn receive_pipeline_framer_to_validator() -> Result<(), Hl7ParseError> {
    // bytes -> framer -> parser -> validator, then builder -> serializer ->
    // framer for the reply
    let inbound = "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5\rEVN||20230101120000\rPID|1||MRN123^^^Hospital^MR||Doe^John\rPV1|1|I\r";

    let mut framer = Framer::new();
    let frames = framer.feed(&Framer::wrap(inbound.as_bytes()));
    assert_eq!(frames.len(), 1);

    let (message, diags) = Parser::parse(frames[0].payload(), &ParserConfig::default())?;
    assert!(diags.is_empty());

    let result = Validator::validate(&message, &Profile::default());
    assert!(result.is_valid(), "findings: {:?}", result.findings);

    let ack = hl7v2_core::MessageBuilder::ack_for(&message, "AA", "R0001").build();
    let reply = hl7v2_core::serializer::serialize_terminated(&ack);
    let reply_frame = Framer::wrap(reply.as_bytes());

    let mut sender_framer = Framer::new();
    let reply_frames = sender_framer.feed(&reply_frame);
    assert_eq!(reply_frames.len(), 1);

    let (parsed_ack, _) = Parser::parse(reply_frames[0].payload(), &ParserConfig::default())?;
    match hl7v2_core::typed::TypedMessage::from(parsed_ack) {
        hl7v2_core::typed::TypedMessage::Acknowledgement(ack) => {
            assert!(ack.is_positive());
            assert_eq!(ack.acked_control_id(), Some("12345"));
        }
        other => panic!("expected an acknowledgement, got {:?}", other),
    }
    Ok(())
}

#[test]
fn selector_reads_the_admit_postcode() -> Result<(), Hl7ParseError> {
    let source = "MSH|^~\\&|GHH LAB|ELAB-3|GHH OE|BLDG4|200202150930||ORU^R01|CNTRL-3456|P|2.4\rPID|||555-44-4444||EVERYWOMAN^EVE^E^^^^L|JONES|19620320|F|||153 FERNWOOD DR.^^STATESVILLE^OH^35292";
    let message = hl7v2_core::Message::try_from(source)?;
    assert_eq!(
        hl7v2_core::selector::query(&message, "PID.F11.C5").as_deref(),
        Some("35292")
    );
    Ok(())
}
