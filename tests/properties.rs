//! The universal properties: round-tripping, chunking idempotence,
//! copy-on-write isolation and pool reuse.

use hl7v2_core::parser::{ErrorRecovery, Parser, ParserConfig, StreamingParser};
use hl7v2_core::pool::ObjectPool;
use hl7v2_core::{serializer, EscapeSequence, Framer, Hl7ParseError, Separators};
use std::sync::Arc;

const MESSAGES: [&str; 3] = [
    "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5\rEVN||20230101120000\rPID|||MRN123^^^Hospital^MR||Doe^John",
    "MSH|^~\\&|GHH LAB|ELAB-3|GHH OE|BLDG4|200202150930||ORU^R01|CNTRL-3456|P|2.4\rOBR|1|845439^GHH OE|1045813^GHH LAB|15545^GLUCOSE\rOBX|1|SN|1554-5^GLUCOSE||^182|mg/dl|70_105|H|||F",
    "MSH|^~\\&|CATH|StJohn|AcmeHIS|StJohn|20061019172719||ACK^O01|MSGID12349876|P|2.3\rMSA|AA|MSGID12349876",
];

#[test]
fn parse_serialize_parse_is_identity() -> Result<(), Hl7ParseError> {
    for source in &MESSAGES {
        let (message, _) = Parser::parse_str(source, &ParserConfig::default())?;
        let wire = serializer::serialize(&message);
        let (reparsed, _) = Parser::parse_str(&wire, &ParserConfig::default())?;
        assert_eq!(message, reparsed);
        assert_eq!(wire, *source);
    }
    Ok(())
}

#[test]
fn terminator_is_canonicalized_on_round_trip() -> Result<(), Hl7ParseError> {
    use hl7v2_core::parser::SegmentTerminator;
    let lf_form = MESSAGES[0].replace('\r', "\n");
    let config = ParserConfig::default().segment_terminator(SegmentTerminator::Any);
    let (from_lf, _) = Parser::parse_str(&lf_form, &config)?;
    let (from_cr, _) = Parser::parse_str(MESSAGES[0], &config)?;
    assert_eq!(from_lf, from_cr);
    assert_eq!(serializer::serialize(&from_lf), MESSAGES[0]);
    Ok(())
}

#[test]
fn escape_decode_encode_is_identity() {
    let codec = EscapeSequence::new(Separators::default());
    let inputs = [
        "plain text",
        "with|pipe",
        "with^caret&and~tilde",
        r#"back\slash"#,
        "line\rbreak",
        "unicode caf\u{e9}",
    ];
    for input in &inputs {
        let encoded = codec.encode(*input);
        let decoded = codec.decode(encoded.into_owned());
        assert_eq!(decoded, *input);
    }
}

#[test]
fn strict_recovery_returns_the_first_problem_path() {
    let source = "MSH|^~\\&|A|B|C|D|20230101||ADT^A01|1|P|2.5\rZZZ|bad\rPID|1";
    let config = ParserConfig::default().strict_mode(true);
    match Parser::parse_str(source, &config) {
        Err(Hl7ParseError::StrictModeFailure(diag)) => {
            assert_eq!(diag.path.segment_index, Some(2));
            assert_eq!(diag.path.segment_id.as_deref(), Some("ZZZ"));
        }
        other => panic!("expected StrictModeFailure, got {:?}", other),
    }
}

#[test]
fn skip_mode_conserves_segment_counts() -> Result<(), Hl7ParseError> {
    let source = "MSH|^~\\&|A|B|C|D|20230101||ADT^A01|1|P|2.5\rZZZ|1\rPID|1\rQQQ|2\rOBX|1";
    let config = ParserConfig::default().error_recovery(ErrorRecovery::SkipInvalidSegments);
    let (message, diags) = Parser::parse_str(source, &config)?;

    let source_segments = source.split('\r').count();
    let dropped = diags
        .with_code(hl7v2_core::DiagnosticCode::UnknownSegment)
        .count();
    assert_eq!(message.segment_count(), source_segments - dropped);
    Ok(())
}

#[test]
fn framer_is_chunking_idempotent() {
    let mut wire = Vec::new();
    for source in &MESSAGES {
        wire.extend_from_slice(&Framer::wrap(source.as_bytes()));
    }

    let reference = Framer::new().feed(&wire);
    assert_eq!(reference.len(), MESSAGES.len());

    for chunk_size in 1..24usize {
        let mut framer = Framer::new();
        let mut frames = Vec::new();
        for chunk in wire.chunks(chunk_size) {
            frames.extend(framer.feed(chunk));
        }
        assert_eq!(frames, reference, "chunk size {}", chunk_size);
    }
}

#[test]
fn streaming_parser_is_chunking_insensitive() -> Result<(), Hl7ParseError> {
    let source = format!("{}\r", MESSAGES[1]);
    let collect = |chunk_size: usize| -> Result<Vec<String>, Hl7ParseError> {
        let mut parser = StreamingParser::new(ParserConfig::default());
        let mut ids = Vec::new();
        for chunk in source.as_bytes().chunks(chunk_size) {
            parser.feed(chunk)?;
            while let Some(segment) = parser.next() {
                ids.push(segment.id().as_str().to_string());
            }
        }
        parser.finish()?;
        while let Some(segment) = parser.next() {
            ids.push(segment.id().as_str().to_string());
        }
        Ok(ids)
    };

    let whole = collect(source.len())?;
    for chunk_size in [1usize, 2, 3, 7, 16] {
        assert_eq!(collect(chunk_size)?, whole, "chunk size {}", chunk_size);
    }
    Ok(())
}

#[test]
fn detected_encoding_characters_reproduce_the_header_bytes() -> Result<(), Hl7ParseError> {
    for header in ["MSH|^~\\&", "MSH#!@$%", "BHS|^~\\&"] {
        let delims = Separators::detect(header.as_bytes())?;
        let chars = [
            delims.segment,
            delims.field,
            delims.component,
            delims.repeat,
            delims.escape_char,
            delims.subcomponent,
        ];
        for (i, a) in chars.iter().enumerate() {
            for b in chars.iter().skip(i + 1) {
                assert_ne!(a, b, "duplicate delimiter in {}", header);
            }
        }
        assert_eq!(delims.serialize(&header[..3]), header);
    }
    Ok(())
}

#[test]
fn mutating_a_clone_never_touches_the_original() -> Result<(), Hl7ParseError> {
    let (original, _) = Parser::parse_str(MESSAGES[0], &ParserConfig::default())?;
    let untouched = original.clone();
    assert!(original.shares_storage(&untouched));

    let mut mutated = original.clone();
    let segment = mutated.segment_mut(2).unwrap();
    segment.set_field(5, hl7v2_core::fields::Field::parse("Roe^Jane", original.separators()));

    assert!(!original.shares_storage(&mutated));
    assert!(original.shares_storage(&untouched));
    assert_eq!(
        original.segment("PID").unwrap().field_raw(5, original.separators()),
        "Doe^John"
    );
    assert_eq!(
        mutated.segment("PID").unwrap().field_raw(5, mutated.separators()),
        "Roe^Jane"
    );
    Ok(())
}

#[test]
fn pool_reuse_is_observationally_fresh() {
    let pool: Arc<ObjectPool<Vec<u8>>> = Arc::new(ObjectPool::new(8));

    let fingerprint = |buf: &Vec<u8>| (buf.len(), buf.is_empty());
    let fresh = Vec::<u8>::new();

    for round in 0..3 {
        let mut node = pool.acquire();
        assert_eq!(fingerprint(&node), fingerprint(&fresh), "round {}", round);
        node.extend_from_slice(b"MSH|^~\\&|scratch data");
    }

    let stats = pool.stats();
    assert_eq!(stats.hits + stats.misses, 3);
    assert!(stats.hits >= 2);
}
