//! Batch and file wrappers: FHS / BHS / messages / BTS / FTS.
//!
//! A file holds batches, a batch holds messages.  Trailer segments carry
//! the count of contained items; a disagreement between the trailer and
//! what was actually counted is reported as a cardinality warning rather
//! than a failure, since the payload itself parsed fine.

use log::debug;

use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, PathLocator};
use crate::message::Message;
use crate::parser::{split_segments, Parser, ParserConfig, SegmentTerminator};
use crate::segments::Segment;
use crate::separators::Separators;
use crate::serializer;
use crate::Hl7ParseError;

/// A BHS-headed group of messages, optionally closed by BTS.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub separators: Separators,
    pub header: Segment,
    pub messages: Vec<Message>,
    pub trailer: Option<Segment>,
}

impl Batch {
    /// BHS-11, the batch control id.
    pub fn control_id(&self) -> Option<String> {
        match self.header.field(11) {
            crate::fields::Presence::Present(f) => Some(f.raw(&self.separators)),
            _ => None,
        }
    }

    /// The count the BTS trailer declares, when present and numeric.
    pub fn declared_count(&self) -> Option<usize> {
        let trailer = self.trailer.as_ref()?;
        trailer
            .field(1)
            .as_option()
            .and_then(|f| f.raw(&self.separators).parse().ok())
    }
}

/// An FHS-headed group of batches, optionally closed by FTS.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFile {
    pub separators: Separators,
    pub header: Segment,
    pub batches: Vec<Batch>,
    pub trailer: Option<Segment>,
}

impl BatchFile {
    pub fn declared_count(&self) -> Option<usize> {
        let trailer = self.trailer.as_ref()?;
        trailer
            .field(1)
            .as_option()
            .and_then(|f| f.raw(&self.separators).parse().ok())
    }
}

/// Parse a BHS-wrapped batch of messages.
pub fn parse_batch(bytes: &[u8], config: &ParserConfig) -> Result<(Batch, Diagnostics), Hl7ParseError> {
    let mut diags = Diagnostics::new();
    let lines = split_segments(bytes, config.segment_terminator);
    if lines.is_empty() {
        return Err(Hl7ParseError::NoHeader);
    }
    if !lines[0].starts_with(b"BHS") {
        return Err(Hl7ParseError::InvalidHeader(
            "batch input does not start with BHS".to_string(),
        ));
    }

    let delims = Separators::detect(lines[0])?;
    let header = Segment::parse(&String::from_utf8_lossy(lines[0]), &delims);

    let mut trailer = None;
    let mut message_lines: Vec<Vec<&[u8]>> = Vec::new();

    for line in &lines[1..] {
        if line.starts_with(b"BTS") {
            trailer = Some(Segment::parse(&String::from_utf8_lossy(line), &delims));
            break;
        }
        if line.starts_with(b"MSH") {
            message_lines.push(vec![*line]);
        } else if let Some(current) = message_lines.last_mut() {
            current.push(*line);
        } else {
            diags.push(Diagnostic::warning(
                DiagnosticCode::MalformedField,
                PathLocator::new(),
                "segment before the first MSH of the batch was ignored",
            ));
        }
    }

    let messages = parse_groups(&message_lines, config, &mut diags)?;
    debug!("batch parsed: {} message(s)", messages.len());

    let batch = Batch {
        separators: delims,
        header,
        messages,
        trailer,
    };
    check_trailer_count(batch.declared_count(), batch.messages.len(), "BTS", "message", &mut diags);

    Ok((batch, diags))
}

/// Parse an FHS-wrapped file of batches.
pub fn parse_file(bytes: &[u8], config: &ParserConfig) -> Result<(BatchFile, Diagnostics), Hl7ParseError> {
    let mut diags = Diagnostics::new();
    let lines = split_segments(bytes, config.segment_terminator);
    if lines.is_empty() {
        return Err(Hl7ParseError::NoHeader);
    }
    if !lines[0].starts_with(b"FHS") {
        return Err(Hl7ParseError::InvalidHeader(
            "file input does not start with FHS".to_string(),
        ));
    }

    let delims = Separators::detect(lines[0])?;
    let header = Segment::parse(&String::from_utf8_lossy(lines[0]), &delims);

    let mut trailer = None;
    let mut batches = Vec::new();
    let mut current_batch: Vec<&[u8]> = Vec::new();

    let terminator = match config.segment_terminator {
        SegmentTerminator::Lf => &b"\n"[..],
        _ => &b"\r"[..],
    };

    for line in &lines[1..] {
        if line.starts_with(b"FTS") {
            trailer = Some(Segment::parse(&String::from_utf8_lossy(line), &delims));
            break;
        }
        if line.starts_with(b"BHS") && !current_batch.is_empty() {
            let (batch, batch_diags) = parse_batch(&join_lines(&current_batch, terminator), config)?;
            batches.push(batch);
            diags.extend(batch_diags);
            current_batch = Vec::new();
        }
        current_batch.push(*line);
    }
    if !current_batch.is_empty() {
        let (batch, batch_diags) = parse_batch(&join_lines(&current_batch, terminator), config)?;
        batches.push(batch);
        diags.extend(batch_diags);
    }

    let file = BatchFile {
        separators: delims,
        header,
        batches,
        trailer,
    };
    check_trailer_count(file.declared_count(), file.batches.len(), "FTS", "batch", &mut diags);

    Ok((file, diags))
}

/// Render a batch back to wire form, every segment terminated.
pub fn serialize_batch(batch: &Batch) -> String {
    let delims = &batch.separators;
    let mut out = batch.header.to_wire(delims);
    out.push(delims.segment);
    for message in &batch.messages {
        out.push_str(&serializer::serialize_terminated(message));
    }
    if let Some(trailer) = &batch.trailer {
        out.push_str(&trailer.to_wire(delims));
        out.push(delims.segment);
    }
    out
}

/// Render a file back to wire form.
pub fn serialize_file(file: &BatchFile) -> String {
    let delims = &file.separators;
    let mut out = file.header.to_wire(delims);
    out.push(delims.segment);
    for batch in &file.batches {
        out.push_str(&serialize_batch(batch));
    }
    if let Some(trailer) = &file.trailer {
        out.push_str(&trailer.to_wire(delims));
        out.push(delims.segment);
    }
    out
}

fn parse_groups(
    groups: &[Vec<&[u8]>],
    config: &ParserConfig,
    diags: &mut Diagnostics,
) -> Result<Vec<Message>, Hl7ParseError> {
    let mut inner_config = config.clone();
    inner_config.segment_terminator = SegmentTerminator::Cr;

    let mut messages = Vec::with_capacity(groups.len());
    for group in groups {
        let bytes = join_lines(group, b"\r");
        let (message, message_diags) = Parser::parse(&bytes, &inner_config)?;
        diags.extend(message_diags);
        messages.push(message);
    }
    Ok(messages)
}

fn join_lines(lines: &[&[u8]], terminator: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for line in lines {
        out.extend_from_slice(line);
        out.extend_from_slice(terminator);
    }
    out
}

fn check_trailer_count(
    declared: Option<usize>,
    counted: usize,
    trailer_id: &str,
    noun: &str,
    diags: &mut Diagnostics,
) {
    if let Some(declared) = declared {
        if declared != counted {
            diags.push(Diagnostic::warning(
                DiagnosticCode::CardinalityViolation,
                PathLocator {
                    segment_id: Some(trailer_id.to_string()),
                    field: Some(1),
                    ..PathLocator::default()
                },
                format!("trailer declares {} {}(s) but {} were counted", declared, noun, counted),
            ));
        }
    }
}
