//! The eager strategy: tokenize the whole buffer up front.

use log::debug;

use super::{
    check_version, detect_separators, resolve_decoder, split_segments, tokenize_segment,
    ParserConfig, SegmentOutcome,
};
use crate::charset::TextDecoder;
use crate::diagnostics::Diagnostics;
use crate::message::Message;
use crate::segments::Segment;
use crate::Hl7ParseError;

/// Parse a complete buffer into a message.
///
/// The header is tokenized first (as UTF-8; delimiters and the MSH fields
/// that matter are ASCII) so MSH-18 can pick the decoder for the rest of
/// the body.
pub(crate) fn parse(bytes: &[u8], config: &ParserConfig) -> Result<(Message, Diagnostics), Hl7ParseError> {
    let mut diags = Diagnostics::new();

    if config.max_message_size > 0 && bytes.len() > config.max_message_size {
        return Err(Hl7ParseError::MessageTooLarge {
            size: bytes.len(),
            max: config.max_message_size,
        });
    }

    let lines = split_segments(bytes, config.segment_terminator);
    if lines.is_empty() {
        return Err(Hl7ParseError::NoHeader);
    }

    let delims = detect_separators(lines[0], config, &mut diags)?;
    debug!("parsing {} segment line(s)", lines.len());

    // First pass over the header alone, so the body decoder can be chosen
    // from MSH-18 before any other leaf text is decoded.
    let header = match tokenize_segment(lines[0], 1, &delims, &TextDecoder::utf8(), config, &mut diags)? {
        SegmentOutcome::Keep(segment) => Some(segment),
        SegmentOutcome::Skip => None,
    };

    let decoder = resolve_decoder(header.as_ref(), config, &mut diags)?;

    let mut segments: Vec<Segment> = Vec::with_capacity(lines.len());
    if let Some(header) = header {
        segments.push(header);
    }

    for (i, line) in lines.iter().enumerate().skip(1) {
        match tokenize_segment(line, i + 1, &delims, &decoder, config, &mut diags)? {
            SegmentOutcome::Keep(segment) => segments.push(segment),
            SegmentOutcome::Skip => {}
        }
    }

    let message = Message::from_parts(delims, segments);
    check_version(&message, config, &mut diags)?;

    Ok((message, diags))
}
