//! The lazy strategy: one cheap boundary pass, field tokenization deferred.
//!
//! The boundary pass records segment lines and ids, detects the delimiters
//! and resolves the body decoder from the header.  A segment's fields are
//! tokenized the first time it is asked for, and the result is cached, so
//! repeated access costs the same as eager access.

use std::cell::RefCell;

use super::{
    detect_separators, record, resolve_decoder, split_segments, tokenize_segment, ParserConfig,
    SegmentOutcome,
};
use crate::charset::TextDecoder;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, PathLocator};
use crate::intern;
use crate::message::Message;
use crate::parser::ErrorRecovery;
use crate::segments::Segment;
use crate::separators::Separators;
use crate::Hl7ParseError;

struct Slot<'a> {
    id: String,
    line: &'a [u8],
    /// False when the id policy decided this segment is dropped.
    keep: bool,
}

/// A message whose segments tokenize on first access.
///
/// Indexing is 0-based here (it addresses the segment list, not positions
/// within a segment).
pub struct LazyMessage<'a> {
    delims: Separators,
    decoder: TextDecoder,
    diags: Diagnostics,
    slots: Vec<Slot<'a>>,
    cache: RefCell<Vec<Option<Segment>>>,
}

impl<'a> LazyMessage<'a> {
    pub(crate) fn parse(bytes: &'a [u8], config: &ParserConfig) -> Result<LazyMessage<'a>, Hl7ParseError> {
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

        // The header is the one segment tokenized up front: MSH-18 picks
        // the decoder for everything else.
        let header = match tokenize_segment(lines[0], 1, &delims, &TextDecoder::utf8(), config, &mut diags)? {
            SegmentOutcome::Keep(segment) => Some(segment),
            SegmentOutcome::Skip => None,
        };
        let decoder = resolve_decoder(header.as_ref(), config, &mut diags)?;

        let mut slots = Vec::with_capacity(lines.len());
        let mut cache = Vec::with_capacity(lines.len());

        for (i, line) in lines.iter().enumerate() {
            let id: String = line
                .iter()
                .take_while(|b| **b != delims.field as u8)
                .take(4)
                .map(|b| *b as char)
                .collect();

            let mut keep = true;
            if i == 0 {
                keep = header.is_some();
            } else {
                let id_ok = id.len() == 3 && id.chars().all(|c| c.is_ascii_alphanumeric());
                let admitted = (id_ok && intern::is_standard(&id)) || (id_ok && config.allow_custom_segments);
                if !admitted {
                    let diag = Diagnostic::warning(
                        DiagnosticCode::UnknownSegment,
                        PathLocator::segment(i + 1, &id),
                        format!("segment id '{}' is not a standard identifier", id),
                    );
                    match config.error_recovery {
                        ErrorRecovery::Strict => return Err(Hl7ParseError::UnknownSegment(id)),
                        ErrorRecovery::SkipInvalidSegments => {
                            record(diag, &mut diags, config)?;
                            keep = false;
                        }
                        ErrorRecovery::BestEffort => {
                            record(diag, &mut diags, config)?;
                        }
                    }
                }
            }

            slots.push(Slot { id, line, keep });
            cache.push(if i == 0 { header.clone() } else { None });
        }

        Ok(LazyMessage {
            delims,
            decoder,
            diags,
            slots,
            cache: RefCell::new(cache),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn separators(&self) -> &Separators {
        &self.delims
    }

    /// Diagnostics from the boundary pass.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    /// The segment id recorded at the boundary pass, without tokenizing.
    pub fn id(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|s| s.id.as_str())
    }

    /// Tokenize (or fetch the cached) segment.  `None` for out-of-range
    /// indices and for segments the recovery policy dropped.
    pub fn segment(&self, index: usize) -> Option<Segment> {
        let slot = self.slots.get(index)?;
        if !slot.keep {
            return None;
        }

        let mut cache = self.cache.borrow_mut();
        if cache[index].is_none() {
            let (text, _) = self.decoder.decode(slot.line);
            cache[index] = Some(Segment::parse(&text, &self.delims));
        }
        cache[index].clone()
    }

    /// Whether the given segment has been tokenized yet.
    pub fn is_tokenized(&self, index: usize) -> bool {
        self.cache
            .borrow()
            .get(index)
            .map(|c| c.is_some())
            .unwrap_or(false)
    }

    /// Tokenize everything that remains and assemble an owned [`Message`].
    pub fn materialize(&self) -> Message {
        let segments = (0..self.len()).filter_map(|i| self.segment(i)).collect();
        Message::from_parts(self.delims, segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    const SAMPLE: &str = "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5\rEVN||20230101120000\rPID|||MRN123^^^Hospital^MR||Doe^John";

    #[test]
    fn boundary_pass_records_ids_without_tokenizing() -> Result<(), Hl7ParseError> {
        let lazy = Parser::parse_lazy(SAMPLE.as_bytes(), &ParserConfig::default())?;

        assert_eq!(lazy.len(), 3);
        assert_eq!(lazy.id(0), Some("MSH"));
        assert_eq!(lazy.id(1), Some("EVN"));
        assert_eq!(lazy.id(2), Some("PID"));
        // the header is tokenized for charset resolution; the body is not
        assert!(lazy.is_tokenized(0));
        assert!(!lazy.is_tokenized(1));
        assert!(!lazy.is_tokenized(2));
        Ok(())
    }

    #[test]
    fn first_access_tokenizes_and_caches() -> Result<(), Hl7ParseError> {
        let lazy = Parser::parse_lazy(SAMPLE.as_bytes(), &ParserConfig::default())?;

        let pid = lazy.segment(2).unwrap();
        assert_eq!(pid.field_raw(5, lazy.separators()), "Doe^John");
        assert!(lazy.is_tokenized(2));

        // the cache hands back shared storage
        let again = lazy.segment(2).unwrap();
        assert!(pid.shares_storage(&again));
        Ok(())
    }

    #[test]
    fn materialize_matches_eager_parse() -> Result<(), Hl7ParseError> {
        let lazy = Parser::parse_lazy(SAMPLE.as_bytes(), &ParserConfig::default())?;
        let (eager, _) = Parser::parse_str(SAMPLE, &ParserConfig::default())?;
        assert_eq!(lazy.materialize(), eager);
        Ok(())
    }

    #[test]
    fn dropped_segments_stay_dropped() -> Result<(), Hl7ParseError> {
        let source = "MSH|^~\\&|A|B|C|D|20230101||ADT^A01|1|P|2.5\rZZZ|x\rPID|1";
        let lazy = Parser::parse_lazy(source.as_bytes(), &ParserConfig::default())?;

        assert_eq!(lazy.len(), 3);
        assert!(lazy.segment(1).is_none());
        assert_eq!(lazy.diagnostics().len(), 1);
        assert_eq!(lazy.materialize().segment_count(), 2);
        Ok(())
    }
}
