//! The indexed strategy: one pass building a point-lookup table.
//!
//! The first pass maps `(segment id, occurrence)` to the byte range of
//! that segment line, so later lookups tokenize exactly one segment in
//! O(1) regardless of message size.  Useful for pulling a handful of
//! fields out of large results messages.

use std::collections::HashMap;
use std::ops::Range;

use super::{detect_separators, resolve_decoder, split_segments, tokenize_segment, ParserConfig, SegmentOutcome};
use crate::charset::TextDecoder;
use crate::diagnostics::Diagnostics;
use crate::segments::Segment;
use crate::separators::Separators;
use crate::Hl7ParseError;

/// A point-lookup view over a message buffer.
pub struct IndexedMessage<'a> {
    source: &'a [u8],
    delims: Separators,
    decoder: TextDecoder,
    /// `(id, 1-based occurrence)` to byte range of the segment line.
    index: HashMap<(String, usize), Range<usize>>,
    /// Source order of (id, range), for iteration.
    order: Vec<(String, Range<usize>)>,
}

impl<'a> IndexedMessage<'a> {
    pub(crate) fn parse(
        bytes: &'a [u8],
        config: &ParserConfig,
    ) -> Result<(IndexedMessage<'a>, Diagnostics), Hl7ParseError> {
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
        let header = match tokenize_segment(lines[0], 1, &delims, &TextDecoder::utf8(), config, &mut diags)? {
            SegmentOutcome::Keep(segment) => Some(segment),
            SegmentOutcome::Skip => None,
        };
        let decoder = resolve_decoder(header.as_ref(), config, &mut diags)?;

        let base = bytes.as_ptr() as usize;
        let mut index = HashMap::new();
        let mut order = Vec::with_capacity(lines.len());
        let mut occurrences: HashMap<String, usize> = HashMap::new();

        for line in &lines {
            let start = line.as_ptr() as usize - base;
            let range = start..start + line.len();
            let id: String = line
                .iter()
                .take_while(|b| **b != delims.field as u8)
                .take(4)
                .map(|b| *b as char)
                .collect();

            let occurrence = occurrences.entry(id.clone()).or_insert(0);
            *occurrence += 1;
            index.insert((id.clone(), *occurrence), range.clone());
            order.push((id, range));
        }

        Ok((
            IndexedMessage {
                source: bytes,
                delims,
                decoder,
                index,
                order,
            },
            diags,
        ))
    }

    pub fn separators(&self) -> &Separators {
        &self.delims
    }

    pub fn segment_count(&self) -> usize {
        self.order.len()
    }

    /// How many occurrences of `id` the message carries.
    pub fn occurrences(&self, id: &str) -> usize {
        self.order.iter().filter(|(i, _)| i == id).count()
    }

    /// The byte range of `(id, occurrence)`, 1-based occurrence.
    pub fn range(&self, id: &str, occurrence: usize) -> Option<Range<usize>> {
        self.index.get(&(id.to_string(), occurrence)).cloned()
    }

    /// Tokenize exactly the addressed segment.
    pub fn segment(&self, id: &str, occurrence: usize) -> Option<Segment> {
        let range = self.range(id, occurrence)?;
        let (text, _) = self.decoder.decode(&self.source[range]);
        Some(Segment::parse(&text, &self.delims))
    }

    /// Source-order segment ids.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|(id, _)| id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    const SAMPLE: &str = "MSH|^~\\&|GHH LAB|ELAB-3|GHH OE|BLDG4|200202150930||ORU^R01|CNTRL-3456|P|2.4\rOBX|1|SN|1554-5^GLUCOSE||^182|mg/dl\rNTE|1||interim\rOBX|2|SN|1495-2^KETONES||^9|mg/dl";

    #[test]
    fn index_maps_id_and_occurrence_to_ranges() -> Result<(), Hl7ParseError> {
        let (indexed, diags) = Parser::parse_indexed(SAMPLE.as_bytes(), &ParserConfig::default())?;

        assert_eq!(indexed.segment_count(), 4);
        assert_eq!(indexed.occurrences("OBX"), 2);
        assert!(indexed.range("OBX", 2).is_some());
        assert!(indexed.range("OBX", 3).is_none());
        assert!(diags.is_empty());
        Ok(())
    }

    #[test]
    fn point_lookup_tokenizes_one_segment() -> Result<(), Hl7ParseError> {
        let (indexed, _) = Parser::parse_indexed(SAMPLE.as_bytes(), &ParserConfig::default())?;

        let second = indexed.segment("OBX", 2).unwrap();
        assert_eq!(second.field_raw(1, indexed.separators()), "2");
        let field3 = second.field(3).as_option().unwrap();
        assert_eq!(field3.component(2).as_option().unwrap().as_str(), Some("KETONES"));
        Ok(())
    }

    #[test]
    fn ids_iterate_in_source_order() -> Result<(), Hl7ParseError> {
        let (indexed, _) = Parser::parse_indexed(SAMPLE.as_bytes(), &ParserConfig::default())?;
        let ids: Vec<&str> = indexed.ids().collect();
        assert_eq!(ids, vec!["MSH", "OBX", "NTE", "OBX"]);
        Ok(())
    }
}
