//! The streaming strategy: pump bytes in, pull segments out.
//!
//! The parser owns no I/O.  A transport calls [`StreamingParser::feed`]
//! with whatever bytes it has; complete segments become available through
//! [`StreamingParser::next`] as soon as their terminator arrives.  The
//! receive buffer is bounded: `feed` consumes only what fits and reports
//! how much, which is the back-pressure signal.

use log::{debug, trace};
use std::collections::VecDeque;
use std::sync::Arc;

use super::{
    detect_separators, record, resolve_decoder, terminator_at, tokenize_segment, CancelToken,
    ErrorRecovery, ParserConfig, SegmentOutcome, Strategy,
};
use crate::charset::TextDecoder;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, PathLocator};
use crate::pool::{self, ObjectPool, Pooled};
use crate::segments::Segment;
use crate::separators::Separators;
use crate::Hl7ParseError;

/// Buffer tuning for the streaming strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingOptions {
    /// Initial receive-buffer bound.
    pub buffer_size: usize,
    /// Capacity of the scoped buffer pool backing this parser.
    pub max_pool_size: usize,
    /// Allow the buffer bound to stretch up to `max_buffer_size`.
    pub auto_grow: bool,
    /// Hard bound when `auto_grow` is on.
    pub max_buffer_size: usize,
}

impl Default for StreamingOptions {
    fn default() -> Self {
        StreamingOptions {
            buffer_size: 8 * 1024,
            max_pool_size: pool::DEFAULT_POOL_CAPACITY,
            auto_grow: true,
            max_buffer_size: 1024 * 1024,
        }
    }
}

/// Incremental ER7 parser.  See the module docs for the feed/next/finish
/// protocol.
pub struct StreamingParser {
    config: ParserConfig,
    options: StreamingOptions,
    pool: Arc<ObjectPool<Vec<u8>>>,
    buffer: Pooled<Vec<u8>>,
    delims: Option<Separators>,
    decoder: TextDecoder,
    pending: VecDeque<Segment>,
    diags: Diagnostics,
    /// 1-based index of the next segment line.
    segment_index: usize,
    total_bytes: usize,
    pending_high_water: usize,
    cancel: Option<CancelToken>,
    finished: bool,
}

impl StreamingParser {
    pub fn new(config: ParserConfig) -> StreamingParser {
        let options = match &config.strategy {
            Strategy::Streaming(options) => options.clone(),
            _ => StreamingOptions::default(),
        };
        let pool = Arc::new(ObjectPool::new(options.max_pool_size));
        StreamingParser::with_pool(config, options, pool)
    }

    /// Use an injected buffer pool (shared with a framer, or a test scope).
    pub fn with_pool(
        config: ParserConfig,
        options: StreamingOptions,
        pool: Arc<ObjectPool<Vec<u8>>>,
    ) -> StreamingParser {
        let buffer = pool.acquire();
        StreamingParser {
            config,
            options,
            pool,
            buffer,
            delims: None,
            decoder: TextDecoder::utf8(),
            pending: VecDeque::new(),
            diags: Diagnostics::new(),
            segment_index: 1,
            total_bytes: 0,
            pending_high_water: 0,
            cancel: None,
            finished: false,
        }
    }

    /// Check this token between buffer boundaries; when it fires the
    /// partial buffer is discarded and storage goes back to the pool.
    pub fn with_cancellation(mut self, token: CancelToken) -> StreamingParser {
        self.cancel = Some(token);
        self
    }

    /// The effective receive-buffer bound.
    pub fn buffer_capacity(&self) -> usize {
        if self.options.auto_grow {
            self.options.max_buffer_size
        } else {
            self.options.buffer_size
        }
    }

    /// How many more bytes `feed` will currently accept.
    pub fn remaining_capacity(&self) -> usize {
        self.buffer_capacity().saturating_sub(self.buffer.len())
    }

    /// Separators detected from the header, once it has been seen.
    pub fn separators(&self) -> Option<Separators> {
        self.delims
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    /// Largest number of parsed-but-unconsumed segments observed.
    pub fn pending_high_water(&self) -> usize {
        self.pending_high_water
    }

    /// Offer bytes to the parser.  Returns how many were accepted; fewer
    /// than `bytes.len()` means the buffer is full and the transport
    /// should pause until segments have been drained.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<usize, Hl7ParseError> {
        if self.finished {
            return Ok(0);
        }
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                debug!("cancellation observed; discarding partial buffer");
                self.discard();
                return Ok(0);
            }
        }

        let available = self.remaining_capacity();
        let consumed = available.min(bytes.len());

        self.total_bytes += consumed;
        if self.config.max_message_size > 0 && self.total_bytes > self.config.max_message_size {
            return Err(Hl7ParseError::MessageTooLarge {
                size: self.total_bytes,
                max: self.config.max_message_size,
            });
        }

        self.buffer.extend_from_slice(&bytes[..consumed]);
        self.scan()?;
        Ok(consumed)
    }

    /// Pull the next complete segment, if one is ready.
    pub fn next(&mut self) -> Option<Segment> {
        self.pending.pop_front()
    }

    /// Signal end of input.  A non-empty remainder is tokenized as the
    /// final segment (end of input counts as a terminator), except under
    /// strict recovery where a missing terminator is a truncation.
    pub fn finish(&mut self) -> Result<Diagnostics, Hl7ParseError> {
        self.finished = true;

        if !self.buffer.is_empty() {
            if self.config.error_recovery == ErrorRecovery::Strict {
                return Err(Hl7ParseError::MessageTruncated);
            }
            let line = std::mem::take(&mut *self.buffer);
            self.process_line(&line)?;
        }

        if self.delims.is_none() && self.pending.is_empty() && self.segment_index == 1 {
            // nothing ever arrived
            record(
                Diagnostic::warning(
                    DiagnosticCode::MessageTruncated,
                    PathLocator::new(),
                    "stream ended before a header segment was seen",
                ),
                &mut self.diags,
                &self.config,
            )?;
        }

        Ok(self.diags.clone())
    }

    /// Drop any partial state and return buffers to the pool.
    pub fn cancel(&mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        self.buffer.clear();
        self.pending.clear();
        self.finished = true;
    }

    fn scan(&mut self) -> Result<(), Hl7ParseError> {
        let mut start = 0;
        let mut i = 0;

        // Lines are carved out of the buffer first so tokenization below
        // does not fight the borrow on `self.buffer`.
        let mut lines: Vec<Vec<u8>> = Vec::new();
        {
            let buf: &[u8] = &self.buffer;
            while i < buf.len() {
                match terminator_at(buf, i, self.config.segment_terminator) {
                    Some(len) => {
                        if i > start {
                            lines.push(buf[start..i].to_vec());
                        }
                        i += len;
                        start = i;
                    }
                    None => i += 1,
                }
            }
        }
        if start > 0 {
            self.buffer.drain(..start);
        }

        for line in lines {
            self.process_line(&line)?;
        }
        Ok(())
    }

    fn process_line(&mut self, line: &[u8]) -> Result<(), Hl7ParseError> {
        if line.is_empty() {
            return Ok(());
        }

        if self.delims.is_none() {
            let delims = detect_separators(line, &self.config, &mut self.diags)?;
            self.delims = Some(delims);

            let header = match tokenize_segment(
                line,
                self.segment_index,
                &delims,
                &TextDecoder::utf8(),
                &self.config,
                &mut self.diags,
            )? {
                SegmentOutcome::Keep(segment) => Some(segment),
                SegmentOutcome::Skip => None,
            };
            self.decoder = resolve_decoder(header.as_ref(), &self.config, &mut self.diags)?;
            self.segment_index += 1;

            if let Some(header) = header {
                self.enqueue(header);
            }
            return Ok(());
        }

        let delims = self.delims.unwrap_or_default();
        let outcome = tokenize_segment(
            line,
            self.segment_index,
            &delims,
            &self.decoder,
            &self.config,
            &mut self.diags,
        )?;
        self.segment_index += 1;

        if let SegmentOutcome::Keep(segment) = outcome {
            self.enqueue(segment);
        }
        Ok(())
    }

    fn enqueue(&mut self, segment: Segment) {
        trace!("segment {} ready", segment.id());
        self.pending.push_back(segment);
        if self.pending.len() > self.pending_high_water {
            self.pending_high_water = self.pending.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    const ADMIT: &str = "MSH|^~\\&|SendApp|SendFac|RecApp|RecFac|20230101120000||ADT^A01|12345|P|2.5\rEVN||20230101120000\rPID|||MRN123^^^Hospital^MR||Doe^John\r";

    #[test]
    fn byte_at_a_time_feed_yields_every_segment() -> Result<(), Hl7ParseError> {
        let mut parser = StreamingParser::new(ParserConfig::default());
        let mut segments = Vec::new();

        for byte in ADMIT.as_bytes() {
            assert_eq!(parser.feed(std::slice::from_ref(byte))?, 1);
            while let Some(segment) = parser.next() {
                segments.push(segment);
            }
        }
        parser.finish()?;
        while let Some(segment) = parser.next() {
            segments.push(segment);
        }

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].id().as_str(), "MSH");
        assert_eq!(segments[2].id().as_str(), "PID");
        Ok(())
    }

    #[test]
    fn chunking_does_not_change_the_result() -> Result<(), Hl7ParseError> {
        for chunk_size in [1usize, 2, 3, 7, 64, 4096] {
            let config = ParserConfig::default().strategy(Strategy::Chunked { chunk_size });
            let (msg, _) = Parser::parse_str(ADMIT, &config)?;
            let (eager_msg, _) = Parser::parse_str(ADMIT, &ParserConfig::default())?;
            assert_eq!(msg, eager_msg, "chunk size {}", chunk_size);
        }
        Ok(())
    }

    #[test]
    fn unterminated_final_segment_is_flushed_at_finish() -> Result<(), Hl7ParseError> {
        let mut parser = StreamingParser::new(ParserConfig::default());
        parser.feed(b"MSH|^~\\&|A|B|C|D|20230101||ADT^A01|1|P|2.5\rPID|1")?;
        parser.finish()?;

        let mut ids = Vec::new();
        while let Some(segment) = parser.next() {
            ids.push(segment.id().as_str().to_string());
        }
        assert_eq!(ids, vec!["MSH", "PID"]);
        Ok(())
    }

    #[test]
    fn strict_recovery_treats_missing_terminator_as_truncation() {
        let config = ParserConfig::default().error_recovery(ErrorRecovery::Strict);
        let mut parser = StreamingParser::new(config);
        parser.feed(b"MSH|^~\\&|A|B|C|D|20230101||ADT^A01|1|P|2.5\rPID|1").unwrap();
        assert_eq!(parser.finish().unwrap_err(), Hl7ParseError::MessageTruncated);
    }

    #[test]
    fn bounded_buffer_applies_back_pressure() -> Result<(), Hl7ParseError> {
        let options = StreamingOptions {
            buffer_size: 8,
            auto_grow: false,
            ..StreamingOptions::default()
        };
        let config = ParserConfig::default().strategy(Strategy::Streaming(options.clone()));
        let mut parser = StreamingParser::new(config);

        let consumed = parser.feed(b"MSH|^~\\&|longer than eight bytes")?;
        assert_eq!(consumed, 8);
        assert_eq!(parser.remaining_capacity(), 0);
        Ok(())
    }

    #[test]
    fn max_message_size_is_cumulative() {
        let config = ParserConfig::default().max_message_size(16);
        let mut parser = StreamingParser::new(config);
        parser.feed(b"MSH|^~\\&|A\r").unwrap();
        let result = parser.feed(b"PID|1|2|3\r");
        match result {
            Err(Hl7ParseError::MessageTooLarge { .. }) => {}
            other => panic!("expected MessageTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn cancellation_discards_partial_state() -> Result<(), Hl7ParseError> {
        let token = CancelToken::new();
        let mut parser =
            StreamingParser::new(ParserConfig::default()).with_cancellation(token.clone());

        parser.feed(b"MSH|^~\\&|A|B|C|D|20230101||ADT^A01|1|P|2.5\rPID|partial")?;
        token.cancel();
        assert_eq!(parser.feed(b" more")?, 0);
        // undelivered segments and the partial PID are both discarded
        let mut ids = Vec::new();
        while let Some(segment) = parser.next() {
            ids.push(segment.id().as_str().to_string());
        }
        assert!(ids.is_empty());
        Ok(())
    }

    #[test]
    fn pending_high_water_tracks_unconsumed_segments() -> Result<(), Hl7ParseError> {
        let mut parser = StreamingParser::new(ParserConfig::default());
        parser.feed(ADMIT.as_bytes())?;
        assert_eq!(parser.pending_high_water(), 3);
        Ok(())
    }

    #[test]
    fn streaming_strategy_through_parser_facade() -> Result<(), Hl7ParseError> {
        let config = ParserConfig::default().strategy(Strategy::Streaming(StreamingOptions::default()));
        let (msg, diags) = Parser::parse_str(ADMIT, &config)?;
        assert_eq!(msg.segment_count(), 3);
        assert!(diags.is_empty());
        Ok(())
    }
}
