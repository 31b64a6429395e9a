//! Strategy-driven tokenization of ER7 wire text into the node model.
//!
//! [`Parser::parse`] runs a whole buffer through the configured strategy.
//! The lazy, streaming and indexed variants live in their own modules and
//! share the per-segment logic here, so recovery behavior is identical no
//! matter how the bytes arrive.

pub mod eager;
pub mod indexed;
pub mod lazy;
pub mod streaming;

pub use indexed::IndexedMessage;
pub use lazy::LazyMessage;
pub use streaming::{StreamingOptions, StreamingParser};

use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::charset::{CharsetCode, TextDecoder};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, PathLocator, Severity};
use crate::intern;
use crate::message::{Message, KNOWN_VERSIONS};
use crate::segments::Segment;
use crate::separators::Separators;
use crate::Hl7ParseError;

/// What byte sequence ends a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentTerminator {
    /// Carriage return, the wire default.
    Cr,
    /// Line feed.
    Lf,
    /// The two-byte pair.
    CrLf,
    /// Any of the above, treating `\r\n` as a single terminator.
    Any,
}

/// What to do when a recoverable problem is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorRecovery {
    /// Abort at the first problem.
    Strict,
    /// Drop the offending segment, diagnose, continue.
    SkipInvalidSegments,
    /// Keep whatever can be salvaged, diagnose, continue.
    BestEffort,
}

/// How the input is tokenized.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Tokenize everything up front.
    Eager,
    /// Record segment boundaries only; tokenize a segment on first access.
    Lazy,
    /// Pump bytes in, pull segments out.
    Streaming(StreamingOptions),
    /// Feed the input through the streaming machinery in fixed-size chunks.
    Chunked { chunk_size: usize },
    /// Build a (segment id, occurrence) index over the input for O(1)
    /// point lookups.
    Indexed,
}

/// Cooperative cancellation shared between a transport and the streaming
/// components.  Checked between buffer boundaries; never mid-segment.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything the tokenizer can be told about how to behave.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    pub strategy: Strategy,
    /// Promote every diagnostic at warning or above to a hard failure.
    pub strict_mode: bool,
    /// Byte cap; zero means unlimited.
    pub max_message_size: usize,
    /// Admit three-letter ids outside the standard set.
    pub allow_custom_segments: bool,
    /// Default text decoder when the header declares nothing, or when the
    /// header is ignored.
    pub encoding: Option<CharsetCode>,
    pub segment_terminator: SegmentTerminator,
    /// Read the header to override the default delimiters.
    pub auto_detect_delimiters: bool,
    pub error_recovery: ErrorRecovery,
    /// Honor MSH-18 when picking the decoder.
    pub respect_header_charset: bool,
    /// Emit a mismatch diagnostic when MSH-18 and `encoding` disagree.
    pub validate_encoding: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            strategy: Strategy::Eager,
            strict_mode: false,
            max_message_size: 0,
            allow_custom_segments: false,
            encoding: None,
            segment_terminator: SegmentTerminator::Cr,
            auto_detect_delimiters: true,
            error_recovery: ErrorRecovery::SkipInvalidSegments,
            respect_header_charset: true,
            validate_encoding: false,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        ParserConfig::default()
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    pub fn allow_custom_segments(mut self, allow: bool) -> Self {
        self.allow_custom_segments = allow;
        self
    }

    pub fn encoding(mut self, encoding: CharsetCode) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn segment_terminator(mut self, terminator: SegmentTerminator) -> Self {
        self.segment_terminator = terminator;
        self
    }

    pub fn auto_detect_delimiters(mut self, detect: bool) -> Self {
        self.auto_detect_delimiters = detect;
        self
    }

    pub fn error_recovery(mut self, recovery: ErrorRecovery) -> Self {
        self.error_recovery = recovery;
        self
    }

    pub fn respect_header_charset(mut self, respect: bool) -> Self {
        self.respect_header_charset = respect;
        self
    }

    pub fn validate_encoding(mut self, validate: bool) -> Self {
        self.validate_encoding = validate;
        self
    }
}

/// Entry point for whole-buffer parsing.
pub struct Parser;

impl Parser {
    /// Parse a byte buffer into a message plus the diagnostics gathered on
    /// the way.
    pub fn parse(bytes: &[u8], config: &ParserConfig) -> Result<(Message, Diagnostics), Hl7ParseError> {
        match &config.strategy {
            Strategy::Eager | Strategy::Lazy | Strategy::Indexed => eager::parse(bytes, config),
            Strategy::Streaming(options) => {
                Parser::drive_streaming(bytes, config, options.buffer_size.max(1))
            }
            Strategy::Chunked { chunk_size } => {
                Parser::drive_streaming(bytes, config, (*chunk_size).max(1))
            }
        }
    }

    /// Parse an `&str`; see [`Parser::parse`].
    pub fn parse_str(source: &str, config: &ParserConfig) -> Result<(Message, Diagnostics), Hl7ParseError> {
        Parser::parse(source.as_bytes(), config)
    }

    /// Boundary-offset parse; segments tokenize on first access.
    pub fn parse_lazy<'a>(bytes: &'a [u8], config: &ParserConfig) -> Result<LazyMessage<'a>, Hl7ParseError> {
        LazyMessage::parse(bytes, config)
    }

    /// One pass building a `(segment id, occurrence) -> byte range` index.
    pub fn parse_indexed<'a>(
        bytes: &'a [u8],
        config: &ParserConfig,
    ) -> Result<(IndexedMessage<'a>, Diagnostics), Hl7ParseError> {
        IndexedMessage::parse(bytes, config)
    }

    fn drive_streaming(
        bytes: &[u8],
        config: &ParserConfig,
        chunk_size: usize,
    ) -> Result<(Message, Diagnostics), Hl7ParseError> {
        let mut parser = StreamingParser::new(config.clone());
        let mut segments = Vec::new();

        for chunk in bytes.chunks(chunk_size) {
            let mut offset = 0;
            while offset < chunk.len() {
                let consumed = parser.feed(&chunk[offset..])?;
                offset += consumed;
                while let Some(segment) = parser.next() {
                    segments.push(segment);
                }
                if consumed == 0 {
                    // a single segment larger than the buffer cap
                    return Err(Hl7ParseError::BufferFull {
                        needed: chunk.len() - offset,
                        capacity: parser.buffer_capacity(),
                    });
                }
            }
        }

        let diagnostics = parser.finish()?;
        while let Some(segment) = parser.next() {
            segments.push(segment);
        }

        let delims = parser.separators().unwrap_or_default();
        debug!("streaming drive produced {} segments", segments.len());
        Ok((Message::from_parts(delims, segments), diagnostics))
    }
}

/// Push a diagnostic, honoring strict-mode promotion.
pub(crate) fn record(
    diag: Diagnostic,
    diags: &mut Diagnostics,
    config: &ParserConfig,
) -> Result<(), Hl7ParseError> {
    if config.strict_mode && diag.severity >= Severity::Warning {
        return Err(Hl7ParseError::StrictModeFailure(diag));
    }
    diags.push(diag);
    Ok(())
}

/// Split a complete buffer into segment lines.  Empty lines are dropped;
/// the wire commonly ends with a trailing terminator.
pub(crate) fn split_segments(bytes: &[u8], terminator: SegmentTerminator) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match terminator_at(bytes, i, terminator) {
            Some(len) => {
                if i > start {
                    lines.push(&bytes[start..i]);
                }
                i += len;
                start = i;
            }
            None => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&bytes[start..]);
    }
    lines
}

/// If a terminator starts at `i`, its byte length.
pub(crate) fn terminator_at(bytes: &[u8], i: usize, terminator: SegmentTerminator) -> Option<usize> {
    let b = bytes[i];
    match terminator {
        SegmentTerminator::Cr => (b == b'\r').then(|| 1),
        SegmentTerminator::Lf => (b == b'\n').then(|| 1),
        SegmentTerminator::CrLf => {
            (b == b'\r' && bytes.get(i + 1) == Some(&b'\n')).then(|| 2)
        }
        SegmentTerminator::Any => match b {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => Some(2),
            b'\r' | b'\n' => Some(1),
            _ => None,
        },
    }
}

pub(crate) enum SegmentOutcome {
    Keep(Segment),
    Skip,
}

/// The shared per-segment path: decode, check the id, tokenize.
///
/// `index` is the 1-based position of the segment in the message.
pub(crate) fn tokenize_segment(
    line: &[u8],
    index: usize,
    delims: &Separators,
    decoder: &TextDecoder,
    config: &ParserConfig,
    diags: &mut Diagnostics,
) -> Result<SegmentOutcome, Hl7ParseError> {
    if line.is_empty() {
        return Ok(SegmentOutcome::Skip);
    }

    let (text, had_errors) = decoder.decode(line);
    let id_text: String = text.chars().take_while(|c| *c != delims.field).collect();

    if had_errors {
        record(
            Diagnostic::warning(
                DiagnosticCode::MalformedField,
                PathLocator::segment(index, &id_text),
                "undecodable bytes replaced during charset decoding",
            ),
            diags,
            config,
        )?;
    }

    let id_ok = id_text.len() == 3 && id_text.chars().all(|c| c.is_ascii_alphanumeric());
    let standard = id_ok && intern::is_standard(&id_text);
    let admitted = standard || (id_ok && config.allow_custom_segments);

    if !admitted {
        let diag = Diagnostic::warning(
            DiagnosticCode::UnknownSegment,
            PathLocator::segment(index, &id_text),
            format!("segment id '{}' is not a standard identifier", id_text),
        );
        match config.error_recovery {
            ErrorRecovery::Strict => return Err(Hl7ParseError::UnknownSegment(id_text)),
            ErrorRecovery::SkipInvalidSegments => {
                record(diag, diags, config)?;
                return Ok(SegmentOutcome::Skip);
            }
            ErrorRecovery::BestEffort => {
                record(diag, diags, config)?;
                // fall through and keep the segment as an opaque bag of fields
            }
        }
    }

    Ok(SegmentOutcome::Keep(Segment::parse(&text, delims)))
}

/// Derive the separators for an input, or fail when there is no usable header.
pub(crate) fn detect_separators(
    first_line: &[u8],
    config: &ParserConfig,
    diags: &mut Diagnostics,
) -> Result<Separators, Hl7ParseError> {
    let looks_like_header = first_line.len() >= 3
        && matches!(&first_line[..3], b"MSH" | b"BHS" | b"FHS");

    if !looks_like_header {
        if config.error_recovery == ErrorRecovery::BestEffort {
            record(
                Diagnostic::error(
                    DiagnosticCode::NoHeader,
                    PathLocator::segment(1, &String::from_utf8_lossy(
                        &first_line[..first_line.len().min(3)],
                    )),
                    "first segment is not MSH/BHS/FHS; assuming default delimiters",
                ),
                diags,
                config,
            )?;
            return Ok(Separators::default());
        }
        return Err(Hl7ParseError::NoHeader);
    }

    if config.auto_detect_delimiters {
        Separators::detect(first_line)
    } else {
        Ok(Separators::default())
    }
}

/// Pick the text decoder for the message body from MSH-18, the configured
/// default and the two charset switches.
pub(crate) fn resolve_decoder(
    header: Option<&Segment>,
    config: &ParserConfig,
    diags: &mut Diagnostics,
) -> Result<TextDecoder, Hl7ParseError> {
    let mut header_value: Option<String> = None;
    if let Some(msh) = header {
        if let Some(field) = msh.field(18).as_option() {
            if field.repeat_count() > 1 {
                // Multi-charset messages are decoded with the first charset
                // only; the rest are tolerated with a diagnostic.
                record(
                    Diagnostic::warning(
                        DiagnosticCode::UnsupportedCharset,
                        PathLocator::segment(1, "MSH").field(18),
                        format!(
                            "{} character sets declared; decoding with the first only",
                            field.repeat_count()
                        ),
                    ),
                    diags,
                    config,
                )?;
            }
            header_value = field
                .first()
                .component(1)
                .as_option()
                .and_then(|c| c.as_str())
                .map(|s| s.to_string());
        }
    }

    let header_code = match header_value.as_deref() {
        Some(value) => {
            let code = CharsetCode::from_header(value);
            if code.is_none() {
                record(
                    Diagnostic::warning(
                        DiagnosticCode::UnsupportedCharset,
                        PathLocator::segment(1, "MSH").field(18),
                        format!("character set '{}' is not in HL7 Table 0211", value),
                    ),
                    diags,
                    config,
                )?;
            }
            code
        }
        None => None,
    };

    if config.validate_encoding {
        if let (Some(header), Some(configured)) = (header_code, config.encoding) {
            if header != configured {
                record(
                    Diagnostic::warning(
                        DiagnosticCode::CharsetMismatch,
                        PathLocator::segment(1, "MSH").field(18),
                        format!(
                            "header declares {} but the configured encoding is {}",
                            header.code(),
                            configured.code()
                        ),
                    ),
                    diags,
                    config,
                )?;
            }
        }
    }

    let chosen = if config.respect_header_charset {
        header_code.or(config.encoding)
    } else {
        config.encoding.or(header_code)
    };

    let chosen = match chosen {
        Some(code) => code,
        None => return Ok(TextDecoder::utf8()),
    };

    // Delimiter detection only works on ASCII-compatible encodings, so the
    // wide Unicode forms cannot drive body decoding here.
    let ascii_compatible = !matches!(chosen, CharsetCode::Utf16 | CharsetCode::Utf32);

    if !chosen.is_supported() || !ascii_compatible {
        record(
            Diagnostic::warning(
                DiagnosticCode::UnsupportedCharset,
                PathLocator::segment(1, "MSH").field(18),
                format!(
                    "character set {} recognized but not directly supported; decoding as UTF-8",
                    chosen.code()
                ),
            ),
            diags,
            config,
        )?;
        return Ok(TextDecoder::utf8());
    }

    Ok(TextDecoder::for_code(chosen))
}

/// Flag unknown MSH-12 values; the model invariant allows 2.1 through 2.8.
pub(crate) fn check_version(
    message: &Message,
    config: &ParserConfig,
    diags: &mut Diagnostics,
) -> Result<(), Hl7ParseError> {
    if let Some(version) = message.version() {
        if !KNOWN_VERSIONS.contains(&version) {
            let diag = Diagnostic::warning(
                DiagnosticCode::DataTypeViolation,
                PathLocator::segment(1, "MSH").field(12),
                format!("version '{}' is not an HL7 v2.x version", version),
            );
            return record(diag, diags, config);
        }
    }
    Ok(())
}
