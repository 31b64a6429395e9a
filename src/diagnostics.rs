//! Diagnostic accumulation for the parser, framer and validator.
//!
//! Recoverable findings never abort a parse on their own; they are pushed
//! onto a [`Diagnostics`] accumulator, each tagged with a severity, a short
//! code and a [`PathLocator`] pointing into the message.  Strict mode and
//! the error-recovery settings decide what ultimately becomes fatal.

use std::fmt;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Short machine-readable codes for everything the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    /// First segment of the input is not MSH/BHS/FHS.
    NoHeader,
    /// Segment id is not in the standard set and custom segments are off.
    UnknownSegment,
    /// Field contents could not be tokenized.
    MalformedField,
    /// Bad `\X..\` hex or an unknown escape sequence.
    MalformedEscape,
    /// Header charset differs from the configured encoding.
    CharsetMismatch,
    /// Header charset is recognized but no decoder is available.
    UnsupportedCharset,
    /// Byte cap exceeded.
    MessageTooLarge,
    /// Frame or stream ended mid-message.
    MessageTruncated,
    /// Repetition count outside the declared min..max.
    CardinalityViolation,
    /// Value does not match its declared data type.
    DataTypeViolation,
    /// Required-bound code missing from its value set.
    ValueSetViolation,
    /// Framer saw bytes outside a frame.
    ProtocolJunk,
    /// Structure database fell back to an older version catalog.
    SchemaFallback,
    /// Object pool hit rate dropped below the configured floor.
    PoolHitRateLow,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            DiagnosticCode::NoHeader => "NoHeader",
            DiagnosticCode::UnknownSegment => "UnknownSegment",
            DiagnosticCode::MalformedField => "MalformedField",
            DiagnosticCode::MalformedEscape => "MalformedEscape",
            DiagnosticCode::CharsetMismatch => "CharsetMismatch",
            DiagnosticCode::UnsupportedCharset => "UnsupportedCharset",
            DiagnosticCode::MessageTooLarge => "MessageTooLarge",
            DiagnosticCode::MessageTruncated => "MessageTruncated",
            DiagnosticCode::CardinalityViolation => "CardinalityViolation",
            DiagnosticCode::DataTypeViolation => "DataTypeViolation",
            DiagnosticCode::ValueSetViolation => "ValueSetViolation",
            DiagnosticCode::ProtocolJunk => "ProtocolJunk",
            DiagnosticCode::SchemaFallback => "SchemaFallback",
            DiagnosticCode::PoolHitRateLow => "PoolHitRateLow",
        };
        write!(f, "{}", code)
    }
}

/// Points at the part of a message a finding refers to.
///
/// All indices are 1-based, matching how HL7 interface analysts count.
/// `segment_index` is the 1-based position of the segment in the message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathLocator {
    pub segment_index: Option<usize>,
    pub segment_id: Option<String>,
    pub field: Option<usize>,
    pub repetition: Option<usize>,
    pub component: Option<usize>,
    pub subcomponent: Option<usize>,
}

impl PathLocator {
    pub fn new() -> Self {
        PathLocator::default()
    }

    pub fn segment(index: usize, id: &str) -> Self {
        PathLocator {
            segment_index: Some(index),
            segment_id: Some(id.to_string()),
            ..PathLocator::default()
        }
    }

    pub fn field(mut self, field: usize) -> Self {
        self.field = Some(field);
        self
    }

    pub fn repetition(mut self, repetition: usize) -> Self {
        self.repetition = Some(repetition);
        self
    }

    pub fn component(mut self, component: usize) -> Self {
        self.component = Some(component);
        self
    }

    pub fn subcomponent(mut self, subcomponent: usize) -> Self {
        self.subcomponent = Some(subcomponent);
        self
    }
}

impl fmt::Display for PathLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.segment_id, self.segment_index) {
            (Some(id), Some(idx)) => write!(f, "{}[{}]", id, idx)?,
            (Some(id), None) => write!(f, "{}", id)?,
            (None, Some(idx)) => write!(f, "segment {}", idx)?,
            (None, None) => write!(f, "message")?,
        }
        if let Some(field) = self.field {
            write!(f, ".F{}", field)?;
        }
        if let Some(repetition) = self.repetition {
            write!(f, ".R{}", repetition)?;
        }
        if let Some(component) = self.component {
            write!(f, ".C{}", component)?;
        }
        if let Some(subcomponent) = self.subcomponent {
            write!(f, ".S{}", subcomponent)?;
        }
        Ok(())
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub path: PathLocator,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagnosticCode, path: PathLocator, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            code,
            path,
            message: message.into(),
        }
    }

    pub fn warning(code: DiagnosticCode, path: PathLocator, message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Warning, code, path, message)
    }

    pub fn error(code: DiagnosticCode, path: PathLocator, message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, code, path, message)
    }

    pub fn info(code: DiagnosticCode, path: PathLocator, message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Info, code, path, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] at {}: {}", self.severity, self.code, self.path, self.message)
    }
}

/// Ordered accumulator of findings.  Findings are kept in source order
/// within a message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// First finding at `severity` or above, if any.
    pub fn first_at_least(&self, severity: Severity) -> Option<&Diagnostic> {
        self.items.iter().find(|d| d.severity >= severity)
    }

    pub fn has_errors(&self) -> bool {
        self.first_at_least(Severity::Error).is_some()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Findings carrying the given code.
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.code == code)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
