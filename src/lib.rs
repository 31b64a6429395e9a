/*!
# hl7v2-core

The HL7 v2.x core engine: a delimiter-sensitive ER7 (pipe-delimited) parser,
the message/segment/field/component/subcomponent data model, the escape
sequence processor, a streaming MLLP framer, a structural validator and a
fluent message builder.

Messages are parsed into an owned, value-semantic model that shares storage
on clone and deep-copies only the mutated path (copy-on-write).

## Example

```
use hl7v2_core::{Parser, ParserConfig};

# fn main() -> Result<(), hl7v2_core::Hl7ParseError> {
let hl7 = "MSH|^~\\&|GHH LAB|ELAB-3|GHH OE|BLDG4|200202150930||ORU^R01|CNTRL-3456|P|2.4\rOBR|1|845439";
let (message, diagnostics) = Parser::parse_str(hl7, &ParserConfig::default())?;

assert_eq!(message.message_type(), Some("ORU"));
assert_eq!(message.control_id(), Some("CNTRL-3456"));
assert!(diagnostics.is_empty());
# Ok(())
# }
```

Deep queries use the selector notation:

```
# use hl7v2_core::{Parser, ParserConfig};
# fn main() -> Result<(), hl7v2_core::Hl7ParseError> {
# let hl7 = "MSH|^~\\&|GHH LAB|ELAB-3|GHH OE|BLDG4|200202150930||ORU^R01|CNTRL-3456|P|2.4\rOBR|1|845439^GHH OE";
let (message, _) = Parser::parse_str(hl7, &ParserConfig::default())?;
assert_eq!(hl7v2_core::selector::query(&message, "OBR.F2.C2").as_deref(), Some("GHH OE"));
# Ok(())
# }
```
*/

use thiserror::Error;

pub mod batch;
pub mod builder;
pub mod charset;
pub mod diagnostics;
pub mod escape_sequence;
pub mod fields;
pub mod intern;
pub mod message;
pub mod mllp;
pub mod parser;
pub mod pool;
pub mod schema;
pub mod segments;
pub mod selector;
pub mod separators;
pub mod serializer;
pub mod typed;
pub mod validator;

pub use builder::MessageBuilder;
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, PathLocator, Severity};
pub use escape_sequence::EscapeSequence;
pub use message::Message;
pub use mllp::{Frame, Framer};
pub use parser::{ErrorRecovery, Parser, ParserConfig, SegmentTerminator, Strategy};
pub use segments::Segment;
pub use separators::Separators;
pub use validator::{ValidationResult, Validator};

/// Errors raised when HL7 source cannot be turned into a [`Message`].
///
/// Only fatal conditions surface here.  Recoverable conditions (unknown
/// segments, malformed escapes, charset mismatches...) are reported as
/// [`Diagnostic`]s on the accumulator returned alongside the message.
#[derive(Error, Debug, PartialEq)]
pub enum Hl7ParseError {
    /// The header segment is missing, too short, or declares duplicate
    /// delimiters.
    #[error("Invalid message header: {0}")]
    InvalidHeader(String),

    /// The first segment of the input is not MSH (or BHS/FHS for batches).
    #[error("First segment is not a message header")]
    NoHeader,

    /// The input exceeds the configured byte cap.
    #[error("Message of {size} bytes exceeds the configured cap of {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// The frame or stream ended in the middle of a message.
    #[error("Input ended mid-message")]
    MessageTruncated,

    /// A `\X..\` escape carried an odd number of hex digits, or hex that
    /// does not decode.
    #[error("Malformed escape sequence: \\{0}\\")]
    MalformedEscape(String),

    /// A segment id outside the standard set was found while custom
    /// segments are disabled, under strict recovery.
    #[error("Unknown segment id '{0}'")]
    UnknownSegment(String),

    /// A field could not be tokenized under the current delimiters.
    #[error("Malformed field at {0}")]
    MalformedField(PathLocator),

    /// A required value was absent.
    #[error("Missing required value")]
    MissingRequiredValue,

    /// Strict mode promoted a diagnostic to a hard failure.  Carries the
    /// first offending diagnostic, including its path locator.
    #[error("Strict mode failure: {0}")]
    StrictModeFailure(Diagnostic),

    /// A bounded buffer (streaming parser or framer) cannot accept more
    /// bytes and growth is disabled or exhausted.
    #[error("Buffer full: {needed} bytes needed, capacity {capacity}")]
    BufferFull { needed: usize, capacity: usize },

    /// A value failed data-type parsing (bad timestamp, non-numeric NM...).
    #[error("Invalid {datatype} value: '{value}'")]
    InvalidValue {
        datatype: &'static str,
        value: String,
    },
}
