use super::Hl7ParseError;
use std::fmt::Display;
use std::str::FromStr;

/// A helper struct to store the separator (delimiter) characters used to parse this message.
/// Note that HL7 allows each _message_ to define its own separators, although most messages
/// use the default set (available from [`Separators::default()`]).
///
/// The six characters are immutable for the lifetime of a message: the header
/// literally carries the delimiters it will itself be tokenized with, so
/// detection has to run before anything else looks at the bytes.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Separators {
    /// Segment terminator, spec fixed to `\r` (ASCII 13, 0x0D) on the wire
    pub segment: char,
    /// Field separator char, defaults to `|`
    pub field: char,
    /// Field repeat separator char, defaults to `~`
    pub repeat: char,
    /// Component separator char, defaults to `^`
    pub component: char,
    /// Sub-component separator char, defaults to `&`
    pub subcomponent: char,
    /// Character used to wrap an escape sequence, defaults to `\` (a single back slash)
    pub escape_char: char,
}

/// Header segment ids allowed to open an input and carry encoding characters.
const HEADER_IDS: [&[u8; 3]; 3] = [b"MSH", b"BHS", b"FHS"];

impl Separators {
    /// Detect the separators declared by the leading header segment.
    ///
    /// `header_prefix` must start with `MSH` (or `BHS`/`FHS` for batch and
    /// file wrappers) followed by the field separator and the four encoding
    /// characters, e.g. `MSH|^~\&`.
    pub fn detect(header_prefix: &[u8]) -> Result<Separators, Hl7ParseError> {
        if header_prefix.len() < 3 || !HEADER_IDS.iter().any(|id| &header_prefix[..3] == &id[..]) {
            return Err(Hl7ParseError::InvalidHeader(
                "input does not start with MSH, BHS or FHS".to_string(),
            ));
        }

        // Field separator plus the four encoding characters.
        let delims = &header_prefix[3..];
        if delims.len() < 5 {
            return Err(Hl7ParseError::InvalidHeader(format!(
                "header carries {} encoding character(s), expected 5",
                delims.len()
            )));
        }

        let found = Separators {
            segment: '\r',
            field: delims[0] as char,
            component: delims[1] as char,
            repeat: delims[2] as char,
            escape_char: delims[3] as char,
            subcomponent: delims[4] as char,
        };

        found.validate()?;
        Ok(found)
    }

    /// All six characters must be distinct, and auto-detected ones must be
    /// printable ASCII.
    fn validate(&self) -> Result<(), Hl7ParseError> {
        let chars = [
            self.segment,
            self.field,
            self.repeat,
            self.component,
            self.subcomponent,
            self.escape_char,
        ];

        for (i, a) in chars.iter().enumerate() {
            for b in chars.iter().skip(i + 1) {
                if a == b {
                    return Err(Hl7ParseError::InvalidHeader(format!(
                        "duplicate delimiter '{}'",
                        a.escape_default()
                    )));
                }
            }
        }

        // The terminator is control whitespace; the other five come off the wire.
        for c in chars.iter().skip(1) {
            if !c.is_ascii() || (*c as u8) < 0x20 || (*c as u8) == 0x7F {
                return Err(Hl7ParseError::InvalidHeader(format!(
                    "delimiter '{}' is not printable ASCII",
                    c.escape_default()
                )));
            }
        }

        Ok(())
    }

    /// Emit the four encoding characters as they appear in MSH-2.
    pub fn encoding_field(&self) -> String {
        self.to_string()
    }

    /// Emit the header prefix these separators round-trip through, e.g. `MSH|^~\&`.
    pub fn serialize(&self, header_id: &str) -> String {
        format!(
            "{}{}{}{}{}{}",
            header_id, self.field, self.component, self.repeat, self.escape_char, self.subcomponent
        )
    }
}

impl Default for Separators {
    /// The default (most common) HL7 values: `|^~\&` with a CR terminator.
    fn default() -> Separators {
        Separators {
            segment: '\r',
            field: '|',
            repeat: '~',
            component: '^',
            subcomponent: '&',
            escape_char: '\\',
        }
    }
}

impl Display for Separators {
    /// Renders the four encoding characters (MSH-2) in wire order.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.component, self.repeat, self.escape_char, self.subcomponent
        )
    }
}

/// Expects to receive a full message (or at least a header segment) in order
/// to parse out the separator chars.
impl FromStr for Separators {
    type Err = Hl7ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Separators::detect(input.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_separators_load_correctly() -> Result<(), Hl7ParseError> {
        let expected = Separators::default();
        let actual = Separators::detect(b"MSH|^~\\&|CATH|StJohn|AcmeHIS|StJohn|20061019172719||ACK^O01|MSGID12349876|P|2.3\rMSA|AA|MSGID12349876")?;

        assert_eq!(expected.component, actual.component);
        assert_eq!(expected.escape_char, actual.escape_char);
        assert_eq!(expected.field, actual.field);
        assert_eq!(expected.repeat, actual.repeat);
        assert_eq!(expected.segment, actual.segment);
        assert_eq!(expected.subcomponent, actual.subcomponent);

        Ok(())
    }

    #[test]
    fn ensure_separators_load_from_string() -> Result<(), Hl7ParseError> {
        let expected = Separators::default();
        let actual = str::parse::<Separators>("MSH|^~\\&|CATH|StJohn|AcmeHIS|StJohn|20061019172719||ACK^O01|MSGID12349876|P|2.3")?;

        assert_eq!(expected, actual);
        Ok(())
    }

    #[test]
    fn ensure_batch_headers_are_accepted() -> Result<(), Hl7ParseError> {
        let bhs = Separators::detect(b"BHS|^~\\&|Sender|Facility")?;
        let fhs = Separators::detect(b"FHS|^~\\&|Sender|Facility")?;
        assert_eq!(bhs, Separators::default());
        assert_eq!(fhs, Separators::default());
        Ok(())
    }

    #[test]
    fn ensure_missing_msh_causes_error() {
        // note the missing M
        let result = Separators::detect(b"SH|^~\\&|CATH|StJohn");
        assert!(result.is_err());
    }

    #[test]
    fn ensure_short_header_causes_error() {
        let result = Separators::detect(b"MSH|^~\\");
        match result {
            Err(Hl7ParseError::InvalidHeader(_)) => {}
            other => panic!("expected InvalidHeader, got {:?}", other),
        }
    }

    #[test]
    fn ensure_duplicate_delimiters_cause_error() {
        let result = Separators::detect(b"MSH|^~\\^");
        match result {
            Err(Hl7ParseError::InvalidHeader(msg)) => assert!(msg.contains("duplicate")),
            other => panic!("expected InvalidHeader, got {:?}", other),
        }
    }

    #[test]
    fn ensure_non_printable_delimiters_cause_error() {
        let result = Separators::detect(b"MSH|\x01~\\&");
        assert!(result.is_err());
    }

    #[test]
    fn ensure_custom_delimiters_round_trip() -> Result<(), Hl7ParseError> {
        let actual = Separators::detect(b"MSH#!@$%")?;
        assert_eq!(actual.field, '#');
        assert_eq!(actual.component, '!');
        assert_eq!(actual.repeat, '@');
        assert_eq!(actual.escape_char, '$');
        assert_eq!(actual.subcomponent, '%');
        assert_eq!(actual.serialize("MSH"), "MSH#!@$%");
        Ok(())
    }

    #[test]
    fn ensure_separators_to_string() {
        assert_eq!("^~\\&", Separators::default().to_string());
    }
}
