use log::trace;
use regex::Regex;

use crate::diagnostics::{Diagnostic, DiagnosticCode, PathLocator};
use crate::separators::Separators;
use crate::Hl7ParseError;
use std::borrow::Cow;

/// Encodes and decodes HL7 escape sequences against a concrete set of
/// [`Separators`].
///
/// For more info see [here](https://www.lyniate.com/knowledge-hub/hl7-escape-sequences/) or [here](https://confluence.hl7australia.com/display/OOADRM20181/Appendix+1+Parsing+HL7v2#Appendix1ParsingHL7v2-Dealingwithreservedcharactersanddelimiters)
///
/// ## Example:
/// ```
/// # use hl7v2_core::escape_sequence::EscapeSequence;
/// # use hl7v2_core::separators::Separators;
/// let delims = Separators::default();
/// let decoder = EscapeSequence::new(delims);
/// let hl7_field_value = r#"Obstetrician \T\ Gynaecologist"#;
/// let decoded = decoder.decode(hl7_field_value);
/// assert_eq!(decoded, r#"Obstetrician & Gynaecologist"#);
/// ```
///
/// ## Details
///
/// `\E\`, `\F\`, `\R\`, `\S\` and `\T\` decode to the escape, field, repeat,
/// component and sub-component separator chars respectively.  `\.br\`
/// decodes to a line break and `\Xdd..\` to the raw bytes given in hex.
///
/// The following sequences are deliberately left in the string:
/// - `\H\` / `\N\` start and end of highlighted text, a consuming
///   application concern.
/// - `\Z...\` custom application escape sequences.
///
/// Anything else is preserved verbatim and reported at warning severity via
/// [`EscapeSequence::decode_checked`].
///
/// If there's _no possibility_ of escape sequences in the value (because
/// there's no escape character, typically a backslash), decoding short
/// circuits and returns the original string slice.
pub struct EscapeSequence {
    delims: Separators,
    escape_regex: Regex,
}

impl<'a> EscapeSequence {
    /// Create a new struct ready for processing of escape sequences.
    /// Escape sequences in HL7 are dependent on the actual delimiters used
    /// _for that message_, and so we need a [`Separators`] instance to know
    /// what chars we're working with.
    ///
    /// Instances are expected to be cached per message, or per sending
    /// application if it will always use the same separators.
    pub fn new(delims: Separators) -> EscapeSequence {
        let regex = if delims.escape_char == '\\' {
            Regex::new(r#"\\"#) // backslashes have meaning in regexes, and need to be escaped
        } else {
            Regex::new(regex::escape(&delims.escape_char.to_string()).as_str())
        }
        .unwrap();

        EscapeSequence {
            delims,
            escape_regex: regex,
        }
    }

    /// Decode any escape sequences in the given `&str`, swallowing problems.
    ///
    /// Malformed `\X..\` payloads are preserved verbatim; use
    /// [`EscapeSequence::decode_checked`] when diagnostics matter.
    pub fn decode<S>(&self, input: S) -> Cow<'a, str>
    where
        S: Into<Cow<'a, str>>,
    {
        let input = input.into();
        // `regex.find` here is about twice as fast for the 'no sequences'
        // case as `&str.find()`.
        if self.escape_regex.find(&input).is_none() {
            return input;
        }

        match self.decode_impl(&input, None, true) {
            Ok(decoded) => Cow::Owned(decoded),
            Err(_) => input,
        }
    }

    /// Decode with full bookkeeping: unknown sequences produce warnings on
    /// the returned list, and a malformed `\X..\` either fails (strict) or
    /// truncates to the even hex prefix (`best_effort`).
    pub fn decode_checked(
        &self,
        input: &str,
        path: &PathLocator,
        best_effort: bool,
    ) -> Result<(String, Vec<Diagnostic>), Hl7ParseError> {
        let mut warnings = Vec::new();
        let decoded = self.decode_impl(input, Some((&mut warnings, path)), best_effort)?;
        Ok((decoded, warnings))
    }

    fn decode_impl(
        &self,
        input: &str,
        mut diag_sink: Option<(&mut Vec<Diagnostic>, &PathLocator)>,
        best_effort: bool,
    ) -> Result<String, Hl7ParseError> {
        let esc = self.delims.escape_char;
        let mut output: Vec<u8> = Vec::with_capacity(input.len());
        let mut rest = input;

        loop {
            let start = match rest.find(esc) {
                Some(i) => i,
                None => {
                    // nothing left to process
                    output.extend_from_slice(rest.as_bytes());
                    break;
                }
            };

            output.extend_from_slice(rest[..start].as_bytes());
            let after_esc = &rest[start + esc.len_utf8()..];

            let end = match after_esc.find(esc) {
                Some(i) => i,
                None => {
                    // an opening escape char with no closing one is not a
                    // sequence at all, keep it
                    trace!("no closing escape char, passing remainder through");
                    output.extend_from_slice(rest[start..].as_bytes());
                    break;
                }
            };

            let sequence = &after_esc[..end];
            trace!("found escape sequence '{}'", sequence);

            match sequence {
                "E" => push_char(&mut output, esc),
                "F" => push_char(&mut output, self.delims.field),
                "R" => push_char(&mut output, self.delims.repeat),
                "S" => push_char(&mut output, self.delims.component),
                "T" => push_char(&mut output, self.delims.subcomponent),
                ".br" => output.push(b'\r'),

                // Highlighted/normal text markers remain for consumers to act
                // on as they see fit, as do custom \Z..\ sequences.
                "H" | "N" => keep_verbatim(&mut output, esc, sequence),
                _ if sequence.starts_with('Z') => keep_verbatim(&mut output, esc, sequence),

                _ if sequence.starts_with('X') => {
                    let hex = &sequence[1..];
                    match decode_hex(hex, best_effort) {
                        Ok(bytes) => output.extend_from_slice(&bytes),
                        Err(err) => {
                            if !best_effort {
                                return Err(err);
                            }
                            keep_verbatim(&mut output, esc, sequence);
                        }
                    }
                }

                _ => {
                    // Unknown sequence: preserved verbatim, reported once.
                    if let Some((warnings, path)) = diag_sink.as_mut() {
                        warnings.push(Diagnostic::warning(
                            DiagnosticCode::MalformedEscape,
                            (*path).clone(),
                            format!("unknown escape sequence '{}{}{}'", esc, sequence, esc),
                        ));
                    }
                    keep_verbatim(&mut output, esc, sequence);
                }
            }

            rest = &after_esc[end + esc.len_utf8()..];
        }

        Ok(match String::from_utf8(output) {
            Ok(s) => s,
            // \X..\ can smuggle arbitrary bytes in; the model stores text
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    /// Encode literal text so it can be embedded in a field without
    /// colliding with the active delimiters.
    ///
    /// ```
    /// # use hl7v2_core::escape_sequence::EscapeSequence;
    /// # use hl7v2_core::separators::Separators;
    /// let encoder = EscapeSequence::new(Separators::default());
    /// assert_eq!(encoder.encode("A&B"), r#"A\T\B"#);
    /// ```
    pub fn encode<S>(&self, input: S) -> Cow<'a, str>
    where
        S: Into<Cow<'a, str>>,
    {
        let input = input.into();

        let needs_work = input.chars().any(|c| self.needs_escaping(c));
        if !needs_work {
            return input;
        }

        let esc = self.delims.escape_char;
        let mut output = String::with_capacity(input.len() + 8);

        for c in input.chars() {
            if c == esc {
                push_sequence(&mut output, esc, "E");
            } else if c == self.delims.field {
                push_sequence(&mut output, esc, "F");
            } else if c == self.delims.repeat {
                push_sequence(&mut output, esc, "R");
            } else if c == self.delims.component {
                push_sequence(&mut output, esc, "S");
            } else if c == self.delims.subcomponent {
                push_sequence(&mut output, esc, "T");
            } else if c == '\r' || c == '\n' {
                push_sequence(&mut output, esc, ".br");
            } else if !c.is_ascii() {
                let mut buf = [0u8; 4];
                let bytes = c.encode_utf8(&mut buf).as_bytes();
                output.push(esc);
                output.push('X');
                for b in bytes {
                    output.push_str(&format!("{:02X}", b));
                }
                output.push(esc);
            } else {
                output.push(c);
            }
        }

        Cow::Owned(output)
    }

    fn needs_escaping(&self, c: char) -> bool {
        c == self.delims.escape_char
            || c == self.delims.field
            || c == self.delims.repeat
            || c == self.delims.component
            || c == self.delims.subcomponent
            || c == '\r'
            || c == '\n'
            || !c.is_ascii()
    }
}

fn push_char(output: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    output.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn keep_verbatim(output: &mut Vec<u8>, esc: char, sequence: &str) {
    push_char(output, esc);
    output.extend_from_slice(sequence.as_bytes());
    push_char(output, esc);
}

fn push_sequence(output: &mut String, esc: char, name: &str) {
    output.push(esc);
    output.push_str(name);
    output.push(esc);
}

/// Decode an even-length run of hex digits.  `best_effort` truncates a
/// trailing odd digit instead of failing.
fn decode_hex(hex: &str, best_effort: bool) -> Result<Vec<u8>, Hl7ParseError> {
    let digits = if hex.len() % 2 != 0 {
        if !best_effort {
            return Err(Hl7ParseError::MalformedEscape(format!("X{}", hex)));
        }
        &hex[..hex.len() - 1]
    } else {
        hex
    };

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    let raw = digits.as_bytes();
    for pair in raw.chunks(2) {
        let text = std::str::from_utf8(pair).map_err(|_| Hl7ParseError::MalformedEscape(format!("X{}", hex)))?;
        let byte = u8::from_str_radix(text, 16)
            .map_err(|_| Hl7ParseError::MalformedEscape(format!("X{}", hex)))?;
        bytes.push(byte);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decode_does_nothing_if_not_required() {
        let escaper = EscapeSequence::new(Separators::default());

        let input = "There are no escape sequences here/there/.";
        let output = escaper.decode(input);
        assert_eq!(output, input);
    }

    #[test]
    fn test_decode_does_nothing_if_backslash_is_not_escape_sequence() {
        let escaper = EscapeSequence::new(Separators::default());

        let input = r#"There are no escape sequences here\there."#;
        let output = escaper.decode(input);
        assert_eq!(output, input);
    }

    #[test]
    fn test_decode_handles_field_sequence() {
        let escaper = EscapeSequence::new(Separators::default());

        let input = r#"Escape this \F\ please"#;
        let output = escaper.decode(input);
        assert_eq!(output, "Escape this | please");
    }

    #[test]
    fn ensure_decode_does_not_eat_chars_it_shouldnt() {
        let escaper = EscapeSequence::new(Separators::default());

        let input = r#"Escape this \F please"#;
        let output = escaper.decode(input);
        assert_eq!(output, input);
    }

    #[test]
    fn ensure_decode_handles_custom_delims() {
        let delims = Separators::from_str("MSH^!@#$").unwrap();
        let escaper = EscapeSequence::new(delims);

        let input = r#"Escape this #F# please"#;
        let output = escaper.decode(input);
        assert_eq!(output, "Escape this ^ please");
    }

    #[test]
    fn ensure_decode_handles_escape_sequence() {
        let escaper = EscapeSequence::new(Separators::default());

        let input = r#"Escape this \E\ please"#;
        let output = escaper.decode(input);
        assert_eq!(output, r#"Escape this \ please"#);

        // ensure it moves on past the char it just added
        let input = r#"Escape this \E\ pretty \F\ please"#;
        let output = escaper.decode(input);
        assert_eq!(output, r#"Escape this \ pretty | please"#);
    }

    #[test]
    fn test_decode_handles_repeat_and_component_sequences() {
        let escaper = EscapeSequence::new(Separators::default());

        assert_eq!(escaper.decode(r#"a \R\ b"#), "a ~ b");
        assert_eq!(escaper.decode(r#"a \S\ b"#), "a ^ b");
        assert_eq!(escaper.decode(r#"Obstetrician \T\ Gynaecologist"#), "Obstetrician & Gynaecologist");
    }

    #[test]
    fn test_decode_handles_line_break_sequence() {
        let escaper = EscapeSequence::new(Separators::default());
        assert_eq!(escaper.decode(r#"line one\.br\line two"#), "line one\rline two");
    }

    #[test]
    fn test_decode_handles_hex_sequence() {
        let escaper = EscapeSequence::new(Separators::default());
        assert_eq!(escaper.decode(r#"\X48454C4C4F\"#), "HELLO");
    }

    #[test]
    fn test_odd_hex_fails_when_strict() {
        let escaper = EscapeSequence::new(Separators::default());
        let result = escaper.decode_checked(r#"\X484\"#, &PathLocator::new(), false);
        match result {
            Err(Hl7ParseError::MalformedEscape(seq)) => assert_eq!(seq, "X484"),
            other => panic!("expected MalformedEscape, got {:?}", other),
        }
    }

    #[test]
    fn test_odd_hex_truncates_when_best_effort() {
        let escaper = EscapeSequence::new(Separators::default());
        let (decoded, _) = escaper
            .decode_checked(r#"\X484\"#, &PathLocator::new(), true)
            .unwrap();
        assert_eq!(decoded, "H");
    }

    #[test]
    fn test_unknown_sequence_preserved_with_warning() {
        let escaper = EscapeSequence::new(Separators::default());
        let (decoded, warnings) = escaper
            .decode_checked(r#"keep \Q\ this"#, &PathLocator::new(), true)
            .unwrap();
        assert_eq!(decoded, r#"keep \Q\ this"#);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, DiagnosticCode::MalformedEscape);
    }

    #[test]
    fn ensure_decode_ignores_highlighting_sequence() {
        let escaper = EscapeSequence::new(Separators::default());

        let input = r#"Don't escape this \H\highlighted text\N\ please"#;
        let output = escaper.decode(input);
        assert_eq!(output, input);
    }

    #[test]
    fn ensure_decode_ignores_custom_sequence() {
        let escaper = EscapeSequence::new(Separators::default());

        let input = r#"Don't escape this custom sequence \Z1234\ please"#;
        let output = escaper.decode(input);
        assert_eq!(output, input);
    }

    #[test]
    fn test_encode_escapes_delimiters() {
        let escaper = EscapeSequence::new(Separators::default());

        assert_eq!(escaper.encode("A&B"), r#"A\T\B"#);
        assert_eq!(escaper.encode("Smith|Jones"), r#"Smith\F\Jones"#);
        assert_eq!(escaper.encode("a^b~c"), r#"a\S\b\R\c"#);
        assert_eq!(escaper.encode(r#"a\b"#), r#"a\E\b"#);
    }

    #[test]
    fn test_encode_leaves_plain_text_borrowed() {
        let escaper = EscapeSequence::new(Separators::default());
        match escaper.encode("plain text") {
            Cow::Borrowed(s) => assert_eq!(s, "plain text"),
            Cow::Owned(_) => panic!("expected a borrow for text with nothing to escape"),
        }
    }

    #[test]
    fn test_encode_line_breaks_and_non_ascii() {
        let escaper = EscapeSequence::new(Separators::default());
        assert_eq!(escaper.encode("one\rtwo"), r#"one\.br\two"#);
        assert_eq!(escaper.encode("caf\u{e9}"), r#"caf\XC3A9\"#);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let escaper = EscapeSequence::new(Separators::default());
        let inputs = ["A&B", "Smith|Jones", r#"a\b"#, "x^y~z", "line\rbreak"];
        for input in &inputs {
            let encoded = escaper.encode(*input);
            let decoded = escaper.decode(encoded.into_owned());
            assert_eq!(&decoded, input);
        }
    }
}
