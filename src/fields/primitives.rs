//! The primitive HL7 data types.
//!
//! Every type parses from wire text (escape sequences included), formats
//! back to wire text and validates its own grammar.  Numeric and temporal
//! types preserve their exact source text so serialization round-trips
//! without precision loss.

use regex::Regex;
use std::sync::OnceLock;

use super::dtm::Dtm;
use crate::escape_sequence::EscapeSequence;
use crate::separators::Separators;
use crate::Hl7ParseError;

fn nm_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap())
}

fn dt_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}(\d{2}(\d{2})?)?$").unwrap())
}

fn tm_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}(\d{2}(\d{2}(\.\d{1,4})?)?)?([+-]\d{4})?$").unwrap())
}

/// `ST` - a short string.  Stored decoded; formatting re-escapes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct St(pub String);

impl St {
    pub fn parse(raw: &str, delims: &Separators) -> Result<St, Hl7ParseError> {
        Ok(St(EscapeSequence::new(*delims).decode(raw).into_owned()))
    }

    pub fn format(&self, delims: &Separators) -> String {
        EscapeSequence::new(*delims).encode(self.0.as_str()).into_owned()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `TX` - text data intended for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tx(pub String);

impl Tx {
    pub fn parse(raw: &str, delims: &Separators) -> Result<Tx, Hl7ParseError> {
        Ok(Tx(EscapeSequence::new(*delims).decode(raw).into_owned()))
    }

    pub fn format(&self, delims: &Separators) -> String {
        EscapeSequence::new(*delims).encode(self.0.as_str()).into_owned()
    }
}

/// `FT` - formatted text; line breaks travel as `\.br\`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ft(pub String);

impl Ft {
    pub fn parse(raw: &str, delims: &Separators) -> Result<Ft, Hl7ParseError> {
        Ok(Ft(EscapeSequence::new(*delims).decode(raw).into_owned()))
    }

    pub fn format(&self, delims: &Separators) -> String {
        EscapeSequence::new(*delims).encode(self.0.as_str()).into_owned()
    }
}

/// `NM` - a number.  The source text is kept verbatim so values like
/// `1.200` round-trip without losing their written precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nm {
    text: String,
}

impl Nm {
    pub fn parse(raw: &str, _delims: &Separators) -> Result<Nm, Hl7ParseError> {
        if !nm_grammar().is_match(raw) {
            return Err(Hl7ParseError::InvalidValue {
                datatype: "NM",
                value: raw.to_string(),
            });
        }
        Ok(Nm { text: raw.to_string() })
    }

    pub fn format(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> f64 {
        // the grammar guarantees this parses
        self.text.parse().unwrap_or(0.0)
    }
}

/// `SI` - a sequence id: a non-negative integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Si {
    text: String,
}

impl Si {
    pub fn parse(raw: &str, _delims: &Separators) -> Result<Si, Hl7ParseError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Hl7ParseError::InvalidValue {
                datatype: "SI",
                value: raw.to_string(),
            });
        }
        Ok(Si { text: raw.to_string() })
    }

    pub fn format(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> u32 {
        self.text.parse().unwrap_or(0)
    }
}

/// `DT` - a date: `YYYY[MM[DD]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dt {
    text: String,
}

impl Dt {
    pub fn parse(raw: &str, _delims: &Separators) -> Result<Dt, Hl7ParseError> {
        if !dt_grammar().is_match(raw) {
            return Err(Hl7ParseError::InvalidValue {
                datatype: "DT",
                value: raw.to_string(),
            });
        }
        // reuse the timestamp machinery for calendar validation
        Dtm::parse(raw)?;
        Ok(Dt { text: raw.to_string() })
    }

    pub fn format(&self) -> &str {
        &self.text
    }
}

/// `TM` - a time: `HH[MM[SS[.s...]]][+/-ZZZZ]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tm {
    text: String,
}

impl Tm {
    pub fn parse(raw: &str, _delims: &Separators) -> Result<Tm, Hl7ParseError> {
        let invalid = || Hl7ParseError::InvalidValue {
            datatype: "TM",
            value: raw.to_string(),
        };
        if !tm_grammar().is_match(raw) {
            return Err(invalid());
        }
        let hour: u32 = raw[..2].parse().map_err(|_| invalid())?;
        if hour > 23 {
            return Err(invalid());
        }
        if raw.len() >= 4 {
            if let Ok(minute) = raw[2..4].parse::<u32>() {
                if minute > 59 {
                    return Err(invalid());
                }
            }
        }
        Ok(Tm { text: raw.to_string() })
    }

    pub fn format(&self) -> &str {
        &self.text
    }
}

/// `ID` - a coded value drawn from an HL7-defined table.  The binding
/// itself is checked by the validator; the type only constrains the
/// lexical shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id(pub String);

impl Id {
    pub fn parse(raw: &str, _delims: &Separators) -> Result<Id, Hl7ParseError> {
        if raw.is_empty() || raw.chars().any(|c| c.is_control()) {
            return Err(Hl7ParseError::InvalidValue {
                datatype: "ID",
                value: raw.to_string(),
            });
        }
        Ok(Id(raw.to_string()))
    }

    pub fn format(&self) -> &str {
        &self.0
    }
}

/// `IS` - a coded value drawn from a user-defined table.  Identical to
/// [`Id`] lexically; bindings on `IS` fields validate at warning strength
/// only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Is(pub String);

impl Is {
    pub fn parse(raw: &str, _delims: &Separators) -> Result<Is, Hl7ParseError> {
        if raw.is_empty() || raw.chars().any(|c| c.is_control()) {
            return Err(Hl7ParseError::InvalidValue {
                datatype: "IS",
                value: raw.to_string(),
            });
        }
        Ok(Is(raw.to_string()))
    }

    pub fn format(&self) -> &str {
        &self.0
    }
}

/// Check raw wire text against the grammar of the named data type.
/// Returns a human-readable problem description, or `None` when the text
/// conforms.  Unknown codes and composite codes are unconstrained here.
pub fn check_datatype(code: &str, raw: &str, delims: &Separators) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let result = match code {
        "NM" => Nm::parse(raw, delims).map(|_| ()),
        "SI" => Si::parse(raw, delims).map(|_| ()),
        "DT" => Dt::parse(raw, delims).map(|_| ()),
        "TM" => Tm::parse(raw, delims).map(|_| ()),
        "TS" | "DTM" => Dtm::parse(raw).map(|_| ()),
        "ID" => Id::parse(raw, delims).map(|_| ()),
        "IS" => Is::parse(raw, delims).map(|_| ()),
        _ => Ok(()),
    };
    result.err().map(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> Separators {
        Separators::default()
    }

    #[test]
    fn st_decodes_and_reencodes() -> Result<(), Hl7ParseError> {
        let st = St::parse(r#"Smith\F\Jones"#, &d())?;
        assert_eq!(st.as_str(), "Smith|Jones");
        assert_eq!(st.format(&d()), r#"Smith\F\Jones"#);
        Ok(())
    }

    #[test]
    fn nm_preserves_source_text() -> Result<(), Hl7ParseError> {
        let nm = Nm::parse("1.200", &d())?;
        assert_eq!(nm.format(), "1.200");
        assert!((nm.value() - 1.2).abs() < f64::EPSILON);

        let negative = Nm::parse("-42", &d())?;
        assert_eq!(negative.value(), -42.0);
        Ok(())
    }

    #[test]
    fn nm_rejects_non_numbers() {
        assert!(Nm::parse("12a", &d()).is_err());
        assert!(Nm::parse("1.2.3", &d()).is_err());
        assert!(Nm::parse("", &d()).is_err());
    }

    #[test]
    fn si_is_a_non_negative_integer() {
        assert!(Si::parse("0", &d()).is_ok());
        assert_eq!(Si::parse("17", &d()).unwrap().value(), 17);
        assert!(Si::parse("-1", &d()).is_err());
        assert!(Si::parse("1.5", &d()).is_err());
    }

    #[test]
    fn dt_accepts_partial_dates() {
        assert!(Dt::parse("2023", &d()).is_ok());
        assert!(Dt::parse("202306", &d()).is_ok());
        assert!(Dt::parse("20230615", &d()).is_ok());
        assert!(Dt::parse("20231301", &d()).is_err());
        assert!(Dt::parse("2023061", &d()).is_err());
    }

    #[test]
    fn tm_bounds_hours_and_minutes() {
        assert!(Tm::parse("09", &d()).is_ok());
        assert!(Tm::parse("0930", &d()).is_ok());
        assert!(Tm::parse("093045.5", &d()).is_ok());
        assert!(Tm::parse("093045-0500", &d()).is_ok());
        assert!(Tm::parse("2430", &d()).is_err());
        assert!(Tm::parse("0960", &d()).is_err());
    }

    #[test]
    fn id_and_is_differ_only_in_intent() {
        assert!(Id::parse("AA", &d()).is_ok());
        assert!(Is::parse("home-grown", &d()).is_ok());
        assert!(Id::parse("", &d()).is_err());
    }

    #[test]
    fn check_datatype_dispatches_by_code() {
        assert!(check_datatype("NM", "182", &d()).is_none());
        assert!(check_datatype("NM", "abc", &d()).is_some());
        assert!(check_datatype("TS", "20230101120000", &d()).is_none());
        assert!(check_datatype("TS", "20231301", &d()).is_some());
        // empty is "no value", never a type violation
        assert!(check_datatype("NM", "", &d()).is_none());
        // composite and unknown codes are unconstrained
        assert!(check_datatype("XPN", "Doe^John", &d()).is_none());
    }
}
