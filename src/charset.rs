//! Character-set registry for MSH-18.
//!
//! Maps the HL7 Table 0211 character-set codes to text decoders.  All the
//! codes in the table are recognized; the ones without a usable decoder
//! here (old ISO-2022 halfwidth sets, UTF-32) fall back to UTF-8 with a
//! warning so the rest of the message still parses.

use encoding_rs::Encoding;
use std::borrow::Cow;

/// The HL7 Table 0211 character sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetCode {
    /// `ASCII` / `ISO IR6`
    Ascii,
    /// `8859/1` Latin-1
    Iso8859_1,
    /// `8859/2` Latin-2
    Iso8859_2,
    /// `8859/3` Latin-3
    Iso8859_3,
    /// `8859/4` Latin-4
    Iso8859_4,
    /// `8859/5` Cyrillic
    Iso8859_5,
    /// `8859/6` Arabic
    Iso8859_6,
    /// `8859/7` Greek
    Iso8859_7,
    /// `8859/8` Hebrew
    Iso8859_8,
    /// `8859/9` Latin-5
    Iso8859_9,
    /// `8859/15` Latin-9
    Iso8859_15,
    /// `ISO IR14` JIS X 0201 halfwidth katakana
    IsoIr14,
    /// `ISO IR87` JIS X 0208 kanji
    IsoIr87,
    /// `ISO IR159` JIS X 0212 supplementary kanji
    IsoIr159,
    /// `GB 18030` Chinese national standard
    Gb18030,
    /// `KS X 1001` Korean
    KsX1001,
    /// `CNS 11643-1992` Taiwanese
    Cns11643,
    /// `BIG-5` traditional Chinese
    Big5,
    /// `UNICODE` (deprecated bare form, treated as UTF-8)
    Unicode,
    /// `UNICODE UTF-8` / `ISO IR192`
    Utf8,
    /// `UNICODE UTF-16`
    Utf16,
    /// `UNICODE UTF-32`
    Utf32,
}

impl CharsetCode {
    /// Look up a header value against the registry.  Matching is
    /// case-insensitive and tolerant of surrounding whitespace.
    pub fn from_header(value: &str) -> Option<CharsetCode> {
        let normalized = value.trim().to_ascii_uppercase();
        let code = match normalized.as_str() {
            "ASCII" | "ISO IR6" => CharsetCode::Ascii,
            "8859/1" => CharsetCode::Iso8859_1,
            "8859/2" => CharsetCode::Iso8859_2,
            "8859/3" => CharsetCode::Iso8859_3,
            "8859/4" => CharsetCode::Iso8859_4,
            "8859/5" => CharsetCode::Iso8859_5,
            "8859/6" => CharsetCode::Iso8859_6,
            "8859/7" => CharsetCode::Iso8859_7,
            "8859/8" => CharsetCode::Iso8859_8,
            "8859/9" => CharsetCode::Iso8859_9,
            "8859/15" => CharsetCode::Iso8859_15,
            "ISO IR14" => CharsetCode::IsoIr14,
            "ISO IR87" => CharsetCode::IsoIr87,
            "ISO IR159" => CharsetCode::IsoIr159,
            "GB 18030" => CharsetCode::Gb18030,
            "KS X 1001" => CharsetCode::KsX1001,
            "CNS 11643-1992" => CharsetCode::Cns11643,
            "BIG-5" => CharsetCode::Big5,
            "UNICODE" => CharsetCode::Unicode,
            "UNICODE UTF-8" | "ISO IR192" => CharsetCode::Utf8,
            "UNICODE UTF-16" => CharsetCode::Utf16,
            "UNICODE UTF-32" => CharsetCode::Utf32,
            _ => return None,
        };
        Some(code)
    }

    /// The Table 0211 wire form of this code.
    pub fn code(&self) -> &'static str {
        match self {
            CharsetCode::Ascii => "ASCII",
            CharsetCode::Iso8859_1 => "8859/1",
            CharsetCode::Iso8859_2 => "8859/2",
            CharsetCode::Iso8859_3 => "8859/3",
            CharsetCode::Iso8859_4 => "8859/4",
            CharsetCode::Iso8859_5 => "8859/5",
            CharsetCode::Iso8859_6 => "8859/6",
            CharsetCode::Iso8859_7 => "8859/7",
            CharsetCode::Iso8859_8 => "8859/8",
            CharsetCode::Iso8859_9 => "8859/9",
            CharsetCode::Iso8859_15 => "8859/15",
            CharsetCode::IsoIr14 => "ISO IR14",
            CharsetCode::IsoIr87 => "ISO IR87",
            CharsetCode::IsoIr159 => "ISO IR159",
            CharsetCode::Gb18030 => "GB 18030",
            CharsetCode::KsX1001 => "KS X 1001",
            CharsetCode::Cns11643 => "CNS 11643-1992",
            CharsetCode::Big5 => "BIG-5",
            CharsetCode::Unicode => "UNICODE",
            CharsetCode::Utf8 => "UNICODE UTF-8",
            CharsetCode::Utf16 => "UNICODE UTF-16",
            CharsetCode::Utf32 => "UNICODE UTF-32",
        }
    }

    /// The backing `encoding_rs` encoding, or `None` when the code is
    /// recognized but not directly supported.
    ///
    /// ASCII and the UTF-8 family return `None` too: they go through the
    /// plain UTF-8 path without an intermediate decoder.
    pub fn encoding(&self) -> Option<&'static Encoding> {
        match self {
            CharsetCode::Iso8859_1 => Some(encoding_rs::WINDOWS_1252),
            CharsetCode::Iso8859_2 => Some(encoding_rs::ISO_8859_2),
            CharsetCode::Iso8859_3 => Some(encoding_rs::ISO_8859_3),
            CharsetCode::Iso8859_4 => Some(encoding_rs::ISO_8859_4),
            CharsetCode::Iso8859_5 => Some(encoding_rs::ISO_8859_5),
            CharsetCode::Iso8859_6 => Some(encoding_rs::ISO_8859_6),
            CharsetCode::Iso8859_7 => Some(encoding_rs::ISO_8859_7),
            CharsetCode::Iso8859_8 => Some(encoding_rs::ISO_8859_8),
            CharsetCode::Iso8859_9 => Some(encoding_rs::WINDOWS_1254),
            CharsetCode::Iso8859_15 => Some(encoding_rs::ISO_8859_15),
            CharsetCode::IsoIr87 => Some(encoding_rs::ISO_2022_JP),
            CharsetCode::Gb18030 => Some(encoding_rs::GB18030),
            CharsetCode::KsX1001 => Some(encoding_rs::EUC_KR),
            CharsetCode::Big5 => Some(encoding_rs::BIG5),
            CharsetCode::Utf16 => Some(encoding_rs::UTF_16LE),
            CharsetCode::Ascii
            | CharsetCode::Unicode
            | CharsetCode::Utf8
            | CharsetCode::IsoIr14
            | CharsetCode::IsoIr159
            | CharsetCode::Cns11643
            | CharsetCode::Utf32 => None,
        }
    }

    /// Whether a decoder (native UTF-8 path included) exists for this code.
    pub fn is_supported(&self) -> bool {
        match self {
            CharsetCode::Ascii | CharsetCode::Unicode | CharsetCode::Utf8 => true,
            other => other.encoding().is_some(),
        }
    }

    /// Every code in the registry.
    pub fn all() -> &'static [CharsetCode] {
        static ALL: [CharsetCode; 22] = [
            CharsetCode::Ascii,
            CharsetCode::Iso8859_1,
            CharsetCode::Iso8859_2,
            CharsetCode::Iso8859_3,
            CharsetCode::Iso8859_4,
            CharsetCode::Iso8859_5,
            CharsetCode::Iso8859_6,
            CharsetCode::Iso8859_7,
            CharsetCode::Iso8859_8,
            CharsetCode::Iso8859_9,
            CharsetCode::Iso8859_15,
            CharsetCode::IsoIr14,
            CharsetCode::IsoIr87,
            CharsetCode::IsoIr159,
            CharsetCode::Gb18030,
            CharsetCode::KsX1001,
            CharsetCode::Cns11643,
            CharsetCode::Big5,
            CharsetCode::Unicode,
            CharsetCode::Utf8,
            CharsetCode::Utf16,
            CharsetCode::Utf32,
        ];
        &ALL
    }
}

impl std::fmt::Display for CharsetCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A resolved text decoder: either the native UTF-8 path or an
/// `encoding_rs` transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextDecoder {
    encoding: Option<&'static Encoding>,
}

impl TextDecoder {
    /// The fallback decoder used when nothing is declared and no default
    /// is configured.
    pub fn utf8() -> TextDecoder {
        TextDecoder { encoding: None }
    }

    pub fn for_code(code: CharsetCode) -> TextDecoder {
        TextDecoder {
            encoding: code.encoding(),
        }
    }

    /// Decode a leaf byte span.  The boolean is true when replacement
    /// characters were substituted for undecodable bytes.
    pub fn decode<'b>(&self, bytes: &'b [u8]) -> (Cow<'b, str>, bool) {
        match self.encoding {
            Some(encoding) => {
                let (text, _, had_errors) = encoding.decode(bytes);
                (text, had_errors)
            }
            None => match std::str::from_utf8(bytes) {
                Ok(text) => (Cow::Borrowed(text), false),
                Err(_) => (String::from_utf8_lossy(bytes), true),
            },
        }
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        TextDecoder::utf8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_recognizes_all_its_own_codes() {
        for code in CharsetCode::all() {
            assert_eq!(CharsetCode::from_header(code.code()), Some(*code));
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_trims() {
        assert_eq!(CharsetCode::from_header(" unicode utf-8 "), Some(CharsetCode::Utf8));
        assert_eq!(CharsetCode::from_header("big-5"), Some(CharsetCode::Big5));
    }

    #[test]
    fn ir192_is_utf8() {
        assert_eq!(CharsetCode::from_header("ISO IR192"), Some(CharsetCode::Utf8));
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(CharsetCode::from_header("EBCDIC"), None);
    }

    #[test]
    fn unsupported_codes_are_still_recognized() {
        let utf32 = CharsetCode::from_header("UNICODE UTF-32").unwrap();
        assert!(!utf32.is_supported());
        let cns = CharsetCode::from_header("CNS 11643-1992").unwrap();
        assert!(!cns.is_supported());
    }

    #[test]
    fn latin1_decodes_high_bytes() {
        let decoder = TextDecoder::for_code(CharsetCode::Iso8859_1);
        let (text, had_errors) = decoder.decode(b"caf\xe9");
        assert_eq!(text, "caf\u{e9}");
        assert!(!had_errors);
    }

    #[test]
    fn utf8_path_borrows_clean_input() {
        let decoder = TextDecoder::utf8();
        let (text, had_errors) = decoder.decode(b"plain");
        assert!(matches!(text, Cow::Borrowed("plain")));
        assert!(!had_errors);
    }

    #[test]
    fn utf8_path_replaces_bad_bytes() {
        let decoder = TextDecoder::utf8();
        let (text, had_errors) = decoder.decode(b"bad\xff");
        assert!(had_errors);
        assert!(text.contains('\u{fffd}'));
    }

    #[test]
    fn gb18030_decodes() {
        let decoder = TextDecoder::for_code(CharsetCode::Gb18030);
        let (text, had_errors) = decoder.decode(b"\xc4\xe3\xba\xc3");
        assert_eq!(text, "\u{4f60}\u{597d}");
        assert!(!had_errors);
    }
}
