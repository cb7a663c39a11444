//! Character encoding detection and strict decoding.
//!
//! Detection only looks at a bounded prefix of the input. The guess it
//! produces is a starting point: the CSV decoder validates it against the
//! full buffer and walks [`fallback_charsets`] when it does not hold.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use chardetng::EncodingDetector as StatisticalDetector;
use encoding_rs::{Encoding, ISO_8859_15, UTF_8, WINDOWS_1252};

/// Number of leading bytes inspected by encoding detection
pub const DETECTION_PREFIX_LEN: usize = 10_000;

/// Encodings tried, in order, after the detected encoding fails
pub fn fallback_charsets() -> [Charset; 3] {
    [
        Charset::Latin1,
        Charset::Encoding(ISO_8859_15),
        Charset::Encoding(WINDOWS_1252),
    ]
}

/// A character set that text can be decoded from
///
/// `encoding_rs` follows the WHATWG Encoding Standard, where the
/// `latin1` label resolves to windows-1252. True ISO-8859-1 gets its own
/// variant so both code pages can take part in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// ISO-8859-1: every byte maps to the code point of the same value
    Latin1,
    /// Any encoding known to `encoding_rs`
    Encoding(&'static Encoding),
}

impl Charset {
    /// UTF-8, the default when detection has no answer
    pub fn utf8() -> Charset {
        Charset::Encoding(UTF_8)
    }

    /// Resolve an encoding label such as `"utf-8"` or `"latin1"`
    pub fn for_label(label: &str) -> Option<Charset> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "l1" => {
                Some(Charset::Latin1)
            }
            _ => Encoding::for_label(normalized.as_bytes()).map(Charset::Encoding),
        }
    }

    /// Canonical name of the character set
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Latin1 => "ISO-8859-1",
            Charset::Encoding(encoding) => encoding.name(),
        }
    }

    /// Whether every byte maps to exactly one character
    ///
    /// Single-byte codecs accept almost any input, so they cannot report
    /// malformed bytes on their own.
    pub fn is_single_byte(&self) -> bool {
        match self {
            Charset::Latin1 => true,
            Charset::Encoding(encoding) => encoding.is_single_byte(),
        }
    }

    /// Decode the complete buffer, or `None` if any byte sequence is unmappable
    ///
    /// Multi-byte codecs such as UTF-8 reject malformed sequences themselves;
    /// for them only NUL is unmappable. Single-byte codecs additionally treat
    /// C0 and C1 control characters other than tab, line feed and carriage
    /// return as unmappable, and skip a leading UTF-8 byte-order mark.
    /// Multi-byte codecs skip their own byte-order mark.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        let text = match self {
            Charset::Latin1 => encoding_rs::mem::decode_latin1(strip_utf8_bom(bytes)),
            Charset::Encoding(encoding) if encoding.is_single_byte() => encoding
                .decode_without_bom_handling_and_without_replacement(strip_utf8_bom(bytes))?,
            Charset::Encoding(encoding) => {
                let body = match Encoding::for_bom(bytes) {
                    Some((bom_encoding, bom_len)) if bom_encoding == *encoding => {
                        &bytes[bom_len..]
                    }
                    _ => bytes,
                };
                encoding.decode_without_bom_handling_and_without_replacement(body)?
            }
        };

        let unmappable: fn(char) -> bool = if self.is_single_byte() {
            is_control
        } else {
            is_nul
        };
        if text.chars().any(unmappable) {
            return None;
        }
        Some(text)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn strip_utf8_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

fn is_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

fn is_nul(c: char) -> bool {
    c == '\0'
}

/// How a guess was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// The input starts with a byte-order mark
    ByteOrderMark,
    /// Inferred from the byte distribution of the prefix
    Heuristic,
}

/// Result of encoding detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingGuess {
    /// Candidate character set
    pub charset: Charset,
    /// How the candidate was chosen
    pub confidence: Confidence,
}

/// Encoding a buffer was actually decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedEncoding {
    /// What detection proposed, if anything
    pub guess: Option<EncodingGuess>,
    /// Character set that produced the text
    pub charset: Charset,
}

impl DecodedEncoding {
    /// Encoding tried first: the guess, or UTF-8 without one
    pub fn primary(&self) -> Charset {
        self.guess
            .map(|guess| guess.charset)
            .unwrap_or_else(Charset::utf8)
    }

    /// Whether the primary encoding failed and a fallback was used
    pub fn is_fallback(&self) -> bool {
        self.charset != self.primary()
    }
}

/// Guesses the character set of a byte prefix
pub trait EncodingDetector {
    /// Guess the encoding of `prefix`, or `None` if there is no signal at all
    ///
    /// Implementations must be pure: the same prefix yields the same guess.
    fn detect(&self, prefix: &[u8]) -> Option<EncodingGuess>;
}

impl<D: EncodingDetector + ?Sized> EncodingDetector for &D {
    fn detect(&self, prefix: &[u8]) -> Option<EncodingGuess> {
        (**self).detect(prefix)
    }
}

/// Default detector: byte-order mark, then UTF-8 validity, then `chardetng`
#[derive(Debug, Clone, Copy, Default)]
pub struct CharsetDetector;

impl EncodingDetector for CharsetDetector {
    fn detect(&self, prefix: &[u8]) -> Option<EncodingGuess> {
        if prefix.is_empty() {
            return None;
        }

        if let Some((encoding, _)) = Encoding::for_bom(prefix) {
            return Some(EncodingGuess {
                charset: Charset::Encoding(encoding),
                confidence: Confidence::ByteOrderMark,
            });
        }

        if is_utf8_prefix(prefix) {
            return Some(EncodingGuess {
                charset: Charset::utf8(),
                confidence: Confidence::Heuristic,
            });
        }

        let mut detector = StatisticalDetector::new();
        detector.feed(prefix, true);
        Some(EncodingGuess {
            charset: Charset::Encoding(detector.guess(None, true)),
            confidence: Confidence::Heuristic,
        })
    }
}

/// Valid UTF-8, allowing a multi-byte sequence cut off by the prefix limit
fn is_utf8_prefix(prefix: &[u8]) -> bool {
    match std::str::from_utf8(prefix) {
        Ok(_) => true,
        Err(err) => err.error_len().is_none(),
    }
}

/// The slice of `bytes` that detection looks at
pub fn detection_prefix(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(DETECTION_PREFIX_LEN)]
}

/// Detect the encoding of an in-memory buffer with the default detector
pub fn detect_encoding(bytes: &[u8]) -> Option<EncodingGuess> {
    CharsetDetector.detect(detection_prefix(bytes))
}

/// Detect the encoding of a seekable source
///
/// Reads at most [`DETECTION_PREFIX_LEN`] bytes from the current position
/// and seeks back to it before returning.
pub fn detect_encoding_from_reader<R, D>(
    reader: &mut R,
    detector: &D,
) -> io::Result<Option<EncodingGuess>>
where
    R: Read + Seek,
    D: EncodingDetector + ?Sized,
{
    let start = reader.stream_position()?;

    let mut prefix = Vec::with_capacity(DETECTION_PREFIX_LEN);
    let read = reader
        .by_ref()
        .take(DETECTION_PREFIX_LEN as u64)
        .read_to_end(&mut prefix);

    // Restore the position even when the read failed part-way
    reader.seek(SeekFrom::Start(start))?;
    read?;

    Ok(detector.detect(&prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_empty_prefix_is_unknown() {
        assert_eq!(detect_encoding(b""), None);
    }

    #[test]
    fn test_ascii_is_utf8() {
        let guess = detect_encoding(b"name,age\nAna,30\n").unwrap();
        assert_eq!(guess.charset, Charset::utf8());
        assert_eq!(guess.confidence, Confidence::Heuristic);
    }

    #[test]
    fn test_utf8_bom() {
        let guess = detect_encoding(b"\xEF\xBB\xBFname\n").unwrap();
        assert_eq!(guess.charset, Charset::utf8());
        assert_eq!(guess.confidence, Confidence::ByteOrderMark);
    }

    #[test]
    fn test_utf16_bom() {
        let guess = detect_encoding(b"\xFF\xFEn\x00a\x00").unwrap();
        assert_eq!(guess.charset, Charset::Encoding(encoding_rs::UTF_16LE));
        assert_eq!(guess.confidence, Confidence::ByteOrderMark);
    }

    #[test]
    fn test_latin1_bytes_not_guessed_as_utf8() {
        let bytes = b"name,city\nJos\xE9,S\xE3o Paulo\nFran\xE7ois,Montr\xE9al\n";
        let guess = detect_encoding(bytes).unwrap();
        assert_ne!(guess.charset, Charset::utf8());
    }

    #[test]
    fn test_truncated_utf8_sequence_in_prefix() {
        let mut bytes = vec![b'a'; DETECTION_PREFIX_LEN - 1];
        bytes.extend_from_slice("é".as_bytes());
        let guess = detect_encoding(&bytes).unwrap();
        assert_eq!(guess.charset, Charset::utf8());
    }

    #[test]
    fn test_detection_is_idempotent() {
        let bytes = b"a,b\n\xE9t\xE9,caf\xE9\n";
        assert_eq!(detect_encoding(bytes), detect_encoding(bytes));
    }

    #[test]
    fn test_reader_position_restored() {
        let mut cursor = Cursor::new(b"xxname,age\nAna,30\n".to_vec());
        cursor.set_position(2);

        let first = detect_encoding_from_reader(&mut cursor, &CharsetDetector).unwrap();
        assert_eq!(cursor.position(), 2);

        let second = detect_encoding_from_reader(&mut cursor, &CharsetDetector).unwrap();
        assert_eq!(cursor.position(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reader_reads_bounded_prefix() {
        let mut bytes = vec![b'a'; DETECTION_PREFIX_LEN];
        // Invalid UTF-8 beyond the prefix is not seen
        bytes.push(0xFF);
        let mut cursor = Cursor::new(bytes);

        let guess = detect_encoding_from_reader(&mut cursor, &CharsetDetector)
            .unwrap()
            .unwrap();
        assert_eq!(guess.charset, Charset::utf8());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_latin1_decodes_high_bytes() {
        let text = Charset::Latin1.decode(b"Jos\xE9").unwrap();
        assert_eq!(text, "José");
    }

    #[test]
    fn test_latin1_rejects_c1_controls() {
        // 0x93 is a curly quote in windows-1252 but a control in Latin-1
        assert!(Charset::Latin1.decode(b"\x93quoted\x94").is_none());
        let text = Charset::Encoding(WINDOWS_1252)
            .decode(b"\x93quoted\x94")
            .unwrap();
        assert_eq!(text, "\u{201C}quoted\u{201D}");
    }

    #[test]
    fn test_utf8_rejects_invalid_sequences() {
        assert!(Charset::utf8().decode(b"Jos\xE9").is_none());
        assert_eq!(Charset::utf8().decode("José".as_bytes()).unwrap(), "José");
    }

    #[test]
    fn test_control_bytes_unmappable_in_single_byte_charsets() {
        let noise = b"\x00\x01\x02binary\x7F";
        for charset in fallback_charsets() {
            assert!(charset.decode(noise).is_none(), "{} accepted noise", charset);
        }
        // Valid UTF-8, but NUL is never text
        assert!(Charset::utf8().decode(noise).is_none());
    }

    #[test]
    fn test_utf8_keeps_control_characters() {
        let text = Charset::utf8().decode(b"page\x0Cbreak \x1B[1m").unwrap();
        assert_eq!(text, "page\u{0C}break \u{1B}[1m");
        assert!(Charset::Latin1.decode(b"page\x0Cbreak").is_none());
    }

    #[test]
    fn test_single_byte_strips_utf8_bom() {
        assert_eq!(Charset::Latin1.decode(b"\xEF\xBB\xBFJos\xE9").unwrap(), "José");
        assert_eq!(
            Charset::Encoding(WINDOWS_1252)
                .decode(b"\xEF\xBB\xBFcaf\xE9")
                .unwrap(),
            "café"
        );
    }

    #[test]
    fn test_is_single_byte() {
        assert!(Charset::Latin1.is_single_byte());
        assert!(Charset::Encoding(ISO_8859_15).is_single_byte());
        assert!(!Charset::utf8().is_single_byte());
        assert!(!Charset::Encoding(encoding_rs::UTF_16LE).is_single_byte());
    }

    #[test]
    fn test_line_breaks_and_tabs_are_text() {
        assert_eq!(Charset::Latin1.decode(b"a\tb\r\nc").unwrap(), "a\tb\r\nc");
    }

    #[test]
    fn test_matching_bom_is_stripped() {
        assert_eq!(Charset::utf8().decode(b"\xEF\xBB\xBFabc").unwrap(), "abc");
    }

    #[test]
    fn test_for_label() {
        assert_eq!(Charset::for_label("latin1"), Some(Charset::Latin1));
        assert_eq!(Charset::for_label("ISO-8859-1"), Some(Charset::Latin1));
        assert_eq!(
            Charset::for_label("windows-1252"),
            Some(Charset::Encoding(WINDOWS_1252))
        );
        assert_eq!(Charset::for_label("utf8"), Some(Charset::utf8()));
        assert_eq!(Charset::for_label("no-such-charset"), None);
    }

    #[test]
    fn test_decoded_encoding_fallback() {
        let guess = EncodingGuess {
            charset: Charset::utf8(),
            confidence: Confidence::Heuristic,
        };
        let direct = DecodedEncoding {
            guess: Some(guess),
            charset: Charset::utf8(),
        };
        assert!(!direct.is_fallback());

        let fallback = DecodedEncoding {
            guess: Some(guess),
            charset: Charset::Latin1,
        };
        assert!(fallback.is_fallback());

        let undetected = DecodedEncoding {
            guess: None,
            charset: Charset::utf8(),
        };
        assert_eq!(undetected.primary(), Charset::utf8());
        assert!(!undetected.is_fallback());
    }

    #[test]
    fn test_fallback_order() {
        let names: Vec<&str> = fallback_charsets().iter().map(Charset::name).collect();
        assert_eq!(names, vec!["ISO-8859-1", "ISO-8859-15", "windows-1252"]);
    }
}
