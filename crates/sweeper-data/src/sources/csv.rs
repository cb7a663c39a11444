//! Delimited text decoding with encoding fallback.

use tracing::{debug, info};

use crate::encoding::{
    detection_prefix, fallback_charsets, Charset, CharsetDetector, DecodedEncoding,
    EncodingDetector, EncodingGuess,
};
use crate::error::{DecodeError, Result};
use crate::table::DecodedTable;

/// Options for CSV parsing
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Whether to trim whitespace from fields
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            trim: false,
        }
    }
}

impl CsvOptions {
    /// Create options for tab-separated values (TSV)
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Default::default()
        }
    }

    /// Create options for semicolon-separated values (common in European locales)
    pub fn semicolon() -> Self {
        Self {
            delimiter: b';',
            ..Default::default()
        }
    }
}

/// Decodes delimited text, recovering from a wrong encoding guess
pub struct CsvDecoder<D = CharsetDetector> {
    /// Parsing options
    options: CsvOptions,
    /// Encoding detector consulted before the first attempt
    detector: D,
}

impl CsvDecoder {
    /// Create a decoder with default options and detector
    pub fn new() -> Self {
        Self::with_options(CsvOptions::default())
    }

    /// Create a decoder with custom options
    pub fn with_options(options: CsvOptions) -> Self {
        Self {
            options,
            detector: CharsetDetector,
        }
    }
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: EncodingDetector> CsvDecoder<D> {
    /// Replace the encoding detector
    pub fn with_detector<E: EncodingDetector>(self, detector: E) -> CsvDecoder<E> {
        CsvDecoder {
            options: self.options,
            detector,
        }
    }

    /// Guess the encoding from the bounded prefix of `bytes`
    pub fn detect_encoding(&self, bytes: &[u8]) -> Option<EncodingGuess> {
        self.detector.detect(detection_prefix(bytes))
    }

    /// Decode `bytes` as delimited text under a single encoding
    ///
    /// Fails with [`DecodeError::EncodingMismatch`] when the bytes are not
    /// valid text in `charset`. Never retries with another encoding.
    pub fn decode_csv(&self, bytes: &[u8], charset: Charset) -> Result<DecodedTable> {
        let text = charset
            .decode(bytes)
            .ok_or_else(|| DecodeError::EncodingMismatch(charset.name().to_string()))?;

        self.parse_text(&text)
    }

    /// Decode `bytes`, walking the fallback chain if the detected encoding fails
    ///
    /// The first encoding that decodes without error wins. Errors other
    /// than an encoding mismatch end the attempt immediately.
    pub fn decode_csv_with_fallback(&self, bytes: &[u8]) -> Result<DecodedTable> {
        self.decode_csv_with_encoding(bytes).map(|(table, _)| table)
    }

    /// Like [`decode_csv_with_fallback`](Self::decode_csv_with_fallback), also
    /// reporting the encoding that produced the table
    pub fn decode_csv_with_encoding(
        &self,
        bytes: &[u8],
    ) -> Result<(DecodedTable, DecodedEncoding)> {
        if bytes.is_empty() {
            return Err(DecodeError::EmptyInput);
        }

        let guess = self.detect_encoding(bytes);
        if let Some(guess) = guess {
            debug!(encoding = %guess.charset, confidence = ?guess.confidence, "Detected encoding");
        }
        let primary = guess.map(|g| g.charset).unwrap_or_else(Charset::utf8);
        let used = |charset| DecodedEncoding { guess, charset };

        let mut attempted = vec![primary.name().to_string()];
        match self.decode_csv(bytes, primary) {
            Err(err) if err.is_encoding_mismatch() => {
                info!(encoding = %primary, "Decode failed, trying fallback encodings");
            }
            result => return result.map(|table| (table, used(primary))),
        }

        for charset in fallback_charsets() {
            if charset == primary {
                continue;
            }
            attempted.push(charset.name().to_string());

            match self.decode_csv(bytes, charset) {
                Err(err) if err.is_encoding_mismatch() => {
                    debug!(encoding = %charset, "Fallback encoding failed");
                }
                Ok(table) => {
                    info!(encoding = %charset, "Decoded with fallback encoding");
                    return Ok((table, used(charset)));
                }
                Err(err) => return Err(err),
            }
        }

        Err(DecodeError::AllEncodingsExhausted { attempted })
    }

    /// Parse decoded text into a table, first record as header
    fn parse_text(&self, text: &str) -> Result<DecodedTable> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .has_headers(false) // We handle headers ourselves
            .trim(if self.options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .flexible(false)
            .from_reader(text.as_bytes());

        let mut records = csv_reader.records();

        let header = match records.next() {
            Some(record) => record.map_err(map_csv_error)?,
            None => return Err(DecodeError::EmptyInput),
        };
        let columns: Vec<String> = header.iter().map(|s| s.to_string()).collect();

        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(map_csv_error)?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        DecodedTable::from_text_rows(columns, rows)
    }
}

fn map_csv_error(err: csv::Error) -> DecodeError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => DecodeError::RaggedRow {
            line: pos.as_ref().map(|p| p.line()).unwrap_or_default(),
            expected: *expected_len as usize,
            found: *len as usize,
        },
        _ => DecodeError::Csv(err.to_string()),
    }
}
