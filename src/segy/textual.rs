//! SEG-Y textual headers and trailer stanzas (3200-byte records).
//!
//! The raw bytes are kept as read so that a rewrite reproduces them
//! exactly; text access goes through the detected encoding.

use std::fmt;

use crate::ebcdic;
use crate::{Result, SegError};

/// Size of every textual header, extended textual header and trailer stanza.
pub const TEXTUAL_HEADER_LEN: usize = 3200;

/// Stanza that terminates a scanned extended-textual or trailer sequence.
pub const END_TEXT_MARKER: &[u8] = b"((SEG: EndText))";

const CARD_LEN: usize = 80;

/// Character encoding of a textual record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Ebcdic,
    Ascii,
}

impl TextEncoding {
    /// Guess the encoding of a textual record.
    ///
    /// EBCDIC letters, digits and space (0x40) all sit at or above 0x40
    /// with most above 0x80, while ASCII text stays printable below 0x7F.
    pub fn detect(raw: &[u8]) -> Self {
        let mut ebcdic = 0usize;
        let mut ascii = 0usize;
        for &b in raw {
            match b {
                0x40 => ebcdic += 1,
                0x80..=0xFF => ebcdic += 1,
                0x20..=0x7E | b'\n' | b'\r' => ascii += 1,
                _ => {}
            }
        }
        if ebcdic > ascii { Self::Ebcdic } else { Self::Ascii }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ebcdic => write!(f, "EBCDIC"),
            Self::Ascii => write!(f, "ASCII"),
        }
    }
}

/// A 3200-byte textual record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextualHeader {
    raw: Vec<u8>,
    encoding: TextEncoding,
}

impl TextualHeader {
    /// Wrap raw record bytes, detecting their encoding.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() != TEXTUAL_HEADER_LEN {
            return Err(SegError::BlockTooShort {
                expected: TEXTUAL_HEADER_LEN,
                actual: raw.len(),
            });
        }
        Ok(Self {
            raw: raw.to_vec(),
            encoding: TextEncoding::detect(raw),
        })
    }

    /// Encode `text`, space padded or truncated to 3200 bytes.
    ///
    /// Characters outside printable ASCII become `?`.
    pub fn new(text: &str, encoding: TextEncoding) -> Self {
        let mut ascii: Vec<u8> = text
            .bytes()
            .take(TEXTUAL_HEADER_LEN)
            .map(|b| if (0x20..0x7F).contains(&b) { b } else { b'?' })
            .collect();
        ascii.resize(TEXTUAL_HEADER_LEN, b' ');
        let raw = match encoding {
            TextEncoding::Ascii => ascii,
            TextEncoding::Ebcdic => ebcdic::encode(&ascii),
        };
        Self { raw, encoding }
    }

    /// Build the record from up to 40 80-column cards.
    pub fn from_lines<S: AsRef<str>>(lines: &[S], encoding: TextEncoding) -> Self {
        let mut text = String::with_capacity(TEXTUAL_HEADER_LEN);
        for line in lines.iter().take(TEXTUAL_HEADER_LEN / CARD_LEN) {
            let card: String = line.as_ref().chars().take(CARD_LEN).collect();
            text.push_str(&format!("{card:<80}"));
        }
        Self::new(&text, encoding)
    }

    /// The standard end-of-sequence stanza.
    pub fn end_text(encoding: TextEncoding) -> Self {
        Self::new("((SEG: EndText))", encoding)
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The record as ASCII text.
    pub fn text(&self) -> String {
        let ascii = match self.encoding {
            TextEncoding::Ascii => self.raw.clone(),
            TextEncoding::Ebcdic => ebcdic::decode(&self.raw),
        };
        String::from_utf8_lossy(&ascii).into_owned()
    }

    /// The 40 cards with trailing blanks removed.
    pub fn lines(&self) -> Vec<String> {
        self.text()
            .as_bytes()
            .chunks(CARD_LEN)
            .map(|c| String::from_utf8_lossy(c).trim_end().to_string())
            .collect()
    }

    /// `true` if this stanza is the end marker.
    pub fn is_end_text(&self) -> bool {
        is_end_text(&self.raw)
    }
}

/// `true` if a raw 3200-byte block opens with the end marker in either
/// encoding.
pub fn is_end_text(raw: &[u8]) -> bool {
    let n = END_TEXT_MARKER.len();
    raw.len() >= n
        && (raw.starts_with(END_TEXT_MARKER)
            || raw[..n]
                .iter()
                .zip(END_TEXT_MARKER)
                .all(|(&b, &m)| ebcdic::to_ascii(b) == m))
}
