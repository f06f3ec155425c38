//! Text encodings used to turn key text into key bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Encodings accepted for key material.
///
/// Characters an encoding cannot represent are replaced with `?`, matching the
/// replacement behaviour hosts expect from legacy single-byte code pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "utf-16le", alias = "unicode", alias = "utf-16")]
    Utf16Le,
    #[serde(rename = "utf-16be", alias = "bigendianunicode")]
    Utf16Be,
    #[serde(rename = "utf-32le", alias = "utf-32")]
    Utf32Le,
    #[serde(rename = "ascii", alias = "us-ascii")]
    Ascii,
    #[serde(rename = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    pub const ALL: [TextEncoding; 6] = [
        TextEncoding::Utf8,
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
        TextEncoding::Utf32Le,
        TextEncoding::Ascii,
        TextEncoding::Latin1,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Utf32Le => "utf-32le",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin1",
        }
    }

    /// Encode `text` into a buffer that is wiped on drop.
    pub fn encode(self, text: &str) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(text.len() * self.max_unit()));
        match self {
            TextEncoding::Utf8 => out.extend_from_slice(text.as_bytes()),
            TextEncoding::Utf16Le => {
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }
            TextEncoding::Utf16Be => {
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
            }
            TextEncoding::Utf32Le => {
                for ch in text.chars() {
                    out.extend_from_slice(&u32::from(ch).to_le_bytes());
                }
            }
            TextEncoding::Ascii => {
                out.extend(text.chars().map(|ch| if ch.is_ascii() { ch as u8 } else { b'?' }));
            }
            TextEncoding::Latin1 => {
                out.extend(text.chars().map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?')));
            }
        }
        out
    }

    fn max_unit(self) -> usize {
        match self {
            TextEncoding::Utf8 | TextEncoding::Ascii | TextEncoding::Latin1 => 1,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
            TextEncoding::Utf32Le => 4,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-16" | "utf-16le" | "utf16" | "unicode" => Ok(TextEncoding::Utf16Le),
            "utf-16be" | "bigendianunicode" | "big-endian-unicode" => Ok(TextEncoding::Utf16Be),
            "utf-32" | "utf-32le" | "utf32" => Ok(TextEncoding::Utf32Le),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(format!("unknown text encoding '{other}'")),
        }
    }
}
