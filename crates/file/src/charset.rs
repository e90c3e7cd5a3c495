//! Charset names and their byte-level definitions.

use anyhow::Result;
use encoding_rs::Encoding;
use std::str::FromStr;

/// A named charset used to decode input or encode output.
///
/// WHATWG label lookup maps several legacy names onto supersets (for
/// example `ISO-8859-1` and `US-ASCII` both become windows-1252). Those
/// names are modelled here as their own variants so bytes mean exactly what
/// the name says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// A charset implemented by `encoding_rs` under its canonical name
    Whatwg(&'static Encoding),
    /// 7-bit ASCII; bytes and characters above 0x7F are invalid
    UsAscii,
    /// ISO-8859-1; every byte maps to the code point of the same value
    Latin1,
    /// UTF-16 with a byte order mark. Big-endian when writing, and when
    /// reading input that has no byte order mark.
    Utf16,
}

impl Charset {
    pub fn utf8() -> Charset {
        Charset::Whatwg(encoding_rs::UTF_8)
    }

    /// Resolve a charset name such as "UTF-8", "latin1" or "utf-16le".
    ///
    /// Names that `encoding_rs` only knows as an alias of a different
    /// charset are rejected instead of silently substituted.
    pub fn for_label(label: &str) -> Result<Charset> {
        let normalized = normalize(label);
        match normalized.as_str() {
            "usascii" | "ascii" | "iso646us" | "ansix3.41968" | "cp367" | "ibm367" | "646" => {
                return Ok(Charset::UsAscii)
            }
            "iso88591" | "iso885911987" | "latin1" | "l1" | "isoir100" | "cp819" | "ibm819" => {
                return Ok(Charset::Latin1)
            }
            "utf16" => return Ok(Charset::Utf16),
            _ => {}
        }

        let Some(encoding) = Encoding::for_label(label.trim().as_bytes()) else {
            anyhow::bail!("Unsupported charset: {label}");
        };
        if normalize(encoding.name()) != normalized {
            anyhow::bail!(
                "Unsupported charset: {label} (only available as {}, which is a different charset)",
                encoding.name()
            );
        }
        Ok(Charset::Whatwg(encoding))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Whatwg(encoding) => encoding.name(),
            Charset::UsAscii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Utf16 => "UTF-16",
        }
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset::utf8()
    }
}

impl FromStr for Charset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Charset::for_label(s)
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(label: &str) -> String {
    label
        .trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
