//! Output character tables
//!
//! Receipt text is built as UTF-8. Printers that cannot render UTF-8 get the
//! text converted to Windows-1252 (WPC1252), which covers Dutch text and the
//! euro sign at 0x80.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::escpos::Command;

/// Character table the printer expects for text bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    /// Text bytes are sent as UTF-8 unchanged
    #[default]
    Utf8,
    /// WPC1252 is selected after every INIT and text is transcoded
    Cp1252,
}

#[derive(Debug, Error)]
#[error("unknown charset '{0}', expected 'utf8' or 'cp1252'")]
pub struct UnknownCharset(pub String);

impl FromStr for Charset {
    type Err = UnknownCharset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Charset::Utf8),
            "cp1252" | "windows-1252" | "wpc1252" => Ok(Charset::Cp1252),
            other => Err(UnknownCharset(other.to_string())),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charset::Utf8 => f.write_str("utf8"),
            Charset::Cp1252 => f.write_str("cp1252"),
        }
    }
}

/// Convert a builder buffer (commands plus UTF-8 text) for the given charset
///
/// ASCII bytes (0x00-0x7F) are copied exactly, which keeps every command
/// intact. Only runs of bytes >= 0x80 are treated as UTF-8 text and
/// transcoded. For [`Charset::Cp1252`] the code table select is re-issued
/// after each INIT, since INIT resets it.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn encode_for_printer(bytes: &[u8], charset: Charset) -> Vec<u8> {
    if charset == Charset::Utf8 {
        return bytes.to_vec();
    }

    let init = Command::Init.bytes();
    let select = Command::CodeTableWpc1252.bytes();

    let mut result = Vec::with_capacity(bytes.len() + 8);
    if !bytes.starts_with(init) {
        result.extend_from_slice(select);
    }

    let mut buffer = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(init) {
            flush_buffer(&mut buffer, &mut result);
            result.extend_from_slice(init);
            result.extend_from_slice(select);
            i += init.len();
            continue;
        }

        let b = bytes[i];
        if b < 0x80 {
            flush_buffer(&mut buffer, &mut result);
            result.push(b);
        } else {
            buffer.push(b);
        }
        i += 1;
    }

    flush_buffer(&mut buffer, &mut result);
    result
}

/// Flush the non-ASCII buffer, converting UTF-8 to Windows-1252
///
/// Characters outside the table become '?'.
fn flush_buffer(buffer: &mut Vec<u8>, result: &mut Vec<u8>) {
    if buffer.is_empty() {
        return;
    }

    let s = String::from_utf8_lossy(buffer);
    let mut tmp = [0u8; 4];
    for c in s.chars() {
        let (encoded, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut tmp));
        if had_errors {
            warn!(character = %c, "Character not representable in cp1252");
            result.push(b'?');
        } else {
            result.extend_from_slice(&encoded);
        }
    }
    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_from_str() {
        assert_eq!("utf8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("UTF-8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("cp1252".parse::<Charset>().unwrap(), Charset::Cp1252);
        assert!("gbk".parse::<Charset>().is_err());
    }

    #[test]
    fn test_utf8_is_passthrough() {
        let data = "\x1B@€12,50\n".as_bytes();
        assert_eq!(encode_for_printer(data, Charset::Utf8), data);
    }

    #[test]
    fn test_cp1252_euro_and_init() {
        let data = "\x1B@€1\n".as_bytes();
        let out = encode_for_printer(data, Charset::Cp1252);
        assert_eq!(out, vec![0x1B, 0x40, 0x1B, 0x74, 0x10, 0x80, b'1', b'\n']);
    }

    #[test]
    fn test_cp1252_accents() {
        let out = encode_for_printer("\x1B@café".as_bytes(), Charset::Cp1252);
        assert_eq!(&out[5..], &[b'c', b'a', b'f', 0xE9]);
    }

    #[test]
    fn test_cp1252_unmappable() {
        let out = encode_for_printer("\x1B@a你b".as_bytes(), Charset::Cp1252);
        assert_eq!(&out[5..], b"a?b");
    }

    #[test]
    fn test_cp1252_without_leading_init() {
        let out = encode_for_printer(b"ab", Charset::Cp1252);
        assert_eq!(out, vec![0x1B, 0x74, 0x10, b'a', b'b']);
    }
}
