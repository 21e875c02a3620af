//! Properties payload format.
//!
//! Watched paths hold line-oriented `key=value` text compatible with the standard
//! properties syntax:
//!
//! - blank lines and lines starting with `#` or `!` are ignored
//! - a key ends at the first unescaped `=`, `:` or whitespace
//! - a trailing backslash continues the logical line on the next line
//! - `\t`, `\n`, `\r`, `\f` and `\uXXXX` escapes are decoded
//!
//! Malformed lines are skipped with a warning instead of failing the whole payload.

use crate::error::{ReloadError, Result};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

/// Key/value pairs parsed from one payload.
pub type PropertyBatch = BTreeMap<String, String>;

/// Character encoding of a properties payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8 (the default). A leading byte order mark is stripped.
    #[default]
    Utf8,
    /// ISO-8859-1, every byte maps to the code point of the same value.
    Latin1,
    /// 7-bit US-ASCII.
    Ascii,
}

impl Encoding {
    /// Look up an encoding by label, e.g. `"UTF-8"` or `"ISO-8859-1"`.
    ///
    /// A blank label selects UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Configuration`] for unsupported labels.
    pub fn from_label(label: &str) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "" | "utf-8" | "utf8" => Ok(Self::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Self::Latin1),
            "us-ascii" | "ascii" => Ok(Self::Ascii),
            _ => Err(ReloadError::Configuration(format!(
                "Unsupported encoding: {}. Supported: UTF-8, ISO-8859-1, US-ASCII",
                label
            ))),
        }
    }

    /// Decode raw bytes into text.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Parse`] if the bytes are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| ReloadError::Parse(format!("Invalid UTF-8 payload: {}", e)))
            }
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Ascii => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(ReloadError::Parse(format!(
                        "Non-ASCII byte 0x{:02x} at offset {}",
                        bytes[pos], pos
                    )));
                }
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            }
        }
    }
}

impl FromStr for Encoding {
    type Err = ReloadError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_label(s)
    }
}

/// Decode a payload and parse it into a batch.
pub fn decode_payload(bytes: &[u8], encoding: Encoding) -> Result<PropertyBatch> {
    let text = encoding.decode(bytes)?;
    Ok(parse_properties(&text))
}

/// Parse properties text into a batch. Later duplicates of a key win.
pub fn parse_properties(text: &str) -> PropertyBatch {
    let mut batch = PropertyBatch::new();
    for (line_no, line) in logical_lines(text) {
        match parse_line(&line) {
            Ok((key, value)) => {
                batch.insert(key, value);
            }
            Err(reason) => {
                warn!(line = line_no, %reason, "Skipping malformed property line");
            }
        }
    }
    batch
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// Join continuation lines and drop comments and blank lines.
///
/// Yields the 1-based number of the first natural line of each logical line.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (index, natural) in text.lines().enumerate() {
        let trimmed = natural.trim_start_matches(is_blank);
        let (start, mut buffer) = match current.take() {
            Some(pending) => pending,
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                (index + 1, String::new())
            }
        };

        let trailing = trimmed.chars().rev().take_while(|&c| c == '\\').count();
        if trailing % 2 == 1 {
            buffer.push_str(&trimmed[..trimmed.len() - 1]);
            current = Some((start, buffer));
        } else {
            buffer.push_str(trimmed);
            lines.push((start, buffer));
        }
    }

    if let Some(pending) = current {
        lines.push(pending);
    }
    lines
}

fn parse_line(line: &str) -> std::result::Result<(String, String), String> {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();

    let mut key_end = len;
    let mut value_start = len;
    let mut has_separator = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if !escaped && (c == '=' || c == ':') {
            key_end = i;
            value_start = i + 1;
            has_separator = true;
            break;
        }
        if !escaped && is_blank(c) {
            key_end = i;
            value_start = i + 1;
            break;
        }
        escaped = c == '\\' && !escaped;
    }

    while value_start < len && is_blank(chars[value_start]) {
        value_start += 1;
    }
    if !has_separator && value_start < len && matches!(chars[value_start], '=' | ':') {
        value_start += 1;
        while value_start < len && is_blank(chars[value_start]) {
            value_start += 1;
        }
    }

    let key = unescape(&chars[..key_end])?;
    if key.is_empty() {
        return Err("empty key".to_string());
    }
    let value = unescape(&chars[value_start..])?;
    Ok((key, value))
}

fn unescape(chars: &[char]) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(chars.len());
    let mut iter = chars.iter().copied();

    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = iter.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .ok_or_else(|| format!("malformed \\uXXXX escape: \\u{}", hex))?;
                let decoded = char::from_u32(code)
                    .ok_or_else(|| format!("invalid code point in escape: \\u{}", hex))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}
