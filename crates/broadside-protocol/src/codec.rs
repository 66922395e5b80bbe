//! Line codec: [`Message`] ⇄ one newline-terminated line of text.
//!
//! The format is
//!
//! ```text
//! TYPE:key1=value1;key2=value2\n
//! TYPE:\n                          (no data)
//! ```
//!
//! The codec is a pair of pure functions; there is no codec state to share
//! between connections.
//!
//! # Escaping
//!
//! The bare format cannot carry `;` or `=` inside a value (and a newline
//! would end the line). Keys and values are therefore percent-escaped for
//! exactly five characters:
//!
//! | char | escape |
//! |------|--------|
//! | `%`  | `%25`  |
//! | `;`  | `%3B`  |
//! | `=`  | `%3D`  |
//! | `\n` | `%0A`  |
//! | `\r` | `%0D`  |
//!
//! Any other `%` sequence is left as-is when decoding, so text produced by
//! a peer that does not escape still decodes to what it meant as long as it
//! avoided those characters.

use crate::{Message, ProtocolError};

/// Encodes a message as one line, including the trailing `\n`.
///
/// ```rust
/// use broadside_protocol::{Message, codec};
///
/// let msg = Message::new("ATTACK").with("x", 3).with("y", 4);
/// assert_eq!(codec::encode(&msg), "ATTACK:x=3;y=4\n");
/// ```
///
/// Keys and values are escaped; the kind is written as is. Kinds are
/// expected to be the constants in [`commands`](crate::commands), which
/// never contain `:` or a line break.
pub fn encode(msg: &Message) -> String {
    debug_assert!(
        !msg.kind().contains([':', '\n', '\r']),
        "message kind {:?} would break framing",
        msg.kind()
    );
    let data: Vec<String> = msg
        .fields()
        .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
        .collect();
    format!("{}:{}\n", msg.kind(), data.join(";"))
}

/// Decodes one line (with or without its line terminator).
///
/// The line is split on the first `:`. Pairs in the data segment that have
/// no `=` are skipped rather than failing the whole line. If a key repeats,
/// the last value wins.
///
/// # Errors
/// - [`ProtocolError::InvalidUtf8`] if the bytes are not UTF-8
/// - [`ProtocolError::MissingSeparator`] if there is no `:`
/// - [`ProtocolError::EmptyCommand`] if nothing precedes the `:`
pub fn decode(line: &[u8]) -> Result<Message, ProtocolError> {
    let line = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;
    let line = line.trim_end_matches(['\n', '\r']);

    let (kind, data) = line
        .split_once(':')
        .ok_or_else(|| ProtocolError::MissingSeparator(line.to_string()))?;
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(ProtocolError::EmptyCommand);
    }

    let mut msg = Message::new(kind);
    for pair in data.split(';').filter(|p| !p.is_empty()) {
        if let Some((key, value)) = pair.split_once('=') {
            msg.insert(unescape(key), unescape(value));
        }
    }
    Ok(msg)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ';' => out.push_str("%3B"),
            '=' => out.push_str("%3D"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = match tail.get(..3) {
            Some(code) if code.eq_ignore_ascii_case("%25") => Some('%'),
            Some(code) if code.eq_ignore_ascii_case("%3B") => Some(';'),
            Some(code) if code.eq_ignore_ascii_case("%3D") => Some('='),
            Some(code) if code.eq_ignore_ascii_case("%0A") => Some('\n'),
            Some(code) if code.eq_ignore_ascii_case("%0D") => Some('\r'),
            _ => None,
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &tail[3..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// =========================================================================
// Tests
// =========================================================================
