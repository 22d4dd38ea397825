//! Line grammar of the protocol: command framing, string quoting and
//! argument scanning.

use crate::editor::Position;
use crate::error::FrameError;

/// How a received command expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `!` (or the event separator `=`): no reply.
    Command,
    /// `/`: exactly one reply line carrying the sequence number.
    Function,
}

/// One parsed inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Close the connection and ask the host to exit.
    Disconnect,
    /// Close the connection only.
    Detach,
    Call(RawCall<'a>),
}

/// A framed `<bufno>:<verb><sep><seqno> <args>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCall<'a> {
    pub bufno: i64,
    pub verb: &'a str,
    pub kind: CallKind,
    pub seqno: i64,
    pub args: &'a str,
}

/// Split a received line into its framing parts.
///
/// # Returns
/// The parsed line, with `args` starting at the first non-blank character
/// after the sequence number.
///
/// # Errors
/// Returns [`FrameError`] when the colon or the `!`/`/` separator is missing.
pub fn parse_line(line: &str) -> Result<Inbound<'_>, FrameError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    match line {
        "DISCONNECT" => return Ok(Inbound::Disconnect),
        "DETACH" => return Ok(Inbound::Detach),
        _ => {}
    }

    let (bufno, rest) = leading_number(line);
    let Some(rest) = rest.strip_prefix(':') else {
        return Err(FrameError::MissingColon(line.to_string()));
    };

    let Some(sep_at) = rest.find(['!', '/', '=']) else {
        return Err(FrameError::MissingSeparator(line.to_string()));
    };
    let verb = &rest[..sep_at];
    let kind = if rest.as_bytes()[sep_at] == b'/' {
        CallKind::Function
    } else {
        CallKind::Command
    };

    let (seqno, args) = leading_number(&rest[sep_at + 1..]);
    Ok(Inbound::Call(RawCall {
        bufno,
        verb,
        kind,
        seqno,
        args: args.trim_start_matches([' ', '\t']),
    }))
}

/// Parse an optionally signed decimal prefix the way `strtol` does: leading
/// blanks are skipped and a missing number reads as 0.
fn leading_number(input: &str) -> (i64, &str) {
    let trimmed = input.trim_start_matches([' ', '\t']);
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return (0, input);
    }
    let value = trimmed[..end].parse::<i64>().unwrap_or(i64::MAX);
    (value, &trimmed[end..])
}

/// Escape text for transmission inside a quoted argument.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

/// Decode a quoted argument.
///
/// `input` must start with `"`; decoding stops at the first unescaped `"` or
/// at the end of input. Unknown escapes are dropped.
///
/// # Returns
/// The decoded text and the unconsumed remainder after the closing quote.
/// `None` when `input` does not start with a quote.
pub fn unquote(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Some((out, &body[idx + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => out.push('\\'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '"')) => out.push('"'),
                Some(_) => {}
                None => break,
            },
            _ => out.push(ch),
        }
    }
    Some((out, ""))
}

/// A location argument: either a byte offset or an explicit `lnum/col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Offset(i64),
    LineCol(Position),
}

/// Sequential scanner over a command's argument text.
#[derive(Debug, Clone)]
pub struct Args<'a> {
    rest: &'a str,
}

impl<'a> Args<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn skip_blanks(&mut self) {
        self.rest = self.rest.trim_start_matches([' ', '\t']);
    }

    /// Whether only blanks remain.
    pub fn is_empty(&self) -> bool {
        self.rest.trim().is_empty()
    }

    /// Next signed decimal number.
    pub fn number(&mut self) -> Option<i64> {
        self.skip_blanks();
        let (value, rest) = leading_number(self.rest);
        if rest.len() == self.rest.len() {
            return None;
        }
        self.rest = rest;
        Some(value)
    }

    /// Next quoted string, decoded.
    pub fn quoted(&mut self) -> Option<String> {
        self.skip_blanks();
        let (text, rest) = unquote(self.rest)?;
        self.rest = rest;
        Some(text)
    }

    /// Next blank-delimited word.
    pub fn word(&mut self) -> Option<&'a str> {
        self.skip_blanks();
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .find([' ', '\t'])
            .unwrap_or(self.rest.len());
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(word)
    }

    /// Next `T`/`F` flag.
    pub fn flag(&mut self) -> Option<bool> {
        match self.word()? {
            "T" => Some(true),
            "F" => Some(false),
            _ => None,
        }
    }

    /// Next location, given as `off` or `lnum/col`.
    pub fn locator(&mut self) -> Option<Locator> {
        let first = self.number()?;
        if let Some(rest) = self.rest.strip_prefix('/') {
            self.rest = rest;
            let col = self.number().unwrap_or(0);
            return Some(Locator::LineCol(Position::new(
                usize::try_from(first).unwrap_or(0),
                usize::try_from(col).unwrap_or(0),
            )));
        }
        Some(Locator::Offset(first))
    }

    /// Everything not yet consumed, without surrounding blanks.
    pub fn rest(&self) -> &'a str {
        self.rest.trim()
    }
}
