//! Classification of reassembled lines into SSE data events.

/// Prefix marking a data line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload sent by the server once it has no more content.
pub const DONE_SENTINEL: &str = "[DONE]";

/// What a single complete line means to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Blank, comment, `event:` line, or anything else without the data prefix.
    Ignore,
    /// The termination sentinel.
    Done,
    /// A data payload, without the prefix.
    Data(&'a str),
}

/// Classify one line.
///
/// The line is trimmed first, so `\r` from CRLF framing and stray indentation
/// do not matter. The sentinel comparison is case-sensitive.
#[must_use]
pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim();
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return LineKind::Ignore;
    };
    if payload == DONE_SENTINEL {
        LineKind::Done
    } else {
        LineKind::Data(payload)
    }
}
