//! Reassembly of newline-terminated lines from decoded text fragments.

/// Buffers a partial line across fragments and yields only complete lines.
#[derive(Debug, Default)]
pub struct LineReassembler {
    carry: String,
}

impl LineReassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` and return every line it completes, in order.
    ///
    /// Returned lines do not include the terminating `\n`. A trailing `\r` is
    /// kept; the event filter trims it.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let start = self.carry.len();
        self.carry.push_str(text);

        // Only the new text can hold a newline: the carry never does.
        let Some(offset) = text.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.carry.split_off(start + offset + 1);
        let complete = std::mem::replace(&mut self.carry, rest);

        complete
            .split_terminator('\n')
            .map(str::to_owned)
            .collect()
    }

    /// Take the unterminated remainder at end of stream, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.carry))
        }
    }

    /// The partial line currently held back.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.carry
    }
}
