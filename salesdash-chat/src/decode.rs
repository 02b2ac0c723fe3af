//! Incremental UTF-8 decoding of transport chunks.

/// Stateful UTF-8 decoder for a chunked byte stream.
///
/// Bytes of a multi-byte character that straddle a chunk boundary are held
/// until the next chunk completes them. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Trailing bytes of an incomplete character (at most three).
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with no held bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning only the text completed by this chunk.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        if self.pending.is_empty() {
            return self.decode_from(chunk);
        }
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);
        self.decode_from(&buf)
    }

    /// Emit any held bytes at end of stream. An incomplete trailing character
    /// becomes a single replacement character.
    pub fn flush(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    fn decode_from(&mut self, mut bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());
        loop {
            match std::str::from_utf8(bytes) {
                Ok(s) => {
                    out.push_str(s);
                    return out;
                }
                Err(e) => {
                    let (valid, rest) = bytes.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            bytes = &rest[bad..];
                        }
                        None => {
                            // Truncated character at the end of the chunk.
                            self.pending.extend_from_slice(rest);
                            return out;
                        }
                    }
                }
            }
        }
    }
}
