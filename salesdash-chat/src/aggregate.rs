//! Running assembly of the assistant's reply.

/// Append-only accumulator that reports each fragment as it arrives.
pub struct Aggregator<F> {
    text: String,
    fragments: usize,
    on_delta: F,
}

impl<F: FnMut(&str)> Aggregator<F> {
    /// Create an empty aggregate reporting to `on_delta`.
    pub fn new(on_delta: F) -> Self {
        Self {
            text: String::new(),
            fragments: 0,
            on_delta,
        }
    }

    /// Append `delta` and invoke the callback with exactly that fragment.
    pub fn push(&mut self, delta: &str) {
        self.text.push_str(delta);
        self.fragments += 1;
        (self.on_delta)(delta);
    }

    /// Text aggregated so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of fragments delivered.
    #[must_use]
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Move the full text out, leaving the aggregate empty.
    pub fn take_text(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

impl<F> std::fmt::Debug for Aggregator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("len", &self.text.len())
            .field("fragments", &self.fragments)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_receives_each_fragment_not_total() {
        let mut seen = Vec::new();
        let mut agg = Aggregator::new(|d: &str| seen.push(d.to_string()));
        agg.push("Hel");
        agg.push("lo");
        assert_eq!(agg.text(), "Hello");
        assert_eq!(agg.fragments(), 2);
        assert_eq!(agg.take_text(), "Hello");
        drop(agg);
        assert_eq!(seen, vec!["Hel", "lo"]);
    }

    #[test]
    fn empty_aggregate() {
        let mut agg = Aggregator::new(|_: &str| {});
        assert_eq!(agg.fragments(), 0);
        assert_eq!(agg.take_text(), "");
    }
}
