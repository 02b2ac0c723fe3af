//! Streaming chat response consumer.
//!
//! Turns a chunked byte stream of SSE frames into text deltas:
//!
//! ```text
//! bytes -> Utf8Decoder -> LineReassembler -> classify_line -> extract_delta -> Aggregator
//! ```
//!
//! [`SseDeltaParser`] and [`StreamConsumer`] are synchronous and transport
//! agnostic. [`consume`] drives a consumer from an async byte stream with
//! cooperative cancellation, and [`delta_stream`] exposes the same pipeline as
//! a lazily produced stream of fragments.
//!
//! Data lines that arrive after the `[DONE]` sentinel are still parsed; the
//! loop only ends when the transport does.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::aggregate::Aggregator;
use crate::decode::Utf8Decoder;
use crate::delta::{DeltaOutcome, SkipReason, extract_delta};
use crate::error::ChatError;
use crate::event::{LineKind, classify_line};
use crate::lines::LineReassembler;

/// Chunk-to-delta pipeline without aggregation.
#[derive(Debug, Default)]
pub struct SseDeltaParser {
    decoder: Utf8Decoder,
    lines: LineReassembler,
    sentinel_seen: bool,
}

impl SseDeltaParser {
    /// Create a parser with empty decoder and line state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return the deltas it completes, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        let lines = self.lines.push(&text);
        self.interpret_all(lines)
    }

    /// Flush decoder and line state at end of stream.
    ///
    /// A trailing line without a newline is interpreted like any other.
    pub fn finish(&mut self) -> Vec<String> {
        let tail = self.decoder.flush();
        let mut lines = self.lines.push(&tail);
        lines.extend(self.lines.finish());
        self.interpret_all(lines)
    }

    /// Whether a `[DONE]` sentinel has been seen.
    #[must_use]
    pub fn sentinel_seen(&self) -> bool {
        self.sentinel_seen
    }

    fn interpret_all(&mut self, lines: Vec<String>) -> Vec<String> {
        lines
            .iter()
            .filter_map(|line| self.interpret(line))
            .collect()
    }

    fn interpret(&mut self, line: &str) -> Option<String> {
        let payload = match classify_line(line) {
            LineKind::Ignore => return None,
            LineKind::Done => {
                tracing::debug!("stream sentinel received");
                self.sentinel_seen = true;
                return None;
            }
            LineKind::Data(payload) => payload,
        };

        if self.sentinel_seen {
            tracing::debug!("data line after sentinel");
        }

        match extract_delta(payload) {
            DeltaOutcome::Text(text) => Some(text),
            DeltaOutcome::Skip(SkipReason::NoContent) => None,
            DeltaOutcome::Skip(SkipReason::Malformed) => {
                tracing::trace!(payload, "skipping malformed data line");
                None
            }
            DeltaOutcome::Skip(SkipReason::ServerError(message)) => {
                tracing::warn!(%message, "completion stream reported an error");
                None
            }
        }
    }
}

/// Lifecycle of one streaming operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// No chunk has been fed yet.
    Idle,
    /// At least one chunk has been fed and the transport is still open.
    Reading,
    /// The transport ended and the aggregate was handed back.
    Done,
    /// Cancellation was observed and the aggregate was discarded.
    Cancelled,
}

impl ConsumerState {
    /// Whether no further chunks will be accepted.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

/// Parser plus aggregator for a single chat-send operation.
pub struct StreamConsumer<F> {
    parser: SseDeltaParser,
    aggregate: Aggregator<F>,
    state: ConsumerState,
}

impl<F: FnMut(&str)> StreamConsumer<F> {
    /// Create a consumer that reports each delta to `on_delta`.
    pub fn new(on_delta: F) -> Self {
        Self {
            parser: SseDeltaParser::new(),
            aggregate: Aggregator::new(on_delta),
            state: ConsumerState::Idle,
        }
    }

    /// Process one chunk. Ignored once the consumer is terminal.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.state.is_terminal() {
            return;
        }
        self.state = ConsumerState::Reading;
        for delta in self.parser.feed(chunk) {
            self.aggregate.push(&delta);
        }
    }

    /// Mark the transport as ended and return everything aggregated.
    ///
    /// Succeeds whether or not a sentinel was seen. Returns an empty string if
    /// the consumer was already terminal.
    pub fn finish(&mut self) -> String {
        if self.state.is_terminal() {
            return String::new();
        }
        for delta in self.parser.finish() {
            self.aggregate.push(&delta);
        }
        self.state = ConsumerState::Done;
        tracing::debug!(
            fragments = self.aggregate.fragments(),
            len = self.aggregate.text().len(),
            sentinel = self.parser.sentinel_seen(),
            "chat stream complete"
        );
        self.aggregate.take_text()
    }

    /// Abandon the operation, discarding the partial aggregate.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = ConsumerState::Cancelled;
        tracing::debug!(
            fragments = self.aggregate.fragments(),
            "chat stream cancelled"
        );
        drop(self.aggregate.take_text());
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Text aggregated so far.
    #[must_use]
    pub fn text(&self) -> &str {
        self.aggregate.text()
    }

    /// Whether a `[DONE]` sentinel has been seen.
    #[must_use]
    pub fn sentinel_seen(&self) -> bool {
        self.parser.sentinel_seen()
    }
}

impl<F> std::fmt::Debug for StreamConsumer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConsumer")
            .field("parser", &self.parser)
            .field("aggregate", &self.aggregate)
            .field("state", &self.state)
            .finish()
    }
}

/// Drive a [`StreamConsumer`] over `stream` until the transport ends.
///
/// `cancel` is checked before every await on the next chunk. When it fires,
/// the stream is dropped (closing the connection), no further callbacks run,
/// and the call fails with [`ChatError::Cancelled`]. Fragments already passed
/// to `on_delta` are not retracted.
///
/// # Errors
///
/// [`ChatError::Cancelled`] on cancellation, or the transport's own error if
/// a chunk read fails.
pub async fn consume<S, F>(
    stream: S,
    cancel: Option<&CancellationToken>,
    on_delta: F,
) -> Result<String, ChatError>
where
    S: Stream<Item = Result<Bytes, ChatError>>,
    F: FnMut(&str),
{
    let mut stream = std::pin::pin!(stream);
    let mut cancelled = std::pin::pin!(async move {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    });
    let mut consumer = StreamConsumer::new(on_delta);

    loop {
        let next = tokio::select! {
            biased;
            () = cancelled.as_mut() => {
                consumer.abort();
                return Err(ChatError::Cancelled);
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => consumer.feed(&chunk),
            Some(Err(err)) => {
                tracing::debug!(error = %err, "chat stream read failed");
                return Err(err);
            }
            None => return Ok(consumer.finish()),
        }
    }
}

/// Expose the pipeline as a finite stream of delta strings.
///
/// The stream is not restartable: each chat-send produces a fresh one. A
/// transport error is yielded once and ends the stream.
pub fn delta_stream<S>(
    byte_stream: S,
) -> impl Stream<Item = Result<String, ChatError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, ChatError>> + Send + 'static,
{
    async_stream::stream! {
        let mut parser = SseDeltaParser::new();
        let mut bytes_stream = std::pin::pin!(byte_stream);

        while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for delta in parser.feed(&chunk) {
                yield Ok(delta);
            }
        }

        for delta in parser.finish() {
            yield Ok(delta);
        }
    }
}

/// End `stream` with [`ChatError::Cancelled`] as soon as `token` fires.
///
/// The inner stream is dropped at that point, releasing whatever it owns.
pub fn with_cancellation<S>(
    stream: S,
    token: CancellationToken,
) -> impl Stream<Item = Result<String, ChatError>> + Send + 'static
where
    S: Stream<Item = Result<String, ChatError>> + Send + 'static,
{
    async_stream::stream! {
        let mut inner = std::pin::pin!(stream);
        loop {
            let step = tokio::select! {
                biased;
                () = token.cancelled() => None,
                next = inner.next() => Some(next),
            };
            match step {
                None => {
                    yield Err(ChatError::Cancelled);
                    return;
                }
                Some(Some(item)) => yield item,
                Some(None) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\
\n\
data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\
\n\
data: [DONE]\n\
\n";

    fn data_line(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    fn run(chunks: &[&[u8]]) -> (Vec<String>, String) {
        let mut seen = Vec::new();
        let text = {
            let mut consumer = StreamConsumer::new(|d: &str| seen.push(d.to_string()));
            for chunk in chunks {
                consumer.feed(chunk);
            }
            consumer.finish()
        };
        (seen, text)
    }

    #[test]
    fn hello_world_in_one_chunk() {
        let (seen, text) = run(&[HELLO_WORLD.as_bytes()]);
        assert_eq!(seen, vec!["Hello", " world"]);
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn hello_world_split_at_every_offset() {
        let bytes = HELLO_WORLD.as_bytes();
        for split in 0..=bytes.len() {
            let (seen, text) = run(&[&bytes[..split], &bytes[split..]]);
            assert_eq!(seen, vec!["Hello", " world"], "split at {split}");
            assert_eq!(text, "Hello world", "split at {split}");
        }
    }

    #[test]
    fn multibyte_content_split_mid_character() {
        let body = data_line("שלום עולם");
        let bytes = body.as_bytes();
        for split in 0..=bytes.len() {
            let (seen, text) = run(&[&bytes[..split], &bytes[split..]]);
            assert_eq!(seen, vec!["שלום עולם"], "split at {split}");
            assert_eq!(text, "שלום עולם");
        }
    }

    #[test]
    fn malformed_payloads_are_skipped() {
        let body = format!(
            "{}data: {{oops\n\ndata: {{\"choices\":[]}}\n\ndata: 17\n\n{}",
            data_line("A"),
            data_line("B")
        );
        let (seen, text) = run(&[body.as_bytes()]);
        assert_eq!(seen, vec!["A", "B"]);
        assert_eq!(text, "AB");
    }

    #[test]
    fn lines_after_sentinel_are_still_processed() {
        let body = format!("{}data: [DONE]\n\n{}", data_line("A"), data_line("B"));
        let mut seen = Vec::new();
        let mut consumer = StreamConsumer::new(|d: &str| seen.push(d.to_string()));
        consumer.feed(body.as_bytes());
        assert!(consumer.sentinel_seen());
        assert_eq!(consumer.finish(), "AB");
        drop(consumer);
        assert_eq!(seen, vec!["A", "B"]);
    }

    #[test]
    fn sentinel_alone_yields_empty_result() {
        let (seen, text) = run(&[b"data: [DONE]\n\n".as_slice()]);
        assert!(seen.is_empty());
        assert_eq!(text, "");
    }

    #[test]
    fn order_is_preserved_across_chunks() {
        let a = data_line("A");
        let b = data_line("B");
        let c = data_line("C");
        let (seen, text) = run(&[a.as_bytes(), b.as_bytes(), c.as_bytes()]);
        assert_eq!(seen, vec!["A", "B", "C"]);
        assert!(text.ends_with("ABC"));
    }

    #[test]
    fn blank_lines_are_tolerated() {
        let body = format!("\n\n\r\n   \n{}\n\n", data_line("X"));
        let (seen, text) = run(&[body.as_bytes()]);
        assert_eq!(seen, vec!["X"]);
        assert_eq!(text, "X");
    }

    #[test]
    fn unterminated_last_line_is_processed_at_finish() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}";
        let (seen, text) = run(&[body.as_bytes()]);
        assert_eq!(seen, vec!["tail"]);
        assert_eq!(text, "tail");
    }

    #[test]
    fn abrupt_end_without_sentinel_returns_aggregate() {
        let body = format!("{}{}", data_line("par"), data_line("tial"));
        let (_, text) = run(&[body.as_bytes()]);
        assert_eq!(text, "partial");
    }

    #[test]
    fn state_transitions() {
        let mut consumer = StreamConsumer::new(|_: &str| {});
        assert_eq!(consumer.state(), ConsumerState::Idle);
        consumer.feed(data_line("x").as_bytes());
        assert_eq!(consumer.state(), ConsumerState::Reading);
        assert_eq!(consumer.finish(), "x");
        assert_eq!(consumer.state(), ConsumerState::Done);
        consumer.feed(data_line("ignored").as_bytes());
        assert_eq!(consumer.finish(), "");
    }

    #[test]
    fn abort_discards_aggregate_and_stops_callbacks() {
        let mut count = 0;
        let mut consumer = StreamConsumer::new(|_: &str| count += 1);
        consumer.feed(data_line("a").as_bytes());
        consumer.abort();
        assert_eq!(consumer.state(), ConsumerState::Cancelled);
        assert_eq!(consumer.text(), "");
        consumer.feed(data_line("b").as_bytes());
        assert_eq!(consumer.finish(), "");
        drop(consumer);
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn consume_returns_aggregate_at_transport_end() {
        let chunks: Vec<Result<Bytes, ChatError>> = HELLO_WORLD
            .as_bytes()
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let mut seen = Vec::new();
        let text = consume(futures::stream::iter(chunks), None, |d| {
            seen.push(d.to_string())
        })
        .await
        .unwrap();
        assert_eq!(text, "Hello world");
        assert_eq!(seen, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn consume_propagates_transport_error() {
        let chunks: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from(data_line("A"))),
            Err(ChatError::Stream("connection reset".into())),
            Ok(Bytes::from(data_line("B"))),
        ];
        let mut seen = Vec::new();
        let err = consume(futures::stream::iter(chunks), None, |d| {
            seen.push(d.to_string())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ChatError::Stream(msg) if msg == "connection reset"));
        assert_eq!(seen, vec!["A"]);
    }

    #[tokio::test]
    async fn consume_with_precancelled_token_fires_no_callbacks() {
        let token = CancellationToken::new();
        token.cancel();
        let chunks: Vec<Result<Bytes, ChatError>> = vec![Ok(Bytes::from(data_line("A")))];
        let mut count = 0;
        let err = consume(futures::stream::iter(chunks), Some(&token), |_| count += 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Cancelled));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn cancellation_after_two_fragments_rejects() {
        let token = CancellationToken::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<Bytes, ChatError>>();
        let stream = receiver_stream(rx);

        tx.send(Ok(Bytes::from(data_line("Hel")))).unwrap();
        tx.send(Ok(Bytes::from(data_line("lo")))).unwrap();

        let trigger = token.clone();
        let mut seen = Vec::new();
        let result = consume(stream, Some(&token), |d| {
            seen.push(d.to_string());
            if seen.len() == 2 {
                trigger.cancel();
            }
        })
        .await;

        assert!(matches!(result, Err(ChatError::Cancelled)));
        assert_eq!(seen, vec!["Hel", "lo"]);
        // The receiver was dropped with the stream.
        assert!(tx.send(Ok(Bytes::from(data_line("!")))).is_err());
    }

    #[tokio::test]
    async fn delta_stream_yields_fragments_lazily() {
        let chunks: Vec<Result<Bytes, ChatError>> = HELLO_WORLD
            .as_bytes()
            .chunks(5)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let deltas: Vec<String> = delta_stream(futures::stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn delta_stream_stops_after_error() {
        let chunks: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from(data_line("A"))),
            Err(ChatError::Stream("boom".into())),
            Ok(Bytes::from(data_line("B"))),
        ];
        let items: Vec<Result<String, ChatError>> =
            delta_stream(futures::stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(t) if t == "A"));
        assert!(matches!(&items[1], Err(ChatError::Stream(_))));
    }

    #[tokio::test]
    async fn with_cancellation_ends_stream() {
        let token = CancellationToken::new();
        token.cancel();
        let inner = futures::stream::iter(vec![Ok::<_, ChatError>("A".to_string())]);
        let items: Vec<Result<String, ChatError>> =
            with_cancellation(inner, token).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ChatError::Cancelled)));
    }

    #[tokio::test]
    async fn with_cancellation_after_two_fragments_yields_cancelled_once() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let mut stream = std::pin::pin!(with_cancellation(
            delta_stream(receiver_stream(rx)),
            token.clone()
        ));

        tx.send(Ok(Bytes::from(data_line("Hel")))).unwrap();
        tx.send(Ok(Bytes::from(data_line("lo")))).unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "Hel");
        assert_eq!(stream.next().await.unwrap().unwrap(), "lo");

        token.cancel();
        // Data that arrives after cancellation is never surfaced.
        tx.send(Ok(Bytes::from(data_line("late")))).unwrap();
        assert!(matches!(stream.next().await, Some(Err(ChatError::Cancelled))));
        assert!(stream.next().await.is_none());
    }

    /// Adapt an unbounded receiver into a `Stream` that stays open while the
    /// sender lives.
    fn receiver_stream(
        mut rx: tokio::sync::mpsc::UnboundedReceiver<Result<Bytes, ChatError>>,
    ) -> impl Stream<Item = Result<Bytes, ChatError>> {
        async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        }
    }
}
