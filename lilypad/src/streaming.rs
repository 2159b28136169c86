//! Incremental decoding of server-sent chat completion streams.
//!
//! The server answers a streaming request with lines of the form
//! `data: {json}` and finishes with `data: [DONE]`. [`ChunkStream`] turns the
//! raw response bytes into one JSON value per data line as soon as each line
//! is complete, without waiting for the rest of the body.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Line that ends a stream.
pub const DONE_SENTINEL: &str = "data: [DONE]";

/// Prefix carried by SSE data lines.
pub const DATA_PREFIX: &str = "data: ";

/// Raw response body, as delivered by the transport.
pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// A single decoded line of an event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// The termination sentinel.
    Done,
    /// A line without payload (blank or keep-alive).
    Empty,
    /// A decoded JSON chunk.
    Chunk(Value),
}

/// Decode one line of an event stream.
///
/// The sentinel check is made on the trimmed line, before the `data: `
/// prefix is stripped. Anything that is neither the sentinel nor blank must
/// be a JSON object.
///
/// # Errors
///
/// Returns [`Error::StreamDecode`] if the payload is not valid JSON or is
/// not an object.
pub fn decode_line(line: &str) -> Result<SseLine> {
    if line.trim() == DONE_SENTINEL {
        return Ok(SseLine::Done);
    }

    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
    if payload.trim().is_empty() {
        return Ok(SseLine::Empty);
    }

    match serde_json::from_str(payload) {
        Ok(chunk @ Value::Object(_)) => Ok(SseLine::Chunk(chunk)),
        Ok(_) => Err(Error::stream_decode(payload, "expected a JSON object")),
        Err(e) => Err(Error::stream_decode(payload, e)),
    }
}

/// Stream of JSON chunks decoded from an event-stream response body.
///
/// Ends after the sentinel line, or when the connection closes. Yields at
/// most one error, after which it is exhausted.
pub struct ChunkStream<S> {
    inner: S,
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a newline.
    scanned: usize,
    closed: bool,
    finished: bool,
    received: usize,
}

impl<S> std::fmt::Debug for ChunkStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("buffered", &self.buffer.len())
            .field("received", &self.received)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<S> ChunkStream<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    /// Wrap a byte stream.
    pub const fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            scanned: 0,
            closed: false,
            finished: false,
            received: 0,
        }
    }

    /// Number of chunks yielded so far.
    #[must_use]
    pub const fn received(&self) -> usize {
        self.received
    }

    /// Drain the stream into a vector.
    ///
    /// Chunks gathered before a failure are discarded.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the stream.
    pub async fn collect_chunks(self) -> Result<Vec<Value>> {
        self.try_collect().await
    }

    /// Take the next complete line out of the buffer.
    ///
    /// Once the connection is closed, whatever is left counts as a final line.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        if let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            self.scanned = 0;
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            return Some(line);
        }
        self.scanned = self.buffer.len();
        if self.closed && !self.buffer.is_empty() {
            self.scanned = 0;
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }

    fn decode_raw(raw: &[u8]) -> Result<SseLine> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| Error::stream_decode(String::from_utf8_lossy(raw), e))?;
        decode_line(line.strip_suffix('\r').unwrap_or(line))
    }
}

impl<S> Stream for ChunkStream<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }

            if let Some(raw) = self.next_line() {
                match Self::decode_raw(&raw) {
                    Ok(SseLine::Chunk(chunk)) => {
                        self.received += 1;
                        return Poll::Ready(Some(Ok(chunk)));
                    }
                    Ok(SseLine::Empty) => continue,
                    Ok(SseLine::Done) => {
                        debug!(chunks = self.received, "Stream finished with sentinel");
                        self.finished = true;
                        return Poll::Ready(None);
                    }
                    Err(e) => {
                        self.finished = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                }
            }

            if self.closed {
                debug!(chunks = self.received, "Stream closed without sentinel");
                self.finished = true;
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => self.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) if e.is_timeout() => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(Error::from(e))));
                }
                Poll::Ready(Some(Err(e))) => {
                    // A dropped connection ends the stream like a clean close.
                    warn!(error = %e, "Stream connection closed while reading");
                    self.closed = true;
                }
                Poll::Ready(None) => self.closed = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
