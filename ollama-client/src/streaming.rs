//! Streamed response assembly.
//!
//! A generation response arrives as a sequence of byte chunks. Each chunk is
//! decoded with the charset announced by the response (UTF-8 when none is
//! given) and the decoded fragments are concatenated in arrival order:
//!
//! ```text
//! ["Hel", "lo, ", "world"]  ──▶  "Hello, world"
//! ```
//!
//! A multi-byte character split across two chunks is held back until the
//! rest of it arrives. A transport error anywhere in the stream aborts
//! assembly; no partial answer is returned.
//!
//! The server writes one JSON object per line into that stream:
//! ```text
//! {"model":"llama2","response":"Hel","done":false}
//! {"model":"llama2","response":"lo","done":false}
//! {"model":"llama2","response":"","done":true,"eval_count":2}
//! ```
//! [`response_text`] extracts the generated text from an assembled body.
//!
//! Reference: <https://github.com/ollama/ollama/blob/main/docs/api.md#generate-a-completion>

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;

use crate::error::{OllamaError, map_reqwest_error};
use crate::types::GenerateLine;

/// A stream of decoded text chunks from a generation response.
///
/// Yields each non-empty decoded fragment in arrival order. After an `Err`
/// the stream ends.
pub struct ChunkStream {
    /// The underlying fragment stream.
    pub receiver: Pin<Box<dyn Stream<Item = Result<String, OllamaError>> + Send>>,
}

impl Stream for ChunkStream {
    type Item = Result<String, OllamaError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.as_mut().poll_next(cx)
    }
}

/// Text encodings a response body may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Charset {
    Utf8,
    Latin1,
}

impl Charset {
    /// Charset named by a `Content-Type` value, UTF-8 when absent.
    pub(crate) fn from_content_type(content_type: Option<&str>) -> Result<Self, OllamaError> {
        let Some(content_type) = content_type else {
            return Ok(Self::Utf8);
        };

        let charset = content_type.split(';').skip(1).find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
        });

        match charset.as_deref() {
            None | Some("utf-8" | "utf8" | "us-ascii" | "ascii") => Ok(Self::Utf8),
            Some("iso-8859-1" | "latin1" | "latin-1") => Ok(Self::Latin1),
            Some(other) => Err(OllamaError::Decode(format!("unsupported charset: {other}"))),
        }
    }
}

/// Incremental chunk decoder.
#[derive(Debug)]
pub(crate) struct ChunkDecoder {
    charset: Charset,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub(crate) fn new(charset: Charset) -> Self {
        Self {
            charset,
            pending: Vec::new(),
        }
    }

    /// Decode one chunk. Returns an empty string when nothing complete arrived.
    pub(crate) fn decode(&mut self, chunk: &[u8]) -> Result<String, OllamaError> {
        match self.charset {
            Charset::Latin1 => Ok(chunk.iter().map(|&b| char::from(b)).collect()),
            Charset::Utf8 => {
                self.pending.extend_from_slice(chunk);
                match std::str::from_utf8(&self.pending) {
                    Ok(text) => {
                        let text = text.to_string();
                        self.pending.clear();
                        Ok(text)
                    }
                    Err(e) if e.error_len().is_none() => {
                        let valid = e.valid_up_to();
                        let rest = self.pending.split_off(valid);
                        let text = String::from_utf8(std::mem::replace(&mut self.pending, rest))
                            .map_err(|e| OllamaError::Decode(e.to_string()))?;
                        Ok(text)
                    }
                    Err(e) => Err(OllamaError::Decode(format!("UTF-8 decode error: {e}"))),
                }
            }
        }
    }

    /// Finish decoding; fails if a multi-byte sequence was left incomplete.
    pub(crate) fn finish(self) -> Result<(), OllamaError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(OllamaError::Decode(format!(
                "stream ended inside a UTF-8 sequence ({} dangling bytes)",
                self.pending.len()
            )))
        }
    }
}

/// Accumulates decoded fragments into one answer.
#[derive(Debug, Default)]
pub struct StreamedAnswer {
    text: String,
    fragments: usize,
}

impl StreamedAnswer {
    /// An empty answer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments are skipped.
    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    /// Number of non-empty fragments received.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Text assembled so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The assembled answer.
    pub fn finish(self) -> String {
        self.text
    }
}

/// Wrap a successful generation response into a [`ChunkStream`].
pub(crate) fn stream_chunks(
    response: Response,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
) -> Result<ChunkStream, OllamaError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let charset = Charset::from_content_type(content_type)?;

    let byte_stream = response
        .bytes_stream()
        .map(move |chunk| chunk.map_err(|e| map_reqwest_error(e, timeout)));

    Ok(ChunkStream {
        receiver: Box::pin(decode_chunks(byte_stream, charset, cancel)),
    })
}

/// Decode a byte stream into a stream of non-empty text fragments.
pub(crate) fn decode_chunks(
    byte_stream: impl Stream<Item = Result<bytes::Bytes, OllamaError>> + Send + 'static,
    charset: Charset,
    cancel: Option<CancellationToken>,
) -> impl Stream<Item = Result<String, OllamaError>> + Send + 'static {
    async_stream::stream! {
        let mut decoder = ChunkDecoder::new(charset);
        let mut bytes_stream = std::pin::pin!(byte_stream);

        loop {
            let next = match &cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => Some(Err(OllamaError::Cancelled)),
                        next = bytes_stream.next() => next,
                    }
                }
                None => bytes_stream.next().await,
            };

            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    yield Err(e);
                    return;
                }
                None => break,
            };

            if chunk.is_empty() {
                continue;
            }

            match decoder.decode(&chunk) {
                Ok(text) if text.is_empty() => {}
                Ok(text) => yield Ok(text),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if let Err(e) = decoder.finish() {
            yield Err(e);
        }
    }
}

/// Drain a fragment stream into a single answer.
///
/// Any error aborts assembly and discards what was received so far.
pub async fn assemble<S>(stream: S) -> Result<String, OllamaError>
where
    S: Stream<Item = Result<String, OllamaError>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut answer = StreamedAnswer::new();
    while let Some(fragment) = stream.next().await {
        answer.push(&fragment?);
    }
    tracing::debug!(fragments = answer.fragments(), bytes = answer.as_str().len(), "assembled streamed answer");
    Ok(answer.finish())
}

/// Extract the generated text from an assembled NDJSON generation body.
///
/// Joins the `response` field of every line in order, stopping at the line
/// marked `done`. A line carrying `error` fails the whole body.
pub fn response_text(body: &str) -> Result<String, OllamaError> {
    let mut text = String::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed: GenerateLine = serde_json::from_str(line)
            .map_err(|e| OllamaError::InvalidResponse(format!("JSON parse error in NDJSON: {e}")))?;
        if let Some(error) = parsed.error {
            return Err(OllamaError::InvalidResponse(format!("server reported: {error}")));
        }

        text.push_str(&parsed.response);
        if parsed.done {
            break;
        }
    }
    Ok(text)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
