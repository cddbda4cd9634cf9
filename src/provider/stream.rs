//! Resumable byte-range streaming with bounded retries.
//!
//! A transient failure (dropped TLS session, read timeout, truncated chunked
//! body) does not restart the download from scratch: the source is reopened
//! at the number of bytes already handed to the consumer, so the output never
//! contains a byte range twice. Every transient failure consumes one attempt;
//! once [`RetryPolicy::max_attempts`] failures have been seen the stream
//! yields [`Error::Transport`] and ends.
//!
//! The retry loop lives inside the stream itself. Dropping the stream drops
//! the open connection and any pending back-off sleep, so an abandoned
//! download stops immediately.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, future, stream};
use reqwest::{
    Client, StatusCode,
    header::RANGE,
};

use crate::{
    error::{Error, Result},
    provider::ByteStream,
    warning,
};

/// Something that can be read from an arbitrary byte offset.
#[async_trait]
pub trait RangeSource: Send + Sync + 'static {
    /// Opens the resource so that its first yielded byte is at `offset`.
    async fn open(&self, offset: u64) -> Result<ByteStream>;

    /// Short description used in log lines.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of transient failures after which the stream gives up.
    pub max_attempts: u32,
    /// Pause before reopening the source.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

/// Plain HTTP(S) resource read with `Range` requests.
#[derive(Debug, Clone)]
pub struct HttpRangeSource {
    client: Client,
    url: String,
}

impl HttpRangeSource {
    /// Creates a source for `url`, fetched with `client`.
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client carrying the vendor's cookies and timeouts
    /// * `url` - Absolute URL of the audio resource
    ///
    /// # Returns
    ///
    /// A source that is not connected yet; the first connection happens on
    /// [`RangeSource::open`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let source = HttpRangeSource::new(Client::new(), "https://cdn.example.com/a.mp3");
    /// let audio = resumable(Arc::new(source), RetryPolicy::default());
    /// ```
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    async fn open(&self, offset: u64) -> Result<ByteStream> {
        let mut request = self.client.get(&self.url);
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={offset}-"));
        }

        let response = request.send().await.map_err(Error::from_http)?;
        let status = response.status();

        // Everything was already delivered before the connection dropped.
        if offset > 0 && status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(stream::empty().boxed());
        }

        if !status.is_success() {
            return Err(Error::from_status(
                status,
                format!("GET {} returned {}", self.url, status),
            ));
        }

        // A body that breaks off mid-transfer surfaces as a decode error;
        // only a status is worth classifying.
        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| match e.status() {
                    Some(_) => Error::from_http(e),
                    None => Error::TransientTransport(e.to_string()),
                })
            })
            .boxed();

        // Servers that ignore `Range` answer 200 with the whole body.
        if offset > 0 && status != StatusCode::PARTIAL_CONTENT {
            return Ok(skip_prefix(body, offset));
        }

        Ok(body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Drops the first `count` bytes of `input`.
pub fn skip_prefix(input: ByteStream, count: u64) -> ByteStream {
    let mut remaining = count;
    input
        .map(move |chunk| {
            chunk.map(|bytes| {
                if remaining == 0 {
                    return bytes;
                }
                let cut = remaining.min(bytes.len() as u64) as usize;
                remaining -= cut as u64;
                bytes.slice(cut..)
            })
        })
        .filter(|chunk| future::ready(!matches!(chunk, Ok(bytes) if bytes.is_empty())))
        .boxed()
}

struct ResumeState {
    source: Arc<dyn RangeSource>,
    policy: RetryPolicy,
    current: Option<ByteStream>,
    offset: u64,
    failures: u32,
    finished: bool,
}

impl ResumeState {
    /// Records a failure. Returns the error to surface when the stream must
    /// stop, or `None` after backing off when it should reconnect.
    async fn fail(&mut self, err: Error) -> Option<Error> {
        self.current = None;

        if !err.is_transient() {
            self.finished = true;
            return Some(err);
        }

        self.failures += 1;
        if self.failures >= self.policy.max_attempts {
            self.finished = true;
            return Some(Error::Transport {
                attempts: self.failures,
                message: err.to_string(),
            });
        }

        warning!(
            "Transfer of {} interrupted ({}), resuming at byte {} [attempt {}/{}]",
            self.source.describe(),
            err,
            self.offset,
            self.failures + 1,
            self.policy.max_attempts
        );
        tokio::time::sleep(self.policy.delay).await;
        None
    }
}

/// Streams `source` from its start, resuming after transient failures.
pub fn resumable(source: Arc<dyn RangeSource>, policy: RetryPolicy) -> ByteStream {
    let state = ResumeState {
        source,
        policy,
        current: None,
        offset: 0,
        failures: 0,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            if state.current.is_none() {
                match state.source.open(state.offset).await {
                    Ok(opened) => state.current = Some(opened),
                    Err(e) => {
                        if let Some(err) = state.fail(e).await {
                            return Some((Err(err), state));
                        }
                    }
                }
                continue;
            }

            let next = match state.current.as_mut() {
                Some(current) => current.next().await,
                None => continue,
            };

            match next {
                Some(Ok(chunk)) => {
                    state.offset += chunk.len() as u64;
                    return Some((Ok(chunk), state));
                }
                Some(Err(e)) => {
                    if let Some(err) = state.fail(e).await {
                        return Some((Err(err), state));
                    }
                }
                None => {
                    state.finished = true;
                    return None;
                }
            }
        }
    })
    .boxed()
}

/// Collects a whole stream in memory.
///
/// Meant for small payloads, for taggers that need the complete file, and
/// for tests.
///
/// # Arguments
///
/// * `input` - Stream to drain
///
/// # Returns
///
/// All bytes in delivery order, or the first error the stream yielded.
///
/// # Example
///
/// ```ignore
/// let audio = collect(provider.download("3135556", formats::MP3_128).await?).await?;
/// ```
pub async fn collect(mut input: ByteStream) -> Result<Bytes> {
    let mut buf = bytes::BytesMut::new();
    while let Some(chunk) = input.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}
