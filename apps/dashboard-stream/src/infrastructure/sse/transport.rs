//! Event-Stream Transport
//!
//! [`StreamTransport`] over HTTP: a long-lived `GET` whose body is decoded
//! with [`SseDecoder`]. The connection counts as open once the server
//! answers `200` with a `text/event-stream` content type.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};

use super::codec::SseDecoder;
use crate::application::ports::{FrameStream, RawFrame, StreamTransport, TransportError};

const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Whether cookies set by the backend are stored and replayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialsMode {
    /// Send no cookies.
    #[default]
    Omit,
    /// Keep a cookie store and send its cookies with every request.
    Include,
}

impl CredentialsMode {
    /// Map a boolean "with credentials" flag.
    #[must_use]
    pub const fn from_flag(with_credentials: bool) -> Self {
        if with_credentials {
            Self::Include
        } else {
            Self::Omit
        }
    }
}

/// Server-Sent Events transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: reqwest::Client,
}

impl SseTransport {
    /// Build a transport with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectionFailed` if the HTTP client cannot
    /// be built (for example when the TLS backend fails to initialise).
    pub fn new(credentials: CredentialsMode) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(credentials == CredentialsMode::Include)
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client })
    }

    /// Use an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamTransport for SseTransport {
    async fn open(&self, url: &str) -> Result<FrameStream, TransportError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, EVENT_STREAM_MIME)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::Rejected(format!("unexpected status {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !content_type.starts_with(EVENT_STREAM_MIME) {
            return Err(TransportError::Rejected(format!(
                "unexpected content type {content_type:?}"
            )));
        }

        tracing::debug!(url, "Event stream response accepted");

        Ok(frames(response.bytes_stream().boxed()))
    }
}

/// Turn a body byte stream into decoded frames.
fn frames<S, B, E>(body: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = (body, SseDecoder::new(), VecDeque::<RawFrame>::new());

    futures::stream::unfold(state, |(mut body, mut decoder, mut pending)| async move {
        loop {
            if let Some(frame) = pending.pop_front() {
                return Some((Ok(frame), (body, decoder, pending)));
            }

            match body.next().await {
                Some(Ok(chunk)) => pending.extend(decoder.decode(chunk.as_ref())),
                Some(Err(e)) => {
                    return Some((
                        Err(TransportError::Interrupted(e.to_string())),
                        (body, decoder, pending),
                    ));
                }
                None => return None,
            }
        }
    })
    .boxed()
}
