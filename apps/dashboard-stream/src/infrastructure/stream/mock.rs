//! Mock stream transport for testing.
//!
//! Each call to `open` consumes the next scripted outcome: a refusal, an
//! attempt that never completes, or an open connection fed by a
//! [`MockFeed`]. With nothing scripted, `open` is refused.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use parking_lot::Mutex;

use crate::application::ports::{FrameStream, RawFrame, StreamTransport, TransportError};

type FrameSender = mpsc::UnboundedSender<Result<RawFrame, TransportError>>;
type FrameReceiver = mpsc::UnboundedReceiver<Result<RawFrame, TransportError>>;

enum Scripted {
    Refuse(TransportError),
    Hang,
    Open(FrameReceiver),
}

/// Scripted [`StreamTransport`].
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    opens: AtomicUsize,
    abandoned: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script an attempt that fails with `error`.
    pub fn push_refusal(&self, error: TransportError) {
        self.script.lock().push_back(Scripted::Refuse(error));
    }

    /// Script an attempt that never reaches open.
    pub fn push_hang(&self) {
        self.script.lock().push_back(Scripted::Hang);
    }

    /// Script an attempt that opens; frames are pushed through the feed.
    #[must_use]
    pub fn push_open(&self) -> MockFeed {
        let (sender, receiver) = mpsc::unbounded();
        self.script.lock().push_back(Scripted::Open(receiver));
        MockFeed { sender }
    }

    /// Number of `open` calls so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of hanging attempts that were dropped by the caller.
    #[must_use]
    pub fn abandoned_count(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("scripted", &self.script.lock().len())
            .field("opens", &self.open_count())
            .finish()
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn open(&self, url: &str) -> Result<FrameStream, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();

        match next {
            Some(Scripted::Open(receiver)) => Ok(receiver.boxed()),
            Some(Scripted::Refuse(error)) => Err(error),
            Some(Scripted::Hang) => {
                let _abandoned = AbandonOnDrop(Arc::clone(&self.abandoned));
                let never = std::future::pending::<Infallible>().await;
                match never {}
            }
            None => Err(TransportError::ConnectionFailed(format!(
                "no scripted connection for {url}"
            ))),
        }
    }
}

struct AbandonOnDrop(Arc<AtomicUsize>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sending half of a scripted open connection.
///
/// Dropping the feed ends the stream.
#[derive(Debug, Clone)]
pub struct MockFeed {
    sender: FrameSender,
}

impl MockFeed {
    /// Deliver a frame. Ignored once the client let go of the connection.
    pub fn send(&self, frame: RawFrame) {
        let _ = self.sender.unbounded_send(Ok(frame));
    }

    /// Drop the connection with an error.
    pub fn fail(&self, error: TransportError) {
        let _ = self.sender.unbounded_send(Err(error));
    }

    /// End the stream cleanly.
    pub fn close(&self) {
        self.sender.close_channel();
    }

    /// Whether the client has dropped its end of the connection.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
