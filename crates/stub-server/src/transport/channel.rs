//! Sink that bridges emitter events into a hyper response.

use crate::error::StubError;
use crate::response::ResponseSink;
use bytes::Bytes;
use futures::channel::{mpsc, oneshot};
use hyper::body::Frame;
use std::collections::HashMap;
use tracing::debug;

pub(crate) type BodyFrame = Result<Frame<Bytes>, StubError>;

/// Status line and headers announced by `on_headers_ready`.
#[derive(Debug)]
pub(crate) struct ResponseHead {
    pub status: u16,
    pub headers: HashMap<String, String>,
}

/// Forwards the head through a oneshot and body frames through an
/// unbounded channel. Dropping the sink ends the body stream.
pub(crate) struct ChannelSink {
    head: Option<oneshot::Sender<ResponseHead>>,
    body: mpsc::UnboundedSender<BodyFrame>,
}

impl ChannelSink {
    pub fn new() -> (
        Self,
        oneshot::Receiver<ResponseHead>,
        mpsc::UnboundedReceiver<BodyFrame>,
    ) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::unbounded();
        (
            Self {
                head: Some(head_tx),
                body: body_tx,
            },
            head_rx,
            body_rx,
        )
    }

    fn forward(&self, frame: BodyFrame) {
        if self.body.unbounded_send(frame).is_err() {
            debug!("Client went away, dropping response frame");
        }
    }
}

impl ResponseSink for ChannelSink {
    fn on_headers_ready(&mut self, status: u16, headers: &HashMap<String, String>) {
        if let Some(head) = self.head.take() {
            let _ = head.send(ResponseHead {
                status,
                headers: headers.clone(),
            });
        }
    }

    fn on_data_chunk(&mut self, chunk: Bytes) {
        self.forward(Ok(Frame::data(chunk)));
    }

    fn on_finished(&mut self) {
        self.body.close_channel();
    }

    fn on_error(&mut self, error: StubError) {
        self.forward(Err(error));
        self.body.close_channel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_events_reach_receivers() {
        let (mut sink, head_rx, mut body_rx) = ChannelSink::new();
        sink.on_headers_ready(201, &HashMap::from([("X-A".to_string(), "1".to_string())]));
        sink.on_data_chunk(Bytes::from_static(b"hello"));
        sink.on_finished();

        let head = head_rx.await.unwrap();
        assert_eq!(head.status, 201);
        assert_eq!(head.headers["X-A"], "1");

        let frame = body_rx.next().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"hello"));
        assert!(body_rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_error_without_head() {
        let (mut sink, head_rx, mut body_rx) = ChannelSink::new();
        sink.on_error(StubError::ResponseConstruction("bad status".into()));
        drop(sink);

        assert!(head_rx.await.is_err());
        let err = body_rx.next().await.unwrap().unwrap_err();
        assert!(matches!(err, StubError::ResponseConstruction(_)));
    }
}
