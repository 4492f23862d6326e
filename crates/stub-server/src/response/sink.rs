//! Host callback interface fed by the response emitter.

use crate::error::StubError;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Receiver of the events produced for one intercepted request.
///
/// Implemented by the transport layer. Within one request the emitter
/// guarantees that `on_headers_ready` fires at most once and before any
/// chunk, chunks arrive in `send` order, and `on_finished` or `on_error`
/// is the last call made.
pub trait ResponseSink: Send {
    fn on_headers_ready(&mut self, status: u16, headers: &HashMap<String, String>);

    fn on_data_chunk(&mut self, chunk: Bytes);

    fn on_finished(&mut self);

    fn on_error(&mut self, error: StubError);
}

/// One event delivered to a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEvent {
    HeadersReady {
        status: u16,
        headers: HashMap<String, String>,
    },
    DataChunk(Bytes),
    Finished,
    /// Rendered error message
    Error(String),
}

/// Sink that records every event into a shared log.
///
/// Clones share the same log, so a test can keep one handle while the
/// emitter owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ResponseEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ResponseEvent> {
        self.events.lock().clone()
    }

    pub fn status(&self) -> Option<u16> {
        self.events.lock().iter().find_map(|event| match event {
            ResponseEvent::HeadersReady { status, .. } => Some(*status),
            _ => None,
        })
    }

    pub fn headers(&self) -> Option<HashMap<String, String>> {
        self.events.lock().iter().find_map(|event| match event {
            ResponseEvent::HeadersReady { headers, .. } => Some(headers.clone()),
            _ => None,
        })
    }

    /// All data chunks concatenated.
    pub fn body(&self) -> Bytes {
        let mut body = BytesMut::new();
        for event in self.events.lock().iter() {
            if let ResponseEvent::DataChunk(chunk) = event {
                body.extend_from_slice(chunk);
            }
        }
        body.freeze()
    }

    pub fn chunks(&self) -> Vec<Bytes> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ResponseEvent::DataChunk(chunk) => Some(chunk.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.events.lock().contains(&ResponseEvent::Finished)
    }

    pub fn error(&self) -> Option<String> {
        self.events.lock().iter().find_map(|event| match event {
            ResponseEvent::Error(message) => Some(message.clone()),
            _ => None,
        })
    }

    fn push(&self, event: ResponseEvent) {
        self.events.lock().push(event);
    }
}

impl ResponseSink for RecordingSink {
    fn on_headers_ready(&mut self, status: u16, headers: &HashMap<String, String>) {
        self.push(ResponseEvent::HeadersReady {
            status,
            headers: headers.clone(),
        });
    }

    fn on_data_chunk(&mut self, chunk: Bytes) {
        self.push(ResponseEvent::DataChunk(chunk));
    }

    fn on_finished(&mut self) {
        self.push(ResponseEvent::Finished);
    }

    fn on_error(&mut self, error: StubError) {
        self.push(ResponseEvent::Error(error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_shares_log() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();

        writer.on_headers_ready(201, &HashMap::new());
        writer.on_data_chunk(Bytes::from_static(b"ab"));
        writer.on_data_chunk(Bytes::from_static(b"cd"));
        writer.on_finished();

        assert_eq!(sink.status(), Some(201));
        assert_eq!(sink.body(), Bytes::from_static(b"abcd"));
        assert_eq!(sink.chunks().len(), 2);
        assert!(sink.is_finished());
        assert_eq!(sink.error(), None);
        assert_eq!(sink.events().len(), 4);
    }
}
