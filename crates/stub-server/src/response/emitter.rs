//! Per-request response builder and event state machine.
//!
//! A handler drives a [`ResponseEmitter`] with `status`, `content_type`,
//! `headers` and `charset`, then streams the body with `send` and closes it
//! with `end` or `error`. Headers are finalized exactly once, the first time
//! data is sent or the response is ended or errored. After that point the
//! pending-state setters are silent no-ops, and once the emitter is closed
//! every call is a no-op.

use super::sink::ResponseSink;
use crate::content_type::ContentKind;
use crate::error::StubError;
use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

pub const DEFAULT_STATUS: u16 = 200;
pub const DEFAULT_CHARSET: &str = "utf8";
const CONTENT_TYPE: &str = "Content-Type";

/// Lifecycle of an emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterPhase {
    /// Headers still pending
    NotStarted,
    /// Headers emitted, body may still be streaming
    Started,
    /// `end` or `error` has run
    Finished,
}

#[derive(Debug, Clone)]
struct ResponseState {
    status: u16,
    headers: Option<HashMap<String, String>>,
    content_kind: ContentKind,
    charset: String,
    headers_sent: bool,
    closed: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: DEFAULT_STATUS,
            headers: None,
            content_kind: ContentKind::default(),
            charset: DEFAULT_CHARSET.to_string(),
            headers_sent: false,
            closed: false,
        }
    }
}

/// Builder and state machine producing the events of one response.
pub struct ResponseEmitter {
    state: ResponseState,
    sink: Option<Box<dyn ResponseSink>>,
}

impl ResponseEmitter {
    pub fn new(sink: Box<dyn ResponseSink>) -> Self {
        Self {
            state: ResponseState::default(),
            sink: Some(sink),
        }
    }

    pub fn phase(&self) -> EmitterPhase {
        if self.state.closed {
            EmitterPhase::Finished
        } else if self.state.headers_sent {
            EmitterPhase::Started
        } else {
            EmitterPhase::NotStarted
        }
    }

    pub fn headers_sent(&self) -> bool {
        self.state.headers_sent
    }

    pub fn is_finished(&self) -> bool {
        self.state.closed
    }

    pub fn status(&mut self, status: u16) -> &mut Self {
        if self.is_pending("status") {
            self.state.status = status;
        }
        self
    }

    /// Set the content kind from a [`ContentKind`] or a short name such as `"json"`.
    pub fn content_type(&mut self, kind: impl Into<ContentKind>) -> &mut Self {
        if self.is_pending("content_type") {
            self.state.content_kind = kind.into();
        }
        self
    }

    /// Replace the response headers.
    ///
    /// A `Content-Type` entry, if present, is kept as is; otherwise one is
    /// synthesized from the content kind and charset.
    pub fn headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if self.is_pending("headers") {
            self.state.headers = Some(
                headers
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            );
        }
        self
    }

    pub fn charset(&mut self, charset: impl Into<String>) -> &mut Self {
        if self.is_pending("charset") {
            self.state.charset = charset.into();
        }
        self
    }

    /// Emit a body chunk, finalizing headers first if needed.
    pub fn send(&mut self, data: impl Into<Bytes>) -> &mut Self {
        if self.state.closed {
            return self;
        }
        self.finalize_headers();
        if let Some(sink) = self.sink.as_mut() {
            sink.on_data_chunk(data.into());
        }
        self
    }

    /// Serialize `value` as JSON and emit it as a chunk.
    ///
    /// Forces the content kind to JSON while headers are still pending. An
    /// encoding failure is routed to the error event.
    pub fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> &mut Self {
        if self.state.closed {
            return self;
        }
        if !self.state.headers_sent {
            self.state.content_kind = ContentKind::Json;
        }
        match serde_json::to_vec(value) {
            Ok(bytes) => self.send(bytes),
            Err(e) => {
                warn!("Failed to encode JSON response body: {}", e);
                self.error(StubError::BodyEncode(e));
                self
            }
        }
    }

    /// Finish the response. Calling it again is a no-op.
    pub fn end(&mut self) {
        if self.state.closed {
            return;
        }
        self.finalize_headers();
        if let Some(mut sink) = self.close() {
            sink.on_finished();
        }
    }

    pub fn end_with(&mut self, data: impl Into<Bytes>) {
        self.send(data);
        self.end();
    }

    pub fn end_json<T: Serialize + ?Sized>(&mut self, value: &T) {
        self.send_json(value);
        self.end();
    }

    /// Fail the response.
    ///
    /// Headers are finalized first when they have not been sent. The error
    /// is the last event; the emitter is closed afterwards.
    pub fn error(&mut self, error: impl Into<StubError>) {
        if self.state.closed {
            return;
        }
        self.finalize_headers();
        if let Some(mut sink) = self.close() {
            sink.on_error(error.into());
        }
    }

    fn is_pending(&self, setter: &str) -> bool {
        let pending = !self.state.headers_sent && !self.state.closed;
        if !pending {
            debug!("Ignoring {}() after headers were finalized", setter);
        }
        pending
    }

    fn close(&mut self) -> Option<Box<dyn ResponseSink>> {
        self.state.closed = true;
        self.sink.take()
    }

    fn finalize_headers(&mut self) {
        if self.state.headers_sent {
            return;
        }
        self.state.headers_sent = true;

        let content_type = self
            .state
            .content_kind
            .header_value(&self.state.charset);
        let mut headers = self.state.headers.take().unwrap_or_default();
        if !headers.keys().any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE)) {
            headers.insert(CONTENT_TYPE.to_string(), content_type);
        }

        match validate_head(self.state.status, &headers) {
            Ok(()) => {
                debug!(status = self.state.status, "Response headers ready");
                if let Some(sink) = self.sink.as_mut() {
                    sink.on_headers_ready(self.state.status, &headers);
                }
                self.state.headers = Some(headers);
            }
            Err(message) => {
                warn!("Failed to prepare response: {}", message);
                self.state.headers = Some(headers);
                if let Some(mut sink) = self.close() {
                    sink.on_error(StubError::ResponseConstruction(message));
                }
            }
        }
    }
}

fn validate_head(status: u16, headers: &HashMap<String, String>) -> Result<(), String> {
    StatusCode::from_u16(status).map_err(|_| format!("invalid status code {status}"))?;
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| format!("invalid header name '{name}'"))?;
        HeaderValue::from_str(value)
            .map_err(|_| format!("invalid value for header '{name}'"))?;
    }
    Ok(())
}

impl fmt::Debug for ResponseEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseEmitter")
            .field("state", &self.state)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Drop for ResponseEmitter {
    fn drop(&mut self) {
        if !self.state.closed {
            warn!("Response emitter dropped without end() or error()");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::sink::{RecordingSink, ResponseEvent};
    use serde::ser::Error as _;
    use serde_json::{json, Value};

    fn emitter() -> (ResponseEmitter, RecordingSink) {
        let sink = RecordingSink::new();
        (ResponseEmitter::new(Box::new(sink.clone())), sink)
    }

    fn content_type_only(value: &str) -> HashMap<String, String> {
        HashMap::from([(CONTENT_TYPE.to_string(), value.to_string())])
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("not encodable"))
        }
    }

    #[test]
    fn test_end_with_string_defaults() {
        let (mut res, sink) = emitter();
        res.end_with("Hello, World!");

        assert_eq!(sink.status(), Some(200));
        assert_eq!(
            sink.headers(),
            Some(content_type_only("text/html; charset=utf8"))
        );
        assert_eq!(sink.body(), Bytes::from_static(b"Hello, World!"));
        assert!(sink.is_finished());
        assert_eq!(res.phase(), EmitterPhase::Finished);
    }

    #[test]
    fn test_end_json() {
        let (mut res, sink) = emitter();
        res.end_json(&json!({"string": "John", "num": 1, "bool": true}));

        assert_eq!(
            sink.headers(),
            Some(content_type_only("application/json; charset=utf8"))
        );
        let decoded: Value = serde_json::from_slice(&sink.body()).unwrap();
        assert_eq!(decoded, json!({"string": "John", "num": 1, "bool": true}));
    }

    #[test]
    fn test_json_overrides_configured_kind() {
        let (mut res, sink) = emitter();
        res.content_type("txt").end_json(&json!([1, 2]));
        assert_eq!(
            sink.headers(),
            Some(content_type_only("application/json; charset=utf8"))
        );
    }

    #[test]
    fn test_status_without_body() {
        let (mut res, sink) = emitter();
        res.status(404).end();

        assert_eq!(sink.status(), Some(404));
        assert!(sink.body().is_empty());
        assert_eq!(
            sink.headers(),
            Some(content_type_only("text/html; charset=utf8"))
        );
        assert_eq!(
            sink.events(),
            vec![
                ResponseEvent::HeadersReady {
                    status: 404,
                    headers: content_type_only("text/html; charset=utf8"),
                },
                ResponseEvent::Finished,
            ]
        );
    }

    #[test]
    fn test_end_twice_is_noop() {
        let (mut res, sink) = emitter();
        res.end();
        res.end();
        res.send("late");

        let finished = sink
            .events()
            .iter()
            .filter(|e| **e == ResponseEvent::Finished)
            .count();
        assert_eq!(finished, 1);
        assert!(sink.chunks().is_empty());
    }

    #[test]
    fn test_chunks_in_send_order() {
        let (mut res, sink) = emitter();
        for i in 0..5 {
            res.send(format!("chunk {i}\n"));
        }
        res.end();

        let events = sink.events();
        assert!(matches!(events[0], ResponseEvent::HeadersReady { .. }));
        assert_eq!(events.len(), 7);
        assert_eq!(
            sink.chunks(),
            (0..5)
                .map(|i| Bytes::from(format!("chunk {i}\n")))
                .collect::<Vec<_>>()
        );
        assert_eq!(events[6], ResponseEvent::Finished);
    }

    #[test]
    fn test_error_after_send_emits_headers_once() {
        let (mut res, sink) = emitter();
        res.send("partial");
        res.error(StubError::handler("upstream went away"));

        let events = sink.events();
        let header_events = events
            .iter()
            .filter(|e| matches!(e, ResponseEvent::HeadersReady { .. }))
            .count();
        assert_eq!(header_events, 1);
        assert_eq!(
            events.last(),
            Some(&ResponseEvent::Error(
                "Handler error: upstream went away".to_string()
            ))
        );
        assert!(!sink.is_finished());
    }

    #[test]
    fn test_error_before_send_finalizes_headers() {
        let (mut res, sink) = emitter();
        res.status(500).error(anyhow::anyhow!("boom"));

        assert_eq!(sink.status(), Some(500));
        assert_eq!(sink.error(), Some("Handler error: boom".to_string()));
        // Terminal: nothing fires afterwards
        res.end_with("ignored");
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_setters_after_headers_are_ignored() {
        let (mut res, sink) = emitter();
        res.send("first");
        res.status(418)
            .content_type("json")
            .charset("ascii")
            .headers([("X-Late", "1")]);
        res.end();

        assert_eq!(sink.status(), Some(200));
        assert_eq!(
            sink.headers(),
            Some(content_type_only("text/html; charset=utf8"))
        );
    }

    #[test]
    fn test_user_headers_get_content_type() {
        let (mut res, sink) = emitter();
        res.content_type(ContentKind::Text)
            .charset("iso-8859-1")
            .headers([("X-Request-Id", "abc")])
            .end();

        let headers = sink.headers().unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["X-Request-Id"], "abc");
        assert_eq!(headers["Content-Type"], "text/plain; charset=iso-8859-1");
    }

    #[test]
    fn test_explicit_content_type_is_kept() {
        let (mut res, sink) = emitter();
        res.headers([("content-type", "image/png")]).end();

        assert_eq!(
            sink.headers(),
            Some(HashMap::from([(
                "content-type".to_string(),
                "image/png".to_string()
            )]))
        );
    }

    #[test]
    fn test_custom_short_name() {
        let (mut res, sink) = emitter();
        res.content_type("application/xml").end_with("<a/>");
        assert_eq!(
            sink.headers(),
            Some(content_type_only("application/xml; charset=utf8"))
        );
    }

    #[test]
    fn test_json_encode_failure_routes_to_error() {
        let (mut res, sink) = emitter();
        res.end_json(&Unencodable);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ResponseEvent::HeadersReady { .. }));
        match &events[1] {
            ResponseEvent::Error(message) => {
                assert!(message.starts_with("Failed to encode JSON body"))
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(res.is_finished());
    }

    #[test]
    fn test_invalid_status_is_construction_error() {
        let (mut res, sink) = emitter();
        res.status(1000).end_with("never");

        assert_eq!(
            sink.events(),
            vec![ResponseEvent::Error(
                "Failed to prepare response: invalid status code 1000".to_string()
            )]
        );
        assert!(res.is_finished());
    }

    #[test]
    fn test_invalid_header_is_construction_error() {
        let (mut res, sink) = emitter();
        res.headers([("X-Bad", "line\nbreak")]).end();

        assert_eq!(sink.status(), None);
        assert_eq!(
            sink.error(),
            Some("Failed to prepare response: invalid value for header 'X-Bad'".to_string())
        );
    }

    #[test]
    fn test_phases() {
        let (mut res, _sink) = emitter();
        assert_eq!(res.phase(), EmitterPhase::NotStarted);
        res.send("x");
        assert_eq!(res.phase(), EmitterPhase::Started);
        assert!(res.headers_sent());
        res.end();
        assert_eq!(res.phase(), EmitterPhase::Finished);
    }
}
