//! Per-request hyper service.

use super::channel::{BodyFrame, ChannelSink, ResponseHead};
use crate::error::StubError;
use crate::protocol::{Interceptor, StubProtocol};
use crate::request::RawRequest;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{stream, StreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Body as HttpBody, Incoming};
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

pub type ResponseBody = UnsyncBoxBody<Bytes, StubError>;

pub const UNMATCHED_HEADER: &str = "x-stub-server-unmatched";

/// Handle one request: match, run the handler, stream its events back.
pub async fn handle_stub_request(
    req: Request<Incoming>,
    protocol: Arc<StubProtocol>,
) -> Result<Response<ResponseBody>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match read_body(body).await {
        Ok(body) => body,
        Err(e) => {
            warn!("{} {}: {}", parts.method, parts.uri, e);
            return Ok(text_response(StatusCode::BAD_REQUEST, e.to_string()));
        }
    };
    let request = RawRequest::from_hyper(parts, body);

    if !protocol.can_handle(&request) {
        warn!("No stub for {} {}", request.method, request.uri);
        return Ok(unmatched_response());
    }

    let (sink, head_rx, mut body_rx) = ChannelSink::new();
    let method = request.method.clone();
    let uri = request.uri.clone();

    // Handlers are synchronous and may block.
    tokio::task::spawn_blocking(move || {
        if protocol.start(request, Box::new(sink)).is_err() {
            debug!("Stub disappeared between match and start");
        }
    });

    let head = match head_rx.await {
        Ok(head) => head,
        Err(_) => return Ok(failed_response(body_rx).await),
    };

    // An error right after the head means nothing was sent yet.
    let first = match body_rx.next().await {
        Some(Err(e)) => {
            warn!("Stub failed before sending a body: {}", e);
            return Ok(text_response(StatusCode::BAD_GATEWAY, e.to_string()));
        }
        first => first,
    };
    debug!("{} {} -> {}", method, uri, head.status);
    Ok(streaming_response(head, first, body_rx))
}

/// Buffer the whole request payload.
pub(crate) async fn read_body<B>(body: B) -> Result<Bytes, StubError>
where
    B: HttpBody,
    B::Error: std::fmt::Display,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| StubError::Transport(format!("Failed to read request body: {e}")))
}

fn streaming_response(
    head: ResponseHead,
    first: Option<BodyFrame>,
    body_rx: mpsc::UnboundedReceiver<BodyFrame>,
) -> Response<ResponseBody> {
    let mut builder = Response::builder().status(head.status);
    for (name, value) in &head.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let frames = stream::iter(first).chain(body_rx);
    match builder.body(StreamBody::new(frames).boxed_unsync()) {
        Ok(response) => response,
        Err(e) => text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Response build error: {e}"),
        ),
    }
}

/// The handler errored before any headers were emitted.
async fn failed_response(mut body_rx: mpsc::UnboundedReceiver<BodyFrame>) -> Response<ResponseBody> {
    let message = match body_rx.next().await {
        Some(Err(e)) => e.to_string(),
        _ => "Stub handler ended without a response".to_string(),
    };
    warn!("Stub failed before sending headers: {}", message);
    text_response(StatusCode::BAD_GATEWAY, message)
}

fn unmatched_response() -> Response<ResponseBody> {
    let mut response = text_response(StatusCode::NOT_FOUND, "No stub matched the request");
    response.headers_mut().insert(
        UNMATCHED_HEADER,
        hyper::header::HeaderValue::from_static("true"),
    );
    response
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<ResponseBody> {
    let body = Full::new(body.into())
        .map_err(|never: Infallible| match never {})
        .boxed_unsync();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}
