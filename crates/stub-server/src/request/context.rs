//! Raw intercepted requests and the read-only context handed to handlers.

use super::body::Body;
use super::query::parse_query;
use crate::content_type::ContentKind;
use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE, HOST};
use hyper::{HeaderMap, Method, Uri};
use std::collections::HashMap;
use std::fmt;
use std::io::{ErrorKind, Read};
use std::str::FromStr;
use tracing::debug;

const STREAM_CHUNK_SIZE: usize = 512;

/// Payload source of an intercepted request.
#[derive(Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Buffer(Bytes),
    /// Incremental source, drained completely before decoding
    Stream(Box<dyn Read + Send>),
}

impl RequestBody {
    /// Read the whole payload into memory.
    pub fn into_bytes(self) -> Bytes {
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Buffer(bytes) => bytes,
            RequestBody::Stream(mut reader) => {
                let mut data = Vec::new();
                let mut buffer = [0u8; STREAM_CHUNK_SIZE];
                loop {
                    match reader.read(&mut buffer) {
                        Ok(0) => break,
                        Ok(n) => data.extend_from_slice(&buffer[..n]),
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => {
                            debug!("Request body stream ended early: {}", e);
                            break;
                        }
                    }
                }
                Bytes::from(data)
            }
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A request as handed over by the interception layer.
#[derive(Debug)]
pub struct RawRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl RawRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Shorthand for a bodiless GET, mostly useful in tests.
    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Add a header. Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Buffer(body.into());
        self
    }

    pub fn body_stream(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = RequestBody::Stream(Box::new(reader));
        self
    }

    /// Build from a server-side request whose target may be in origin form.
    ///
    /// Relative targets are resolved against the `Host` header with the
    /// `http` scheme so that host and port predicates see the same URL a
    /// client-side interception hook would.
    pub fn from_hyper(parts: hyper::http::request::Parts, body: Bytes) -> Self {
        let uri = if parts.uri.authority().is_some() {
            parts.uri
        } else {
            resolve_origin_form(&parts.uri, &parts.headers).unwrap_or(parts.uri)
        };

        Self {
            method: parts.method,
            uri,
            headers: parts.headers,
            body: if body.is_empty() {
                RequestBody::Empty
            } else {
                RequestBody::Buffer(body)
            },
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.uri.host()
    }

    pub fn port(&self) -> Option<u16> {
        self.uri.port_u16()
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }
}

fn resolve_origin_form(uri: &Uri, headers: &HeaderMap) -> Option<Uri> {
    let host = headers.get(HOST)?.to_str().ok()?;
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Uri::builder()
        .scheme("http")
        .authority(host)
        .path_and_query(path_and_query)
        .build()
        .ok()
}

/// Read-only snapshot of one intercepted request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    url: String,
    method: Method,
    scheme: String,
    host: String,
    port: Option<u16>,
    path: Option<String>,
    raw_query: Option<String>,
    query_params: HashMap<String, Option<String>>,
    headers: HeaderMap,
    body: Body,
}

impl RequestContext {
    /// Parse URL parts, query string and body of a raw request.
    pub fn from_raw(raw: RawRequest) -> Self {
        let RawRequest {
            method,
            uri,
            headers,
            body,
        } = raw;

        let raw_query = uri.query().map(str::to_string);
        let query_params = raw_query.as_deref().map(parse_query).unwrap_or_default();

        let bytes = body.into_bytes();
        let body = if bytes.is_empty() {
            Body::Empty
        } else {
            let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
            Body::decode(&bytes, &ContentKind::from_header_value(content_type))
        };

        Self {
            url: uri.to_string(),
            method,
            scheme: uri.scheme_str().unwrap_or("http").to_string(),
            host: uri.host().unwrap_or_default().to_string(),
            port: uri.port_u16(),
            path: Some(uri.path()).filter(|p| !p.is_empty()).map(str::to_string),
            raw_query,
            query_params,
            headers,
            body,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn query_params(&self) -> &HashMap<String, Option<String>> {
        &self.query_params
    }

    /// Value of a query parameter; `None` when absent or given without `=`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name)?.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}
