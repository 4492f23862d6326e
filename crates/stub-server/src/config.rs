//! Configuration types: server scoping and static stub files.

use crate::error::ConfigError;
use crate::registry::StubServer;
use crate::request::RequestContext;
use crate::response::ResponseEmitter;
use hyper::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

/// Host/port filters applied to every stub registered through a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

impl ListenConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_status() -> u16 {
    200
}

/// A canned response declared in a stub file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticStub {
    /// Omitted or empty matches any method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Omitted matches any path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default = "default_status")]
    pub status: u16,
    /// Short name (`json`, `text`, `html`) or a full MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Strings are sent as text, any other value as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl StaticStub {
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        if let Some(method) = self.method.as_deref().filter(|m| !m.is_empty()) {
            Method::from_bytes(method.as_bytes()).map_err(|_| ConfigError::InvalidMethod {
                index,
                method: method.to_string(),
            })?;
        }
        StatusCode::from_u16(self.status).map_err(|_| ConfigError::InvalidStatus {
            index,
            status: self.status,
        })?;
        Ok(())
    }

    /// Register this canned response on `server`.
    pub fn register(&self, server: &mut StubServer) {
        let response = self.clone();
        let method = self.method.clone().unwrap_or_default();
        server.register(
            &method,
            self.path.as_deref(),
            None,
            Arc::new(move |_req: RequestContext, mut res: ResponseEmitter| {
                res.status(response.status);
                if let Some(content_type) = &response.content_type {
                    res.content_type(content_type.as_str());
                }
                if !response.headers.is_empty() {
                    res.headers(response.headers.clone());
                }
                match &response.body {
                    None => res.end(),
                    Some(Value::String(text)) => res.end_with(text.clone()),
                    Some(value) => res.end_json(value),
                }
            }),
        );
    }
}

/// Stub file consumed by the `stub-server` binary.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StubFile {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub server: ServerOptions,
    #[serde(default)]
    pub stubs: Vec<StaticStub>,
}

impl StubFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let file: StubFile = serde_yaml::from_str(&contents)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen.socket_addr()?;
        for (index, stub) in self.stubs.iter().enumerate() {
            stub.validate(index)?;
        }
        Ok(())
    }

    /// Build a server holding every stub of the file, in file order.
    pub fn build_server(&self) -> Result<StubServer, ConfigError> {
        self.validate()?;
        let mut server = StubServer::with_options(self.server.clone());
        for stub in &self.stubs {
            stub.register(&mut server);
        }
        Ok(server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ActiveSet;
    use crate::request::RawRequest;
    use crate::response::RecordingSink;
    use std::io::Write;

    const STUB_FILE: &str = r#"
listen:
  port: 9099
server:
  host: localhost
stubs:
  - method: get
    path: /string
    body: "Hello, World!"
  - method: GET
    path: /json
    body:
      string: John
      num: 1
  - path: /missing
    status: 404
  - method: post
    path: /xml
    contentType: application/xml
    headers:
      X-Stub: "yes"
    body: "<ok/>"
"#;

    fn respond(server: &StubServer, url: &str) -> RecordingSink {
        let active = ActiveSet::new();
        server.activate_into(&active);
        let request = RawRequest::get(url.parse().unwrap());
        let sink = RecordingSink::new();
        active
            .find(&request)
            .unwrap()
            .respond(request, Box::new(sink.clone()));
        sink
    }

    #[test]
    fn test_parse_stub_file() {
        let file: StubFile = serde_yaml::from_str(STUB_FILE).unwrap();
        assert_eq!(file.listen.port, 9099);
        assert_eq!(file.listen.address, "127.0.0.1");
        assert_eq!(file.server.host.as_deref(), Some("localhost"));
        assert_eq!(file.stubs.len(), 4);
        assert_eq!(file.stubs[2].status, 404);
        assert_eq!(file.stubs[0].status, 200);
        assert_eq!(
            file.stubs[3].content_type.as_deref(),
            Some("application/xml")
        );
        assert!(file.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(STUB_FILE.as_bytes()).unwrap();
        let file = StubFile::from_file(tmp.path()).unwrap();
        assert_eq!(file.stubs.len(), 4);
    }

    #[test]
    fn test_from_missing_file() {
        let err = StubFile::from_file("/nonexistent/stubs.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_invalid_entries() {
        let mut file = StubFile::default();
        file.stubs.push(StaticStub {
            method: None,
            path: None,
            status: 1200,
            content_type: None,
            headers: HashMap::new(),
            body: None,
        });
        assert!(matches!(
            file.validate(),
            Err(ConfigError::InvalidStatus {
                index: 0,
                status: 1200
            })
        ));

        file.stubs[0].status = 200;
        file.stubs[0].method = Some("BAD METHOD".to_string());
        assert!(matches!(
            file.validate(),
            Err(ConfigError::InvalidMethod { index: 0, .. })
        ));

        let bad_listen = StubFile {
            listen: ListenConfig {
                address: "not-an-ip".to_string(),
                port: 80,
            },
            ..StubFile::default()
        };
        assert!(matches!(
            bad_listen.validate(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_static_stub_text_body() {
        let file: StubFile = serde_yaml::from_str(STUB_FILE).unwrap();
        let server = file.build_server().unwrap();
        assert_eq!(server.options().host.as_deref(), Some("localhost"));

        let sink = respond(&server, "http://localhost/string");
        assert_eq!(sink.status(), Some(200));
        assert_eq!(sink.body(), "Hello, World!");
        assert_eq!(
            sink.headers().unwrap()["Content-Type"],
            "text/html; charset=utf8"
        );
    }

    #[test]
    fn test_static_stub_json_body() {
        let file: StubFile = serde_yaml::from_str(STUB_FILE).unwrap();
        let server = file.build_server().unwrap();

        let sink = respond(&server, "http://localhost/json");
        assert_eq!(
            sink.headers().unwrap()["Content-Type"],
            "application/json; charset=utf8"
        );
        let body: Value = serde_json::from_slice(&sink.body()).unwrap();
        assert_eq!(body, serde_json::json!({"string": "John", "num": 1}));
    }

    #[test]
    fn test_static_stub_status_only() {
        let file: StubFile = serde_yaml::from_str(STUB_FILE).unwrap();
        let server = file.build_server().unwrap();

        let sink = respond(&server, "http://localhost/missing");
        assert_eq!(sink.status(), Some(404));
        assert!(sink.body().is_empty());
        assert!(sink.is_finished());
    }
}
