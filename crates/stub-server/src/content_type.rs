//! Content kinds used to pick a body decoding/encoding strategy.
//!
//! Request bodies are classified from the `Content-Type` header, response
//! bodies from the kind configured on the emitter. The mapping from MIME
//! strings is many-to-one and falls back to [`ContentKind::Html`].

use std::fmt;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_JSON: &str = "text/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Closed classification of a payload's media type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentKind {
    Text,
    #[default]
    Html,
    Json,
    UrlEncoded,
    /// Raw MIME string emitted verbatim in the `Content-Type` header
    Custom(String),
}

impl ContentKind {
    /// Resolve a full `Content-Type` header value.
    ///
    /// Only the media type before any `;` parameter is considered, and the
    /// comparison is case-sensitive. Unknown or missing types resolve to
    /// [`ContentKind::Html`].
    pub fn from_header_value(value: Option<&str>) -> Self {
        let media_type = value
            .map(|v| v.split(';').next().unwrap_or("").trim())
            .unwrap_or("");

        match media_type {
            FORM_URLENCODED => ContentKind::UrlEncoded,
            APPLICATION_JSON | TEXT_JSON => ContentKind::Json,
            TEXT_PLAIN => ContentKind::Text,
            _ => ContentKind::Html,
        }
    }

    /// Resolve a short type name such as `"json"` or `"txt"`.
    ///
    /// Anything unrecognized is kept as a [`ContentKind::Custom`] MIME string.
    pub fn from_short_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "txt" | "text" => ContentKind::Text,
            "htm" | "html" => ContentKind::Html,
            "json" => ContentKind::Json,
            _ => ContentKind::Custom(name.to_string()),
        }
    }

    /// MIME string used when synthesizing the response `Content-Type`.
    pub fn header_str(&self) -> &str {
        match self {
            ContentKind::Text => TEXT_PLAIN,
            ContentKind::Json => APPLICATION_JSON,
            ContentKind::UrlEncoded => FORM_URLENCODED,
            ContentKind::Custom(raw) => raw,
            ContentKind::Html => TEXT_HTML,
        }
    }

    /// `"<mime>; charset=<charset>"`
    pub fn header_value(&self, charset: &str) -> String {
        format!("{}; charset={}", self.header_str(), charset)
    }
}

impl From<&str> for ContentKind {
    fn from(name: &str) -> Self {
        ContentKind::from_short_name(name)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_str())
    }
}
