//! Decoded request body.

use crate::content_type::ContentKind;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Request payload after content-type driven decoding.
///
/// Decode failures never surface as errors: an unparsable JSON document or a
/// non UTF-8 text payload resolves to [`Body::Empty`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Structured(BTreeMap<String, Option<Value>>),
}

impl Body {
    pub fn text(value: impl Into<String>) -> Self {
        Body::Text(value.into())
    }

    pub fn structured<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<Value>)>,
        K: Into<String>,
    {
        Body::Structured(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Decode raw bytes according to the request's content kind.
    pub fn decode(bytes: &[u8], kind: &ContentKind) -> Self {
        if bytes.is_empty() {
            return Body::Empty;
        }

        match kind {
            ContentKind::UrlEncoded => decode_urlencoded(&String::from_utf8_lossy(bytes)),
            ContentKind::Json => match serde_json::from_slice::<Value>(bytes) {
                Ok(Value::Object(map)) => Body::Structured(
                    map.into_iter()
                        .map(|(k, v)| (k, Some(v).filter(|v| !v.is_null())))
                        .collect(),
                ),
                Ok(other) => {
                    debug!("Ignoring JSON body with non-object top level: {}", other);
                    Body::Empty
                }
                Err(e) => {
                    debug!("Ignoring unparsable JSON body: {}", e);
                    Body::Empty
                }
            },
            _ => match std::str::from_utf8(bytes) {
                Ok(text) => Body::Text(text.to_string()),
                Err(e) => {
                    debug!("Ignoring body that is not valid UTF-8: {}", e);
                    Body::Empty
                }
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Option<Value>>> {
        match self {
            Body::Structured(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a field of a structured body. Absent values read as `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)?.as_ref()
    }

    /// Look up a string field of a structured body.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Whether a structured body has `key`, with or without a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.as_map().is_some_and(|map| map.contains_key(key))
    }
}

// Form bodies are split verbatim: `k=v` pairs only, anything else is a bare key.
fn decode_urlencoded(text: &str) -> Body {
    let mut params = BTreeMap::new();
    for element in text.split('&') {
        let parts: Vec<&str> = element.split('=').collect();
        if let [key, value] = parts.as_slice() {
            params.insert(key.to_string(), Some(Value::String(value.to_string())));
        } else {
            params.insert(element.to_string(), None);
        }
    }
    Body::Structured(params)
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => Ok(()),
            Body::Text(text) => f.write_str(text),
            Body::Structured(map) => {
                let object: serde_json::Map<String, Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone().unwrap_or(Value::Null)))
                    .collect();
                write!(f, "{}", Value::Object(object))
            }
        }
    }
}

impl PartialEq<str> for Body {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other)
    }
}

impl PartialEq<&str> for Body {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}
