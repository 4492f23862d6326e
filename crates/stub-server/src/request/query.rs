//! Query string parsing.

use std::borrow::Cow;
use std::collections::HashMap;

/// Parse a raw query string into a map of optional values.
///
/// Pairs are split on the first `=`; a pair without `=` maps to `None`.
/// Duplicate keys keep the last value. Keys and values are percent-decoded,
/// falling back to the raw text when the escape sequence is not valid UTF-8.
pub fn parse_query(query: &str) -> HashMap<String, Option<String>> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((key, value)) => {
                params.insert(decode(key), Some(decode(value)));
            }
            None => {
                params.insert(decode(pair), None);
            }
        }
    }
    params
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .unwrap_or(Cow::Borrowed(raw))
        .into_owned()
}
