use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

/// Request method as written on the request line.
///
/// Only `GET` and `POST` can be dispatched; any other token is kept verbatim
/// so it can still be listed and reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    pub fn parse(token: &str) -> Method {
        return match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        };
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(token) => token.as_str(),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered header mapping.
///
/// Names are kept exactly as written. Inserting an existing name replaces the
/// value but keeps the position of the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: IndexMap<String, String>,
}

impl Headers {
    pub fn new() -> Headers {
        return Headers::default();
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Looks a header up ignoring ASCII case, returning the name as stored.
    pub fn find_ignore_case(&self, name: &str) -> Option<(&str, &str)> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// One parsed request of an `.http` file.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    request_no: u32,
    label: Option<String>,
    method: Method,
    url: String,
    headers: Headers,
    body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(
        request_no: u32,
        label: Option<String>,
        method: Method,
        url: String,
        headers: Headers,
        body: Option<Value>,
    ) -> RequestDescriptor {
        RequestDescriptor {
            request_no,
            label,
            method,
            url,
            headers,
            body,
        }
    }

    pub fn request_no(&self) -> u32 {
        self.request_no
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn name(&self) -> String {
        return match &self.label {
            Some(label) => format!("#{} {}", self.request_no, label),
            None => format!("#{}", self.request_no),
        };
    }

    /// Human readable summary: method, url, headers and, if present, the
    /// indented body.
    pub fn preview(&self, indent: usize) -> String {
        let mut text = format!("Method: {}\nUrl: {}", self.method, self.url);
        for (name, value) in self.headers.iter() {
            text.push_str(&format!("\n{name}: {value}"));
        }
        if let Some(body) = &self.body {
            text.push_str("\n\n");
            text.push_str(&to_pretty_json(body, indent));
        }
        text
    }
}

/// Serializes `value` with `indent` spaces per level. Non-ASCII characters are
/// written as-is.
pub fn to_pretty_json(value: &Value, indent: usize) -> String {
    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8_lossy(&buf).into_owned()
}
