use std::fmt::{Display, Formatter};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{error, info};

use crate::config::DispatchConfig;
use crate::content_type::normalize_content_type_with;
use crate::errors::TransportError;
use crate::http_request::{to_pretty_json, Headers, Method, RequestDescriptor};

/// Prefix of every failed dispatch when rendered as text.
pub const ERROR_MARKER: &str = "Error: ";

/// What is handed to the transport: the descriptor with normalized headers
/// and the body already serialized.
///
/// The dispatcher only builds these for `GET` and `POST`; [`ReqwestTransport`]
/// rejects any other method.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

/// Raw answer of the transport. The body is left undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

pub trait Transport {
    fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError>;
}

/// Blocking transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(config: &DispatchConfig) -> Result<ReqwestTransport, TransportError> {
        let client = reqwest::blocking::Client::builder().timeout(config.timeout).build()?;
        Ok(ReqwestTransport { client })
    }
}

fn to_reqwest_method(method: &Method) -> Result<reqwest::Method, TransportError> {
    return match method {
        Method::Get => Ok(reqwest::Method::GET),
        Method::Post => Ok(reqwest::Method::POST),
        Method::Other(token) => Err(TransportError::InvalidRequest(format!("unsupported method '{token}'"))),
    };
}

fn to_header_map(headers: &Headers) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers.iter() {
        let key = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("{e} @ '{name}'")))?;
        let value = HeaderValue::from_bytes(value.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("{e} @ '{name}: {value}'")))?;
        map.insert(key, value);
    }
    Ok(map)
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        let mut req = self
            .client
            .request(to_reqwest_method(&request.method)?, request.url.as_str())
            .headers(to_header_map(&request.headers)?);
        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let res = req.send()?;
        let status = res.status();
        let body = res.bytes()?.to_vec();
        Ok(TransportResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

/// Rejects urls that have no host, such as `http:///path` produced for a
/// request without a `Host` header. The url parser would otherwise read the
/// first path segment as the host.
pub fn check_url(url: &str) -> Result<(), TransportError> {
    let authority = url
        .split_once("://")
        .map(|(_, rest)| rest.split(['/', '?', '#']).next().unwrap_or_default());
    if authority.map_or(true, str::is_empty) {
        return Err(TransportError::InvalidRequest(format!("no host in url '{url}'")));
    }
    reqwest::Url::parse(url).map_err(|e| TransportError::InvalidRequest(format!("{e} @ '{url}'")))?;
    Ok(())
}

/// Decoded response of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    /// Body decoded as utf-8, pretty printed when it is json.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed(HttpResponse),
    UnsupportedMethod(String),
    Failed(TransportError),
}

impl DispatchOutcome {
    pub fn is_error(&self) -> bool {
        !matches!(self, DispatchOutcome::Completed(_))
    }

    pub fn status_line(&self) -> Option<String> {
        match self {
            DispatchOutcome::Completed(response) => Some(format!("HTTP {} {}", response.status, response.reason).trim_end().to_string()),
            _ => None,
        }
    }
}

impl Display for DispatchOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchOutcome::Completed(response) => write!(f, "{}", response.body),
            DispatchOutcome::UnsupportedMethod(method) => write!(f, "{ERROR_MARKER}unsupported method: {method}"),
            DispatchOutcome::Failed(err) => write!(f, "{ERROR_MARKER}{err}"),
        }
    }
}

/// Response bytes are always read as utf-8, whatever charset the server
/// declares.
pub fn decode_body(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Pretty prints `text` if it is json, returns it unchanged otherwise.
pub fn format_body(text: String, indent: usize) -> String {
    return match serde_json::from_str::<Value>(&text) {
        Ok(value) => to_pretty_json(&value, indent),
        Err(_) => text,
    };
}

/// Sends requests through a [`Transport`] and turns the answers into text.
///
/// Holds no per-request state, so one dispatcher can serve several threads.
#[derive(Debug)]
pub struct Dispatcher<T> {
    transport: T,
    config: DispatchConfig,
}

impl Dispatcher<ReqwestTransport> {
    pub fn from_config(config: DispatchConfig) -> Result<Dispatcher<ReqwestTransport>, TransportError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Dispatcher::new(transport, config))
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, config: DispatchConfig) -> Dispatcher<T> {
        Dispatcher { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Builds what goes on the wire. `None` for methods that cannot be sent.
    pub fn outbound(&self, request: &RequestDescriptor) -> Option<OutboundRequest> {
        let body = match request.method() {
            Method::Get => None,
            Method::Post => request.body().map(Value::to_string).map(String::into_bytes),
            Method::Other(_) => return None,
        };
        let headers = normalize_content_type_with(
            request.headers(),
            &self.config.default_content_type,
            &self.config.charset,
        );
        Some(OutboundRequest {
            method: request.method().clone(),
            url: request.url().to_string(),
            headers,
            body,
        })
    }

    pub fn dispatch(&self, request: &RequestDescriptor) -> DispatchOutcome {
        let Some(outbound) = self.outbound(request) else {
            info!(request = %request.name(), method = %request.method(), "method not supported, nothing sent");
            return DispatchOutcome::UnsupportedMethod(request.method().to_string());
        };

        if let Err(err) = check_url(&outbound.url) {
            error!(request = %request.name(), url = %outbound.url, "not sending request: {err}");
            return DispatchOutcome::Failed(err);
        }

        info!(request = %request.name(), method = %outbound.method, url = %outbound.url, "sending request");
        match self.transport.send(&outbound) {
            Ok(response) => {
                info!(request = %request.name(), status = response.status, bytes = response.body.len(), "received response");
                let body = format_body(decode_body(&response.body), self.config.indent);
                DispatchOutcome::Completed(HttpResponse {
                    status: response.status,
                    reason: response.reason,
                    body,
                })
            }
            Err(err) => {
                error!(request = %request.name(), url = %outbound.url, "request failed: {err}");
                DispatchOutcome::Failed(err)
            }
        }
    }
}
