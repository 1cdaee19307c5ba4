use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ParseOptions;
use crate::errors::{BodyParseError, LoadError, MalformedBlock};
use crate::http_request::{Headers, Method, RequestDescriptor};
use crate::url_resolver::resolve_url;

const BODY_START: char = '{';
const DELIMITER: &str = "###";

/// Lines of one request, as cut out of the file by [`split_blocks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub label: Option<String>,
    pub lines: Vec<String>,
}

// Determined type of a line while splitting
#[derive(Debug, Eq, PartialEq)]
enum LineType {
    NewRequest(Option<String>),
    Comment,
    Content,
}

// Where the block parser is after the request line
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ScanState {
    Headers,
    AwaitingBody,
    Body,
}

fn delimiter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*###\s*(.*?)\s*$").expect("valid delimiter pattern"))
}

fn versioned_request_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\S+\s+\S+\s+HTTP/\d+(\.\d+)?\s*$").expect("valid request line pattern"))
}

fn get_line_type(line: &str) -> LineType {
    if let Some(captures) = delimiter_regex().captures(line) {
        let label = captures.get(1).map(|m| m.as_str()).filter(|s| !s.is_empty());
        return LineType::NewRequest(label.map(str::to_string));
    }
    let trimmed = line.trim_start();
    return if trimmed.starts_with('#') || trimmed.starts_with("//") {
        LineType::Comment
    } else {
        LineType::Content
    };
}

/// Cuts file text into request blocks on `###` lines.
///
/// Text before the first delimiter is a block of its own. Within each block
/// full-line comments are dropped and, when a request line with an HTTP
/// version is present, everything above it too.
pub fn split_blocks(text: &str) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut label = None;
    let mut lines = Vec::new();

    for line in text.lines() {
        match get_line_type(line) {
            LineType::NewRequest(next_label) => {
                push_block(&mut blocks, label.take(), std::mem::take(&mut lines));
                label = next_label;
            }
            LineType::Comment => {}
            LineType::Content => lines.push(line.to_string()),
        }
    }
    push_block(&mut blocks, label, lines);
    blocks
}

fn push_block(blocks: &mut Vec<RawBlock>, label: Option<String>, mut lines: Vec<String>) {
    if let Some(start) = lines.iter().position(|l| versioned_request_line_regex().is_match(l)) {
        lines.drain(..start);
    }
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return;
    };
    let last = lines.iter().rposition(|l| !l.trim().is_empty()).unwrap_or(first);
    lines.truncate(last + 1);
    lines.drain(..first);
    blocks.push(RawBlock { label, lines });
}

/// Splits a request line into method and target. Anything after the target,
/// such as the protocol version, is ignored.
pub fn parse_request_line(line: &str) -> Option<(Method, &str)> {
    let mut tokens = line.split_whitespace();
    let method = tokens.next()?;
    let target = tokens.next()?;
    Some((Method::parse(method), target))
}

fn strip_comment(text: &str) -> &str {
    text.split_once('#').map_or(text, |(head, _)| head)
}

/// Parses `Name: value`, dropping a trailing `# comment` from both sides.
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(": ").or_else(|| line.split_once(':'))?;
    let key = strip_comment(key).trim();
    let value = strip_comment(value).trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

fn is_header_candidate(line: &str) -> bool {
    line.contains(':') && !line.contains(DELIMITER) && !line.contains(BODY_START)
}

/// Joins the body lines and parses them as json.
pub fn extract_body<S: AsRef<str>>(lines: &[S]) -> Result<Option<Value>, BodyParseError> {
    if lines.is_empty() {
        return Ok(None);
    }
    let text = lines.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join("\n");
    Ok(Some(serde_json::from_str(&text)?))
}

/// Turns one block into a request.
///
/// The first line containing `{` after the request line starts the body, with
/// or without a blank line before it. A body that is not valid json is logged
/// and left out; the request is still returned.
pub fn parse_block(block: &RawBlock, request_no: u32, options: &ParseOptions) -> Result<RequestDescriptor, MalformedBlock> {
    let Some((request_line, rest)) = block.lines.split_first() else {
        return Err(MalformedBlock::IncompleteRequestLine(String::new()));
    };
    let (method, target) =
        parse_request_line(request_line).ok_or_else(|| MalformedBlock::IncompleteRequestLine(request_line.clone()))?;

    let mut headers = Headers::new();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut state = ScanState::Headers;

    for line in rest {
        state = match state {
            ScanState::Headers if line.trim().is_empty() => ScanState::AwaitingBody,
            ScanState::Headers | ScanState::AwaitingBody if line.contains(BODY_START) => {
                body_lines.push(line);
                ScanState::Body
            }
            ScanState::Headers => {
                if is_header_candidate(line) {
                    if let Some((key, value)) = parse_header_line(line) {
                        headers.insert(key, value);
                    }
                }
                ScanState::Headers
            }
            ScanState::AwaitingBody => ScanState::AwaitingBody,
            ScanState::Body => {
                body_lines.push(line);
                ScanState::Body
            }
        };
    }

    let body = match extract_body(&body_lines) {
        Ok(body) => body,
        Err(err) => {
            warn!(request_no, path = %target, "{err}, sending request without body");
            None
        }
    };

    let url = resolve_url(&headers, target, &options.default_scheme);

    debug!(request_no, %method, %url, headers = headers.len(), has_body = body.is_some(), "parsed request");
    Ok(RequestDescriptor::new(request_no, block.label.clone(), method, url, headers, body))
}

/// Parses every request of an `.http` file's text. Blocks that do not form a
/// request are skipped.
pub fn parse_http_str(text: &str, options: &ParseOptions) -> Vec<RequestDescriptor> {
    let mut http_requests = Vec::new();
    let mut request_no: u32 = 1;

    for block in split_blocks(text) {
        match parse_block(&block, request_no, options) {
            Ok(request) => {
                http_requests.push(request);
                request_no += 1;
            }
            Err(reason) => debug!(label = ?block.label, "skipping block: {reason}"),
        }
    }
    http_requests
}

pub fn parse_http_file(http_file_path: &Path, options: &ParseOptions) -> Result<Vec<RequestDescriptor>, LoadError> {
    let text = std::fs::read_to_string(http_file_path).map_err(|source| LoadError::Io {
        path: http_file_path.to_path_buf(),
        source,
    })?;
    return Ok(parse_http_str(&text, options));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn block(lines: &[&str]) -> RawBlock {
        RawBlock {
            label: None,
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn parse(lines: &[&str]) -> Result<RequestDescriptor, MalformedBlock> {
        parse_block(&block(lines), 1, &ParseOptions::default())
    }

    #[test_case("### Request" => LineType::NewRequest(Some("Request".to_string())) ; "labelled delimiter")]
    #[test_case("###" => LineType::NewRequest(None) ; "bare delimiter")]
    #[test_case("  ###   get users  " => LineType::NewRequest(Some("get users".to_string())) ; "indented delimiter")]
    #[test_case("# just a note" => LineType::Comment ; "hash comment")]
    #[test_case("// just a note" => LineType::Comment ; "slash comment")]
    #[test_case("GET /x HTTP/1.1" => LineType::Content ; "request line")]
    fn classifies_lines(line: &str) -> LineType {
        get_line_type(line)
    }

    #[test_case("X-Foo: bar # note" => Some(("X-Foo".to_string(), "bar".to_string())) ; "inline comment stripped")]
    #[test_case("Host: localhost:8080" => Some(("Host".to_string(), "localhost:8080".to_string())) ; "colon in value")]
    #[test_case("X-Time:12" => Some(("X-Time".to_string(), "12".to_string())) ; "no space after colon")]
    #[test_case("Accept #the key : */*" => Some(("Accept".to_string(), "*/*".to_string())) ; "comment after key")]
    #[test_case("not a header" => None ; "no colon")]
    #[test_case(": orphan" => None ; "empty key")]
    fn parses_header_lines(line: &str) -> Option<(String, String)> {
        parse_header_line(line)
    }

    #[test_case("POST /api/items HTTP/1.1" => Some((Method::Post, "/api/items")) ; "with version")]
    #[test_case("GET https://example.com/x" => Some((Method::Get, "https://example.com/x")) ; "absolute target")]
    #[test_case("GET" => None ; "single token")]
    #[test_case("" => None ; "empty")]
    fn parses_request_lines(line: &str) -> Option<(Method, &str)> {
        parse_request_line(line)
    }

    #[test]
    fn splits_on_delimiters_and_keeps_labels() {
        let blocks = split_blocks("### first\nGET /a HTTP/1.1\n\n###\nGET /b\n### third\n\n   \n");
        assert_eq!(
            blocks,
            vec![
                RawBlock {
                    label: Some("first".to_string()),
                    lines: vec!["GET /a HTTP/1.1".to_string()],
                },
                RawBlock {
                    label: None,
                    lines: vec!["GET /b".to_string()],
                },
            ]
        );
    }

    #[test]
    fn drops_preamble_above_versioned_request_line() {
        let blocks = split_blocks("leftover text\nmore\nPOST /a HTTP/1.1\nHost: x\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec!["POST /a HTTP/1.1", "Host: x"]);
    }

    #[test]
    fn keeps_block_without_version_marker() {
        let blocks = split_blocks("# a comment\nGET http://example.com/\n");
        assert_eq!(blocks[0].lines, vec!["GET http://example.com/"]);
    }

    #[test]
    fn handles_crlf_line_endings() {
        let blocks = split_blocks("### one\r\nGET /a HTTP/1.1\r\nHost: x\r\n");
        assert_eq!(blocks[0].lines, vec!["GET /a HTTP/1.1", "Host: x"]);
    }

    #[test]
    fn parses_headers_and_body() {
        let request = parse(&[
            "POST /api/items HTTP/1.1",
            "Host: example.com",
            "Content-Type: application/json",
            "",
            "{\"name\": \"widget\"}",
        ])
        .unwrap();

        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "http://example.com/api/items");
        assert_eq!(request.headers().get("Content-Type"), Some("application/json"));
        assert_eq!(request.body(), Some(&json!({"name": "widget"})));
    }

    #[test]
    fn body_may_follow_headers_without_blank_line() {
        let request = parse(&["POST /x", "Host: h", "{", "  \"a\": 1", "}"]).unwrap();
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.body(), Some(&json!({"a": 1})));
    }

    #[test]
    fn lines_after_blank_line_are_not_headers() {
        let request = parse(&["GET /x", "Host: h", "", "X-Late: nope"]).unwrap();
        assert_eq!(request.headers().get("X-Late"), None);
        assert_eq!(request.body(), None);
    }

    #[test]
    fn malformed_body_keeps_headers() {
        let request = parse(&["POST /x", "Host: h", "X-Foo: bar # note", "", "{\"a\": }"]).unwrap();
        assert_eq!(request.body(), None);
        assert_eq!(request.headers().get("Host"), Some("h"));
        assert_eq!(request.headers().get("X-Foo"), Some("bar"));
    }

    #[test]
    fn later_header_overwrites_earlier() {
        let request = parse(&["GET /x", "Host: a", "Host: b"]).unwrap();
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.url(), "http://b/x");
    }

    #[test]
    fn single_token_request_line_is_malformed() {
        assert_eq!(
            parse(&["GET", "Host: h"]),
            Err(MalformedBlock::IncompleteRequestLine("GET".to_string()))
        );
    }

    #[test]
    fn uses_configured_scheme() {
        let options = ParseOptions::default().with_default_scheme("https");
        let request = parse_block(&block(&["GET /x", "Host: h"]), 3, &options).unwrap();
        assert_eq!(request.url(), "https://h/x");
        assert_eq!(request.request_no(), 3);
    }

    #[test_case(&[] => None ; "no lines")]
    #[test_case(&["[1, 2]"] => Some(json!([1, 2])) ; "array")]
    #[test_case(&["{", "\"a\": {\"b\": true}", "}"] => Some(json!({"a": {"b": true}})) ; "multi line object")]
    fn extracts_bodies(lines: &[&str]) -> Option<Value> {
        extract_body(lines).unwrap()
    }

    #[test]
    fn extract_body_reports_invalid_json() {
        assert!(extract_body(&["{\"a\": }"]).is_err());
    }

    #[test]
    fn numbers_only_emitted_requests() {
        let requests = parse_http_str(
            "### a\nGET /one\nHost: h\n### broken\nGET\n### c\nDELETE /three\nHost: h\n",
            &ParseOptions::default(),
        );
        let summary: Vec<_> = requests.iter().map(|r| (r.request_no(), r.name(), r.method().to_string())).collect();
        assert_eq!(
            summary,
            vec![
                (1, "#1 a".to_string(), "GET".to_string()),
                (2, "#2 c".to_string(), "DELETE".to_string()),
            ]
        );
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let result = parse_http_file(Path::new("does/not/exist.http"), &ParseOptions::default());
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
