use crate::config::{DEFAULT_CHARSET, DEFAULT_CONTENT_TYPE};
use crate::http_request::Headers;

pub const CONTENT_TYPE: &str = "Content-Type";

/// Returns a copy of `headers` whose `Content-Type` names a charset.
///
/// A missing header is set to `application/json; charset=utf-8`, a header
/// without a `charset` parameter gets `; charset=utf-8` appended. Applying it
/// twice gives the same headers as applying it once.
pub fn normalize_content_type(headers: &Headers) -> Headers {
    normalize_content_type_with(headers, DEFAULT_CONTENT_TYPE, DEFAULT_CHARSET)
}

/// Like [`normalize_content_type`] with an explicit default type and charset.
///
/// The header is matched ignoring case so a `content-type` written in the file
/// is completed in place instead of being sent twice.
pub fn normalize_content_type_with(headers: &Headers, default_content_type: &str, charset: &str) -> Headers {
    let (name, value) = match headers.find_ignore_case(CONTENT_TYPE) {
        Some((name, value)) => (name.to_string(), value.to_string()),
        None => (CONTENT_TYPE.to_string(), default_content_type.to_string()),
    };
    let value = if has_charset(&value) {
        value
    } else {
        format!("{value}; charset={charset}")
    };

    let mut normalized = headers.clone();
    normalized.insert(name, value);
    normalized
}

fn has_charset(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("charset=")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn headers(entries: &[(&str, &str)]) -> Headers {
        entries.iter().copied().collect()
    }

    #[test_case(&[], &[("Content-Type", "application/json; charset=utf-8")] ; "missing header gets default")]
    #[test_case(&[("Content-Type", "text/plain")], &[("Content-Type", "text/plain; charset=utf-8")] ; "charset appended")]
    #[test_case(&[("Content-Type", "application/json; charset=utf-8")], &[("Content-Type", "application/json; charset=utf-8")] ; "already complete")]
    #[test_case(&[("Content-Type", "text/html; Charset=ISO-8859-1")], &[("Content-Type", "text/html; Charset=ISO-8859-1")] ; "declared charset kept")]
    #[test_case(&[("content-type", "text/plain")], &[("content-type", "text/plain; charset=utf-8")] ; "lower case name updated in place")]
    fn normalizes(input: &[(&str, &str)], expected: &[(&str, &str)]) {
        assert_eq!(normalize_content_type(&headers(input)), headers(expected));
    }

    #[test]
    fn is_idempotent() {
        let input = headers(&[("Host", "example.com"), ("Content-Type", "application/xml")]);
        let once = normalize_content_type(&input);
        let twice = normalize_content_type(&once);
        assert_eq!(once, twice);
        assert_eq!(once.get("Content-Type"), Some("application/xml; charset=utf-8"));
    }

    #[test]
    fn leaves_input_untouched() {
        let input = headers(&[("Accept", "*/*")]);
        let normalized = normalize_content_type(&input);
        assert_eq!(input.len(), 1);
        assert_eq!(normalized.len(), 2);
    }

    #[test]
    fn uses_configured_defaults() {
        let normalized = normalize_content_type_with(&Headers::new(), "text/plain", "iso-8859-1");
        assert_eq!(normalized.get("Content-Type"), Some("text/plain; charset=iso-8859-1"));
    }
}
