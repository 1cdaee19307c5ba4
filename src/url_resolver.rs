use crate::http_request::Headers;

pub const HOST: &str = "Host";

/// Builds the absolute url of a request.
///
/// A target that already carries a scheme is used unchanged. Otherwise the
/// `Host` header is put between `scheme://` and the target. Without a `Host`
/// the result is `scheme://<target>` with an empty authority; the dispatcher
/// refuses to send such a url.
pub fn resolve_url(headers: &Headers, target: &str, scheme: &str) -> String {
    if target.contains("://") {
        return target.to_string();
    }
    let host = headers.get(HOST).unwrap_or_default();
    return format!("{scheme}://{host}{target}");
}
