use std::time::Duration;

pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_CHARSET: &str = "utf-8";
pub const DEFAULT_INDENT: usize = 4;

/// Settings used while turning file text into requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Scheme put in front of `Host` + path when the target is relative.
    pub default_scheme: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            default_scheme: DEFAULT_SCHEME.to_string(),
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn with_default_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.default_scheme = scheme.into();
        self
    }
}

/// Settings used while sending requests.
///
/// No timeout is applied unless one is set; a request then runs until the
/// server answers or the connection fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub timeout: Option<Duration>,
    pub default_content_type: String,
    pub charset: String,
    /// Indentation of pretty printed json bodies.
    pub indent: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            timeout: None,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            indent: DEFAULT_INDENT,
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}
