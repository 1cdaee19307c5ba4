//! Parse `.http` request files and execute the requests they describe.
//!
//! ```text
//! file text -> split_blocks -> parse_block* -> RequestDescriptor*
//! RequestDescriptor -> Dispatcher (normalize Content-Type, send, decode) -> DispatchOutcome
//! ```

pub mod config;
pub mod content_type;
pub mod errors;
pub mod execute;
pub mod http_file_parser;
pub mod http_request;
pub mod http_request_executor;
pub mod url_resolver;

pub use config::{DispatchConfig, ParseOptions};
pub use errors::{BodyParseError, LoadError, MalformedBlock, TransportError};
pub use execute::LoadedFile;
pub use http_request::{Headers, Method, RequestDescriptor};
pub use http_request_executor::{DispatchOutcome, Dispatcher, ReqwestTransport, Transport};
