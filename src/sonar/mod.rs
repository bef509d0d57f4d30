//! Quality server client side
//!
//! HTTP transport, response decoding, version gating and the result
//! resolver built on top of them.

pub mod http;
pub mod project;
pub mod resolver;
pub mod types;
pub mod version;
pub mod ws;

pub use http::{Credentials, HttpClient, ReqwestHttpClient, TransportError};
pub use project::ProjectInformation;
pub use resolver::{ProjectResolver, ResolveError};
pub use types::{parse_gate_status, parse_task, CeTask, ParseFailure, QualityGateStatus, TaskStatus};
pub use version::{is_supported, ServerVersion, MINIMUM_SUPPORTED_VERSION};
pub use ws::WsClient;
