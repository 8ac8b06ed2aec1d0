//! Shared data types: requests, responses, model identity and metadata.

pub mod model;
pub mod request;
pub mod response;

pub use model::{ComplexityLevel, ModelId, ModelMetadata, ModelMetadataOverride, ProviderId};
pub use request::{McpParams, Priority, Request, RequestMetadata, ResponseParser, DEFAULT_TIMEOUT};
pub use response::{ErrorInfo, ErrorKind, Response, Savings, Source, Usage};
