//! Client-side optimization layer for completion-style model calls: a
//! two-tier response cache, a capability-aware model router, a bounded
//! retry/timeout executor, and a single backpressure priority queue.
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_pipeline::{Pipeline, Priority, Request};
//! use mcp_pipeline::telemetry::default_event_sink;
//! use mcp_pipeline::types::ModelId;
//! use std::sync::Arc;
//!
//! # async fn run(gateway: Arc<dyn mcp_pipeline::provider::ProviderGateway>) -> mcp_pipeline::Result<()> {
//! let pipeline = Pipeline::default_shared(
//!     gateway,
//!     default_event_sink(),
//!     ModelId::new("claude-3-5-haiku"),
//! )?;
//!
//! let response = pipeline
//!     .submit(Request::new("Summarize this in one sentence."), Priority::Normal)
//!     .await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod provider;
pub mod queue;
pub mod router;
pub mod telemetry;
pub mod types;

pub use error::{McpError, Result};
pub use pipeline::{Pipeline, PipelineStats, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_COUNT};
pub use types::{
    ComplexityLevel, ErrorInfo, ErrorKind, McpParams, ModelId, ModelMetadata,
    ModelMetadataOverride, Priority, ProviderId, Request, RequestMetadata, Response,
    ResponseParser, Savings, Source, Usage,
};
