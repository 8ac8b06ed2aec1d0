//! ProviderGateway: the external collaborator that performs HTTP egress.
//!
//! Provider HTTP shapes beyond the common normalized fields are out of
//! scope for this crate (spec §1); this module defines only the trait
//! boundary and the wire-shape-agnostic request/response types the
//! executor exchanges with it.

pub mod retry;

pub use retry::{RetryConfig, RetryingProviderGateway};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ProviderId;

/// One message in a normalized chat-style request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub role: String,
    pub content: String,
}

/// Provider-agnostic request body (spec §6, "Provider wire format"):
/// `{model, messages:[{role, content}], max_tokens, temperature, system?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRequest {
    pub model: String,
    pub messages: Vec<NormalizedMessage>,
    pub max_tokens: usize,
    pub temperature: f32,
    pub system: Option<String>,
}

/// Normalized token accounting as reported by the provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NormalizedUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Provider-agnostic response: `text` plus usage. Field-name translation
/// to a specific provider's dialect is the gateway implementation's
/// responsibility, not this crate's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedResponse {
    pub text: String,
    pub usage: NormalizedUsage,
}

/// External collaborator performing HTTP egress against a model provider.
/// Implemented outside this crate; the executor calls it as an opaque
/// dependency, generalized from the teacher's per-capability trait split
/// (`ChatProvider`, `EmbeddingProvider`) down to the single completion
/// operation this protocol needs.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    async fn complete(
        &self,
        provider: &ProviderId,
        req: &NormalizedRequest,
    ) -> Result<NormalizedResponse>;
}
