//! Backend API abstraction and HTTP implementation
//!
//! The Prompt Visualizer backend runs the models, retrieval and semantic
//! diffing; this module is the client seam. `ChatBackend` is the trait the
//! orchestrator dispatches against, `HttpBackend` the JSON-over-HTTP
//! implementation.

mod http;

pub use http::{HttpBackend, DEFAULT_BASE_URL};

use crate::session::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Request for a single chat completion
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// User prompt for this turn
    pub prompt: String,

    /// Backend model identifier (e.g. "azure/gpt-4.1-mini")
    pub model: String,

    /// Selected product the conversation is scoped to
    pub product: String,

    /// Selected product version
    pub version: String,

    /// Trailing conversation history, most recent turns last
    pub history: Vec<Message>,

    /// Optional override for the system instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instructions: Option<String>,
}

/// Reply to a chat completion
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    /// The generated answer
    pub response: String,

    /// Raw retrieval context the backend assembled
    #[serde(default)]
    pub context: String,

    /// Retrieval documents shown for transparency
    #[serde(default)]
    pub context_files: Vec<ContextFile>,

    /// Full prompt the backend sent to the model, echoed back
    #[serde(default)]
    pub llm_prompt: String,
}

/// A retrieval document returned alongside a model response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    pub collection_name: String,
    pub document: String,
}

/// A diff chunk of a response, tagged unique or common
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightChunk {
    pub text: String,
    pub is_unique: bool,
}

/// Per-version highlight data from the semantic diff endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub version: String,
    pub chunks: Vec<HighlightChunk>,
}

/// Trait for the remote backend collaborator
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one chat completion request
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError>;

    /// Fetch prompt suggestions for a partially typed query
    async fn suggestions(
        &self,
        query: &str,
        context: &[String],
    ) -> Result<Vec<String>, BackendError>;

    /// List available products and their versions
    async fn products(&self) -> Result<BTreeMap<String, Vec<String>>, BackendError>;

    /// Fetch the retrieval documents for a product/version pair
    async fn context(
        &self,
        product: &str,
        version: &str,
    ) -> Result<Vec<ContextFile>, BackendError>;

    /// Discover which versions to fan out to for version comparison
    async fn versions_to_compare(&self, version1: &str) -> Result<Vec<String>, BackendError>;

    /// Request per-version highlight chunks over a completed response set
    async fn semantic_diff(
        &self,
        question: &str,
        answers: &[String],
        versions: &[String],
    ) -> Result<Vec<Highlight>, BackendError>;

    /// Ask the backend to rank a model comparison's answers
    async fn best_of_models(
        &self,
        question: &str,
        answers: &[String],
        models: &[String],
    ) -> Result<String, BackendError>;

    /// Ask the backend to rank a version comparison's answers
    async fn best_of_versions(
        &self,
        question: &str,
        answers: &[String],
        versions: &[String],
    ) -> Result<String, BackendError>;
}
