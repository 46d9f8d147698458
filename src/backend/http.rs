//! JSON-over-HTTP backend implementation

use super::{BackendError, ChatBackend, ChatReply, ChatRequest, ContextFile, Highlight};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Default backend origin when none is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// HTTP client for the Prompt Visualizer backend
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new backend handle for the given origin
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(300))
    }

    /// Create with a custom request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
        }
    }

    /// The configured backend origin
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST");

        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    async fn get_json<R>(&self, path: &str) -> Result<R, BackendError>
    where
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
struct SuggestionsRequest<'a> {
    query: &'a str,
    context: &'a [String],
}

/// A missing or non-array `suggestions` field coerces to empty rather
/// than failing the request.
#[derive(Deserialize)]
struct SuggestionsReply {
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Serialize)]
struct ContextRequest<'a> {
    product: &'a str,
    version: &'a str,
}

#[derive(Serialize)]
struct SendVersionsRequest<'a> {
    version1: &'a str,
}

#[derive(Deserialize)]
struct SendVersionsReply {
    #[serde(default)]
    received_versions: Vec<String>,
}

#[derive(Serialize)]
struct SemanticDiffRequest<'a> {
    question: &'a str,
    answers: &'a [String],
    versions: &'a [String],
}

#[derive(Deserialize)]
struct SemanticDiffReply {
    #[serde(default)]
    highlights: Vec<Highlight>,
}

#[derive(Serialize)]
struct CompareRequest<'a> {
    question: &'a str,
    answers: &'a [String],
    models: &'a [String],
}

#[derive(Serialize)]
struct CompareVersionRequest<'a> {
    question: &'a str,
    answers: &'a [String],
    versions: &'a [String],
}

#[derive(Deserialize)]
struct CompareReply {
    best: String,
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        self.post_json("/api/chat", request).await
    }

    async fn suggestions(
        &self,
        query: &str,
        context: &[String],
    ) -> Result<Vec<String>, BackendError> {
        let reply: SuggestionsReply = self
            .post_json("/api/suggestions", &SuggestionsRequest { query, context })
            .await?;
        Ok(reply.suggestions)
    }

    async fn products(&self) -> Result<BTreeMap<String, Vec<String>>, BackendError> {
        self.get_json("/api/products").await
    }

    async fn context(
        &self,
        product: &str,
        version: &str,
    ) -> Result<Vec<ContextFile>, BackendError> {
        self.post_json("/api/context", &ContextRequest { product, version })
            .await
    }

    async fn versions_to_compare(&self, version1: &str) -> Result<Vec<String>, BackendError> {
        let reply: SendVersionsReply = self
            .post_json("/api/send-versions", &SendVersionsRequest { version1 })
            .await?;
        Ok(reply.received_versions)
    }

    async fn semantic_diff(
        &self,
        question: &str,
        answers: &[String],
        versions: &[String],
    ) -> Result<Vec<Highlight>, BackendError> {
        let reply: SemanticDiffReply = self
            .post_json(
                "/api/semantic-llm-diff",
                &SemanticDiffRequest {
                    question,
                    answers,
                    versions,
                },
            )
            .await?;
        Ok(reply.highlights)
    }

    async fn best_of_models(
        &self,
        question: &str,
        answers: &[String],
        models: &[String],
    ) -> Result<String, BackendError> {
        let reply: CompareReply = self
            .post_json(
                "/api/compare",
                &CompareRequest {
                    question,
                    answers,
                    models,
                },
            )
            .await?;
        Ok(reply.best)
    }

    async fn best_of_versions(
        &self,
        question: &str,
        answers: &[String],
        versions: &[String],
    ) -> Result<String, BackendError> {
        let reply: CompareReply = self
            .post_json(
                "/api/compare-version",
                &CompareVersionRequest {
                    question,
                    answers,
                    versions,
                },
            )
            .await?;
        Ok(reply.best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_creation() {
        let backend = HttpBackend::new("http://localhost:5000/");
        assert_eq!(backend.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_suggestions_reply_coerces_missing_field() {
        let reply: SuggestionsReply = serde_json::from_str("{}").unwrap();
        assert!(reply.suggestions.is_empty());

        let reply: SuggestionsReply =
            serde_json::from_str(r#"{"suggestions": ["a", "b"]}"#).unwrap();
        assert_eq!(reply.suggestions, vec!["a", "b"]);
    }

    #[test]
    fn test_chat_reply_defaults() {
        let reply: ChatReply = serde_json::from_str(r#"{"response": "hi"}"#).unwrap();
        assert_eq!(reply.response, "hi");
        assert!(reply.context_files.is_empty());
        assert!(reply.llm_prompt.is_empty());
    }
}
