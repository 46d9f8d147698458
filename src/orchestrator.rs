//! Chat orchestration logic
//!
//! Translates one user action into the right set of backend calls for
//! the selected model option and folds the results back into the
//! session state. Comparison mode is an all-or-nothing join committed
//! in fixed model order; version comparison commits each branch as it
//! resolves and the aggregate only after all branches settle.

use crate::backend::{BackendError, ChatBackend, ChatReply, ChatRequest};
use crate::dispatch::{join_batch, CommitEach, StatsMap};
use crate::registry::{self, DispatchMode, ModelOption};
use crate::session::{Message, ResponseEntry, SessionState, VersionResponseEntry};
use crate::ClientConfig;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// Synthetic bot message appended when a chat dispatch fails
pub const BACKEND_ERROR_MESSAGE: &str = "Error contacting backend.";

/// Prompt re-sent on an instruction edit when no user turn exists yet
pub const REGENERATE_PROMPT: &str = "Regenerate using updated instructions.";

/// Fallback shown when a best-answer ranking call fails
pub const BEST_ANSWER_FALLBACK: &str = "Could not determine the best answer. Please try again.";

/// How many trailing message contents accompany a suggestion query
const SUGGESTION_CONTEXT_TURNS: usize = 5;

/// Errors from orchestrator operations that surface to the caller
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("unknown model option: {0}")]
    UnknownModel(String),
}

/// Orchestrates one chat session against the backend
pub struct ChatOrchestrator {
    config: ClientConfig,
    backend: Arc<dyn ChatBackend>,
    stats: Arc<StatsMap>,
    selected: &'static ModelOption,
    /// Session state; mutated only by this orchestrator's operations
    pub state: SessionState,
}

impl ChatOrchestrator {
    /// Create an orchestrator with the default model selection
    pub fn new(config: ClientConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            config,
            backend,
            stats: Arc::new(StatsMap::new()),
            selected: registry::default_option(),
            state: SessionState::new(),
        }
    }

    /// The currently selected model option
    pub fn selected_model(&self) -> &'static ModelOption {
        self.selected
    }

    /// Per-model request statistics
    pub fn stats(&self) -> &StatsMap {
        &self.stats
    }

    /// Switch the active model option by display name or id
    pub fn select_model(&mut self, name: &str) -> Result<(), OrchestratorError> {
        self.selected = registry::by_name(name)
            .or_else(|| registry::by_id(name))
            .ok_or_else(|| OrchestratorError::UnknownModel(name.to_string()))?;
        Ok(())
    }

    /// Populate the product/version table from the discovery endpoint
    pub async fn load_products(&mut self) -> Result<(), OrchestratorError> {
        self.state.products = self.backend.products().await?;
        Ok(())
    }

    /// Select the product/version scope and refresh the context files:
    /// fetched when both are set, cleared otherwise
    pub async fn set_scope(
        &mut self,
        product: Option<String>,
        version: Option<String>,
    ) -> Result<(), OrchestratorError> {
        self.state.selected_product = product;
        self.state.selected_version = version;

        let scope = self
            .state
            .selected_product
            .clone()
            .zip(self.state.selected_version.clone());
        match scope {
            Some((product, version)) => {
                let files = self.backend.context(&product, &version).await?;
                self.state.set_context_files(files);
            }
            None => self.state.context_files.clear(),
        }
        Ok(())
    }

    /// Store the user-edited instruction fragment for the next
    /// instruction send
    pub fn set_edited_instructions(&mut self, text: impl Into<String>) {
        self.state.edited_instructions = text.into();
    }

    /// Send one user prompt through the selected dispatch mode.
    ///
    /// Any dispatch failure is folded into a single synthetic bot
    /// message; the loading flag is cleared on every path.
    pub async fn send(&mut self, prompt: &str) {
        self.state.push_user(prompt);
        self.state.loading = true;
        self.state.best_answer = None;

        let history = self.state.history_window(self.config.history_window);
        let outcome = self.dispatch(prompt, history, None, true).await;

        self.state.loading = false;
        if let Err(err) = outcome {
            warn!(error = %err, model = self.selected.name, "chat dispatch failed");
            self.state.push_bot(BACKEND_ERROR_MESSAGE, self.selected.name);
        }
    }

    /// Re-send the last user prompt with the combined system-instruction
    /// override. Same dispatch branching as [`send`](Self::send), but
    /// context files and the prompt echo are left untouched, and the
    /// history carries no model tags.
    pub async fn send_instructions(&mut self) {
        let prompt = self
            .state
            .last_user_content()
            .map(str::to_string)
            .unwrap_or_else(|| REGENERATE_PROMPT.to_string());
        self.state.push_user(prompt.clone());
        self.state.loading = true;
        self.state.best_answer = None;

        let history: Vec<Message> = self
            .state
            .history_window(self.config.history_window)
            .into_iter()
            .map(|mut turn| {
                turn.model = None;
                turn
            })
            .collect();
        let instructions = self.state.combined_instructions();
        let outcome = self
            .dispatch(&prompt, history, Some(instructions), false)
            .await;

        self.state.loading = false;
        if let Err(err) = outcome {
            warn!(error = %err, model = self.selected.name, "instruction dispatch failed");
            self.state.push_bot(BACKEND_ERROR_MESSAGE, self.selected.name);
        }
    }

    /// Ask the backend to rank the model comparison's answers. Failure
    /// commits a fixed fallback string, never an error.
    pub async fn best_answer(&mut self) {
        self.state.best_loading = true;
        self.state.best_answer = None;

        let question = self
            .state
            .first_user_content()
            .unwrap_or_default()
            .to_string();
        let answers: Vec<String> = self
            .state
            .responses
            .iter()
            .map(|r| r.content.clone())
            .collect();
        let models: Vec<String> = self
            .state
            .responses
            .iter()
            .map(|r| r.model.clone())
            .collect();

        let result = self
            .backend
            .best_of_models(&question, &answers, &models)
            .await;

        self.state.best_loading = false;
        self.state.best_answer = Some(match result {
            Ok(best) => best,
            Err(err) => {
                warn!(error = %err, "best-answer ranking failed");
                BEST_ANSWER_FALLBACK.to_string()
            }
        });
    }

    /// Ask the backend to rank the version comparison's answers
    pub async fn best_version_answer(&mut self) {
        self.state.best_loading = true;
        self.state.best_answer = None;

        let question = self
            .state
            .first_user_content()
            .unwrap_or_default()
            .to_string();
        let answers: Vec<String> = self
            .state
            .version_responses
            .iter()
            .map(|r| r.content.clone())
            .collect();
        let versions: Vec<String> = self
            .state
            .version_responses
            .iter()
            .map(|r| r.version.clone())
            .collect();

        let result = self
            .backend
            .best_of_versions(&question, &answers, &versions)
            .await;

        self.state.best_loading = false;
        self.state.best_answer = Some(match result {
            Ok(best) => best,
            Err(err) => {
                warn!(error = %err, "best-version ranking failed");
                BEST_ANSWER_FALLBACK.to_string()
            }
        });
    }

    /// Fetch prompt suggestions for a partially typed query. Queries
    /// shorter than the configured minimum skip the network; failures
    /// coerce to an empty list.
    pub async fn suggestions(&self, query: &str) -> Vec<String> {
        if query.trim().len() < self.config.min_suggestion_len {
            return Vec::new();
        }

        let context = self.state.recent_contents(SUGGESTION_CONTEXT_TURNS);
        match self.backend.suggestions(query, &context).await {
            Ok(suggestions) => suggestions,
            Err(err) => {
                warn!(error = %err, "failed to fetch suggestions");
                Vec::new()
            }
        }
    }

    /// Reset the conversation
    pub fn clear(&mut self) {
        self.state.clear();
    }

    fn chat_request(
        &self,
        prompt: &str,
        model: &str,
        version: &str,
        history: Vec<Message>,
        system_instructions: Option<String>,
    ) -> ChatRequest {
        ChatRequest {
            prompt: prompt.to_string(),
            model: model.to_string(),
            product: self.state.selected_product.clone().unwrap_or_default(),
            version: version.to_string(),
            history,
            system_instructions,
        }
    }

    async fn dispatch(
        &mut self,
        prompt: &str,
        history: Vec<Message>,
        system_instructions: Option<String>,
        echo: bool,
    ) -> Result<(), BackendError> {
        let version = self.state.selected_version.clone().unwrap_or_default();

        match self.selected.mode {
            DispatchMode::Single => {
                let request = self.chat_request(
                    prompt,
                    self.selected.backend_id,
                    &version,
                    history,
                    system_instructions,
                );
                let reply = timed_chat(
                    Arc::clone(&self.backend),
                    Arc::clone(&self.stats),
                    self.selected.name.to_string(),
                    request,
                )
                .await?;

                if echo {
                    self.state.set_context_files(reply.context_files.clone());
                    self.state.set_prompt_echo(reply.llm_prompt.clone());
                }
                self.state.replace_responses(vec![ResponseEntry {
                    model: self.selected.name.to_string(),
                    content: reply.response.clone(),
                }]);
                self.state.push_bot(reply.response, self.selected.name);
            }

            DispatchMode::Comparison => {
                let options: Vec<&'static ModelOption> = registry::comparison_set().collect();
                let calls: Vec<_> = options
                    .iter()
                    .map(|opt| {
                        timed_chat(
                            Arc::clone(&self.backend),
                            Arc::clone(&self.stats),
                            opt.name.to_string(),
                            self.chat_request(
                                prompt,
                                opt.backend_id,
                                &version,
                                history.clone(),
                                system_instructions.clone(),
                            ),
                        )
                    })
                    .collect();

                // All-or-nothing join; nothing commits until every
                // branch has settled.
                let replies = join_batch(calls).await?;

                if echo {
                    if let Some(last) = replies.last() {
                        self.state.set_context_files(last.context_files.clone());
                        self.state.set_prompt_echo(last.llm_prompt.clone());
                    }
                }

                self.state.replace_responses(
                    options
                        .iter()
                        .zip(&replies)
                        .map(|(opt, reply)| ResponseEntry {
                            model: opt.name.to_string(),
                            content: reply.response.clone(),
                        })
                        .collect(),
                );
                for (opt, reply) in options.iter().zip(replies) {
                    self.state.push_bot(reply.response, opt.name);
                }
            }

            DispatchMode::ComparisonVersion => {
                // Failures in this mode are diagnostics, never a
                // user-visible error message.
                let versions = match self.backend.versions_to_compare(&version).await {
                    Ok(versions) => versions,
                    Err(err) => {
                        warn!(error = %err, "failed to fetch versions to compare");
                        return Ok(());
                    }
                };
                debug!(count = versions.len(), "comparing versions");

                let mut pending: CommitEach<_> = versions
                    .iter()
                    .enumerate()
                    .map(|(idx, compare_version)| {
                        let request = self.chat_request(
                            prompt,
                            self.selected.backend_id,
                            compare_version,
                            history.clone(),
                            system_instructions.clone(),
                        );
                        let backend = Arc::clone(&self.backend);
                        let stats = Arc::clone(&self.stats);
                        let label = self.selected.name.to_string();
                        let compare_version = compare_version.clone();
                        async move {
                            let result = timed_chat(backend, stats, label, request).await;
                            (idx, compare_version, result)
                        }
                    })
                    .collect();

                let mut entries: Vec<(usize, VersionResponseEntry)> = Vec::new();
                let mut any_failed = false;

                // Each branch commits its message as soon as it
                // resolves, so append order follows completion order.
                while let Some((idx, compare_version, result)) = pending.next().await {
                    match result {
                        Ok(reply) => {
                            if echo {
                                self.state.set_context_files(reply.context_files.clone());
                            }
                            self.state.push_bot(reply.response.clone(), self.selected.name);
                            entries.push((
                                idx,
                                VersionResponseEntry {
                                    version: compare_version,
                                    content: reply.response,
                                },
                            ));
                        }
                        Err(err) => {
                            any_failed = true;
                            warn!(version = %compare_version, error = %err, "version comparison call failed");
                        }
                    }
                }

                if any_failed {
                    return Ok(());
                }

                // The aggregate commits in request order even though the
                // messages above appended in completion order.
                entries.sort_by_key(|(idx, _)| *idx);
                let entries: Vec<VersionResponseEntry> =
                    entries.into_iter().map(|(_, entry)| entry).collect();

                let answers: Vec<String> = entries.iter().map(|e| e.content.clone()).collect();
                let version_names: Vec<String> =
                    entries.iter().map(|e| e.version.clone()).collect();
                self.state.replace_version_responses(entries);

                // Best effort: a diff failure just disables highlighting
                // for this turn.
                match self
                    .backend
                    .semantic_diff(prompt, &answers, &version_names)
                    .await
                {
                    Ok(highlights) => self.state.highlights = Some(highlights),
                    Err(err) => {
                        warn!(error = %err, "semantic diff unavailable for this turn");
                        self.state.highlights = None;
                    }
                }
            }
        }

        Ok(())
    }
}

async fn timed_chat(
    backend: Arc<dyn ChatBackend>,
    stats: Arc<StatsMap>,
    label: String,
    request: ChatRequest,
) -> Result<ChatReply, BackendError> {
    let start = Instant::now();
    let result = backend.chat(&request).await;
    stats.record(&label, start.elapsed().as_millis() as u64, result.is_ok());
    result
}
