//! Per-session conversation state
//!
//! One `SessionState` owns every array the chat surface renders: the
//! message timeline, the per-model and per-version response sets, context
//! files and the prompt echo. All updates go through named transition
//! methods so each one is testable independent of rendering; updates are
//! whole-value replacements, never partial in-place edits.

use crate::backend::{ContextFile, Highlight};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker the backend embeds in the echoed prompt between the system
/// instructions and the serialized conversation history.
pub const HISTORY_MARKER: &str = "--- CONVERSATION HISTORY ---";

/// Who produced a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// A single chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Display name of the model that produced a bot turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One model's answer in a single-turn or comparison request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEntry {
    pub model: String,
    pub content: String,
}

/// One version's answer in a version-comparison request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionResponseEntry {
    pub version: String,
    pub content: String,
}

/// All mutable state owned by one chat session
#[derive(Debug, Default)]
pub struct SessionState {
    /// Ordered message timeline, append-only within a conversation
    pub messages: Vec<Message>,
    /// Response set from the last single/comparison dispatch
    pub responses: Vec<ResponseEntry>,
    /// Response set from the last version-comparison dispatch
    pub version_responses: Vec<VersionResponseEntry>,
    /// Retrieval documents from the last reply
    pub context_files: Vec<ContextFile>,
    /// Product name to version list, from the discovery endpoint
    pub products: BTreeMap<String, Vec<String>>,
    /// Currently selected product
    pub selected_product: Option<String>,
    /// Currently selected version
    pub selected_version: Option<String>,
    /// Full prompt echoed back by the backend on the last reply
    pub prompt_echo: String,
    /// System instructions extracted from the prompt echo
    pub original_instructions: String,
    /// User-edited instruction fragment, appended on the next
    /// instruction send
    pub edited_instructions: String,
    /// Result of the last best-answer ranking call
    pub best_answer: Option<String>,
    /// Highlight data for the last version comparison; `None` disables
    /// highlighting
    pub highlights: Option<Vec<Highlight>>,
    /// True while a chat dispatch is in flight
    pub loading: bool,
    /// True while a best-answer ranking call is in flight
    pub best_loading: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message {
            role: Role::User,
            content: content.into(),
            model: None,
        });
    }

    /// Append a bot turn tagged with the model that produced it
    pub fn push_bot(&mut self, content: impl Into<String>, model: impl Into<String>) {
        self.messages.push(Message {
            role: Role::Bot,
            content: content.into(),
            model: Some(model.into()),
        });
    }

    /// Replace the model response set
    pub fn replace_responses(&mut self, responses: Vec<ResponseEntry>) {
        self.responses = responses;
    }

    /// Replace the version response set
    pub fn replace_version_responses(&mut self, responses: Vec<VersionResponseEntry>) {
        self.version_responses = responses;
    }

    /// Replace the context file list
    pub fn set_context_files(&mut self, files: Vec<ContextFile>) {
        self.context_files = files;
    }

    /// Store the echoed prompt and re-extract the system instructions
    /// from it. The extracted fragment is everything before the
    /// conversation-history marker; the edited fragment resets so the
    /// next instruction edit starts empty.
    pub fn set_prompt_echo(&mut self, echo: impl Into<String>) {
        self.prompt_echo = echo.into();
        if !self.prompt_echo.is_empty() {
            let base = self
                .prompt_echo
                .split(HISTORY_MARKER)
                .next()
                .unwrap_or_default();
            self.original_instructions = base.trim().to_string();
            self.edited_instructions.clear();
        }
    }

    /// The instruction override for an instruction send: original
    /// fragment and edited fragment joined with a blank line, empty
    /// fragments dropped.
    pub fn combined_instructions(&self) -> String {
        [
            self.original_instructions.as_str(),
            self.edited_instructions.trim(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n")
    }

    /// The trailing `n` turns, as sent to the backend
    pub fn history_window(&self, n: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..].to_vec()
    }

    /// The trailing `n` message contents, used as suggestion context
    pub fn recent_contents(&self, n: usize) -> Vec<String> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..]
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    /// Content of the first user turn, the "question" for ranking calls
    pub fn first_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Content of the most recent user turn
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Reset every per-conversation field simultaneously so stale
    /// cross-turn state cannot leak into a fresh conversation. The
    /// product list and selection survive; they scope the session, not
    /// the conversation.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.responses.clear();
        self.version_responses.clear();
        self.context_files.clear();
        self.prompt_echo.clear();
        self.original_instructions.clear();
        self.edited_instructions.clear();
        self.best_answer = None;
        self.highlights = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_turns() {
        let mut state = SessionState::new();
        state.push_user("hello");
        state.push_bot("hi there", "GPT-4.1 Mini");

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role, Role::User);
        assert_eq!(state.messages[0].model, None);
        assert_eq!(state.messages[1].role, Role::Bot);
        assert_eq!(state.messages[1].model.as_deref(), Some("GPT-4.1 Mini"));
    }

    #[test]
    fn test_history_window_takes_trailing_turns() {
        let mut state = SessionState::new();
        for i in 0..10 {
            state.push_user(format!("turn {i}"));
        }
        let window = state.history_window(6);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].content, "turn 4");
        assert_eq!(window[5].content, "turn 9");

        // Shorter conversations come back whole.
        let mut short = SessionState::new();
        short.push_user("only");
        assert_eq!(short.history_window(6).len(), 1);
    }

    #[test]
    fn test_prompt_echo_extracts_instructions() {
        let mut state = SessionState::new();
        state.edited_instructions = "be brief".to_string();
        state.set_prompt_echo(format!(
            "You are a helpful assistant.\n\n{HISTORY_MARKER}\nuser: hi"
        ));

        assert_eq!(state.original_instructions, "You are a helpful assistant.");
        assert!(state.edited_instructions.is_empty());
    }

    #[test]
    fn test_prompt_echo_without_marker_keeps_whole_text() {
        let mut state = SessionState::new();
        state.set_prompt_echo("  just instructions  ");
        assert_eq!(state.original_instructions, "just instructions");
    }

    #[test]
    fn test_empty_prompt_echo_preserves_instructions() {
        let mut state = SessionState::new();
        state.original_instructions = "keep me".to_string();
        state.set_prompt_echo("");
        assert_eq!(state.original_instructions, "keep me");
    }

    #[test]
    fn test_combined_instructions_drops_empty_fragments() {
        let mut state = SessionState::new();
        assert_eq!(state.combined_instructions(), "");

        state.original_instructions = "base".to_string();
        assert_eq!(state.combined_instructions(), "base");

        state.edited_instructions = "  extra  ".to_string();
        assert_eq!(state.combined_instructions(), "base\n\nextra");

        state.original_instructions.clear();
        assert_eq!(state.combined_instructions(), "extra");
    }

    #[test]
    fn test_first_and_last_user_content() {
        let mut state = SessionState::new();
        assert_eq!(state.first_user_content(), None);

        state.push_user("first");
        state.push_bot("answer", "GPT-4.1 Mini");
        state.push_user("second");

        assert_eq!(state.first_user_content(), Some("first"));
        assert_eq!(state.last_user_content(), Some("second"));
    }

    #[test]
    fn test_clear_resets_conversation_but_keeps_scope() {
        let mut state = SessionState::new();
        state.products.insert("Widget".to_string(), vec!["1.0".to_string()]);
        state.selected_product = Some("Widget".to_string());
        state.selected_version = Some("1.0".to_string());
        state.push_user("hi");
        state.replace_responses(vec![ResponseEntry {
            model: "GPT-4.1 Mini".to_string(),
            content: "hello".to_string(),
        }]);
        state.replace_version_responses(vec![VersionResponseEntry {
            version: "1.0".to_string(),
            content: "hello".to_string(),
        }]);
        state.set_context_files(vec![ContextFile {
            collection_name: "widget_1_0".to_string(),
            document: "doc".to_string(),
        }]);
        state.set_prompt_echo("instructions");
        state.best_answer = Some("hello".to_string());
        state.highlights = Some(Vec::new());

        state.clear();

        assert!(state.messages.is_empty());
        assert!(state.responses.is_empty());
        assert!(state.version_responses.is_empty());
        assert!(state.context_files.is_empty());
        assert!(state.prompt_echo.is_empty());
        assert!(state.original_instructions.is_empty());
        assert!(state.best_answer.is_none());
        assert!(state.highlights.is_none());
        // Session scope survives a conversation reset.
        assert_eq!(state.selected_product.as_deref(), Some("Widget"));
        assert!(!state.products.is_empty());
    }

    #[test]
    fn test_message_wire_shape() {
        let msg = Message {
            role: Role::User,
            content: "hi".to_string(),
            model: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));

        let tagged = Message {
            role: Role::Bot,
            content: "hello".to_string(),
            model: Some("GPT-4o Mini".to_string()),
        };
        let json = serde_json::to_value(&tagged).unwrap();
        assert_eq!(json["role"], "bot");
        assert_eq!(json["model"], "GPT-4o Mini");
    }
}
