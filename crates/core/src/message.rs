//! Conversation turns and the append-only conversation store.
//!
//! The model has no memory of its own: every round, the full sequence of
//! turns is replayed to it verbatim. Insertion order is therefore the resend
//! order and is never changed after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::ToolResult;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the exchange a turn belongs to when sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One atomic entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    /// Text typed by the user (possibly enriched with session context).
    UserText { text: String },

    /// Text produced by the model.
    AssistantText { text: String },

    /// A tool invocation requested by the model.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// The outcome of a tool invocation, correlated by `id`.
    ToolResult {
        id: String,
        output: String,
        is_error: bool,
    },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::UserText { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::AssistantText { text: text.into() }
    }

    /// The provider-side role this turn is sent under.
    ///
    /// Tool results travel on the user side of the exchange.
    pub fn role(&self) -> Role {
        match self {
            Self::UserText { .. } | Self::ToolResult { .. } => Role::User,
            Self::AssistantText { .. } | Self::ToolCall { .. } => Role::Assistant,
        }
    }
}

impl From<ToolResult> for Turn {
    fn from(result: ToolResult) -> Self {
        Self::ToolResult {
            id: result.call_id,
            output: result.output,
            is_error: result.is_error,
        }
    }
}

/// An ordered, append-only log of turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// Ordered turns
    turns: Vec<Turn>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last turn was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a user utterance.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.append(std::iter::once(Turn::user(text)));
    }

    /// Append the text and tool-call turns of one model response, in order.
    pub fn push_assistant(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.append(turns);
    }

    /// Append one batch of tool results, in arrival order.
    pub fn push_tool_results(&mut self, results: impl IntoIterator<Item = ToolResult>) {
        self.append(results.into_iter().map(Turn::from));
    }

    fn append(&mut self, turns: impl IntoIterator<Item = Turn>) {
        let before = self.turns.len();
        self.turns.extend(turns);
        if self.turns.len() != before {
            self.updated_at = Utc::now();
        }
    }

    /// The complete, ordered history. This is what gets resent each round.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_append_order() {
        let mut conv = Conversation::new();
        conv.push_user("list the slides");
        conv.push_assistant(vec![
            Turn::assistant("Let me look."),
            Turn::ToolCall {
                id: "toolu_1".into(),
                name: "list_slides".into(),
                input: serde_json::json!({}),
            },
        ]);
        conv.push_tool_results(vec![ToolResult::ok("toolu_1", r#"{"slide_count":3}"#)]);
        conv.push_assistant(vec![Turn::assistant("There are 3 slides.")]);

        let turns = conv.snapshot();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[0], Turn::user("list the slides"));
        assert!(matches!(&turns[2], Turn::ToolCall { name, .. } if name == "list_slides"));
        assert!(matches!(&turns[3], Turn::ToolResult { id, is_error: false, .. } if id == "toolu_1"));
        assert_eq!(turns[4], Turn::assistant("There are 3 slides."));
    }

    #[test]
    fn many_appends_never_reorder_or_drop() {
        let mut conv = Conversation::new();
        for i in 0..50 {
            if i % 2 == 0 {
                conv.push_user(format!("u{i}"));
            } else {
                conv.push_assistant(vec![Turn::assistant(format!("a{i}"))]);
            }
        }
        assert_eq!(conv.len(), 50);
        for (i, turn) in conv.snapshot().iter().enumerate() {
            let expected = if i % 2 == 0 {
                Turn::user(format!("u{i}"))
            } else {
                Turn::assistant(format!("a{i}"))
            };
            assert_eq!(turn, &expected);
        }
    }

    #[test]
    fn empty_assistant_batch_leaves_history_untouched() {
        let mut conv = Conversation::new();
        conv.push_user("hi");
        let stamp = conv.updated_at;
        conv.push_assistant(Vec::new());
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.updated_at, stamp);
    }

    #[test]
    fn tool_results_sit_on_the_user_side() {
        let turn = Turn::from(ToolResult::error("toolu_9", "tool not found"));
        assert_eq!(turn.role(), Role::User);
        assert_eq!(Turn::assistant("x").role(), Role::Assistant);
    }

    #[test]
    fn turn_serialization_is_tagged() {
        let json = serde_json::to_string(&Turn::user("hello")).unwrap();
        assert!(json.contains(r#""type":"user_text""#));
    }
}
