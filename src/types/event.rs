//! Events: the immutable records making up a session's log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::{Content, FunctionCall, FunctionResponse};

/// Author used for events carrying the user's input.
pub const USER_AUTHOR: &str = "user";

/// Summary of a compacted window of events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventCompaction {
    pub start_timestamp: DateTime<Utc>,
    pub end_timestamp: DateTime<Utc>,
    pub compacted_content: Content,
}

/// Side effects an event requests from the runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventActions {
    #[serde(default)]
    pub escalate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_to_agent: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub state_delta: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compaction: Option<EventCompaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewind_before_invocation_id: Option<String>,
}

impl EventActions {
    /// Transfer target, if one was requested and is non-empty.
    pub fn transfer_target(&self) -> Option<&str> {
        self.transfer_to_agent
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    /// Fold another set of actions into this one. Later values win.
    pub fn merge(&mut self, other: EventActions) {
        self.escalate |= other.escalate;
        if other.transfer_to_agent.is_some() {
            self.transfer_to_agent = other.transfer_to_agent;
        }
        self.state_delta.extend(other.state_delta);
        if other.compaction.is_some() {
            self.compaction = other.compaction;
        }
        if other.rewind_before_invocation_id.is_some() {
            self.rewind_before_invocation_id = other.rewind_before_invocation_id;
        }
    }
}

/// One record in a session's event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub invocation_id: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default)]
    pub actions: EventActions,
    #[serde(default)]
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Event {
    pub fn new(invocation_id: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            invocation_id: invocation_id.into(),
            author: author.into(),
            content: None,
            actions: EventActions::default(),
            partial: false,
            branch: None,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
            error_message: None,
        }
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_actions(mut self, actions: EventActions) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Function calls in this event's content.
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.content
            .as_ref()
            .map(Content::function_calls)
            .unwrap_or_default()
    }

    /// Function responses in this event's content.
    pub fn function_responses(&self) -> Vec<&FunctionResponse> {
        self.content
            .as_ref()
            .map(Content::function_responses)
            .unwrap_or_default()
    }

    /// Text of this event's content, empty when there is none.
    pub fn text(&self) -> String {
        self.content.as_ref().map(Content::text).unwrap_or_default()
    }

    pub fn is_compaction(&self) -> bool {
        self.actions.compaction.is_some()
    }

    pub fn is_rewind(&self) -> bool {
        self.actions.rewind_before_invocation_id.is_some()
    }

    /// A final response ends the agent's turn: no pending calls, not partial.
    pub fn is_final_response(&self) -> bool {
        !self.partial && self.function_calls().is_empty() && self.function_responses().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::content::{Part, Role};

    #[test]
    fn empty_transfer_target_is_ignored() {
        let actions = EventActions {
            transfer_to_agent: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(actions.transfer_target(), None);
    }

    #[test]
    fn merge_keeps_later_transfer_and_ors_escalate() {
        let mut actions = EventActions {
            escalate: true,
            transfer_to_agent: Some("a".into()),
            ..Default::default()
        };
        let mut delta = serde_json::Map::new();
        delta.insert("k".into(), serde_json::json!(1));
        actions.merge(EventActions {
            transfer_to_agent: Some("b".into()),
            state_delta: delta,
            ..Default::default()
        });
        assert!(actions.escalate);
        assert_eq!(actions.transfer_target(), Some("b"));
        assert_eq!(actions.state_delta["k"], 1);
    }

    #[test]
    fn final_response_excludes_calls() {
        let call = Content::new(
            Role::Model,
            vec![Part::FunctionCall(
                crate::types::FunctionCall::new("f", serde_json::json!({})).with_id("c1"),
            )],
        );
        assert!(!Event::new("inv", "agent").with_content(call).is_final_response());
        assert!(Event::new("inv", "agent")
            .with_content(Content::model("done"))
            .is_final_response());
    }
}
