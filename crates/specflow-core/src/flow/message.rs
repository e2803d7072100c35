//! Messages recorded between agents and the orchestrator during a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Recipient {
    Agent(String),
    Orchestrator,
    Broadcast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Result,
    Artifact,
    Error,
    /// The sender needs an answer before it can continue.
    Request,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMessage {
    pub from: String,
    pub to: Recipient,
    pub kind: MessageKind,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl FlowMessage {
    pub fn new(from: impl Into<String>, to: Recipient, kind: MessageKind, payload: Value) -> Self {
        Self {
            from: from.into(),
            to,
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn to_orchestrator(from: impl Into<String>, kind: MessageKind, payload: Value) -> Self {
        Self::new(from, Recipient::Orchestrator, kind, payload)
    }

    pub fn broadcast(from: impl Into<String>, kind: MessageKind, payload: Value) -> Self {
        Self::new(from, Recipient::Broadcast, kind, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recipient_serialization() {
        let msg = FlowMessage::new(
            "coding_agent",
            Recipient::Agent("review_agent".into()),
            MessageKind::Artifact,
            json!({"name": "code"}),
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["to"], json!({"kind": "agent", "name": "review_agent"}));
        assert_eq!(value["kind"], json!("artifact"));

        let back: FlowMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_broadcast_has_no_name() {
        let msg = FlowMessage::broadcast("a", MessageKind::Result, Value::Null);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["to"], json!({"kind": "broadcast"}));
    }
}
