//! ChatGPT export adapter
//!
//! A ChatGPT export is a list of conversations with a stable `uuid`, ISO-8601
//! timestamps, and a flat `chat_messages` list. Message bodies come in
//! several shapes; [`MessageBody`] resolves them once into plain text.

use super::{
    is_truthy, parse_export_entries, parse_iso_timestamp, synthesized_message_id, value_to_text,
    ExportAdapter, Metadata, NormalizedConversation, NormalizedMessage, SourceKind, UNKNOWN_ROLE,
    UNTITLED,
};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Adapter for ChatGPT `conversations.json` exports
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatGptAdapter;

#[derive(Debug, Deserialize)]
struct ChatGptConversation {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    account: Option<Value>,
    #[serde(default)]
    chat_messages: Option<Vec<Value>>,
}

/// The shapes a chat message body can take
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// Object with a `parts` list, joined line by line
    TextParts(Vec<Value>),
    /// Object with a direct `text` field
    DirectText(String),
    /// Any other scalar, list, or object
    Opaque(Value),
}

impl MessageBody {
    /// Pick the body of a chat message: `message` when truthy, otherwise
    /// `content` when truthy, otherwise nothing
    pub fn of_message(message: &Value) -> Self {
        let body = ["message", "content"]
            .iter()
            .filter_map(|key| message.get(key))
            .find(|value| is_truthy(value));

        match body {
            Some(value) => Self::resolve(value),
            None => MessageBody::Opaque(Value::Null),
        }
    }

    /// Classify a body value by shape
    pub fn resolve(value: &Value) -> Self {
        if let Value::Object(map) = value {
            if let Some(parts) = map.get("parts") {
                return match parts {
                    Value::Array(items) => MessageBody::TextParts(items.clone()),
                    other => MessageBody::TextParts(vec![other.clone()]),
                };
            }
            if let Some(text) = map.get("text") {
                return match text {
                    Value::Null => MessageBody::DirectText(String::new()),
                    other => MessageBody::DirectText(value_to_text(other)),
                };
            }
        }
        MessageBody::Opaque(value.clone())
    }

    /// Flatten to plain text
    pub fn into_text(self) -> String {
        match self {
            MessageBody::TextParts(parts) => join_lines(&parts),
            MessageBody::DirectText(text) => text,
            MessageBody::Opaque(Value::Null) => String::new(),
            MessageBody::Opaque(Value::Array(items)) => join_lines(&items),
            MessageBody::Opaque(other) => value_to_text(&other),
        }
    }
}

fn join_lines(items: &[Value]) -> String {
    items
        .iter()
        .filter(|item| !item.is_null())
        .map(value_to_text)
        .collect::<Vec<_>>()
        .join("\n")
}

impl ExportAdapter for ChatGptAdapter {
    fn source(&self) -> SourceKind {
        SourceKind::ChatGpt
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<NormalizedConversation>> {
        let entries = parse_export_entries(SourceKind::ChatGpt, raw)?;
        let mut conversations = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let conv: ChatGptConversation = serde_json::from_value(entry).map_err(|e| {
                Error::Parse(format!("chatgpt conversation #{}: {}", index, e))
            })?;

            if let Some(normalized) = normalize_conversation(conv)? {
                conversations.push(normalized);
            }
        }

        Ok(conversations)
    }
}

fn normalize_conversation(conv: ChatGptConversation) -> Result<Option<NormalizedConversation>> {
    let id = conv
        .uuid
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let title = conv.name.unwrap_or_else(|| UNTITLED.to_string());
    let created_at = required_timestamp(&id, "created_at", conv.created_at.as_deref())?;
    let updated_at = required_timestamp(&id, "updated_at", conv.updated_at.as_deref())?;

    let mut metadata = Metadata::new();
    metadata.insert("summary".to_string(), conv.summary.unwrap_or(Value::Null));
    metadata.insert(
        "account_uuid".to_string(),
        conv.account
            .as_ref()
            .and_then(|account| account.get("uuid"))
            .cloned()
            .unwrap_or(Value::Null),
    );

    let messages: Vec<NormalizedMessage> = conv
        .chat_messages
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, message)| normalize_message(&id, created_at, index, message))
        .collect();

    if messages.is_empty() {
        debug!(conversation = %id, "Skipping ChatGPT conversation without messages");
        return Ok(None);
    }

    Ok(Some(NormalizedConversation {
        id,
        title,
        source: SourceKind::ChatGpt,
        created_at,
        updated_at,
        metadata,
        messages,
    }))
}

fn normalize_message(
    conversation_id: &str,
    created_at: DateTime<Utc>,
    index: usize,
    message: Value,
) -> Option<NormalizedMessage> {
    let content = MessageBody::of_message(&message).into_text();
    if content.trim().is_empty() {
        debug!(conversation = %conversation_id, index, "Dropping empty ChatGPT message");
        return None;
    }

    let role = message
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_ROLE)
        .to_string();

    let mut metadata = Metadata::new();
    metadata.insert("message_index".to_string(), Value::from(index));
    metadata.insert("original_message".to_string(), message);

    Some(NormalizedMessage {
        id: synthesized_message_id(conversation_id, index),
        role,
        content,
        created_at,
        metadata,
    })
}

fn required_timestamp(
    conversation_id: &str,
    field: &str,
    raw: Option<&str>,
) -> Result<DateTime<Utc>> {
    let raw = raw.unwrap_or_default();
    parse_iso_timestamp(raw).ok_or_else(|| {
        Error::Parse(format!(
            "chatgpt conversation {}: invalid {} {:?}",
            conversation_id, field, raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::format_timestamp;
    use serde_json::json;

    fn normalize(value: Value) -> Vec<NormalizedConversation> {
        let raw = serde_json::to_vec(&value).unwrap();
        ChatGptAdapter.normalize(&raw).unwrap()
    }

    fn conversation(uuid: &str, messages: Value) -> Value {
        json!({
            "uuid": uuid,
            "name": "T",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "chat_messages": messages
        })
    }

    #[test]
    fn test_single_message_example() {
        let convs = normalize(json!([conversation(
            "c1",
            json!([{"role": "user", "message": "hello"}])
        )]));

        assert_eq!(convs.len(), 1);
        let conv = &convs[0];
        assert_eq!(conv.id, "c1");
        assert_eq!(conv.title, "T");
        assert_eq!(conv.source, SourceKind::ChatGpt);
        assert_eq!(format_timestamp(&conv.created_at), "2024-01-01T00:00:00.000Z");
        assert_eq!(format_timestamp(&conv.updated_at), "2024-01-02T00:00:00.000Z");

        let message = &conv.messages[0];
        assert_eq!(message.id, "c1_msg_0");
        assert_eq!(message.role, "user");
        assert_eq!(message.content, "hello");
        assert_eq!(message.created_at, conv.created_at);
        assert_eq!(message.metadata["message_index"], json!(0));
        assert_eq!(
            message.metadata["original_message"],
            json!({"role": "user", "message": "hello"})
        );
    }

    #[test]
    fn test_message_ids_follow_source_positions() {
        let convs = normalize(json!([conversation(
            "c2",
            json!([
                {"role": "user", "message": "one"},
                {"role": "assistant", "message": "   "},
                {"role": "assistant", "content": "three"},
                {"message": ""}
            ])
        )]));

        let ids: Vec<_> = convs[0].messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["c2_msg_0", "c2_msg_2"]);
        assert_eq!(convs[0].messages[1].content, "three");
    }

    #[test]
    fn test_body_shapes() {
        let convs = normalize(json!([conversation(
            "c3",
            json!([
                {"role": "user", "message": {"parts": ["a", "b"]}},
                {"role": "assistant", "message": {"text": "direct"}},
                {"role": "user", "message": ["x", 1, true]},
                {"message": 42},
                {"message": {"other": "field"}}
            ])
        )]));

        let contents: Vec<_> = convs[0]
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(
            contents,
            vec!["a\nb", "direct", "x\n1\ntrue", "42", "{\"other\":\"field\"}"]
        );
        assert_eq!(convs[0].messages[3].role, "unknown");
    }

    #[test]
    fn test_message_body_resolution() {
        assert_eq!(
            MessageBody::resolve(&json!({"parts": ["p"], "text": "t"})),
            MessageBody::TextParts(vec![json!("p")])
        );
        assert_eq!(
            MessageBody::resolve(&json!({"text": "t"})),
            MessageBody::DirectText("t".to_string())
        );
        assert_eq!(
            MessageBody::resolve(&json!("plain")),
            MessageBody::Opaque(json!("plain"))
        );
        assert_eq!(
            MessageBody::of_message(&json!({"message": null, "content": {"text": "fallback"}})),
            MessageBody::DirectText("fallback".to_string())
        );
        assert_eq!(MessageBody::of_message(&json!({"role": "user"})).into_text(), "");
        assert_eq!(
            MessageBody::TextParts(vec![json!("solo")]).into_text(),
            "solo"
        );
    }

    #[test]
    fn test_null_text_and_parts_yield_no_content() {
        assert_eq!(
            MessageBody::resolve(&json!({"text": null})),
            MessageBody::DirectText(String::new())
        );
        assert_eq!(
            MessageBody::TextParts(vec![json!(null), json!("kept"), json!(null)]).into_text(),
            "kept"
        );

        let convs = normalize(json!([conversation(
            "c5",
            json!([
                {"role": "user", "message": {"text": null}},
                {"role": "user", "message": {"parts": [null]}},
                {"role": "assistant", "message": "real"}
            ])
        )]));
        let contents: Vec<_> = convs[0]
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["real"]);
        assert_eq!(convs[0].messages[0].id, "c5_msg_2");
    }

    #[test]
    fn test_missing_uuid_and_name() {
        let convs = normalize(json!([{
            "created_at": "2024-01-01T00:00:00.000000+00:00",
            "updated_at": "2024-01-01T00:00:00.000000+00:00",
            "chat_messages": [{"role": "user", "message": "hi"}]
        }]));

        let conv = &convs[0];
        assert_eq!(conv.title, "Untitled");
        assert!(Uuid::parse_str(&conv.id).is_ok());
        assert_eq!(conv.messages[0].id, format!("{}_msg_0", conv.id));
    }

    #[test]
    fn test_metadata_fields() {
        let convs = normalize(json!([{
            "uuid": "c4",
            "summary": "about things",
            "account": {"uuid": "acct-1"},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "chat_messages": [{"role": "user", "message": "hi"}]
        }]));

        let keys: Vec<_> = convs[0].metadata.keys().cloned().collect();
        assert_eq!(keys, vec!["summary", "account_uuid"]);
        assert_eq!(convs[0].metadata["summary"], json!("about things"));
        assert_eq!(convs[0].metadata["account_uuid"], json!("acct-1"));
    }

    #[test]
    fn test_conversation_without_messages_is_skipped() {
        let convs = normalize(json!([
            conversation("empty", json!([])),
            conversation("blank", json!([{"role": "user", "message": "  \n "}]))
        ]));
        assert!(convs.is_empty());
    }

    #[test]
    fn test_stable_ids_across_runs() {
        let export = json!([conversation("c5", json!([{"role": "user", "message": "hi"}]))]);
        assert_eq!(normalize(export.clone()), normalize(export));
    }

    #[test]
    fn test_invalid_timestamp_is_parse_error() {
        let raw = serde_json::to_vec(&json!([{
            "uuid": "c6",
            "created_at": "not a date",
            "updated_at": "2024-01-01T00:00:00Z",
            "chat_messages": []
        }]))
        .unwrap();
        assert!(matches!(
            ChatGptAdapter.normalize(&raw),
            Err(Error::Parse(_))
        ));
    }
}
