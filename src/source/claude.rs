//! Claude export adapter
//!
//! A Claude export is a list of conversations. Each conversation keeps its
//! messages in a `mapping` of node id to node, where a node may or may not
//! carry a message. Only text messages with non-blank parts are kept.

use super::{
    epoch_to_utc, parse_export_entries, synthesized_message_id, value_to_text, ExportAdapter,
    Metadata, NormalizedConversation, NormalizedMessage, SourceKind, UNKNOWN_ROLE, UNTITLED,
};
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

/// Adapter for Claude `conversations.json` exports
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeAdapter;

#[derive(Debug, Deserialize)]
struct ClaudeConversation {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    create_time: Option<Value>,
    #[serde(default)]
    update_time: Option<Value>,
    #[serde(default)]
    mapping: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ClaudeNode {
    #[serde(default)]
    message: Option<ClaudeMessage>,
}

/// Only `content` decides whether a node is kept; the other fields are
/// taken in whatever JSON shape they arrive in.
#[derive(Debug, Deserialize)]
struct ClaudeMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    author: Option<Value>,
    #[serde(default)]
    content: Option<ClaudeContent>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    weight: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    parts: Option<Value>,
}

impl ExportAdapter for ClaudeAdapter {
    fn source(&self) -> SourceKind {
        SourceKind::Claude
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<NormalizedConversation>> {
        let entries = parse_export_entries(SourceKind::Claude, raw)?;
        let mut conversations = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let conv: ClaudeConversation = serde_json::from_value(entry).map_err(|e| {
                Error::Parse(format!("claude conversation #{}: {}", index, e))
            })?;

            if let Some(normalized) = normalize_conversation(conv) {
                conversations.push(normalized);
            }
        }

        Ok(conversations)
    }
}

fn normalize_conversation(conv: ClaudeConversation) -> Option<NormalizedConversation> {
    let mapping = match conv.mapping {
        Some(mapping) if !mapping.is_empty() => mapping,
        _ => {
            debug!(title = ?conv.title, "Skipping Claude conversation without mapping");
            return None;
        }
    };

    // Claude exports carry no id we reuse, so every import mints a new one.
    let id = Uuid::new_v4().to_string();
    let title = conv.title.unwrap_or_else(|| UNTITLED.to_string());
    let created_at = epoch_to_utc(conv.create_time.as_ref());
    let updated_at = epoch_to_utc(conv.update_time.as_ref());

    let mut metadata = Metadata::new();
    metadata.insert(
        "original_create_time".to_string(),
        conv.create_time.unwrap_or(Value::Null),
    );
    metadata.insert(
        "original_update_time".to_string(),
        conv.update_time.unwrap_or(Value::Null),
    );

    let mut messages = Vec::new();
    for (node_index, (node_id, node)) in mapping.iter().enumerate() {
        let node = match ClaudeNode::deserialize(node) {
            Ok(node) => node,
            Err(e) => {
                debug!(node_id = %node_id, "Skipping malformed Claude node: {}", e);
                continue;
            }
        };

        let Some(message) = node.message else {
            continue;
        };
        let Some(text) = message.content.as_ref().and_then(extract_text) else {
            continue;
        };

        let mut msg_metadata = Metadata::new();
        msg_metadata.insert("node_id".to_string(), Value::String(node_id.clone()));
        msg_metadata.insert("status".to_string(), message.status.unwrap_or(Value::Null));
        msg_metadata.insert("weight".to_string(), message.weight.unwrap_or(Value::Null));

        messages.push(NormalizedMessage {
            id: message
                .id
                .as_ref()
                .map(value_to_text)
                .unwrap_or_else(|| synthesized_message_id(&id, node_index)),
            role: message
                .author
                .as_ref()
                .and_then(|author| author.get("role"))
                .filter(|role| !role.is_null())
                .map(value_to_text)
                .unwrap_or_else(|| UNKNOWN_ROLE.to_string()),
            content: text,
            created_at,
            metadata: msg_metadata,
        });
    }

    if messages.is_empty() {
        debug!(title = %title, "Skipping Claude conversation without text messages");
        return None;
    }

    Some(NormalizedConversation {
        id,
        title,
        source: SourceKind::Claude,
        created_at,
        updated_at,
        metadata,
        messages,
    })
}

/// Text of a message when it is a `text` message with at least one
/// non-blank part
fn extract_text(content: &ClaudeContent) -> Option<String> {
    if content.content_type.as_deref() != Some("text") {
        return None;
    }

    let text = match content.parts.as_ref()? {
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => return None,
        other => value_to_text(other),
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
