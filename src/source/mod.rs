//! Export source adapters
//!
//! Each supported chat export format has an adapter that turns the raw
//! export bytes into normalized conversations and messages. The importer
//! only ever talks to [`ExportAdapter`], selected through [`SourceKind`].

mod chatgpt;
mod claude;

pub use chatgpt::{ChatGptAdapter, MessageBody};
pub use claude::ClaudeAdapter;

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Title used when an export entry has none
pub const UNTITLED: &str = "Untitled";

/// Role used when a message carries no author role
pub const UNKNOWN_ROLE: &str = "unknown";

/// Source-specific extra fields, kept in insertion order
pub type Metadata = Map<String, Value>;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Claude,
    #[serde(rename = "chatgpt")]
    ChatGpt,
}

impl SourceKind {
    /// Fixed import order
    pub const ALL: [SourceKind; 2] = [SourceKind::Claude, SourceKind::ChatGpt];

    /// Adapter that understands this format
    pub fn adapter(self) -> &'static dyn ExportAdapter {
        match self {
            SourceKind::Claude => &ClaudeAdapter,
            SourceKind::ChatGpt => &ChatGptAdapter,
        }
    }

    /// Human-readable name for progress output
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Claude => "Claude",
            SourceKind::ChatGpt => "ChatGPT",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Claude => write!(f, "claude"),
            SourceKind::ChatGpt => write!(f, "chatgpt"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "claude" => Ok(SourceKind::Claude),
            "chatgpt" => Ok(SourceKind::ChatGpt),
            _ => Err(Error::Config(format!("Unknown source: {}", s))),
        }
    }
}

/// A conversation in the unified model, with its extracted messages
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedConversation {
    pub id: String,
    pub title: String,
    pub source: SourceKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Metadata,
    pub messages: Vec<NormalizedMessage>,
}

/// A single message flattened to plain text
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Metadata,
}

/// Produces normalized records from one export format
pub trait ExportAdapter: Sync {
    /// Which source this adapter reads
    fn source(&self) -> SourceKind;

    /// Parse raw export bytes into normalized conversations.
    ///
    /// Entries without any extractable message are left out. Malformed JSON,
    /// or JSON that is not a list of conversation objects, is an
    /// [`Error::Parse`].
    fn normalize(&self, raw: &[u8]) -> Result<Vec<NormalizedConversation>>;
}

/// Message id for sources without a native per-message id
pub fn synthesized_message_id(conversation_id: &str, index: usize) -> String {
    format!("{}_msg_{}", conversation_id, index)
}

/// Storage format for timestamps; fixed width so it sorts lexically
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Convert (possibly fractional) epoch seconds, treating missing or
/// non-numeric values as the epoch
pub(crate) fn epoch_to_utc(value: Option<&Value>) -> DateTime<Utc> {
    let secs = value.and_then(Value::as_f64).unwrap_or(0.0);
    let millis = (secs * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Parse an ISO-8601 timestamp. A trailing `Z` is rewritten to `+00:00`;
/// timestamps without an offset are read as UTC.
pub(crate) fn parse_iso_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    let normalized = match trimmed.strip_suffix('Z') {
        Some(stem) => format!("{}+00:00", stem),
        None => trimmed.to_string(),
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Parse the top-level export array shared by every format
pub(crate) fn parse_export_entries(source: SourceKind, raw: &[u8]) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| Error::Parse(format!("{} export is not valid JSON: {}", source, e)))?;

    match value {
        Value::Array(entries) => Ok(entries),
        other => Err(Error::Parse(format!(
            "{} export must be a JSON array of conversations, found {}",
            source,
            json_type_name(&other)
        ))),
    }
}

/// Python-style truthiness used to pick between alternative fields
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Render a JSON value as plain text: strings verbatim, everything else as JSON
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
