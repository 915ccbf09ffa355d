//! Conversation memory storage using SQLite
//!
//! This module handles all persistence:
//! - Conversations (one per imported export entry)
//! - Messages (flattened text, owned by a conversation)
//! - Memories (source-tagged search copies of messages)
//!
//! Writes go through a [`WriteBatch`], which wraps a single transaction so
//! an export file is committed as a whole.

mod schema;

pub use schema::*;

use crate::error::Result;
use crate::source::{format_timestamp, NormalizedConversation, NormalizedMessage, SourceKind};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{FromRow, Sqlite, Transaction};
use std::path::Path;
use tracing::{debug, info};

/// Memory `type` tag for rows derived from conversation messages
pub const CONVERSATION_MESSAGE: &str = "conversation_message";

/// A stored conversation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    pub id: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub metadata: Option<String>,
}

impl ConversationRecord {
    pub fn from_normalized(conv: &NormalizedConversation) -> Result<Self> {
        Ok(Self {
            id: conv.id.clone(),
            title: Some(conv.title.clone()),
            source: Some(conv.source.to_string()),
            created_at: Some(format_timestamp(&conv.created_at)),
            updated_at: Some(format_timestamp(&conv.updated_at)),
            metadata: Some(serde_json::to_string(&conv.metadata)?),
        })
    }
}

/// A stored message
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: Option<String>,
    pub role: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<String>,
    pub metadata: Option<String>,
}

impl MessageRecord {
    pub fn from_normalized(conversation_id: &str, message: &NormalizedMessage) -> Result<Self> {
        Ok(Self {
            id: message.id.clone(),
            conversation_id: Some(conversation_id.to_string()),
            role: Some(message.role.clone()),
            content: Some(message.content.clone()),
            created_at: Some(format_timestamp(&message.created_at)),
            metadata: Some(serde_json::to_string(&message.metadata)?),
        })
    }
}

/// A stored memory
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    pub source: Option<String>,
    pub created_at: Option<String>,
    pub metadata: Option<String>,
}

/// Metadata pointing a memory back at its conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryMetadata {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub conversation_title: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl MemoryRecord {
    /// Memory id for a message: `{source}_{message_id}`
    pub fn id_for(source: SourceKind, message_id: &str) -> String {
        format!("{}_{}", source, message_id)
    }

    /// Derive the search copy of a message
    pub fn derive(conv: &NormalizedConversation, message: &NormalizedMessage) -> Result<Self> {
        let metadata = MemoryMetadata {
            conversation_id: Some(conv.id.clone()),
            conversation_title: Some(conv.title.clone()),
            role: Some(message.role.clone()),
            kind: Some(CONVERSATION_MESSAGE.to_string()),
        };

        Ok(Self {
            id: Self::id_for(conv.source, &message.id),
            content: message.content.clone(),
            source: Some(conv.source.to_string()),
            created_at: Some(format_timestamp(&message.created_at)),
            metadata: Some(serde_json::to_string(&metadata)?),
        })
    }

    /// Parsed metadata; unreadable metadata yields empty fields
    pub fn parsed_metadata(&self) -> MemoryMetadata {
        self.metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok())
            .unwrap_or_default()
    }
}

/// Row counts for the three tables
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableCounts {
    pub conversations: usize,
    pub messages: usize,
    pub memories: usize,
}

/// A `(source, count)` pair from a grouped count
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCount {
    pub source: Option<String>,
    pub count: i64,
}

/// Grouped counts for every table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCounts {
    pub conversations: Vec<SourceCount>,
    pub messages: Vec<SourceCount>,
    pub memories: Vec<SourceCount>,
}

/// Conversation memory database handle
#[derive(Clone)]
pub struct MemoryDb {
    pool: SqlitePool,
}

impl MemoryDb {
    /// Connect to the database, creating the file and its parent directory
    /// if needed
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Connect and make sure the schema exists
    pub async fn open(db_path: &Path) -> Result<Self> {
        let db = Self::connect(db_path).await?;
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Create the tables and indexes if they are missing
    pub async fn ensure_schema(&self) -> Result<()> {
        debug!("Ensuring database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if the schema has been created
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='memories'",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.is_some())
    }

    /// Close the pool, waiting for connections to be released
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// Start a write batch; nothing is visible until [`WriteBatch::commit`]
    pub async fn begin(&self) -> Result<WriteBatch> {
        let tx = self.pool.begin().await?;
        Ok(WriteBatch { tx })
    }

    // ===== Lookups =====

    /// Get conversation by ID
    pub async fn get_conversation(&self, id: &str) -> Result<Option<ConversationRecord>> {
        let conv = sqlx::query_as::<_, ConversationRecord>(
            "SELECT * FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(conv)
    }

    /// Get message by ID
    pub async fn get_message(&self, id: &str) -> Result<Option<MessageRecord>> {
        let message = sqlx::query_as::<_, MessageRecord>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(message)
    }

    /// Get memory by ID
    pub async fn get_memory(&self, id: &str) -> Result<Option<MemoryRecord>> {
        let memory = sqlx::query_as::<_, MemoryRecord>("SELECT * FROM memories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(memory)
    }

    /// List messages of a conversation
    pub async fn list_messages(&self, conversation_id: &str) -> Result<Vec<MessageRecord>> {
        let messages = sqlx::query_as::<_, MessageRecord>(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY rowid",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    // ===== Search =====

    /// Memories whose content contains `query`, newest first
    pub async fn search_memories(&self, query: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        let pattern = format!("%{}%", escape_like(query));
        let memories = sqlx::query_as::<_, MemoryRecord>(
            r#"
            SELECT id, content, source, created_at, metadata
            FROM memories
            WHERE content LIKE ? ESCAPE '\'
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(memories)
    }

    // ===== Statistics =====

    /// Total rows per table
    pub async fn count_totals(&self) -> Result<TableCounts> {
        let conversations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await?;

        let messages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;

        let memories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memories")
            .fetch_one(&self.pool)
            .await?;

        Ok(TableCounts {
            conversations: conversations as usize,
            messages: messages as usize,
            memories: memories as usize,
        })
    }

    /// Conversations grouped by source
    pub async fn conversation_counts_by_source(&self) -> Result<Vec<SourceCount>> {
        let counts = sqlx::query_as::<_, SourceCount>(
            "SELECT source, COUNT(*) AS count FROM conversations GROUP BY source ORDER BY source",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Messages grouped by the source of their conversation
    pub async fn message_counts_by_source(&self) -> Result<Vec<SourceCount>> {
        let counts = sqlx::query_as::<_, SourceCount>(
            r#"
            SELECT c.source AS source, COUNT(m.id) AS count
            FROM conversations c
            LEFT JOIN messages m ON c.id = m.conversation_id
            GROUP BY c.source
            ORDER BY c.source
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Memories grouped by source
    pub async fn memory_counts_by_source(&self) -> Result<Vec<SourceCount>> {
        let counts = sqlx::query_as::<_, SourceCount>(
            "SELECT source, COUNT(*) AS count FROM memories GROUP BY source ORDER BY source",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Per-source counts of conversations, messages, and memories
    pub async fn counts_by_source(&self) -> Result<SourceCounts> {
        Ok(SourceCounts {
            conversations: self.conversation_counts_by_source().await?,
            messages: self.message_counts_by_source().await?,
            memories: self.memory_counts_by_source().await?,
        })
    }

    /// Most recently created conversations
    pub async fn recent_conversations(&self, limit: usize) -> Result<Vec<ConversationRecord>> {
        let convs = sqlx::query_as::<_, ConversationRecord>(
            "SELECT * FROM conversations ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(convs)
    }
}

/// Pending writes for one export file
pub struct WriteBatch {
    tx: Transaction<'static, Sqlite>,
}

impl WriteBatch {
    /// Insert or replace a conversation
    pub async fn upsert_conversation(&mut self, conv: &ConversationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, title, source, created_at, updated_at, metadata)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                source = excluded.source,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                metadata = excluded.metadata
            "#,
        )
        .bind(&conv.id)
        .bind(&conv.title)
        .bind(&conv.source)
        .bind(&conv.created_at)
        .bind(&conv.updated_at)
        .bind(&conv.metadata)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Insert or replace a message
    pub async fn upsert_message(&mut self, message: &MessageRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, created_at, metadata)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                conversation_id = excluded.conversation_id,
                role = excluded.role,
                content = excluded.content,
                created_at = excluded.created_at,
                metadata = excluded.metadata
            "#,
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.role)
        .bind(&message.content)
        .bind(&message.created_at)
        .bind(&message.metadata)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Insert or replace a memory
    pub async fn upsert_memory(&mut self, memory: &MemoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memories (id, content, source, created_at, metadata)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                source = excluded.source,
                created_at = excluded.created_at,
                metadata = excluded.metadata
            "#,
        )
        .bind(&memory.id)
        .bind(&memory.content)
        .bind(&memory.source)
        .bind(&memory.created_at)
        .bind(&memory.metadata)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Make every write in the batch visible
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Escape `LIKE` wildcards so the query matches literally (escape char `\`)
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
