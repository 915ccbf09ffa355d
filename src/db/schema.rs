//! SQLite schema definition

/// SQL schema for the conversation memory database
pub const SCHEMA_SQL: &str = r#"
-- Conversations: one row per imported export entry
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    title TEXT,
    source TEXT,
    created_at TEXT,
    updated_at TEXT,
    metadata TEXT
);

-- Messages: flattened message text, owned by a conversation
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT REFERENCES conversations(id),
    role TEXT,
    content TEXT,
    created_at TEXT,
    metadata TEXT
);

-- Memories: search projection of messages, namespaced by source
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    source TEXT,
    created_at TEXT,
    metadata TEXT
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);
CREATE INDEX IF NOT EXISTS idx_conversations_created ON conversations(created_at);
"#;
