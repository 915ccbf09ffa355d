//! Default values for configuration

use std::path::PathBuf;

/// Directory holding the `claude_data/` and `chatgpt_data/` export folders
pub fn default_export_dir() -> PathBuf {
    std::env::var("CONVMEM_EXPORT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::download_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
        })
}

/// Default Claude export path
pub fn default_claude_export() -> PathBuf {
    default_export_dir()
        .join("claude_data")
        .join("conversations.json")
}

/// Default ChatGPT export path
pub fn default_chatgpt_export() -> PathBuf {
    default_export_dir()
        .join("chatgpt_data")
        .join("conversations.json")
}

/// Default SQLite database file, next to the exports
pub fn default_db_file() -> PathBuf {
    std::env::var("CONVMEM_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_export_dir().join("conversations_memory.db"))
}

/// Default number of search results
pub fn default_query_limit() -> usize {
    10
}

/// Characters of memory content shown per search hit
pub fn default_snippet_chars() -> usize {
    200
}

/// Characters of conversation title shown in stats
pub fn default_title_chars() -> usize {
    60
}

/// Number of recent conversations listed in stats
pub fn default_recent_conversations() -> usize {
    10
}

/// Knowledge-graph service base URL
pub fn default_graph_url() -> String {
    std::env::var("CONVMEM_GRAPH_URL").unwrap_or_else(|_| "http://localhost:3721".to_string())
}

/// Knowledge-graph request timeout
pub fn default_graph_timeout_secs() -> u64 {
    30
}
