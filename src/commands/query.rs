//! Query command implementation

use super::truncate_with_ellipsis;
use crate::db::MemoryDb;
use crate::error::Result;
use crate::source::{UNKNOWN_ROLE, UNTITLED};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// A single search match
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub id: String,
    pub source: String,
    pub title: String,
    pub role: String,
    pub created_at: String,
    pub content: String,
}

/// Search result for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

/// Open the database for reading. A database nothing was imported into
/// yet gets empty tables and a warning.
pub async fn open_for_query(db_path: &Path) -> Result<MemoryDb> {
    let db = MemoryDb::connect(db_path).await?;
    if !db.is_initialized().await? {
        warn!(
            "No memories at {}; run `convmem import` first",
            db_path.display()
        );
        db.ensure_schema().await?;
    }
    Ok(db)
}

/// Search memories for a substring, newest first
pub async fn cmd_search(db: &MemoryDb, query: &str, limit: usize) -> Result<SearchResult> {
    info!("Searching memories for: {}", query);

    let memories = db.search_memories(query, limit).await?;
    let hits = memories
        .into_iter()
        .enumerate()
        .map(|(i, memory)| {
            let metadata = memory.parsed_metadata();
            SearchHit {
                rank: i + 1,
                source: memory.source.clone().unwrap_or_default(),
                title: metadata
                    .conversation_title
                    .unwrap_or_else(|| UNTITLED.to_string()),
                role: metadata.role.unwrap_or_else(|| UNKNOWN_ROLE.to_string()),
                created_at: memory.created_at.clone().unwrap_or_default(),
                id: memory.id,
                content: memory.content,
            }
        })
        .collect::<Vec<_>>();

    info!("Returning {} results", hits.len());

    Ok(SearchResult {
        query: query.to_string(),
        hits,
    })
}

/// Print search results to console
pub fn print_search_results(result: &SearchResult, snippet_chars: usize) {
    println!(
        "\nFound {} memories matching '{}':\n",
        result.hits.len(),
        result.query
    );

    for hit in &result.hits {
        println!("{}. [{}] {}", hit.rank, hit.source.to_uppercase(), hit.title);
        println!("   Role: {}", hit.role);
        println!("   Date: {}", hit.created_at);
        println!(
            "   Content: {}",
            truncate_with_ellipsis(&hit.content, snippet_chars)
        );
        println!();
    }
}
