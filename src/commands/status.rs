//! Statistics command implementation

use super::{format_count, truncate_with_ellipsis};
use crate::db::{MemoryDb, SourceCount};
use crate::error::Result;
use crate::source::UNTITLED;
use serde::Serialize;
use tracing::info;

/// A conversation in the "most recent" listing
#[derive(Debug, Clone, Serialize)]
pub struct RecentConversation {
    pub id: String,
    pub title: String,
    pub source: String,
    pub created_at: String,
}

/// Aggregate statistics over the memory database
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub conversations_by_source: Vec<SourceCount>,
    pub messages_by_source: Vec<SourceCount>,
    pub memories_by_source: Vec<SourceCount>,
    pub recent_conversations: Vec<RecentConversation>,
}

/// Collect counts per source and the most recent conversations
pub async fn cmd_stats(db: &MemoryDb, recent: usize) -> Result<StatsReport> {
    info!("Collecting database statistics");

    let recent_conversations = db
        .recent_conversations(recent)
        .await?
        .into_iter()
        .map(|c| RecentConversation {
            id: c.id,
            title: c.title.unwrap_or_else(|| UNTITLED.to_string()),
            source: c.source.unwrap_or_default(),
            created_at: c.created_at.unwrap_or_default(),
        })
        .collect();

    let counts = db.counts_by_source().await?;

    Ok(StatsReport {
        conversations_by_source: counts.conversations,
        messages_by_source: counts.messages,
        memories_by_source: counts.memories,
        recent_conversations,
    })
}

fn print_counts(heading: &str, counts: &[SourceCount]) {
    println!("{}", heading);
    for entry in counts {
        println!(
            "  {}: {}",
            entry.source.as_deref().unwrap_or("unknown"),
            format_count(entry.count)
        );
    }
}

/// Print statistics to console
pub fn print_stats(stats: &StatsReport, title_chars: usize) {
    println!("=== CONVERSATION DATABASE STATISTICS ===\n");

    print_counts("Conversations by source:", &stats.conversations_by_source);
    println!();
    print_counts("Messages by source:", &stats.messages_by_source);
    println!();
    print_counts("Memories by source:", &stats.memories_by_source);

    println!("\nMost recent conversations:");
    for conv in &stats.recent_conversations {
        println!(
            "  [{}] {} ({})",
            conv.source.to_uppercase(),
            truncate_with_ellipsis(&conv.title, title_chars),
            conv.created_at
        );
    }
    println!();
}
