//! Import command implementation

use crate::config::Config;
use crate::db::{ConversationRecord, MemoryDb, MemoryRecord, MessageRecord, TableCounts};
use crate::error::{Error, Result};
use crate::progress::import_progress_bar;
use crate::source::{ExportAdapter, SourceKind};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Statistics from importing one export file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub source: SourceKind,
    /// Conversations that yielded at least one message
    pub conversations: usize,
    /// Distinct message ids written; a repeated id overwrites its row
    pub messages: usize,
    pub memories: usize,
}

impl ImportStats {
    fn new(source: SourceKind) -> Self {
        Self {
            source,
            conversations: 0,
            messages: 0,
            memories: 0,
        }
    }
}

/// What happened to one configured source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceOutcome {
    Imported(ImportStats),
    Missing { source: SourceKind },
}

/// Per-source result with the path that was read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceImport {
    pub path: String,
    pub outcome: SourceOutcome,
}

/// Result of a full import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub sources: Vec<SourceImport>,
    pub totals: TableCounts,
    pub db_path: String,
}

/// Normalize one export with `adapter` and persist it.
///
/// All rows of the file are written in one transaction that is committed
/// only after the whole file has been processed.
pub async fn import_export(
    db: &MemoryDb,
    adapter: &dyn ExportAdapter,
    raw: &[u8],
) -> Result<ImportStats> {
    let bar = import_progress_bar(0, adapter.source().label());
    import_with_progress(db, adapter, raw, &bar).await
}

/// Like [`import_export`], reporting on `bar`; the bar is cleared whether
/// or not the import succeeds
async fn import_with_progress(
    db: &MemoryDb,
    adapter: &dyn ExportAdapter,
    raw: &[u8],
    bar: &ProgressBar,
) -> Result<ImportStats> {
    let result = write_export(db, adapter, raw, bar).await;
    bar.finish_and_clear();

    let stats = result?;
    info!(
        "Imported {} {} conversations ({} messages)",
        stats.conversations,
        stats.source.label(),
        stats.messages
    );
    Ok(stats)
}

async fn write_export(
    db: &MemoryDb,
    adapter: &dyn ExportAdapter,
    raw: &[u8],
    bar: &ProgressBar,
) -> Result<ImportStats> {
    let source = adapter.source();
    let conversations = adapter.normalize(raw)?;
    debug!(%source, count = conversations.len(), "Normalized export");
    bar.set_length(conversations.len() as u64);

    let mut stats = ImportStats::new(source);
    // Message ids may repeat within one export; the later row wins.
    let mut message_ids = HashSet::new();
    let mut batch = db.begin().await?;

    for conv in &conversations {
        batch
            .upsert_conversation(&ConversationRecord::from_normalized(conv)?)
            .await?;

        for message in &conv.messages {
            batch
                .upsert_message(&MessageRecord::from_normalized(&conv.id, message)?)
                .await?;
            batch
                .upsert_memory(&MemoryRecord::derive(conv, message)?)
                .await?;
            message_ids.insert(message.id.as_str());
        }

        stats.conversations += 1;
        bar.inc(1);
    }

    batch.commit().await?;

    stats.messages = message_ids.len();
    stats.memories = message_ids.len();
    Ok(stats)
}

/// Read an export file, reporting absence as [`Error::MissingInput`]
async fn read_export(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::MissingInput(path.to_path_buf()))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Import one export file; a missing file is skipped, not an error
pub async fn import_file(db: &MemoryDb, source: SourceKind, path: &Path) -> Result<SourceImport> {
    let shown = path.display().to_string();

    let raw = match read_export(path).await {
        Ok(raw) => raw,
        Err(Error::MissingInput(_)) => {
            warn!("{} file not found: {}", source.label(), shown);
            return Ok(SourceImport {
                path: shown,
                outcome: SourceOutcome::Missing { source },
            });
        }
        Err(e) => return Err(e),
    };

    info!("Importing {} conversations from {}", source.label(), shown);
    let stats = import_export(db, source.adapter(), &raw)
        .await
        .map_err(|e| match e {
            Error::Parse(msg) => Error::Parse(format!("{}: {}", shown, msg)),
            other => other,
        })?;

    Ok(SourceImport {
        path: shown,
        outcome: SourceOutcome::Imported(stats),
    })
}

/// Import every configured export, Claude first, then ChatGPT
pub async fn cmd_import(config: &Config, db: &MemoryDb) -> Result<ImportReport> {
    let mut sources = Vec::with_capacity(SourceKind::ALL.len());

    for source in SourceKind::ALL {
        let path = export_path(config, source);
        sources.push(import_file(db, source, path).await?);
    }

    let totals = db.count_totals().await?;

    Ok(ImportReport {
        sources,
        totals,
        db_path: config.database.file.display().to_string(),
    })
}

fn export_path(config: &Config, source: SourceKind) -> &Path {
    match source {
        SourceKind::Claude => config.import.claude_export.as_path(),
        SourceKind::ChatGpt => config.import.chatgpt_export.as_path(),
    }
}

/// Print import results to console
pub fn print_import_report(report: &ImportReport) {
    for entry in &report.sources {
        match &entry.outcome {
            SourceOutcome::Imported(stats) => {
                println!(
                    "Importing {} conversations from {}",
                    stats.source.label(),
                    entry.path
                );
                println!(
                    "Imported {} {} conversations",
                    stats.conversations,
                    stats.source.label()
                );
            }
            SourceOutcome::Missing { source } => {
                println!("{} file not found: {}", source.label(), entry.path);
            }
        }
    }

    println!("\n✓ Import completed successfully!");
    println!("  Total conversations: {}", report.totals.conversations);
    println!("  Total messages: {}", report.totals.messages);
    println!("  Total memories: {}", report.totals.memories);
    println!("  Database saved to: {}", report.db_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChatGptAdapter, ClaudeAdapter};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    async fn setup_test_db() -> (MemoryDb, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = MemoryDb::open(&tmp.path().join("test.db")).await.unwrap();
        (db, tmp)
    }

    fn bytes(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn claude_export() -> Vec<u8> {
        bytes(json!([{
            "mapping": {"n1": {"message": {
                "id": "m1",
                "content": {"content_type": "text", "parts": ["hi"]},
                "author": {"role": "user"}
            }}}
        }]))
    }

    fn chatgpt_export() -> Vec<u8> {
        bytes(json!([{
            "uuid": "c1",
            "name": "T",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "chat_messages": [{"role": "user", "message": "hello"}]
        }]))
    }

    #[tokio::test]
    async fn test_claude_example() {
        let (db, _tmp) = setup_test_db().await;

        let stats = import_export(&db, &ClaudeAdapter, &claude_export())
            .await
            .unwrap();
        assert_eq!(stats.conversations, 1);
        assert_eq!(stats.messages, 1);

        let message = db.get_message("m1").await.unwrap().unwrap();
        assert_eq!(message.role.as_deref(), Some("user"));
        assert_eq!(message.content.as_deref(), Some("hi"));

        let conv_id = message.conversation_id.unwrap();
        let conv = db.get_conversation(&conv_id).await.unwrap().unwrap();
        assert_eq!(conv.source.as_deref(), Some("claude"));
        assert_eq!(conv.title.as_deref(), Some("Untitled"));

        let memory = db.get_memory("claude_m1").await.unwrap().unwrap();
        assert_eq!(memory.content, "hi");
        assert_eq!(memory.source.as_deref(), Some("claude"));
        assert_eq!(
            memory.parsed_metadata().conversation_id.as_deref(),
            Some(conv_id.as_str())
        );
    }

    #[tokio::test]
    async fn test_chatgpt_example() {
        let (db, _tmp) = setup_test_db().await;

        import_export(&db, &ChatGptAdapter, &chatgpt_export())
            .await
            .unwrap();

        let conv = db.get_conversation("c1").await.unwrap().unwrap();
        assert_eq!(conv.title.as_deref(), Some("T"));
        assert_eq!(conv.created_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));

        let message = db.get_message("c1_msg_0").await.unwrap().unwrap();
        assert_eq!(message.content.as_deref(), Some("hello"));
        assert_eq!(message.conversation_id.as_deref(), Some("c1"));

        let memory = db.get_memory("chatgpt_c1_msg_0").await.unwrap().unwrap();
        assert_eq!(memory.content, "hello");
    }

    #[tokio::test]
    async fn test_chatgpt_reimport_is_idempotent() {
        let (db, _tmp) = setup_test_db().await;
        let raw = chatgpt_export();

        import_export(&db, &ChatGptAdapter, &raw).await.unwrap();
        let before = db.count_totals().await.unwrap();
        let memory_before = db.get_memory("chatgpt_c1_msg_0").await.unwrap();

        import_export(&db, &ChatGptAdapter, &raw).await.unwrap();
        assert_eq!(db.count_totals().await.unwrap(), before);
        assert_eq!(
            db.get_memory("chatgpt_c1_msg_0").await.unwrap(),
            memory_before
        );
        assert_eq!(
            before,
            TableCounts {
                conversations: 1,
                messages: 1,
                memories: 1
            }
        );
    }

    #[tokio::test]
    async fn test_claude_reimport_duplicates_conversations() {
        let (db, _tmp) = setup_test_db().await;
        let raw = claude_export();

        import_export(&db, &ClaudeAdapter, &raw).await.unwrap();
        let first_conv = db
            .get_message("m1")
            .await
            .unwrap()
            .unwrap()
            .conversation_id
            .unwrap();

        import_export(&db, &ClaudeAdapter, &raw).await.unwrap();
        let second_conv = db
            .get_message("m1")
            .await
            .unwrap()
            .unwrap()
            .conversation_id
            .unwrap();

        // Same message id, now owned by the newer conversation row.
        assert_ne!(first_conv, second_conv);
        assert_eq!(
            db.count_totals().await.unwrap(),
            TableCounts {
                conversations: 2,
                messages: 1,
                memories: 1
            }
        );
        assert!(db.list_messages(&first_conv).await.unwrap().is_empty());
        assert_eq!(db.list_messages(&second_conv).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_every_message_has_one_memory() {
        let (db, _tmp) = setup_test_db().await;
        let raw = bytes(json!([{
            "uuid": "c9",
            "created_at": "2024-05-01T00:00:00Z",
            "updated_at": "2024-05-01T00:00:00Z",
            "chat_messages": [
                {"role": "user", "message": "first"},
                {"role": "assistant", "message": ""},
                {"role": "assistant", "message": {"parts": ["second", "part"]}}
            ]
        }]));

        let stats = import_export(&db, &ChatGptAdapter, &raw).await.unwrap();
        assert_eq!(stats.messages, 2);
        assert_eq!(stats.memories, 2);

        for message in db.list_messages("c9").await.unwrap() {
            let memory = db
                .get_memory(&format!("chatgpt_{}", message.id))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(Some(memory.content), message.content);
        }
    }

    #[tokio::test]
    async fn test_parse_failure_writes_nothing() {
        let (db, _tmp) = setup_test_db().await;
        let result = import_export(&db, &ChatGptAdapter, b"{not json").await;
        assert!(matches!(result, Err(Error::Parse(_))));
        assert_eq!(db.count_totals().await.unwrap(), TableCounts::default());
    }

    #[tokio::test]
    async fn test_cmd_import_skips_missing_files() {
        let tmp = TempDir::new().unwrap();
        let chatgpt_path = tmp.path().join("chatgpt.json");
        std::fs::write(&chatgpt_path, chatgpt_export()).unwrap();

        let mut config = Config::default();
        config.import.claude_export = tmp.path().join("missing.json");
        config.import.chatgpt_export = chatgpt_path;
        config.database.file = tmp.path().join("memory.db");

        let db = MemoryDb::open(&config.database.file).await.unwrap();
        let report = cmd_import(&config, &db).await.unwrap();

        assert_eq!(report.sources.len(), 2);
        assert_eq!(
            report.sources[0].outcome,
            SourceOutcome::Missing {
                source: SourceKind::Claude
            }
        );
        match &report.sources[1].outcome {
            SourceOutcome::Imported(stats) => {
                assert_eq!(stats.source, SourceKind::ChatGpt);
                assert_eq!(stats.conversations, 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(report.totals.memories, 1);
    }

    #[tokio::test]
    async fn test_repeated_message_ids_are_counted_once() {
        let (db, _tmp) = setup_test_db().await;
        let raw = bytes(json!([{
            "mapping": {
                "n1": {"message": {
                    "id": "dup",
                    "content": {"content_type": "text", "parts": ["first"]}
                }},
                "n2": {"message": {
                    "id": "dup",
                    "content": {"content_type": "text", "parts": ["second"]}
                }}
            }
        }]));

        let stats = import_export(&db, &ClaudeAdapter, &raw).await.unwrap();
        let totals = db.count_totals().await.unwrap();

        assert_eq!(stats.messages, 1);
        assert_eq!(stats.memories, 1);
        assert_eq!(totals.messages as usize, stats.messages);
        assert_eq!(totals.memories as usize, stats.memories);
        let message = db.get_message("dup").await.unwrap().unwrap();
        assert_eq!(message.content.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_progress_bar_cleared_when_import_fails() {
        let (db, _tmp) = setup_test_db().await;
        db.close().await;

        let bar = ProgressBar::hidden();
        let result = import_with_progress(&db, &ChatGptAdapter, &chatgpt_export(), &bar).await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert!(bar.is_finished());
    }

    #[tokio::test]
    async fn test_progress_bar_cleared_after_import() {
        let (db, _tmp) = setup_test_db().await;

        let bar = ProgressBar::hidden();
        let stats = import_with_progress(&db, &ChatGptAdapter, &chatgpt_export(), &bar)
            .await
            .unwrap();

        assert_eq!(stats.conversations, 1);
        assert_eq!(bar.position(), 1);
        assert!(bar.is_finished());
    }

    #[tokio::test]
    async fn test_read_export_reports_missing_input() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.json");
        assert!(matches!(
            read_export(&path).await,
            Err(Error::MissingInput(p)) if p == path
        ));
    }

    #[tokio::test]
    async fn test_cmd_import_fails_on_malformed_file() {
        let tmp = TempDir::new().unwrap();
        let claude_path = tmp.path().join("claude.json");
        std::fs::write(&claude_path, "[{").unwrap();

        let mut config = Config::default();
        config.import.claude_export = claude_path;
        config.import.chatgpt_export = tmp.path().join("missing.json");
        config.database.file = tmp.path().join("memory.db");

        let db = MemoryDb::open(&config.database.file).await.unwrap();
        let err = cmd_import(&config, &db).await.unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("claude.json")));
    }
}
