use anyhow::Result;

use crate::models::{FileKind, ItemFile, LogEntry};
use crate::services::state::AppState;

pub fn add_file(
    item_id: &str,
    kind: &str,
    filename: Option<&str>,
    size_bytes: i64,
    state: &AppState,
) -> Result<ItemFile> {
    let kind: FileKind = kind.parse()?;
    state.add_file(item_id, kind, filename, size_bytes)
}

pub fn add_log(item_id: &str, text: &str, state: &AppState) -> Result<LogEntry> {
    state.add_log(item_id, text)
}

pub fn get_logs(item_id: &str, state: &AppState) -> Result<Vec<LogEntry>> {
    state.logs(item_id)
}
