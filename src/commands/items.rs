use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use crate::models::{ImportResult, Item, ItemFilter, ItemType, ItemView, NewItem};
use crate::services::state::AppState;

/// Reads a chat message from `source` (`-` for stdin) and creates an item.
pub fn import_message(source: &str, state: &AppState) -> Result<ImportResult> {
    let text = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Read message from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(Path::new(source)).with_context(|| format!("Read message file {}", source))?
    };
    state.import_message(&text)
}

pub fn create_item(fields: &NewItem, state: &AppState) -> Result<Item> {
    state.create_item(fields)
}

/// Lists items, optionally only `auftrag` or `projekt` and only those
/// matching a search text.
pub fn get_items(latest: bool, item_type: Option<&str>, query: Option<&str>, state: &AppState) -> Result<Vec<ItemView>> {
    let filter = ItemFilter {
        item_type: item_type.map(str::parse::<ItemType>).transpose()?,
        query: query.map(str::to_string),
    };
    state.list_views(latest, &filter)
}

pub fn get_item_detail(item_id: &str, state: &AppState) -> Result<ItemView> {
    state.item_view(item_id)
}
