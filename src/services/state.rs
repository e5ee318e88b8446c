use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::Database;
use crate::models::{
    DayOverview, FileKind, ImportResult, InvoiceState, Item, ItemFile, ItemFilter, ItemView, LogEntry, LogSource,
    NewItem, Settings, TrafficLight,
};
use crate::services::code::{display_code, stem_of};
use crate::services::intake;
use crate::services::invoice_state::{InvoiceStateTracker, SqliteInvoiceStates};
use crate::services::status::{compute_status, is_data_complete, pill_style};
use crate::utils::non_blank;

pub const DEFAULT_LATEST_LIMIT: usize = 20;

pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub settings: Settings,
    invoices: InvoiceStateTracker,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let db = Arc::new(Mutex::new(db));
        let invoices = if settings.persist_invoice_state {
            InvoiceStateTracker::new(Box::new(SqliteInvoiceStates::new(db.clone())))
        } else {
            InvoiceStateTracker::in_memory()
        };
        AppState { db, settings, invoices }
    }

    fn lock_db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| anyhow!("DB lock poisoned"))
    }

    pub fn import_message(&self, text: &str) -> Result<ImportResult> {
        let db = self.lock_db()?;
        intake::import_message(&db, text)
    }

    pub fn create_item(&self, fields: &NewItem) -> Result<Item> {
        let db = self.lock_db()?;
        intake::create_item_from_fields(&db, fields)
    }

    pub fn add_file(&self, item_id: &str, kind: FileKind, filename: Option<&str>, size_bytes: i64) -> Result<ItemFile> {
        let db = self.lock_db()?;
        intake::add_file(&db, item_id, kind, filename, size_bytes)
    }

    pub fn add_log(&self, item_id: &str, text: &str) -> Result<LogEntry> {
        let db = self.lock_db()?;
        intake::add_log(&db, item_id, text, LogSource::Manual)
    }

    pub fn logs(&self, item_id: &str) -> Result<Vec<LogEntry>> {
        let db = self.lock_db()?;
        Ok(db.logs_of_item(item_id)?)
    }

    pub fn item_view(&self, item_id: &str) -> Result<ItemView> {
        // The SQLite invoice store takes the same lock, so release it before
        // asking the tracker.
        let (item, files, siblings) = {
            let db = self.lock_db()?;
            let item = db
                .get_item(item_id)?
                .ok_or_else(|| anyhow!("Item not found: {}", item_id))?;
            let files = db.files_of_item(item_id)?;
            let siblings = db.items_with_stem(stem_of(&item.code))?;
            (item, files, siblings)
        };
        Ok(self.build_view(item, files, &siblings))
    }

    /// Items matching `filter`, newest first. With `latest_only` the result
    /// is cut to `settings.latest_limit`.
    pub fn list_views(&self, latest_only: bool, filter: &ItemFilter) -> Result<Vec<ItemView>> {
        let limit = if latest_only {
            self.settings.latest_limit
        } else {
            usize::MAX
        };

        let (all, shown, files) = {
            let db = self.lock_db()?;
            let all = db.list_items()?;
            let shown: Vec<Item> = all
                .iter()
                .filter(|item| filter.item_type.map_or(true, |t| item.item_type == t))
                .filter(|item| matches_query(item, &all, filter.query.as_deref()))
                .take(limit)
                .cloned()
                .collect();
            let files = shown
                .iter()
                .map(|item| db.files_of_item(&item.id))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            (all, shown, files)
        };

        Ok(shown
            .into_iter()
            .zip(files)
            .map(|(item, files)| self.build_view(item, files, &all))
            .collect())
    }

    /// Items ordered for `date` (`YYYY-MM-DD`), with a count per traffic light.
    pub fn day_overview(&self, date: &str) -> Result<DayOverview> {
        let items: Vec<ItemView> = self
            .list_views(false, &ItemFilter::default())?
            .into_iter()
            .filter(|view| view.item.order_date == date)
            .collect();

        let count = |light: TrafficLight| {
            items
                .iter()
                .filter(|view| view.status.traffic_light == light)
                .count()
        };

        Ok(DayOverview {
            date: date.to_string(),
            red: count(TrafficLight::Red),
            yellow: count(TrafficLight::Yellow),
            green: count(TrafficLight::Green),
            items,
        })
    }

    pub fn invoice_state(&self, item: &Item) -> InvoiceState {
        self.invoices.get(item)
    }

    pub fn cycle_invoice(&self, item_id: &str) -> Result<InvoiceState> {
        let item = self.require_item(item_id)?;
        Ok(self.invoices.toggle(&item)?)
    }

    pub fn set_invoice(&self, item_id: &str, state: InvoiceState) -> Result<InvoiceState> {
        let item = self.require_item(item_id)?;
        self.invoices.set(&item.id, state)?;
        Ok(state)
    }

    fn require_item(&self, item_id: &str) -> Result<Item> {
        let db = self.lock_db()?;
        db.get_item(item_id)?
            .ok_or_else(|| anyhow!("Item not found: {}", item_id))
    }

    fn build_view(&self, item: Item, files: Vec<ItemFile>, all: &[Item]) -> ItemView {
        let invoice_state = self.invoices.get(&item);
        let status = compute_status(&item, &files, invoice_state);
        ItemView {
            display_code: display_code(&item, all),
            pill: pill_style(status.traffic_light),
            data_complete: is_data_complete(&item),
            status,
            invoice_state,
            files,
            item,
        }
    }
}

/// Reads settings from the `settings` table, with defaults for missing or
/// unreadable values.
pub fn load_settings(db: &Database) -> Settings {
    let persist_invoice_state = db
        .get_setting("persist_invoice_state")
        .ok()
        .flatten()
        .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
        .unwrap_or(true);
    let latest_limit = db
        .get_setting("latest_limit")
        .ok()
        .flatten()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LATEST_LIMIT);

    Settings {
        persist_invoice_state,
        latest_limit,
    }
}

/// Case-insensitive substring search over code, shown code, customer,
/// address, contact and order date. A blank query matches everything.
pub fn matches_query(item: &Item, all: &[Item], query: Option<&str>) -> bool {
    let Some(needle) = non_blank(query).map(str::to_lowercase) else {
        return true;
    };

    let shown_code = display_code(item, all);
    [
        item.code.as_str(),
        shown_code.as_str(),
        item.customer_name.as_str(),
        item.address.as_str(),
        item.contact_name.as_deref().unwrap_or(""),
        item.order_date.as_str(),
    ]
    .iter()
    .any(|haystack| haystack.to_lowercase().contains(&needle))
}
