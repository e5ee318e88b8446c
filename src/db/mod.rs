use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row, Transaction, TransactionBehavior};
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::{InvoiceState, Item, ItemFile, ItemStatus, LogEntry};
use crate::services::code::stem_of;

const ITEM_COLUMNS: &str = "id, type, code, customer_name, contact_name, address, billing_address,
    order_date, created_at, updated_at, status_data_complete, status_report_generated,
    status_invoice_written";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: PathBuf) -> SqlResult<Self> {
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> SqlResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SqlResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&mut self) -> SqlResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = vec![
            (
                "001_create_items.sql",
                include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations/001_create_items.sql")),
            ),
            (
                "002_create_files_and_logs.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/002_create_files_and_logs.sql"
                )),
            ),
            (
                "003_create_settings_and_invoice_states.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/003_create_settings_and_invoice_states.sql"
                )),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }

    /// Runs `f` inside one immediate transaction. Everything `f` wrote is
    /// rolled back when it returns an error.
    pub fn in_transaction<T, E>(&self, f: impl FnOnce(&Database) -> Result<T, E>) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn insert_item(&self, item: &Item) -> SqlResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                ITEM_COLUMNS
            ),
            params![
                item.id,
                item.item_type.as_str(),
                item.code,
                item.customer_name,
                item.contact_name,
                item.address,
                item.billing_address,
                Some(item.order_date.as_str()).filter(|d| !d.is_empty()),
                item.created_at,
                item.updated_at,
                item.status.data_complete,
                item.status.report_generated,
                item.status.invoice_written
            ],
        )?;
        Ok(())
    }

    pub fn get_item(&self, id: &str) -> SqlResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS))?;
        stmt.query_row(params![id], map_item).optional()
    }

    /// Newest first.
    pub fn list_items(&self) -> SqlResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM items ORDER BY created_at DESC",
            ITEM_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_item)?;
        rows.collect()
    }

    /// Items whose code, without any `-NN` suffix, equals `stem`.
    pub fn items_with_stem(&self, stem: &str) -> SqlResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM items WHERE code = ?1 OR code LIKE ?1 || '-%' ORDER BY created_at",
            ITEM_COLUMNS
        ))?;
        let rows = stmt.query_map(params![stem], map_item)?;
        let items = rows.collect::<SqlResult<Vec<_>>>()?;
        Ok(items
            .into_iter()
            .filter(|item| stem_of(&item.code) == stem)
            .collect())
    }

    pub fn insert_file(&self, file: &ItemFile) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO files (id, item_id, kind, filename, url, size_bytes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                file.id,
                file.item_id,
                file.kind.as_str(),
                file.filename,
                file.url,
                file.size_bytes,
                file.created_at
            ],
        )?;
        Ok(())
    }

    pub fn files_of_item(&self, item_id: &str) -> SqlResult<Vec<ItemFile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, item_id, kind, filename, url, size_bytes, created_at
             FROM files WHERE item_id = ?1 ORDER BY created_at",
        )?;

        let rows = stmt.query_map(params![item_id], |row| {
            Ok(ItemFile {
                id: row.get(0)?,
                item_id: row.get(1)?,
                kind: parse_column(row, 2)?,
                filename: row.get(3)?,
                url: row.get(4)?,
                size_bytes: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        rows.collect()
    }

    pub fn insert_log(&self, entry: &LogEntry) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO logs (id, item_id, time, text, source) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.id, entry.item_id, entry.time, entry.text, entry.source.as_str()],
        )?;
        Ok(())
    }

    pub fn logs_of_item(&self, item_id: &str) -> SqlResult<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, item_id, time, text, source FROM logs WHERE item_id = ?1 ORDER BY time",
        )?;

        let rows = stmt.query_map(params![item_id], |row| {
            Ok(LogEntry {
                id: row.get(0)?,
                item_id: row.get(1)?,
                time: row.get(2)?,
                text: row.get(3)?,
                source: parse_column(row, 4)?,
            })
        })?;

        rows.collect()
    }

    pub fn set_setting(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> SqlResult<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        stmt.query_row(params![key], |row| row.get(0)).optional()
    }

    pub fn get_invoice_state(&self, item_id: &str) -> SqlResult<Option<InvoiceState>> {
        let mut stmt = self
            .conn
            .prepare("SELECT state FROM invoice_states WHERE item_id = ?1")?;
        stmt.query_row(params![item_id], |row| parse_column(row, 0))
            .optional()
    }

    pub fn set_invoice_state(&self, item_id: &str, state: InvoiceState) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO invoice_states (item_id, state, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![item_id, state.as_str()],
        )?;
        Ok(())
    }
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> SqlResult<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_item(row: &Row<'_>) -> SqlResult<Item> {
    let order_date: Option<String> = row.get(7)?;
    Ok(Item {
        id: row.get(0)?,
        item_type: parse_column(row, 1)?,
        code: row.get(2)?,
        customer_name: row.get(3)?,
        contact_name: row.get(4)?,
        address: row.get(5)?,
        billing_address: row.get(6)?,
        order_date: order_date.unwrap_or_default(),
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        status: ItemStatus {
            data_complete: row.get(10)?,
            report_generated: row.get(11)?,
            invoice_written: row.get(12)?,
        },
    })
}
