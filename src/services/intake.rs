use anyhow::{anyhow, bail, Result};
use tracing::{info, warn};

use crate::db::Database;
use crate::models::{FileKind, ImportResult, Item, ItemFile, ItemStatus, LogEntry, LogSource, NewItem, Validation};
use crate::services::code::{assign_suffix, generate_code, stem_of};
use crate::services::message::{parse_message, parse_message_date};
use crate::services::validate::validate;
use crate::utils::{make_id, non_blank, now_rfc3339};

/// Parses a chat message, validates it and stores the resulting item. The
/// message itself is kept as the item's first log entry, in the same
/// transaction as the item.
pub fn import_message(db: &Database, text: &str) -> Result<ImportResult> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Message text is empty");
    }

    let parsed = parse_message(text);
    let validation = validate(&parsed, &[]);
    if !validation.ok {
        let missing: Vec<&str> = validation.missing.iter().map(|f| f.as_str()).collect();
        warn!(missing = ?missing, "message is missing fields, creating item anyway");
    }

    let item = db.in_transaction(|db| {
        let item = insert_with_free_suffix(db, item_from_validation(&validation))?;
        add_log(db, &item.id, text, LogSource::Whatsapp)?;
        Ok::<_, anyhow::Error>(item)
    })?;

    Ok(ImportResult {
        id: item.id,
        code: item.code,
        missing: validation.missing,
    })
}

/// Creates an item from structured fields.
///
/// Missing fields stay empty so the item shows up as incomplete. Without an
/// explicit code one is generated from the customer name and order date.
pub fn create_item_from_fields(db: &Database, fields: &NewItem) -> Result<Item> {
    let order_date = match fields.order_date.trim() {
        "" => String::new(),
        raw => parse_message_date(raw).ok_or_else(|| anyhow!("Invalid order date: {}", raw))?,
    };
    let customer_name = fields.customer_name.trim().to_string();
    let address = fields.address.trim().to_string();
    let data_complete = !customer_name.is_empty() && !address.is_empty() && !order_date.is_empty();

    let explicit_code = non_blank(fields.code.as_deref());
    let code = match explicit_code {
        Some(code) => code.to_string(),
        None => generate_code(fields.item_type, &customer_name, non_blank(Some(order_date.as_str())), &[]),
    };

    let now = now_rfc3339();
    let item = Item {
        id: make_id(fields.item_type.prefix()),
        code,
        item_type: fields.item_type,
        customer_name,
        contact_name: fields.contact_name.as_deref().and_then(optional),
        address,
        billing_address: fields.billing_address.as_deref().and_then(optional),
        order_date,
        created_at: now.clone(),
        updated_at: now,
        status: ItemStatus {
            data_complete,
            report_generated: false,
            invoice_written: false,
        },
    };

    db.in_transaction(|db| {
        if explicit_code.is_some() {
            insert_new(db, item)
        } else {
            insert_with_free_suffix(db, item)
        }
    })
}

fn item_from_validation(validation: &Validation) -> Item {
    let record = &validation.validated;
    let now = now_rfc3339();
    Item {
        id: make_id(record.item_type.prefix()),
        code: record.code.clone(),
        item_type: record.item_type,
        customer_name: record.customer_name.clone(),
        contact_name: optional(&record.contact_name),
        address: record.address.clone(),
        billing_address: optional(&record.billing_address),
        order_date: record.order_date.clone(),
        created_at: now.clone(),
        updated_at: now,
        status: ItemStatus {
            data_complete: validation.ok,
            report_generated: false,
            invoice_written: false,
        },
    }
}

// The suffix is fixed against the siblings stored at this moment and never
// changes afterwards. Callers hold a transaction so two writers cannot pick
// the same suffix.
fn insert_with_free_suffix(db: &Database, mut item: Item) -> Result<Item> {
    let stem = stem_of(&item.code).to_string();
    let siblings = db.items_with_stem(&stem)?;
    item.code = assign_suffix(&stem, siblings.iter().map(|s| s.code.as_str()));
    insert_new(db, item)
}

fn insert_new(db: &Database, item: Item) -> Result<Item> {
    db.insert_item(&item)?;
    info!(id = %item.id, code = %item.code, data_complete = item.status.data_complete, "item created");
    Ok(item)
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn require_item(db: &Database, item_id: &str) -> Result<Item> {
    db.get_item(item_id)?
        .ok_or_else(|| anyhow!("Item not found: {}", item_id))
}

/// Registers a file for an item. Storage of the bytes happens elsewhere; the
/// url is a placeholder path.
pub fn add_file(
    db: &Database,
    item_id: &str,
    kind: FileKind,
    filename: Option<&str>,
    size_bytes: i64,
) -> Result<ItemFile> {
    require_item(db, item_id)?;

    let id = make_id("F");
    let filename = filename
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.dat", id));
    let file = ItemFile {
        url: format!("/files/{}-{}", id, filename),
        id,
        item_id: item_id.to_string(),
        kind,
        filename,
        size_bytes: size_bytes.max(0),
        created_at: now_rfc3339(),
    };

    db.insert_file(&file)?;
    info!(item_id, kind = %kind, file_id = %file.id, "file added");
    Ok(file)
}

pub fn add_log(db: &Database, item_id: &str, text: &str, source: LogSource) -> Result<LogEntry> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Log text must not be empty");
    }
    require_item(db, item_id)?;

    let entry = LogEntry {
        id: make_id("L"),
        item_id: item_id.to_string(),
        time: now_rfc3339(),
        text: text.to_string(),
        source,
    };
    db.insert_log(&entry)?;
    Ok(entry)
}
