//! Line-oriented `Key: Value` parser for chat messages that announce a new
//! order or project.
//!
//! ```text
//! Typ: Auftrag
//! Datum: 23.01.25
//! AP: Frau Schmidt
//! Rechnungsadresse: Herr Tal, Talstraße 8, 35353 Tal
//! ```
//!
//! Lines that do not look like `Key: Value`, and keys that are not in the
//! synonym table, are skipped. Parsing never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::{ItemType, ParsedMessage};

static KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-zÄÖÜäöüß_ ]{1,30})\s*:\s*(.+)$").unwrap());
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());
static DOTTED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,2})\.([0-9]{1,2})\.([0-9]{4}|[0-9]{2})$").unwrap());
static SLASHED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,2})/([0-9]{1,2})/([0-9]{4}|[0-9]{2})$").unwrap());

enum Field {
    Type,
    OrderDate,
    CustomerName,
    ContactName,
    Address,
    BillingAddress,
    BillingName,
    Phone,
    Notes,
}

fn field_for_key(key: &str) -> Option<Field> {
    let field = match key {
        "typ" | "type" => Field::Type,
        "datum" | "order_date" | "auftragsdatum" => Field::OrderDate,
        "kunde" | "rechnungskunde" => Field::CustomerName,
        "ap" | "ansprechpartner" | "mieter" => Field::ContactName,
        "adresse" | "auftragsadresse" => Field::Address,
        "rechnungsadresse" => Field::BillingAddress,
        "rechnungsname" | "rechnungkunde" => Field::BillingName,
        "telefon" | "phone" => Field::Phone,
        "notiz" | "notes" => Field::Notes,
        _ => return None,
    };
    Some(field)
}

fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace('ä', "ae")
        .replace('ö', "oe")
        .replace('ü', "ue")
        .replace('ß', "ss")
}

fn parse_item_type(value: &str) -> Option<ItemType> {
    match value.chars().next()?.to_ascii_lowercase() {
        'a' => Some(ItemType::Order),
        'p' => Some(ItemType::Project),
        _ => None,
    }
}

/// Normalizes the accepted date spellings to `YYYY-MM-DD`. Two-digit years
/// are read as 20YY.
pub fn parse_message_date(value: &str) -> Option<String> {
    if ISO_DATE.is_match(value) {
        return Some(value.to_string());
    }

    let caps = DOTTED_DATE
        .captures(value)
        .or_else(|| SLASHED_DATE.captures(value))?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = match &caps[3] {
        short if short.len() == 2 => format!("20{}", short),
        long => long.to_string(),
    };
    Some(format!("{}-{:02}-{:02}", year, month, day))
}

pub fn parse_message(text: &str) -> ParsedMessage {
    let mut out = ParsedMessage::default();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = KEY_VALUE.captures(line) else {
            debug!(line, "skipping line without key");
            continue;
        };
        let key = normalize_key(&caps[1]);
        let value = caps[2].trim().to_string();

        let Some(field) = field_for_key(&key) else {
            debug!(key = %key, "skipping unknown key");
            continue;
        };

        match field {
            Field::Type => {
                if let Some(item_type) = parse_item_type(&value) {
                    out.item_type = Some(item_type);
                }
            }
            Field::OrderDate => {
                if let Some(date) = parse_message_date(&value) {
                    out.order_date = Some(date);
                }
            }
            Field::CustomerName => out.customer_name = Some(value),
            Field::ContactName => out.contact_name = Some(value),
            Field::Address => out.address = Some(value),
            Field::BillingAddress => out.billing_address = Some(value),
            Field::BillingName => out.billing_name = Some(value),
            Field::Phone => out.phone = Some(value),
            Field::Notes => out.notes = Some(value),
        }
    }

    derive_billing_name(&mut out);
    if out.customer_name.is_none() {
        out.customer_name = out.billing_name.clone();
    }

    out
}

/// `Rechnungsadresse: Herr Tal, Talstraße 8, 35353 Tal` carries the billing
/// name in its first segment. The segment only counts as a name if it has at
/// least two characters and no digits.
fn derive_billing_name(out: &mut ParsedMessage) {
    if out.billing_name.is_some() {
        return;
    }
    let Some(address) = out.billing_address.as_deref() else {
        return;
    };

    let parts: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let Some((first, rest)) = parts.split_first() else {
        return;
    };
    if rest.is_empty() || first.chars().count() < 2 || first.chars().any(|c| c.is_ascii_digit()) {
        return;
    }

    out.billing_name = Some(first.to_string());
    out.billing_address = Some(rest.join(", "));
}
