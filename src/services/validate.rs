use chrono::NaiveDate;

use crate::models::{Item, ItemType, MissingField, ParsedMessage, ValidatedRecord, Validation};
use crate::services::code::generate_code_on;
use crate::utils::{iso_date, non_blank, today};

pub const UNKNOWN_CUSTOMER: &str = "Unbekannt";
pub const NO_ADDRESS: &str = "—";

/// Checks a parsed message for the fields a complete item needs and fills in
/// defaults for everything else. `missing` is advisory: the record is always
/// usable.
pub fn validate(parsed: &ParsedMessage, existing: &[Item]) -> Validation {
    validate_on(parsed, existing, today())
}

pub fn validate_on(parsed: &ParsedMessage, existing: &[Item], today: NaiveDate) -> Validation {
    let missing = missing_fields(parsed);

    let item_type = parsed.item_type.unwrap_or(ItemType::Order);
    let order_date = non_blank(parsed.order_date.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| iso_date(today));

    let name_for_code = non_blank(parsed.customer_name.as_deref())
        .or_else(|| non_blank(parsed.billing_address.as_deref()))
        .or_else(|| non_blank(parsed.address.as_deref()))
        .unwrap_or("");
    let code = generate_code_on(item_type, name_for_code, Some(&order_date), existing, today);

    let text_or = |value: &Option<String>, fallback: &str| {
        non_blank(value.as_deref()).unwrap_or(fallback).to_string()
    };

    let validated = ValidatedRecord {
        item_type,
        customer_name: text_or(&parsed.customer_name, UNKNOWN_CUSTOMER),
        address: text_or(&parsed.address, NO_ADDRESS),
        contact_name: text_or(&parsed.contact_name, ""),
        billing_address: text_or(&parsed.billing_address, ""),
        billing_name: text_or(&parsed.billing_name, ""),
        phone: text_or(&parsed.phone, ""),
        notes: text_or(&parsed.notes, ""),
        order_date,
        code,
    };

    Validation {
        ok: missing.is_empty(),
        missing,
        validated,
    }
}

fn missing_fields(parsed: &ParsedMessage) -> Vec<MissingField> {
    let checks = [
        (parsed.item_type.is_some(), MissingField::Type),
        (non_blank(parsed.order_date.as_deref()).is_some(), MissingField::OrderDate),
        (non_blank(parsed.customer_name.as_deref()).is_some(), MissingField::CustomerName),
        (non_blank(parsed.address.as_deref()).is_some(), MissingField::Address),
        (non_blank(parsed.contact_name.as_deref()).is_some(), MissingField::ContactName),
        (non_blank(parsed.billing_address.as_deref()).is_some(), MissingField::BillingAddress),
    ];

    checks
        .into_iter()
        .filter_map(|(present, field)| (!present).then_some(field))
        .collect()
}
