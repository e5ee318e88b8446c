//! Human-readable item codes: `{A|P}-{NAME}-{DDMMYY}` with an optional
//! `-NN` suffix when several items share the same stem.
//!
//! Suffixes are assigned once, when an item is created, and stored with the
//! code. The first item of a stem keeps the bare stem and is shown as `-01`
//! as soon as a sibling exists; every later sibling gets the next free
//! number. Display never re-sorts a group, so codes do not shift when items
//! are created out of date order.

use chrono::NaiveDate;

use crate::models::{Item, ItemType};
use crate::utils::{parse_calendar_date, today};

pub const UNKNOWN_NAME: &str = "UNBEKANNT";
const MAX_NAME_LEN: usize = 12;

// Longest first, so " kg" never shadows " gmbh & co kg".
const LEGAL_SUFFIXES: [&str; 12] = [
    " gmbh & co. kg",
    " gmbh & co kg",
    " gmbh",
    " e.k.",
    " e.v.",
    " ohg",
    " e.k",
    " gbr",
    " ug",
    " ag",
    " kg",
    " ev",
];

/// Shortens a customer or company name to the token used in codes.
///
/// Personal names (`Herr Meier`) keep the surname, company names keep their
/// first word once the legal form is stripped (`BASF Industrie GmbH` ->
/// `BASF`).
pub fn normalize_name_for_code(raw: &str) -> String {
    let mut name = raw.trim();
    if let Some(idx) = name.find(',') {
        name = &name[..idx];
    }

    let mut is_company = false;
    for suffix in LEGAL_SUFFIXES {
        if let Some(stripped) = strip_suffix_ignore_case(name, suffix) {
            name = stripped;
            is_company = true;
            break;
        }
    }

    let tokens: Vec<&str> = name.split_whitespace().collect();
    let token = match tokens.as_slice() {
        [] => "",
        [_, last] if !is_company => *last,
        [first, ..] => *first,
    };

    let mut code = String::with_capacity(token.len());
    for c in transliterate(token).to_uppercase().chars() {
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            code.push(c);
        } else if !code.ends_with('-') {
            code.push('-');
        }
    }

    let trimmed = code.trim_matches('-');
    if trimmed.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        trimmed.chars().take(MAX_NAME_LEN).collect()
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(cut) {
        return None;
    }
    s[cut..].eq_ignore_ascii_case(suffix).then(|| &s[..cut])
}

fn transliterate(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'ä' | 'Ä' => out.push_str("ae"),
            'ö' | 'Ö' => out.push_str("oe"),
            'ü' | 'Ü' => out.push_str("ue"),
            'ß' | 'ẞ' => out.push_str("ss"),
            _ => out.push(c),
        }
    }
    out
}

/// `DDMMYY` of the order date, or of `fallback` when the date is missing or
/// unreadable.
pub fn date_part(order_date: Option<&str>, fallback: NaiveDate) -> String {
    order_date
        .and_then(parse_calendar_date)
        .unwrap_or(fallback)
        .format("%d%m%y")
        .to_string()
}

pub fn code_stem(item_type: ItemType, raw_name: &str, order_date: Option<&str>, fallback: NaiveDate) -> String {
    format!(
        "{}-{}-{}",
        item_type.prefix(),
        normalize_name_for_code(raw_name),
        date_part(order_date, fallback)
    )
}

/// Splits a stored code into its stem and the numeric suffix, if any.
///
/// A suffix (two or more digits) is only recognised directly after the
/// six-digit date group of a `{prefix}-{name}-{date}` stem, so names made of
/// digits are not mistaken for one.
pub fn split_code(code: &str) -> (&str, Option<u32>) {
    let Some((head, last)) = code.rsplit_once('-') else {
        return (code, None);
    };
    let is_suffix = last.len() >= 2 && last.bytes().all(|b| b.is_ascii_digit());
    let date_before = head
        .rsplit_once('-')
        .map(|(rest, date)| {
            rest.contains('-') && date.len() == 6 && date.bytes().all(|b| b.is_ascii_digit())
        })
        .unwrap_or(false);

    if is_suffix && date_before {
        match last.parse::<u32>() {
            Ok(n) => (head, Some(n)),
            Err(_) => (code, None),
        }
    } else {
        (code, None)
    }
}

pub fn stem_of(code: &str) -> &str {
    split_code(code).0
}

pub fn format_suffix(n: u32) -> String {
    format!("{:02}", n)
}

/// Code for a new item, disambiguated against the items that already exist.
pub fn generate_code(item_type: ItemType, raw_name: &str, order_date: Option<&str>, existing: &[Item]) -> String {
    generate_code_on(item_type, raw_name, order_date, existing, today())
}

pub fn generate_code_on(
    item_type: ItemType,
    raw_name: &str,
    order_date: Option<&str>,
    existing: &[Item],
    today: NaiveDate,
) -> String {
    let stem = code_stem(item_type, raw_name, order_date, today);
    assign_suffix(&stem, existing.iter().map(|item| item.code.as_str()))
}

/// Appends the next free suffix to `stem`, or returns it bare when no code in
/// `existing` shares it. A bare sibling counts as number 1.
pub fn assign_suffix<'a>(stem: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|code| {
            let (s, suffix) = split_code(code);
            (s == stem).then(|| suffix.unwrap_or(1))
        })
        .max();

    match highest {
        None => stem.to_string(),
        Some(n) => format!("{}-{}", stem, format_suffix(n + 1)),
    }
}

/// Code shown for `item` among `all` items.
///
/// An item alone in its stem group is shown with the bare stem, even if its
/// stored code carries a suffix (its siblings were removed).
pub fn display_code(item: &Item, all: &[Item]) -> String {
    let (stem, suffix) = split_code(&item.code);
    let siblings = all
        .iter()
        .filter(|other| other.id != item.id && stem_of(&other.code) == stem)
        .count();

    if siblings == 0 {
        stem.to_string()
    } else {
        format!("{}-{}", stem, format_suffix(suffix.unwrap_or(1)))
    }
}
