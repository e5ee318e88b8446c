use chrono::{DateTime, Local, NaiveDate, Utc};

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Reads the calendar date out of `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}

/// `<prefix>-<8 hex chars>`, e.g. `A-3f9c2b1e`.
pub fn make_id(prefix: &str) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &uuid[..8])
}

pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
