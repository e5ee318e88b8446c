use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::models::DayOverview;
use crate::services::state::AppState;
use crate::utils::{iso_date, today};

/// Items ordered for `date` (default today) with their traffic lights.
pub fn get_day_overview(date: Option<&str>, state: &AppState) -> Result<DayOverview> {
    let date = match date {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid date {}, expected YYYY-MM-DD", raw))?,
        None => today(),
    };
    state.day_overview(&iso_date(date))
}
