use anyhow::{anyhow, bail, Result};
use serde::Serialize;

use crate::services::state::AppState;

const KNOWN_KEYS: [&str; 2] = ["persist_invoice_state", "latest_limit"];

#[derive(Serialize)]
pub struct SettingValue {
    pub key: String,
    pub value: Option<String>,
}

pub fn get_setting(key: &str, state: &AppState) -> Result<SettingValue> {
    let db = state.db.lock().map_err(|_| anyhow!("DB lock"))?;
    Ok(SettingValue {
        key: key.to_string(),
        value: db.get_setting(key)?,
    })
}

pub fn save_setting(key: &str, value: &str, state: &AppState) -> Result<SettingValue> {
    if !KNOWN_KEYS.contains(&key) {
        bail!("Unknown setting: {} (known: {})", key, KNOWN_KEYS.join(", "));
    }
    let db = state.db.lock().map_err(|_| anyhow!("DB lock"))?;
    db.set_setting(key, value.trim())?;
    Ok(SettingValue {
        key: key.to_string(),
        value: Some(value.trim().to_string()),
    })
}
