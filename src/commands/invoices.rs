use anyhow::Result;
use serde::Serialize;

use crate::models::InvoiceState;
use crate::services::state::AppState;

#[derive(Serialize)]
pub struct InvoiceStateChange {
    pub item_id: String,
    pub invoice_state: InvoiceState,
}

/// Without `state` the invoice state advances one step, like the toggle in
/// the detail view.
pub fn update_invoice_state(item_id: &str, state: Option<&str>, app: &AppState) -> Result<InvoiceStateChange> {
    let invoice_state = match state {
        Some(raw) => app.set_invoice(item_id, raw.parse()?)?,
        None => app.cycle_invoice(item_id)?,
    };
    Ok(InvoiceStateChange {
        item_id: item_id.to_string(),
        invoice_state,
    })
}
