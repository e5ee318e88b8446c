//! Order and project tracking for a small field-service team: readable item
//! codes, traffic-light status, invoice progress and intake of items from
//! chat messages.

pub mod commands;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

pub use services::code::{display_code, generate_code};
pub use services::invoice_state::{InvoiceStateStore, InvoiceStateTracker};
pub use services::message::parse_message;
pub use services::status::{compute_status, pill_style};
pub use services::validate::validate;
