pub mod dashboard;
pub mod files;
pub mod invoices;
pub mod items;
pub mod settings;
