pub mod code;
pub mod intake;
pub mod invoice_state;
pub mod message;
pub mod state;
pub mod status;
pub mod validate;
