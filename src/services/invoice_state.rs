//! Tri-state invoice progress per item, kept apart from the stored item
//! record.
//!
//! The first read for an item derives its state from
//! `status.invoice_written` (`paid` or `none`) and stores it; after that the
//! state only changes through [`InvoiceStateTracker::set`]. Stores are
//! mutex-guarded. Two callers toggling the same item race with last write
//! wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::db::Database;
use crate::models::{InvoiceState, Item};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invoice state store lock poisoned")]
    Lock,
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

pub trait InvoiceStateStore: Send + Sync {
    fn load(&self, item_id: &str) -> Result<Option<InvoiceState>, StoreError>;
    fn save(&self, item_id: &str, state: InvoiceState) -> Result<(), StoreError>;
}

/// Process-lifetime store. A restart forgets every toggle.
#[derive(Default)]
pub struct MemoryInvoiceStates {
    states: Mutex<HashMap<String, InvoiceState>>,
}

impl InvoiceStateStore for MemoryInvoiceStates {
    fn load(&self, item_id: &str) -> Result<Option<InvoiceState>, StoreError> {
        let states = self.states.lock().map_err(|_| StoreError::Lock)?;
        Ok(states.get(item_id).copied())
    }

    fn save(&self, item_id: &str, state: InvoiceState) -> Result<(), StoreError> {
        let mut states = self.states.lock().map_err(|_| StoreError::Lock)?;
        states.insert(item_id.to_string(), state);
        Ok(())
    }
}

/// Keeps toggles in the `invoice_states` table so they survive restarts.
pub struct SqliteInvoiceStates {
    db: Arc<Mutex<Database>>,
}

impl SqliteInvoiceStates {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        SqliteInvoiceStates { db }
    }
}

impl InvoiceStateStore for SqliteInvoiceStates {
    fn load(&self, item_id: &str) -> Result<Option<InvoiceState>, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Lock)?;
        Ok(db.get_invoice_state(item_id)?)
    }

    fn save(&self, item_id: &str, state: InvoiceState) -> Result<(), StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Lock)?;
        db.set_invoice_state(item_id, state)?;
        Ok(())
    }
}

pub fn default_state(item: &Item) -> InvoiceState {
    if item.status.invoice_written {
        InvoiceState::Paid
    } else {
        InvoiceState::None
    }
}

pub struct InvoiceStateTracker {
    store: Box<dyn InvoiceStateStore>,
}

impl InvoiceStateTracker {
    pub fn new(store: Box<dyn InvoiceStateStore>) -> Self {
        InvoiceStateTracker { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryInvoiceStates::default()))
    }

    /// Current state of `item`. Never fails: a store error is logged and the
    /// derived default is returned instead.
    pub fn get(&self, item: &Item) -> InvoiceState {
        match self.store.load(&item.id) {
            Ok(Some(state)) => state,
            Ok(None) => {
                let initial = default_state(item);
                if let Err(err) = self.store.save(&item.id, initial) {
                    warn!(item_id = %item.id, error = %err, "could not remember initial invoice state");
                }
                initial
            }
            Err(err) => {
                warn!(item_id = %item.id, error = %err, "invoice state lookup failed, using default");
                default_state(item)
            }
        }
    }

    pub fn set(&self, item_id: &str, state: InvoiceState) -> Result<(), StoreError> {
        self.store.save(item_id, state)
    }

    /// Advances the item's state by one step and stores it.
    pub fn toggle(&self, item: &Item) -> Result<InvoiceState, StoreError> {
        let next = self.get(item).cycle();
        self.set(&item.id, next)?;
        Ok(next)
    }
}
