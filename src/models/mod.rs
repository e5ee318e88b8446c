use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "auftrag", alias = "order")]
    Order,
    #[serde(rename = "projekt", alias = "project")]
    Project,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Order => "auftrag",
            ItemType::Project => "projekt",
        }
    }

    /// Single-letter prefix used in codes and ids.
    pub fn prefix(&self) -> &'static str {
        match self {
            ItemType::Order => "A",
            ItemType::Project => "P",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auftrag" | "order" => Ok(ItemType::Order),
            "projekt" | "project" => Ok(ItemType::Project),
            _ => Err(UnknownVariant::new("item type", s)),
        }
    }
}

/// Flags written when an item is created or updated. They are a snapshot and
/// are not kept in sync with files or the invoice tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatus {
    pub data_complete: bool,
    pub report_generated: bool,
    pub invoice_written: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub code: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub customer_name: String,
    pub contact_name: Option<String>,
    pub address: String,
    pub billing_address: Option<String>,
    pub order_date: String,
    pub created_at: String,
    pub updated_at: String,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Ticket,
    Report,
    Logdata,
    Picture,
    Video,
    Other,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Ticket => "ticket",
            FileKind::Report => "report",
            FileKind::Logdata => "logdata",
            FileKind::Picture => "picture",
            FileKind::Video => "video",
            FileKind::Other => "other",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ticket" => Ok(FileKind::Ticket),
            "report" => Ok(FileKind::Report),
            "logdata" => Ok(FileKind::Logdata),
            "picture" => Ok(FileKind::Picture),
            "video" => Ok(FileKind::Video),
            "other" => Ok(FileKind::Other),
            _ => Err(UnknownVariant::new("file kind", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFile {
    pub id: String,
    pub item_id: String,
    pub kind: FileKind,
    pub filename: String,
    pub url: String,
    pub size_bytes: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Manual,
    Whatsapp,
    System,
}

impl LogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Manual => "manual",
            LogSource::Whatsapp => "whatsapp",
            LogSource::System => "system",
        }
    }
}

impl FromStr for LogSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(LogSource::Manual),
            "whatsapp" => Ok(LogSource::Whatsapp),
            "system" => Ok(LogSource::System),
            _ => Err(UnknownVariant::new("log source", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub item_id: String,
    pub time: String,
    pub text: String,
    pub source: LogSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceState {
    None,
    Invoice,
    Paid,
}

impl InvoiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceState::None => "none",
            InvoiceState::Invoice => "invoice",
            InvoiceState::Paid => "paid",
        }
    }

    /// One step forward: none -> invoice -> paid -> none.
    pub fn cycle(self) -> InvoiceState {
        match self {
            InvoiceState::None => InvoiceState::Invoice,
            InvoiceState::Invoice => InvoiceState::Paid,
            InvoiceState::Paid => InvoiceState::None,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, InvoiceState::Invoice | InvoiceState::Paid)
    }
}

impl FromStr for InvoiceState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(InvoiceState::None),
            "invoice" => Ok(InvoiceState::Invoice),
            "paid" => Ok(InvoiceState::Paid),
            _ => Err(UnknownVariant::new("invoice state", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLight {
    Red,
    Yellow,
    Green,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub text: String,
    pub traffic_light: TrafficLight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Alert,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum PillStyle {
    Solid { color: StatusColor },
    DiagonalSplit { first: StatusColor, second: StatusColor },
}

/// Structured input for creating an item by hand. Empty fields are allowed
/// and simply leave the item incomplete; a non-blank `code` is used as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub customer_name: String,
    pub address: String,
    pub order_date: String,
    pub contact_name: Option<String>,
    pub billing_address: Option<String>,
    pub code: Option<String>,
}

/// Narrows an item listing by type and by a case-insensitive search text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub item_type: Option<ItemType>,
    pub query: Option<String>,
}

/// Fields recognised in a free-text message. Everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub order_date: Option<String>,
    pub customer_name: Option<String>,
    pub contact_name: Option<String>,
    pub address: Option<String>,
    pub billing_name: Option<String>,
    pub billing_address: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    Type,
    OrderDate,
    CustomerName,
    Address,
    ContactName,
    BillingAddress,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingField::Type => "type",
            MissingField::OrderDate => "order_date",
            MissingField::CustomerName => "customer_name",
            MissingField::Address => "address",
            MissingField::ContactName => "contact_name",
            MissingField::BillingAddress => "billing_address",
        }
    }
}

/// A parsed message with every field defaulted and a code assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub order_date: String,
    pub customer_name: String,
    pub address: String,
    pub contact_name: String,
    pub billing_address: String,
    pub billing_name: String,
    pub phone: String,
    pub notes: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub ok: bool,
    pub missing: Vec<MissingField>,
    pub validated: ValidatedRecord,
}

/// Everything a view needs to render one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemView {
    pub item: Item,
    pub display_code: String,
    pub status: StatusSummary,
    pub pill: PillStyle,
    pub invoice_state: InvoiceState,
    pub data_complete: bool,
    pub files: Vec<ItemFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayOverview {
    pub date: String,
    pub red: usize,
    pub yellow: usize,
    pub green: usize,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub id: String,
    pub code: String,
    pub missing: Vec<MissingField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub persist_invoice_state: bool,
    pub latest_limit: usize,
}
