//! Traffic-light status of an item, derived live from its fields, its files
//! and the tracked invoice state.

use crate::models::{
    FileKind, InvoiceState, Item, ItemFile, ItemType, PillStyle, StatusColor, StatusSummary, TrafficLight,
};

const SEPARATOR: &str = " · ";

pub fn files_of_kind(files: &[ItemFile], kind: FileKind) -> Vec<&ItemFile> {
    files.iter().filter(|f| f.kind == kind).collect()
}

pub fn first_file_of_kind(files: &[ItemFile], kind: FileKind) -> Option<&ItemFile> {
    files.iter().find(|f| f.kind == kind)
}

pub fn has_file_of_kind(files: &[ItemFile], kind: FileKind) -> bool {
    files.iter().any(|f| f.kind == kind)
}

fn has_text(value: &str) -> bool {
    !value.trim().is_empty()
}

fn has_optional_text(value: Option<&str>) -> bool {
    value.map(has_text).unwrap_or(false)
}

/// Code, customer, address and a date are present.
///
/// The order date is the qualifying date; records stored before the order
/// date existed fall back to their creation timestamp.
pub fn has_base_data(item: &Item) -> bool {
    let has_date = has_text(&item.order_date) || has_text(&item.created_at);
    has_text(&item.code) && has_text(&item.customer_name) && has_text(&item.address) && has_date
}

/// Base data, plus a ticket file for orders.
pub fn base_ok(item: &Item, files: &[ItemFile]) -> bool {
    if !has_base_data(item) {
        return false;
    }
    match item.item_type {
        ItemType::Order => has_file_of_kind(files, FileKind::Ticket),
        ItemType::Project => true,
    }
}

/// Stricter master-data check that also wants billing address and contact.
/// Feeds the stored `data_complete` flag, never the traffic light.
pub fn is_data_complete(item: &Item) -> bool {
    has_text(&item.code)
        && has_text(&item.customer_name)
        && has_text(&item.address)
        && has_text(&item.order_date)
        && has_optional_text(item.billing_address.as_deref())
        && has_optional_text(item.contact_name.as_deref())
}

pub fn compute_status(item: &Item, files: &[ItemFile], invoice_state: InvoiceState) -> StatusSummary {
    let base = base_ok(item, files);
    let report = has_file_of_kind(files, FileKind::Report);
    let invoice = invoice_state.is_written();

    let mut parts = Vec::with_capacity(3);
    parts.push(if base { "Basisdaten vollständig" } else { "Basisdaten fehlen" });
    if item.item_type == ItemType::Project {
        parts.push(if report { "Bericht vorhanden" } else { "Bericht fehlt" });
    }
    parts.push(if invoice { "Rechnung geschrieben" } else { "Rechnung fehlt" });

    let traffic_light = match (base, item.item_type) {
        (false, _) => TrafficLight::Red,
        (true, ItemType::Project) if report && invoice => TrafficLight::Green,
        (true, ItemType::Order) if invoice => TrafficLight::Green,
        (true, _) => TrafficLight::Yellow,
    };

    StatusSummary {
        text: parts.join(SEPARATOR),
        traffic_light,
    }
}

/// Yellow is drawn as a diagonal split of the red and green colors.
pub fn pill_style(traffic_light: TrafficLight) -> PillStyle {
    match traffic_light {
        TrafficLight::Red => PillStyle::Solid {
            color: StatusColor::Alert,
        },
        TrafficLight::Green => PillStyle::Solid {
            color: StatusColor::Done,
        },
        TrafficLight::Yellow => PillStyle::DiagonalSplit {
            first: StatusColor::Alert,
            second: StatusColor::Done,
        },
    }
}
