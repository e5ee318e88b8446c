use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use werkbuch::commands;
use werkbuch::db::Database;
use werkbuch::models::NewItem;
use werkbuch::services::state::{load_settings, AppState};

#[derive(Parser)]
#[command(name = "werkbuch", version, about = "Orders, projects and their completion status")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "WERKBUCH_DB", default_value = "werkbuch.sqlite")]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an item from a chat message file (`-` reads stdin)
    Import { source: String },
    /// Create an item from fields; missing ones leave it incomplete
    New {
        /// auftrag or projekt
        #[arg(value_name = "TYPE")]
        item_type: String,
        #[arg(long, default_value = "")]
        customer: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        date: String,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        billing_address: Option<String>,
        /// Use this code instead of generating one
        #[arg(long)]
        code: Option<String>,
    },
    /// List items, newest first
    List {
        #[arg(long)]
        latest: bool,
        /// Only auftrag or projekt
        #[arg(long = "type", value_name = "TYPE")]
        item_type: Option<String>,
        /// Search code, customer, address, contact and date
        #[arg(long)]
        query: Option<String>,
    },
    /// Show one item with files, status and invoice state
    Show { id: String },
    /// Items ordered for a day (default today)
    Today { date: Option<String> },
    /// Register a file for an item
    AddFile {
        id: String,
        kind: String,
        filename: Option<String>,
        #[arg(long, default_value_t = 0)]
        size: i64,
    },
    /// Add a manual log entry
    AddLog { id: String, text: String },
    /// Log entries of an item
    Logs { id: String },
    /// Advance the invoice state, or set it with --set none|invoice|paid
    Invoice {
        id: String,
        #[arg(long)]
        set: Option<String>,
    },
    /// Read or write a setting
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Get { key: String },
    Set { key: String, value: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("WERKBUCH_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = Database::new(PathBuf::from(&cli.db)).with_context(|| format!("Open database {}", cli.db))?;
    let settings = load_settings(&db);
    let state = AppState::new(db, settings);

    match cli.command {
        Command::Import { source } => print_json(&commands::items::import_message(&source, &state)?),
        Command::New {
            item_type,
            customer,
            address,
            date,
            contact,
            billing_address,
            code,
        } => {
            let fields = NewItem {
                item_type: item_type.parse()?,
                customer_name: customer,
                address,
                order_date: date,
                contact_name: contact,
                billing_address,
                code,
            };
            print_json(&commands::items::create_item(&fields, &state)?)
        }
        Command::List {
            latest,
            item_type,
            query,
        } => print_json(&commands::items::get_items(
            latest,
            item_type.as_deref(),
            query.as_deref(),
            &state,
        )?),
        Command::Show { id } => print_json(&commands::items::get_item_detail(&id, &state)?),
        Command::Today { date } => print_json(&commands::dashboard::get_day_overview(date.as_deref(), &state)?),
        Command::AddFile {
            id,
            kind,
            filename,
            size,
        } => print_json(&commands::files::add_file(
            &id,
            &kind,
            filename.as_deref(),
            size,
            &state,
        )?),
        Command::AddLog { id, text } => print_json(&commands::files::add_log(&id, &text, &state)?),
        Command::Logs { id } => print_json(&commands::files::get_logs(&id, &state)?),
        Command::Invoice { id, set } => {
            print_json(&commands::invoices::update_invoice_state(&id, set.as_deref(), &state)?)
        }
        Command::Config { action } => match action {
            ConfigAction::Get { key } => print_json(&commands::settings::get_setting(&key, &state)?),
            ConfigAction::Set { key, value } => print_json(&commands::settings::save_setting(&key, &value, &state)?),
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
