//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use logiflow_entity::order::Order;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One order as a table row.
#[derive(Debug, Serialize, Tabled)]
pub struct OrderRow {
    /// Order id
    #[tabled(rename = "ID")]
    pub id: i64,
    /// Status
    #[tabled(rename = "Estado")]
    pub estado: String,
    /// Client
    #[tabled(rename = "Cliente")]
    pub cliente: i64,
    /// Courier
    #[tabled(rename = "Repartidor")]
    pub repartidor: String,
    /// Fee
    #[tabled(rename = "Tarifa")]
    pub tarifa: String,
    /// Address
    #[tabled(rename = "Dirección")]
    pub direccion: String,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            estado: order.status.to_string(),
            cliente: order.customer_id,
            repartidor: order
                .courier_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            tarifa: format!("{:.2}", order.fee),
            direccion: order.delivery_address.clone(),
        }
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize>(item: &T, format: OutputFormat) {
    if format == OutputFormat::Table {
        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(item) {
            for (key, value) in &fields {
                print_kv(key, &plain(value));
            }
            return;
        }
    }
    let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
    println!("{json}");
}

fn plain(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}
