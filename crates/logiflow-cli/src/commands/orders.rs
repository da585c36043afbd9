//! Order commands.

use clap::{Args, Subcommand};

use logiflow_core::error::AppError;
use logiflow_entity::order::{NewOrder, Order};

use super::Context;
use crate::output::{self, OrderRow, OutputFormat};

/// Arguments for order commands
#[derive(Debug, Args)]
pub struct OrdersArgs {
    /// Order subcommand
    #[command(subcommand)]
    pub command: OrdersCommand,
}

/// Order subcommands
#[derive(Debug, Subcommand)]
pub enum OrdersCommand {
    /// List orders visible to the signed-in user
    List {
        /// Only orders in this status (e.g. EN_CAMINO)
        #[arg(short, long)]
        estado: Option<String>,
        /// Skip the query cache
        #[arg(long)]
        fresh: bool,
    },
    /// Create a pending order for the signed-in client
    Create {
        /// Delivery address
        #[arg(short, long)]
        direccion: String,
        /// Delivery fee
        #[arg(short, long, default_value_t = 15.0)]
        tarifa: f64,
    },
}

/// Execute order commands
pub async fn execute(args: &OrdersArgs, ctx: &Context, format: OutputFormat) -> Result<(), AppError> {
    let user = ctx.require_user()?;
    let client = ctx.orders()?;

    match &args.command {
        OrdersCommand::List { estado, fresh } => {
            let fetched = if *fresh {
                client.fetch().await?
            } else {
                client.list().await?
            };
            if fetched.is_demo() {
                output::print_warning("Order service unavailable, showing demo data");
            }
            let rows: Vec<OrderRow> = fetched
                .data
                .iter()
                .filter(|order| matches_status(order, estado.as_deref()))
                .map(OrderRow::from)
                .collect();
            output::print_list(&rows, format);
        }
        OrdersCommand::Create { direccion, tarifa } => {
            let customer_id = user.cedula.parse::<i64>().unwrap_or_default();
            let created = client
                .create(&NewOrder::pending(customer_id, direccion.clone(), *tarifa))
                .await?;
            if created.is_demo() {
                output::print_warning("Order service unavailable, order kept locally");
            }
            output::print_success(&format!("Order #{} created", created.data.id));
            output::print_item(&created.data, format);
        }
    }

    Ok(())
}

fn matches_status(order: &Order, estado: Option<&str>) -> bool {
    estado.is_none_or(|wanted| order.status.as_str().eq_ignore_ascii_case(wanted))
}
