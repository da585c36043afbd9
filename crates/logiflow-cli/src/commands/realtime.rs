//! Realtime commands: watch, delivery actions, ping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use tokio::sync::mpsc;

use logiflow_core::error::AppError;
use logiflow_entity::user::UserRole;
use logiflow_realtime::topics::{ORDERS_TOPIC, PONG_TOPIC, TRACKING_TOPIC, order_topic};
use logiflow_realtime::{ChannelError, ChannelEvents, Message, NoopEvents};

use super::Context;
use crate::output;

/// Time to wait for `/topic/pong`.
const PONG_TIMEOUT: Duration = Duration::from_secs(5);

/// Arguments for `watch`
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Topics to follow (default: orders and tracking)
    #[arg(short, long)]
    pub topic: Vec<String>,
    /// Follow a single order instead
    #[arg(long, conflicts_with = "topic")]
    pub order: Option<i64>,
    /// Stop after this many seconds (default: until Ctrl-C)
    #[arg(long)]
    pub seconds: Option<u64>,
}

/// Arguments for delivery commands
#[derive(Debug, Args)]
pub struct DeliveryArgs {
    /// Delivery subcommand
    #[command(subcommand)]
    pub command: DeliveryCommand,
}

/// Delivery subcommands
#[derive(Debug, Subcommand)]
pub enum DeliveryCommand {
    /// Start delivering an order
    Start {
        /// Order id
        pedido_id: i64,
    },
    /// Confirm an order was delivered
    Confirm {
        /// Order id
        pedido_id: i64,
        /// Photo reference of the delivery
        #[arg(long)]
        foto: String,
    },
}

/// Prints channel lifecycle and configured-topic messages.
#[derive(Debug)]
struct Printer;

impl ChannelEvents for Printer {
    fn on_connect(&self) {
        output::print_success("Connected");
    }

    fn on_disconnect(&self) {
        output::print_warning("Disconnected, reconnecting");
    }

    fn on_error(&self, error: &ChannelError) {
        output::print_error(&error.to_string());
    }

    fn on_message(&self, topic: &str, message: &Message) {
        println!(
            "[{}] {} {} {}",
            message.timestamp, topic, message.message_type, message.payload
        );
    }
}

/// `watch`
pub async fn watch(args: &WatchArgs, ctx: &Context) -> Result<(), AppError> {
    ctx.require_user()?;
    let topics = match (args.order, args.topic.is_empty()) {
        (Some(id), _) => vec![order_topic(id)],
        (None, true) => vec![ORDERS_TOPIC.to_string(), TRACKING_TOPIC.to_string()],
        (None, false) => args.topic.clone(),
    };

    let channel = ctx.channel(topics.clone(), Arc::new(Printer));
    channel.connect()?;
    output::print_kv("Endpoint", &ctx.config.realtime.url);
    output::print_kv("Topics", &topics.join(", "));

    let stop = async {
        match args.seconds {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    };
    stop.await;

    channel.disconnect().await;
    Ok(())
}

/// `delivery start|confirm`
pub async fn delivery(args: &DeliveryArgs, ctx: &Context) -> Result<(), AppError> {
    let user = ctx.require_user()?;
    if !ctx.session.has_role(&[UserRole::Courier]) {
        output::print_warning(&format!(
            "Delivery actions are meant for couriers; signed in as {}",
            user.role.display_name()
        ));
    }

    let channel = ctx.channel(Vec::new(), Arc::new(NoopEvents));
    ctx.connect(&channel).await?;

    match &args.command {
        DeliveryCommand::Start { pedido_id } => {
            channel.start_delivery(*pedido_id);
            output::print_success(&format!("Delivery of order #{pedido_id} started"));
        }
        DeliveryCommand::Confirm { pedido_id, foto } => {
            channel.confirm_delivery(*pedido_id, foto);
            output::print_success(&format!("Delivery of order #{pedido_id} confirmed"));
        }
    }

    channel.disconnect().await;
    Ok(())
}

/// `ping`
pub async fn ping(ctx: &Context) -> Result<(), AppError> {
    ctx.require_user()?;
    let channel = ctx.channel(Vec::new(), Arc::new(NoopEvents));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _pong = channel
        .subscribe_when_connected(PONG_TOPIC, move |message: &Message| {
            let _ = tx.send(message.clone());
        })
        .await?;

    let sent = Instant::now();
    channel.ping();
    let reply = tokio::time::timeout(PONG_TIMEOUT, rx.recv()).await;
    channel.disconnect().await;

    match reply {
        Ok(Some(message)) => {
            output::print_success(&format!("pong in {} ms", sent.elapsed().as_millis()));
            if let Some(text) = message.payload.get("message").and_then(|m| m.as_str()) {
                output::print_kv("Message", text);
            }
            Ok(())
        }
        _ => Err(AppError::network("No pong received from the realtime service")),
    }
}
