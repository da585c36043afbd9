//! CLI command definitions and dispatch.

pub mod config;
pub mod orders;
pub mod realtime;
pub mod route;
pub mod session;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use logiflow_auth::{FileTokenStore, HttpAuthApi, SessionManager};
use logiflow_client::{OrdersClient, QueryCache};
use logiflow_core::config::AppConfig;
use logiflow_core::error::AppError;
use logiflow_core::traits::TokenProvider;
use logiflow_entity::user::User;
use logiflow_realtime::{ChannelEvents, ChannelState, RealtimeChannel};

use crate::output::OutputFormat;

/// LogiFlow: delivery dashboards from the terminal
#[derive(Debug, Parser)]
#[command(name = "logiflow", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay (`config/<env>.toml`)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login(session::LoginArgs),
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Create an account
    Register(session::RegisterArgs),
    /// Order management
    Orders(orders::OrdersArgs),
    /// Check where a dashboard path leads for the current session
    Route(route::RouteArgs),
    /// Print realtime messages as they arrive
    Watch(realtime::WatchArgs),
    /// Courier delivery actions
    Delivery(realtime::DeliveryArgs),
    /// Round-trip a ping through the realtime service
    Ping,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(&self.config, &self.env)?;
        if let Commands::Config(args) = &self.command {
            return config::execute(args, &config, self.format);
        }

        let ctx = Context::open(config).await?;
        match &self.command {
            Commands::Login(args) => session::login(args, &ctx, self.format).await,
            Commands::Logout => session::logout(&ctx).await,
            Commands::Whoami => session::whoami(&ctx, self.format),
            Commands::Refresh => session::refresh(&ctx).await,
            Commands::Register(args) => session::register(args, &ctx).await,
            Commands::Orders(args) => orders::execute(args, &ctx, self.format).await,
            Commands::Route(args) => route::execute(args, &ctx, self.format),
            Commands::Watch(args) => realtime::watch(args, &ctx).await,
            Commands::Delivery(args) => realtime::delivery(args, &ctx).await,
            Commands::Ping => realtime::ping(&ctx).await,
            Commands::Config(_) => Ok(()),
        }
    }
}

/// Helper: load configuration from file and environment
pub fn load_config(config_path: &str, env: &str) -> Result<AppConfig, AppError> {
    tracing::debug!(path = %config_path, env = %env, "Loading configuration");
    AppConfig::load(config_path, env)
        .map_err(|e| AppError::configuration(format!("Failed to load config: {e}")))
}

/// Session and clients shared by every command.
#[derive(Debug)]
pub struct Context {
    /// Loaded configuration.
    pub config: AppConfig,
    /// Hydrated session.
    pub session: Arc<SessionManager>,
    /// Query cache bound to the session.
    pub cache: QueryCache,
}

impl Context {
    /// Build the session manager over the durable store and hydrate it.
    pub async fn open(config: AppConfig) -> Result<Self, AppError> {
        tracing::debug!(
            auth_url = %config.api.auth_url,
            session_file = %config.storage.session_file,
            "Opening session"
        );
        let api = Arc::new(HttpAuthApi::new(&config.api)?);
        let store = Arc::new(FileTokenStore::new(config.storage.session_file.clone()));
        let cache = QueryCache::new(&config.orders);
        let session = Arc::new(SessionManager::new(api, store).with_cache(Arc::new(cache.clone())));
        session.init().await;

        Ok(Self {
            config,
            session,
            cache,
        })
    }

    /// The signed-in user, or an error telling the operator to log in.
    pub fn require_user(&self) -> Result<User, AppError> {
        self.session
            .current_user()
            .ok_or_else(|| AppError::authentication("Not signed in. Run `logiflow login` first."))
    }

    fn tokens(&self) -> Arc<dyn TokenProvider> {
        self.session.clone()
    }

    /// Order client carrying the session token.
    pub fn orders(&self) -> Result<OrdersClient, AppError> {
        Ok(OrdersClient::new(&self.config.api, &self.config.orders, self.tokens())?
            .with_cache(self.cache.clone()))
    }

    /// Realtime channel for the configured endpoint.
    pub fn channel(&self, topics: Vec<String>, events: Arc<dyn ChannelEvents>) -> RealtimeChannel {
        RealtimeChannel::builder(self.config.realtime.clone(), self.tokens())
            .topics(topics)
            .events(events)
            .build()
    }

    /// Connect `channel` and wait for the handshake.
    pub async fn connect(&self, channel: &RealtimeChannel) -> Result<(), AppError> {
        let mut state = channel.watch_state();
        channel.connect()?;
        let wait = self.config.realtime.connect_timeout();
        match tokio::time::timeout(wait, state.wait_for(ChannelState::is_connected)).await {
            Ok(Ok(_)) => Ok(()),
            _ => Err(AppError::network(format!(
                "Realtime channel did not connect within {}s (state: {})",
                wait.as_secs(),
                channel.state()
            ))),
        }
    }
}
