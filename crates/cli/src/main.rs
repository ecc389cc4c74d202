//! Foodcart CLI - Migrations and dispatch operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! fc-cli migrate
//!
//! # Resolve an address through the geocode cache
//! fc-cli geocode "Moscow, Tverskaya 1"
//!
//! # Place an order from a JSON file (use - for stdin)
//! fc-cli order place --file order.json
//!
//! # List restaurants able to fulfill order 42, nearest first
//! fc-cli order candidates 42
//!
//! # Assign restaurant 3 to order 42
//! fc-cli order assign 42 3
//!
//! # List products available in at least one restaurant
//! fc-cli products
//! ```
//!
//! Results are printed to stdout as JSON. Logs go to stderr; set
//! `LOG_FORMAT=json` for structured logs.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodcart_dispatch::config::DispatchConfig;
use foodcart_dispatch::db;
use foodcart_dispatch::error::AppError;
use foodcart_dispatch::state::AppState;

mod commands;

#[derive(Parser)]
#[command(name = "fc-cli")]
#[command(author, version, about = "Foodcart dispatch tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Resolve an address to coordinates
    Geocode {
        /// Free-form address
        address: String,
    },
    /// Place and route orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// List products available in at least one restaurant
    Products,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Place an order from a JSON submission
    Place {
        /// Path to the JSON submission, or - for stdin
        #[arg(short, long)]
        file: String,
    },
    /// Show an order
    Show {
        /// Order ID
        id: i32,
    },
    /// List restaurants able to fulfill an order, nearest first
    Candidates {
        /// Order ID
        id: i32,
    },
    /// Assign a restaurant to an order
    Assign {
        /// Order ID
        id: i32,
        /// Restaurant ID
        restaurant: i32,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &DispatchConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays JSON.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "foodcart_dispatch=info,fc_cli=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match DispatchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        if e.is_internal() {
            tracing::error!(error = %e, "Command failed");
        } else {
            tracing::info!(error = %e, "Command rejected");
        }
        // Flush pending Sentry events before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: DispatchConfig) -> Result<(), AppError> {
    let pool = db::create_pool(&config.database_url).await?;
    tracing::debug!("Database pool created");

    let state = AppState::new(config, pool)?;
    match cli.command {
        Commands::Migrate => commands::migrate::run(state.pool()).await,
        Commands::Geocode { address } => commands::geocode::resolve(&state, &address).await,
        Commands::Order { action } => match action {
            OrderAction::Place { file } => commands::order::place(&state, &file).await,
            OrderAction::Show { id } => commands::order::show(&state, id).await,
            OrderAction::Candidates { id } => commands::order::candidates(&state, id).await,
            OrderAction::Assign { id, restaurant } => {
                commands::order::assign(&state, id, restaurant).await
            }
        },
        Commands::Products => commands::products::list(&state).await,
    }
}
