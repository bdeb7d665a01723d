use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use voucher_engine::config::{EngineConfig, StoreBackend};
use voucher_engine::state::{AppState, open_store};
use voucher_engine::{cli, handlers};

#[derive(Parser)]
#[command(name = "voucher-engine")]
#[command(about = "Voucher lifecycle and redemption engine", long_about = None)]
struct Cli {
    /// Override the configured store backend (postgres or memory)
    #[arg(long, global = true)]
    store: Option<StoreBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Voucher administration
    Voucher {
        #[command(subcommand)]
        subcommand: VoucherCommands,
    },
    /// Redemption code administration
    Code {
        #[command(subcommand)]
        subcommand: CodeCommands,
    },
}

#[derive(Subcommand)]
enum VoucherCommands {
    /// Create a voucher from a TOML or JSON definition and issue its codes
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    /// Make a scheduled voucher valid from now
    Publish { id: Uuid },
    /// Show redemption and scan counters
    Stats { id: Uuid },
}

#[derive(Subcommand)]
enum CodeCommands {
    /// Stop accepting a code for redemption
    Deactivate { code_id: Uuid },
    /// Accept a previously deactivated code again
    Activate { code_id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: no .env file loaded ({})", e);
    }

    let cli = Cli::parse();
    let (mut config, config_source) = EngineConfig::load()?;
    if let Some(store) = cli.store {
        config.server.store = store;
    }

    let file_appender =
        tracing_appender::rolling::never(&config.logging.directory, &config.logging.file_name);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "voucher_engine=debug,voucher_db=info,tower_http=info,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    tracing::info!("voucher-engine {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loaded config from {}", config_source);

    if let Commands::Migrate = cli.command {
        let url = config
            .database
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set to run migrations"))?;
        voucher_db::db::init_db(url, 1).await?;
        println!("Migrations applied.");
        return Ok(());
    }

    let store = open_store(&config).await?;
    let state = AppState::from_config(store, &config)?;

    match cli.command {
        Commands::Serve => run_server(state, &config).await?,
        Commands::Migrate => {}
        Commands::Voucher { subcommand } => match subcommand {
            VoucherCommands::Create { file } => cli::create_voucher(&state, &file).await?,
            VoucherCommands::Publish { id } => cli::publish_voucher(&state, id).await?,
            VoucherCommands::Stats { id } => cli::voucher_stats(&state, id).await?,
        },
        Commands::Code { subcommand } => match subcommand {
            CodeCommands::Deactivate { code_id } => {
                cli::set_code_active(&state, code_id, false).await?
            }
            CodeCommands::Activate { code_id } => cli::set_code_active(&state, code_id, true).await?,
        },
    }

    Ok(())
}

async fn run_server(state: AppState, config: &EngineConfig) -> Result<()> {
    let app = handlers::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.listen_port));
    tracing::info!("Voucher engine listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Voucher engine stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
