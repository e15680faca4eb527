use checkout_engine::application::config::EngineConfig;
use checkout_engine::application::engine::OrderEngine;
use checkout_engine::domain::expiry::ExpiryPolicy;
use checkout_engine::domain::ports::OrderStoreBox;
use checkout_engine::infrastructure::in_memory::InMemoryOrderStore;
use checkout_engine::infrastructure::log_notifier::LogNotifier;
#[cfg(feature = "storage-rocksdb")]
use checkout_engine::infrastructure::rocksdb::RocksDBStore;
use checkout_engine::infrastructure::simulated_gateway::SimulatedGateway;
use checkout_engine::interfaces::csv::pending_report::PendingReportWriter;
use checkout_engine::interfaces::jsonl::batch::BatchProcessor;
use checkout_engine::interfaces::jsonl::request_reader::RequestReader;
use checkout_engine::interfaces::jsonl::response_writer::ResponseWriter;
use chrono::Utc;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "CHECKOUT_DB_PATH", global = true)]
    db_path: Option<PathBuf>,

    /// Public gateway key id handed to the checkout widget.
    #[arg(
        long,
        env = "CHECKOUT_GATEWAY_KEY_ID",
        default_value = "rzp_test_local",
        global = true
    )]
    gateway_key_id: String,

    /// Shared secret used to verify payment signatures.
    #[arg(long, env = "CHECKOUT_GATEWAY_SECRET", hide_env_values = true, global = true)]
    gateway_secret: Option<String>,

    /// ISO currency code sent to the gateway.
    #[arg(long, env = "CHECKOUT_CURRENCY", default_value = "INR", global = true)]
    currency: String,

    /// Minutes an unpaid gateway order stays payable.
    #[arg(long, env = "CHECKOUT_EXPIRY_MINUTES", default_value_t = 30, global = true)]
    expiry_minutes: i64,

    /// Seconds to wait on a single gateway call.
    #[arg(long, env = "CHECKOUT_GATEWAY_TIMEOUT_SECS", default_value_t = 10, global = true)]
    gateway_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process newline-delimited JSON requests, writing one JSON response per line to stdout
    Process {
        /// Input requests file
        input: PathBuf,
    },
    /// Print gateway orders still awaiting payment as CSV
    Pending,
    /// Delete unpaid gateway orders past their payment window
    Reap {
        /// Keep running, sweeping every this many seconds until interrupted.
        #[arg(long)]
        every: Option<u64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

fn build_config(cli: &Cli) -> Result<EngineConfig> {
    let secret = cli.gateway_secret.clone().ok_or_else(|| {
        miette!("no gateway secret: pass --gateway-secret or set CHECKOUT_GATEWAY_SECRET")
    })?;

    let mut config = EngineConfig::new(cli.gateway_key_id.clone(), secret);
    config.currency = cli.currency.clone();
    let window = chrono::Duration::try_minutes(cli.expiry_minutes)
        .ok_or_else(|| miette!("expiry window of {} minutes is out of range", cli.expiry_minutes))?;
    config.expiry = ExpiryPolicy::new(window);
    config.gateway_timeout = Duration::from_secs(cli.gateway_timeout_secs);
    Ok(config)
}

fn open_store(db_path: Option<PathBuf>) -> Result<OrderStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            info!(path = %path.display(), "opening RocksDB order store");
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            warn!(
                path = %path.display(),
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
            );
            Ok(Box::new(InMemoryOrderStore::new()))
        }
        None => Ok(Box::new(InMemoryOrderStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = build_config(&cli)?;
    let store = open_store(cli.db_path.clone())?;
    store.health_check().await.into_diagnostic()?;

    let gateway = SimulatedGateway::new(&config.gateway_secret);
    let engine = OrderEngine::new(
        config,
        store,
        Box::new(gateway.clone()),
        Box::new(LogNotifier::new()),
    )
    .into_diagnostic()?;

    match cli.command {
        Command::Process { input } => {
            let file = File::open(input).into_diagnostic()?;
            let reader = RequestReader::new(BufReader::new(file));
            let stdout = io::stdout();
            let mut writer = ResponseWriter::new(stdout.lock());
            BatchProcessor::new(&engine)
                .with_simulator(&gateway)
                .run(reader, &mut writer)
                .await
                .into_diagnostic()?;
        }
        Command::Pending => {
            let pending = engine.list_pending_orders().await.into_diagnostic()?;
            let stdout = io::stdout();
            PendingReportWriter::new(stdout.lock())
                .write_summaries(pending)
                .into_diagnostic()?;
        }
        Command::Reap { every: None } => {
            let report = engine.purge_expired(Utc::now()).await.into_diagnostic()?;
            println!("{}", serde_json::to_string(&report).into_diagnostic()?);
        }
        Command::Reap { every: Some(secs) } => {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = engine.purge_expired(Utc::now()).await {
                            warn!(error = %e, "expiry sweep failed");
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutting down reaper");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
