//! alarm-worker — reads event records as JSON lines and dispatches them to
//! the configured alarms.
//!
//! Events come from a file or stdin, one `{"category": ..., "fields": {...}}`
//! object per line. On Ctrl-C or end of input the worker stops reading and
//! waits (bounded by `--shutdown-timeout`) for in-flight deliveries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

use alarmist_core::config::{load_dotenv, Config};
use alarmist_core::EventRecord;
use alarmist_notify::{
    http_adapters, Dispatcher, DispatchResult, GoogleStaticMap, LoadPolicy, Registry, RegistryWatcher, Vocabulary,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Alarm worker — renders and delivers alarm notifications for incoming events.
#[derive(Parser, Debug)]
#[command(name = "alarm-worker", version, about)]
struct Cli {
    /// Alarms configuration file (JSON or YAML). Overrides ALARMS_FILE.
    #[arg(long)]
    alarms: Option<PathBuf>,

    /// Event source: a JSON-lines file, or `-` for stdin.
    #[arg(long, default_value = "-")]
    events: String,

    /// Extra placeholder declarations. Overrides PLACEHOLDERS_FILE.
    #[arg(long)]
    placeholders: Option<PathBuf>,

    /// Skip malformed alarms instead of refusing to start.
    #[arg(long)]
    skip_invalid: bool,

    /// Reload the alarms file when it changes.
    #[arg(long)]
    watch: bool,

    /// Do not send the startup announcement.
    #[arg(long)]
    no_startup_message: bool,

    /// Shutdown timeout in seconds.
    #[arg(long, env = "ALARM_WORKER_SHUTDOWN_TIMEOUT", default_value_t = 10)]
    shutdown_timeout: u64,
}

// ── Setup ───────────────────────────────────────────────────────────

fn build_dispatcher(registry: Arc<Registry>, config: &Config) -> anyhow::Result<Arc<Dispatcher>> {
    let adapters = http_adapters(
        &registry,
        config.delivery.timeout(),
        config.delivery.max_attempts,
        config.delivery.backoff(),
    )
    .context("failed to build channel adapters")?;

    let dispatcher = Dispatcher::new(registry)
        .with_adapters(adapters)
        .with_map_renderer(Arc::new(GoogleStaticMap::new(config.maps.google_key.clone())))
        .with_delivery_timeout(config.delivery.timeout());
    Ok(Arc::new(dispatcher))
}

async fn open_events(source: &str) -> anyhow::Result<Box<dyn AsyncRead + Unpin + Send>> {
    if source == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("failed to open events file {}", source))?;
    Ok(Box::new(file))
}

fn log_results(category: &str, results: &[DispatchResult]) {
    let delivered = results.iter().filter(|r| r.is_delivered()).count();
    let failed = results.len() - delivered;
    if failed > 0 {
        warn!(category, delivered, failed, "event dispatched with failures");
    } else {
        info!(category, delivered, "event dispatched");
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(path) = cli.alarms {
        config.alarms.file = path;
    }
    if let Some(path) = cli.placeholders {
        config.alarms.placeholders_file = Some(path);
    }
    config.alarms.skip_invalid |= cli.skip_invalid;
    config.alarms.watch |= cli.watch;
    config.log_summary();

    let mut vocabulary = Vocabulary::builtin();
    if let Some(path) = &config.alarms.placeholders_file {
        vocabulary.apply_overrides_from_path(path)?;
    }

    let policy = if config.alarms.skip_invalid {
        LoadPolicy::SkipInvalid
    } else {
        LoadPolicy::Strict
    };
    let mut watcher = RegistryWatcher::new(config.alarms.file.clone(), Arc::new(vocabulary), policy)
        .with_context(|| format!("failed to load alarms from {}", config.alarms.file.display()))?;
    if config.alarms.watch {
        watcher.watch()?;
    }
    let mut registry_rx = watcher.subscribe();

    let mut dispatcher = build_dispatcher(watcher.current(), &config)?;
    if !cli.no_startup_message {
        let results = dispatcher.announce_startup().await;
        log_results("startup", &results);
    }

    let mut lines = BufReader::new(open_events(&cli.events).await?).lines();
    let mut tasks = JoinSet::new();
    info!(events = %cli.events, "alarm-worker started");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read events")? else {
                    info!("end of event input");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let event: EventRecord = match serde_json::from_str(&line) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "skipping malformed event");
                        continue;
                    }
                };
                let dispatcher = Arc::clone(&dispatcher);
                tasks.spawn(async move {
                    let results = dispatcher.dispatch(&event).await;
                    log_results(event.category.as_str(), &results);
                });
            }
            Ok(()) = registry_rx.changed() => {
                let registry = Arc::clone(&registry_rx.borrow_and_update());
                match build_dispatcher(registry, &config) {
                    Ok(d) => {
                        dispatcher = d;
                        info!("dispatcher rebuilt for reloaded alarms");
                    }
                    Err(e) => warn!(error = %e, "keeping previous dispatcher"),
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "dispatch task failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    let pending = tasks.len();
    let drain = async { while tasks.join_next().await.is_some() {} };
    if tokio::time::timeout(Duration::from_secs(cli.shutdown_timeout), drain)
        .await
        .is_err()
    {
        warn!(pending, "shutdown timeout reached, aborting in-flight deliveries");
        tasks.abort_all();
    }

    info!("alarm-worker exited cleanly");
    Ok(())
}
