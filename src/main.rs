//! Cement Ops - plant anomaly monitoring and optimization service
//!
//! # Usage
//!
//! ```bash
//! # Run with ./plant_config.toml or built-in defaults
//! cargo run --release
//!
//! # Explicit config, JSON logs, custom bind address
//! ./cement-ops --config /etc/cement-ops/plant.toml --log-json --addr 127.0.0.1:9000
//! ```
//!
//! # Environment Variables
//!
//! - `CEMENT_OPS_CONFIG`: Path to the plant config TOML
//! - `RECOMMENDER_API_KEY`: Enables the generative-model recommender
//! - `PREDICTOR_API_KEY`: Bearer token for the energy model endpoint (optional)
//! - `SMTP_USERNAME` / `SMTP_PASSWORD`: Enable alert e-mails
//! - `ADMIN_EMAILS` / `OPERATOR_EMAILS`: Fallback recipients (comma separated)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cement_ops::anomaly::ThresholdProvider;
use cement_ops::api::{create_app, ApiState};
use cement_ops::config::PlantConfig;
use cement_ops::llm::{DisabledRecommender, HttpRecommender, RecommendationClient};
use cement_ops::notify::{MailTransport, NotificationDispatcher, SmtpMailTransport, StaticUserDirectory};
use cement_ops::optimization::{DisabledPredictor, EnergyPredictor, HttpPredictor, SavingsVerifier};
use cement_ops::pipeline::{run_scheduler, Collaborators, CycleOrchestrator, WindowedDedup};
use cement_ops::storage::{open_db, SledAlertStore, SledCycleLog};
use cement_ops::telemetry::JsonlTelemetrySource;
use cement_ops::types::Role;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "cement-ops")]
#[command(about = "Cement plant anomaly monitoring and optimization service")]
#[command(version)]
struct CliArgs {
    /// Path to the plant config TOML (overrides the standard search order)
    #[arg(short, long, env = "CEMENT_OPS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the server address (default: from config, "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Do not start the periodic scheduler, whatever the config says
    #[arg(long)]
    no_scheduler: bool,
}

// ============================================================================
// Task Supervision
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    Scheduler,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpServer => write!(f, "HttpServer"),
            Self::Scheduler => write!(f, "Scheduler"),
        }
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PlantConfig> {
    match path {
        Some(p) => PlantConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config from {}", p.display())),
        None => Ok(PlantConfig::load()),
    }
}

// ============================================================================
// Wiring
// ============================================================================

fn build_recommender(config: &PlantConfig) -> Result<Arc<dyn RecommendationClient>> {
    match std::env::var("RECOMMENDER_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let r = &config.recommender;
            let client = HttpRecommender::new(&r.base_url, &r.model, key, r.timeout())
                .context("Failed to build recommender client")?;
            info!(model = %r.model, "✓ Recommender enabled");
            Ok(Arc::new(client))
        }
        _ => {
            warn!("RECOMMENDER_API_KEY not set, recommendations disabled");
            Ok(Arc::new(DisabledRecommender))
        }
    }
}

fn build_predictor(config: &PlantConfig) -> Result<Arc<dyn EnergyPredictor>> {
    match config.predictor.endpoint.as_deref().filter(|e| !e.is_empty()) {
        Some(endpoint) => {
            let api_key = std::env::var("PREDICTOR_API_KEY").ok().filter(|k| !k.is_empty());
            let predictor = HttpPredictor::new(endpoint, api_key, config.predictor.timeout())
                .context("Failed to build energy predictor client")?;
            info!(endpoint = %endpoint, "✓ Energy predictor enabled");
            Ok(Arc::new(predictor))
        }
        None => {
            warn!("No predictor endpoint configured, savings verification disabled");
            Ok(Arc::new(DisabledPredictor))
        }
    }
}

fn build_notifier(config: &PlantConfig) -> Result<NotificationDispatcher> {
    let transport: Option<Arc<dyn MailTransport>> =
        match SmtpMailTransport::from_env(&config.smtp_settings()).context("Invalid SMTP settings")? {
            Some(t) => {
                info!(host = %config.notifications.smtp_host, "✓ SMTP transport configured");
                Some(Arc::new(t))
            }
            None => {
                warn!("SMTP credentials not set, alert e-mails disabled");
                None
            }
        };

    let directory = Arc::new(StaticUserDirectory::new(config.notifications.users.clone()));
    Ok(NotificationDispatcher::new(transport, directory)
        .context("Failed to build notification dispatcher")?
        .with_fallback(Role::Admin, config.admin_fallback())
        .with_fallback(Role::Operator, config.operator_fallback())
        .with_frontend_url(config.notifications.frontend_url.clone()))
}

fn build_orchestrator(config: &PlantConfig) -> Result<CycleOrchestrator> {
    let db = open_db(&config.storage.data_dir).context("Failed to open storage")?;
    info!(path = %config.storage.data_dir.display(), "✓ Storage opened");

    let thresholds: Arc<dyn ThresholdProvider> = Arc::new(config.threshold_provider());
    let collaborators = Collaborators {
        telemetry: Arc::new(JsonlTelemetrySource::new(&config.telemetry.jsonl_path)),
        thresholds,
        recommender: build_recommender(config)?,
        verifier: SavingsVerifier::new(build_predictor(config)?),
        alerts: Arc::new(SledAlertStore::open(&db).context("Failed to open alert store")?),
        cycles: Arc::new(SledCycleLog::open(&db).context("Failed to open cycle log")?),
        notifier: Arc::new(build_notifier(config)?),
    };

    let mut orchestrator = CycleOrchestrator::new(collaborators, config.orchestrator_settings())
        .with_access(Arc::new(config.access.clone()));
    if let Some(secs) = config.alerts.dedup_window_secs {
        info!(window_secs = secs, "Alert deduplication enabled");
        orchestrator = orchestrator.with_dedup(Arc::new(WindowedDedup::new(Duration::from_secs(secs))));
    }
    Ok(orchestrator)
}

// ============================================================================
// Tasks
// ============================================================================

fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

fn spawn_scheduler(
    task_set: &mut JoinSet<Result<TaskName>>,
    orchestrator: Arc<CycleOrchestrator>,
    config: &PlantConfig,
    cancel_token: CancellationToken,
) {
    let period = config.scheduler.interval();
    let mode = config.scheduler.mode;
    task_set.spawn(async move {
        run_scheduler(orchestrator, period, mode, cancel_token).await;
        Ok(TaskName::Scheduler)
    });
}

async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let the remaining tasks observe the cancellation and drain.
    let drain = async {
        while let Some(res) = task_set.join_next().await {
            if let Ok(Ok(task_name)) = res {
                info!("Supervisor: task {} stopped", task_name);
            }
        }
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("Supervisor: tasks did not stop within {:?}, aborting", SHUTDOWN_GRACE);
        task_set.abort_all();
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = load_config(args.config.as_ref())?;
    info!(
        plant = %config.plant.name,
        plant_id = config.plant.id.as_deref().unwrap_or("unset"),
        "Cement Ops starting"
    );

    let server_addr = args.addr.clone().unwrap_or_else(|| config.server.addr.clone());
    let orchestrator = Arc::new(build_orchestrator(&config)?);
    let config = Arc::new(config);

    let app = create_app(ApiState::new(Arc::clone(&orchestrator), Arc::clone(&config)));
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind to {server_addr}"))?;
    info!("✓ HTTP server listening on {}", server_addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    if config.scheduler.enabled && !args.no_scheduler {
        spawn_scheduler(&mut task_set, Arc::clone(&orchestrator), &config, cancel_token.clone());
    } else {
        info!("Scheduler disabled");
    }

    run_supervisor(&mut task_set, cancel_token).await?;

    info!("✓ Cement Ops shutdown complete");
    Ok(())
}
