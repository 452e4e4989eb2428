use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use plantgo_common::traits::notifier_traits::Notifier;
use plantgo_core::api::{self, AppState};
use plantgo_core::push::{DisabledPushSender, FcmConfig, FcmPushSender, PushSender};
use plantgo_core::repositories::{
    PostgresLevelRepository, PostgresNotificationRepository, PostgresProgressRepository,
};
use plantgo_core::services::{CatalogService, NotificationService, ProgressionService};
use plantgo_core::Database;

mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "plantgo")]
#[command(author, version, about = "PlantGo game backend: levels, progression and rewards")]
struct Args {
    /// Address the HTTP server binds to
    #[arg(long, env = "PLANTGO_SERVER_ADDR", default_value = "0.0.0.0:8080")]
    server_addr: String,

    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://plantgo@localhost:5432/plantgo")]
    database_url: String,

    #[arg(long, env = "PLANTGO_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Upper bound on the storage work of a single request
    #[arg(long, env = "PLANTGO_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    request_timeout_secs: u64,

    /// Firebase service account key; push is disabled without it
    #[arg(long, env = "FIREBASE_CREDENTIALS_PATH")]
    firebase_credentials_path: Option<PathBuf>,

    /// Overrides the project id found in the service account key
    #[arg(long, env = "FCM_PROJECT_ID")]
    fcm_project_id: Option<String>,

    /// Do not apply pending migrations at startup
    #[arg(long, default_value = "false")]
    skip_migrations: bool,
}

fn init_tracing() {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("log bridge already installed: {}", e);
    }
    let filter = EnvFilter::from_default_env()
        .add_directive("plantgo=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {}", e);
    }
}

fn push_sender(args: &Args, timeout: Duration) -> anyhow::Result<Arc<dyn PushSender>> {
    match &args.firebase_credentials_path {
        Some(path) => {
            let sender = FcmPushSender::from_service_account(FcmConfig {
                credentials_path: path.clone(),
                project_id: args.fcm_project_id.clone(),
                request_timeout: timeout,
            })
            .with_context(|| format!("initialising FCM from {}", path.display()))?;
            Ok(Arc::new(sender))
        }
        None => {
            warn!("FCM is not configured; notifications will be stored but not pushed");
            Ok(Arc::new(DisabledPushSender))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("PlantGo starting. server_addr={}", args.server_addr);

    if let Err(e) = run(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let addr: SocketAddr = args
        .server_addr
        .parse()
        .with_context(|| format!("invalid --server-addr '{}'", args.server_addr))?;
    let timeout = Duration::from_secs(args.request_timeout_secs);

    let db = Database::new(&args.database_url, args.max_connections)
        .await
        .context("connecting to Postgres")?;
    if args.skip_migrations {
        info!("Skipping migrations (--skip-migrations).");
    } else {
        db.migrate().await.context("applying migrations")?;
    }

    let level_repo = Arc::new(PostgresLevelRepository::new(db.pool().clone()));
    let progress_repo = Arc::new(PostgresProgressRepository::new(db.pool().clone()));
    let notification_repo = Arc::new(PostgresNotificationRepository::new(db.pool().clone()));

    let push = push_sender(&args, timeout)?;
    let notifications =
        Arc::new(NotificationService::new(notification_repo, push).with_timeout(timeout));
    let notifier: Arc<dyn Notifier> = notifications.clone();

    let state = AppState {
        catalog: Arc::new(CatalogService::new(level_repo.clone()).with_timeout(timeout)),
        progression: Arc::new(
            ProgressionService::new(level_repo, progress_repo, notifier).with_timeout(timeout),
        ),
        notifications,
    };

    server::serve(addr, api::router(state)).await
}
