use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use training_ops::config::{AppConfig, AppEnvironment};
use training_ops::error::AppError;
use training_ops::telemetry;
use training_ops::workflows::training::memory::{InMemoryStore, NullNotifier, StaticDirectory};
use training_ops::workflows::training::{
    training_router, Actor, ChecklistPolicy, DeliveryMode, Role, TrainerId, TrainingService,
    UserId,
};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Training Backoffice",
    about = "Run the training delivery backoffice service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the checklist blueprint for a delivery mode
    Checklist(ChecklistArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ChecklistArgs {
    /// Delivery mode: online or classroom
    #[arg(long, value_parser = parse_mode)]
    mode: DeliveryMode,
}

fn parse_mode(raw: &str) -> Result<DeliveryMode, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "online" => Ok(DeliveryMode::Online),
        "classroom" => Ok(DeliveryMode::Classroom),
        other => Err(format!("unknown delivery mode '{other}'")),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Checklist(args) => {
            print_checklist(args.mode);
            Ok(())
        }
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(NullNotifier);
    let service = Arc::new(TrainingService::with_policy(
        store,
        notifier,
        ChecklistPolicy::standard(),
        config.workflow.checklist_on_create,
    ));
    let directory = Arc::new(demo_directory(config.environment));

    let infra = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state);

    let app = Router::new()
        .merge(infra)
        .merge(training_router(service, directory))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "training backoffice ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Static demo logins outside production; real deployments put an identity
/// provider behind the `AuthProvider` seam instead.
fn demo_directory(environment: AppEnvironment) -> StaticDirectory {
    if environment == AppEnvironment::Production {
        return StaticDirectory::new();
    }

    StaticDirectory::new()
        .with_actor(
            "dev-admin",
            Actor {
                user_id: UserId(1),
                username: "admin".to_string(),
                role: Role::Admin,
                trainer_id: None,
            },
        )
        .with_actor(
            "dev-backoffice",
            Actor {
                user_id: UserId(2),
                username: "backoffice".to_string(),
                role: Role::BackofficeUser,
                trainer_id: None,
            },
        )
        .with_actor(
            "dev-trainer",
            Actor {
                user_id: UserId(3),
                username: "trainer".to_string(),
                role: Role::Trainer,
                trainer_id: Some(TrainerId(1)),
            },
        )
}

fn print_checklist(mode: DeliveryMode) {
    let policy = ChecklistPolicy::standard();
    println!("Checklist blueprint for {mode} trainings");
    for (position, template) in policy.templates_for(mode).iter().enumerate() {
        let requirement = if template.required {
            "required"
        } else {
            "optional"
        };
        println!(
            "{:>2}. {} [{}] ({})",
            position + 1,
            template.title,
            template.key,
            requirement
        );
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
