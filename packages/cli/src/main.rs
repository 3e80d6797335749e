// ABOUTME: Crucible server entrypoint
// ABOUTME: Wires storage, sandbox provider, task manager, and the HTTP API

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crucible_api::{create_sandbox_router, create_tasks_router, SandboxState, TasksState};
use crucible_sandbox::{FragmentRunner, HttpSandboxClient, SandboxClient};
use crucible_tasks::{NoopPlanner, TaskManager, TaskStorage};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "crucible", about = "Crucible task execution engine server")]
struct Cli {
    /// Listen port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Allowed CORS origin (overrides CORS_ORIGIN)
    #[arg(long)]
    cors_origin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crucible=info,tower_http=warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database_url = database_url;
    }
    if let Some(cors_origin) = cli.cors_origin {
        config.cors_origin = cors_origin;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    let storage = Arc::new(TaskStorage::new(pool));
    storage.init_schema().await?;

    let client = Arc::new(HttpSandboxClient::from_env()) as Arc<dyn SandboxClient>;
    let runner = Arc::new(FragmentRunner::new(client));
    let manager = Arc::new(TaskManager::new(
        Arc::clone(&storage),
        Arc::clone(&runner),
        Arc::new(NoopPlanner),
    ));

    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .nest(
            "/api/tasks",
            create_tasks_router().with_state(TasksState { manager }),
        )
        .nest(
            "/api/sandbox",
            create_sandbox_router().with_state(SandboxState { runner }),
        )
        .layer(cors);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Crucible server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
