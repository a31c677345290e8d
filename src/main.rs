use clap::Parser;
use footfall::config::AppConfig;
use footfall::event_log::TracingLog;
use footfall::geo::GeoClient;
use footfall::query::handler::QueryState;
use footfall::storage;
use footfall::user_agent::UaDeviceDetector;
use footfall::visit::VisitState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[derive(Parser)]
#[command(name = "footfall", about = "Self-hosted visitor tracking service")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "footfall=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(Some(&cli.config))?;

    if let Err(msg) = config.validate() {
        eprintln!("Configuration error: {msg}");
        return Err(msg.into());
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        db = %config.database.path.display(),
        geo = %config.geo.base_url,
        "starting footfall"
    );

    // Setup SQLite pool
    let pool = storage::sqlite::create_pool(&config.database)?;
    storage::sqlite::init_pool(&pool).await?;
    tracing::info!("database initialized");

    let geo = GeoClient::new(&config.geo)?;
    if config.geo.timeout_secs.is_none() {
        tracing::info!("geolocation lookups have no timeout; set geo.timeout_secs to bound them");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    // Port 0 binds an ephemeral port; record the one actually in use
    let local_addr = listener.local_addr()?;

    let visit_state = Arc::new(VisitState {
        pool: pool.clone(),
        geo,
        detector: Arc::new(UaDeviceDetector),
        log: Arc::new(TracingLog),
        session: config.session.clone(),
        server_port: local_addr.port(),
    });
    let query_state = Arc::new(QueryState { pool: pool.clone() });

    let app = footfall::app(visit_state, query_state);
    tracing::info!(addr = %local_addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    tracing::info!("shutting down...");
}
