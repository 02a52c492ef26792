//! API server entry point.

use api::config::Config;
use audit_log::{AuditLog, InMemoryAuditLog, PostgresAuditLog};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Bootstraps the registry on `log` and serves it until shutdown.
async fn serve<S: AuditLog + Clone + 'static>(
    log: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
) {
    let (state, processor) = api::create_default_state(log, config)
        .await
        .expect("failed to bootstrap registry");

    // Replay any existing records into the read models
    processor.run_catch_up().await.expect("catch-up failed");

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("invalid configuration");

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    match &config.database_url {
        Some(url) => {
            tracing::info!("using PostgreSQL audit log");
            let log = PostgresAuditLog::connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            serve(log, &config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, audit log is in-memory and will not survive restarts");
            serve(InMemoryAuditLog::new(), &config, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
