use std::sync::Arc;

use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_reports::api::router;
use lms_reports::auth::Authenticator;
use lms_reports::config::ServerConfig;
use lms_reports::lms::{LmsConfig, LmsHttpClient};
use lms_reports::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lms_reports=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server_config = ServerConfig::new_from_env()?;
    let lms_config = LmsConfig::new_from_env()?;

    let html_url = lms_config.html_url();
    let lms = LmsHttpClient::new(lms_config)?;

    let state = AppState {
        lms: Arc::new(lms),
        auth: Arc::new(Authenticator::new(server_config.jwt_secret.as_bytes())),
        html_url,
        web_origin: server_config.web_origin.clone(),
        request_timeout: server_config.request_timeout,
    };

    let app = router(state);

    info!("listening on http://{}", server_config.addr);

    let listener = tokio::net::TcpListener::bind(server_config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
