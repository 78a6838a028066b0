//! HTTP server initialization and startup

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use noteshare::api::{router, AppState};
use noteshare::cli::initialize_server_database;
use noteshare::config::Config;
use noteshare::upload::{CloudinaryClient, FileHost};

/// Start the HTTP API
#[tokio::main]
pub async fn start_http(config: Config) -> Result<()> {
    info!("Starting noteshare (HTTP on port {})", config.port);

    let (root, db) = initialize_server_database(&config)?;
    info!("Data root: {}", root);

    let host: Option<Arc<dyn FileHost>> = config.cloudinary.as_ref().map(|c| {
        info!("Uploading PDFs to Cloudinary cloud '{}'", c.cloud_name);
        Arc::new(CloudinaryClient::new(&c.cloud_name, &c.upload_preset)) as Arc<dyn FileHost>
    });

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let app = router(AppState::new(db, config, host));

    info!("Listening on http://{}/api", bind_addr);
    let tcp_listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(
        tcp_listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down...");
}
