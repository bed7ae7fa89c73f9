//! evmerge-svc - EV data merge service
//!
//! Accepts merge requests over HTTP, queues them, and processes them one at
//! a time on a background worker that reads both data sources.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evmerge_common::db::init_database;
use evmerge_svc::config::{Args, ServiceConfig};
use evmerge_svc::db::TaskStore;
use evmerge_svc::queue::TaskQueue;
use evmerge_svc::sources::FileSourceLoader;
use evmerge_svc::worker::{requeue_pending, Worker};
use evmerge_svc::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "evmerge_svc=info,evmerge_common=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting evmerge-svc v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::from_args(&args).context("Failed to resolve configuration")?;

    std::fs::create_dir_all(&config.root_folder).with_context(|| {
        format!(
            "Failed to create root folder {}",
            config.root_folder.display()
        )
    })?;

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database: {}", config.database_path.display());

    let store = TaskStore::new(pool);
    let loader = Arc::new(FileSourceLoader::new(
        &config.document_source,
        &config.table_source,
    ));

    let (queue, receiver) = TaskQueue::new();
    let mut worker = Worker::new(store.clone(), loader).spawn(receiver);

    requeue_pending(&store, &queue)
        .await
        .context("Failed to re-enqueue pending tasks")?;

    let app = build_router(AppState::new(store, queue.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address()))?;
    info!("Listening on http://{}", config.bind_address());

    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    };

    tokio::select! {
        result = server => {
            result.context("Server error")?;
            info!("HTTP server stopped");
        }
        joined = &mut worker => {
            // The worker only exits early on a fatal error; dropping the
            // server future stops accepting requests.
            return match joined {
                Ok(Ok(())) => Err(anyhow::anyhow!("Task worker exited unexpectedly")),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("Task worker stopped")),
                Err(e) => Err(anyhow::Error::new(e).context("Task worker panicked")),
            };
        }
    }

    // The in-flight task finishes; queued tasks stay pending for the next start
    queue.shutdown();
    match worker.await {
        Ok(Ok(())) => info!("Task worker stopped"),
        Ok(Err(e)) => error!(error = %e, "Task worker stopped with error"),
        Err(e) => error!(error = %e, "Task worker panicked"),
    }

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
