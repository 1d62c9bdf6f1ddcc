// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use addon_csr_signer::{
    cache::ResourceCache,
    config::Config,
    constants::{CONTROLLER_NAME, TOKIO_WORKER_THREADS},
    context::Context,
    controller::run_csr_controller,
    events::KubeEventPublisher,
    filter::CsrEventFilter,
    reconcilers::status::KubeStatusWriter,
    server,
};
use anyhow::Result;
use clap::Parser;
use kube::Client;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("addon-csr-signer")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or `text`).
/// Text output looks like:
/// `2025-11-29T23:45:00.123456Z controller.rs:62 INFO Starting CSR signing controller`
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    init_logging();

    info!("Starting add-on CSR signer");
    debug!("Logging initialized with file and line number tracking");

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let config = Config::parse();
    debug!(?config, "Configuration loaded");

    let registry = Arc::new(config.build_registry()?);

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let ready = Arc::new(AtomicBool::new(false));

    let (server_tx, server_rx) = futures::channel::oneshot::channel::<()>();
    let metrics_server = tokio::spawn(server::serve(
        config.metrics_bind_address,
        ready.clone(),
        async {
            let _ = server_rx.await;
        },
    ));

    let (controller_tx, controller_rx) = futures::channel::oneshot::channel::<()>();
    let filter = CsrEventFilter::new(registry.clone());
    let context_client = client.clone();
    let controller = run_csr_controller(
        client,
        filter,
        config.concurrency,
        ready,
        move |stores| {
            let cache: Arc<dyn ResourceCache> = Arc::new(stores);
            Context::new(
                cache,
                registry,
                Arc::new(KubeStatusWriter::new(context_client.clone())),
                Arc::new(KubeEventPublisher::new(context_client, CONTROLLER_NAME)),
            )
        },
        async {
            let _ = controller_rx.await;
        },
    );
    tokio::pin!(controller);

    // The controller never exits on its own; if it does, exit the process
    tokio::select! {
        result = &mut controller => {
            error!("CRITICAL: CSR signing controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("CSR signing controller exited unexpectedly without error")
        }
        signal = shutdown_signal() => {
            let signal = signal?;
            info!("Received {signal}, initiating graceful shutdown...");
        }
    }

    info!("Waiting for in-flight reconciliations to finish...");
    let _ = controller_tx.send(());
    controller.await?;

    let _ = server_tx.send(());
    metrics_server.await??;

    info!("Graceful shutdown completed successfully");
    Ok(())
}

/// Resolve when the process is asked to stop, returning the signal's name.
///
/// Listens for SIGINT (Ctrl+C) everywhere and SIGTERM (pod termination) on Unix.
async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("SIGINT")
            }
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT")
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
