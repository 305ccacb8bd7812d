//! Web server

use crate::cli;
use crate::error::StatsError;

use std::{net::SocketAddr, path::PathBuf, process::exit, str::FromStr, time::Duration};

use axum::ServiceExt;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use tokio::signal;
use tracing::{event, Level};

/// Serve the tweet statistics service
///
/// Returns once the server has shut down.
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `service`: The [crate::app::Service] to serve
pub async fn serve(
    args: &cli::CommandLineArgs,
    service: crate::app::Service,
) -> Result<(), StatsError> {
    let addr = match SocketAddr::from_str(&format!("{}:{}", args.host, args.port)) {
        Ok(addr) => addr,
        Err(error) => {
            event!(Level::ERROR, "Invalid host name, IP address or port number: {}", error);
            exit(1)
        }
    };

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    event!(Level::INFO, "Listening on {}", addr);
    if args.https {
        let cert_file = tls_file("certificate", &args.cert_file);
        let key_file = tls_file("key", &args.key_file);
        let tls_config = RustlsConfig::from_pem_file(cert_file, key_file).await?;
        // run HTTPS server with hyper
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(service.into_make_service())
            .await?;
    } else {
        // run HTTP server with hyper
        axum_server::bind(addr)
            .handle(handle)
            .serve(service.into_make_service())
            .await?;
    }
    Ok(())
}

/// Resolve a TLS file path, exiting if it cannot be found.
fn tls_file(kind: &str, path: &str) -> PathBuf {
    let expanded = match expanduser(path) {
        Ok(expanded) => expanded,
        Err(error) => {
            event!(
                Level::ERROR,
                "Failed to expand ~ in TLS {} path '{}': {}. Please provide an absolute path instead.",
                kind,
                path,
                error
            );
            exit(1)
        }
    };
    match expanded.canonicalize() {
        Ok(file) if file.exists() => file,
        _ => {
            event!(
                Level::ERROR,
                "TLS {} file expected at '{}' but not found.",
                kind,
                expanded.display()
            );
            exit(1)
        }
    }
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            event!(Level::ERROR, "Failed to install Ctrl+C handler: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                event!(Level::ERROR, "Failed to install SIGTERM handler: {}", error);
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

    event!(Level::INFO, "Signal received, starting graceful shutdown");
    // Force shutdown if graceful shutdown takes longer than the timeout
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}
