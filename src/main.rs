use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use barehttp::echo::echo;
use barehttp::server::{Server, ShutdownHandle};

/// Minimal HTTP server that echoes each request back.
#[derive(Debug, Parser)]
#[command(name = "barehttp", version, about)]
struct Cli {
    /// Port to listen on (1-65535)
    #[arg(
        short,
        long,
        default_value_t = 8000,
        env = "BAREHTTP_PORT",
        allow_negative_numbers = true
    )]
    port: i64,

    /// Host address to bind
    #[arg(long, default_value = "127.0.0.1", env = "BAREHTTP_HOST")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut server = Server::new(cli.host, cli.port)?;
    info!("Server listening on {}", server.local_addr());

    tokio::spawn(shutdown_on_signal(server.shutdown_handle()));

    server.listen(echo).await?;
    Ok(())
}

/// Stops the server on Ctrl+C, or on SIGTERM where available.
async fn shutdown_on_signal(shutdown: ShutdownHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Shutdown signal received (Ctrl+C)"),
        _ = terminate => info!("Shutdown signal received (SIGTERM)"),
    }
    shutdown.shutdown();
}
