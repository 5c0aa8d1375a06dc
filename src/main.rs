use std::process::ExitCode;

use oksrv::{PORT, Server};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let served = match Server::bind(([0, 0, 0, 0], PORT)).await {
        Ok(server) => server.serve().await,
        Err(e) => Err(e),
    };

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
