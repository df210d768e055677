use iotmon_ingest::{serve, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LISTEN_ADDR: &str = "0.0.0.0:8000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    info!("Ingest server listening on {}", listener.local_addr()?);

    serve(listener, AppState::default()).await?;
    Ok(())
}
