mod session;
mod shared;

use anyhow::{Context, Result};
use clap::Parser;
use shared::{Gate, SharedStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use taskhub_store::TaskStore;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(author, version, about = "shared task list server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:65432")]
    bind: SocketAddr,

    /// Path to the snapshot file.
    #[arg(long, default_value = "storage.json")]
    store: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhub_server=info".into()),
        )
        .init();

    let args = Args::parse();

    let gate = SharedStore::open(TaskStore::new(&args.store));

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!(addr = %args.bind, store = %args.store.display(), "task server listening");

    tokio::select! {
        result = accept_loop(listener, gate) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
            Ok(())
        }
    }
}

async fn accept_loop(listener: TcpListener, gate: Gate) -> Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        tracing::info!(%addr, "client connected");
        let gate = gate.clone();
        tokio::spawn(async move {
            match session::serve_connection(stream, gate).await {
                Ok(()) => tracing::info!(%addr, "client disconnected"),
                Err(e) => tracing::debug!(%addr, err = %e, "client connection failed"),
            }
        });
    }
}
