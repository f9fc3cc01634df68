use tracker::{api, Tracker};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> tracker::error::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // No arguments; always binds localhost:8000. An env override is
    // accepted for local testing without adding a CLI parser.
    let addr: std::net::SocketAddr = std::env::var("SWARMKIT_TRACKER_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| ([127, 0, 0, 1], 8000).into());

    let tracker = Tracker::new();
    let app = api::router(tracker);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "tracker listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutting down");
}
