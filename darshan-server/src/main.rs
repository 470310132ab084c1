mod routes;
mod state;

use anyhow::Context;
use log::{info, warn};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    result::Result as StdResult,
};
use tokio::net::TcpListener;

use state::ServerState;

type Result<T = (), E = anyhow::Error> = StdResult<T, E>;

async fn shutdown_signal() {
    if let Err(why) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {why:?}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result {
    colog::init();

    let args = std::env::args().collect::<Vec<_>>();
    let socket_addr = args
        .get(1)
        .map(|raw_binding| raw_binding.parse::<SocketAddr>())
        .transpose()
        .context("Invalid socket addr passed")?
        .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3537));

    let state = ServerState::default();
    let app = routes::router(state);

    let listener = TcpListener::bind(socket_addr)
        .await
        .with_context(|| format!("Failed to bind to {socket_addr}"))?;

    info!(
        "Starting darshan location server {} on {socket_addr}",
        env!("CARGO_PKG_VERSION")
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Error while running server")
}
