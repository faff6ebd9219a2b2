use std::sync::Arc;

use mcp_toolbox::{
    build_app,
    config::{Config, Transport},
    domain::tools::default_registry,
    logging,
    mcp::{
        server::{Dispatcher, ServerIdentity},
        stdio::serve_stdio,
    },
    AppState,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    logging::init_logging(config.debug);

    let registry = default_registry();
    info!(
        name = %config.server_name,
        version = %config.server_version,
        tools = registry.len(),
        transport = %config.transport,
        "server starting"
    );
    let dispatcher = Arc::new(Dispatcher::new(ServerIdentity::from(&config), registry));

    match config.transport {
        Transport::Stdio => serve_stdio(&dispatcher).await?,
        Transport::Http => {
            let bind_socket = config.bind_socket()?;
            let state = AppState::new(Arc::clone(&dispatcher));
            let shutdown = Arc::clone(&state.shutdown);
            let app = build_app(state);
            let listener = tokio::net::TcpListener::bind(bind_socket).await?;

            info!(host = %config.host, port = config.port, "http listener bound");

            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async move {
                    tokio::select! {
                        _ = shutdown.notified() => {}
                        result = tokio::signal::ctrl_c() => {
                            if let Err(err) = result {
                                warn!(error = %err, "failed to listen for ctrl-c");
                            }
                        }
                    }
                })
                .await?;
        }
    }

    info!("server stopped");
    Ok(())
}
