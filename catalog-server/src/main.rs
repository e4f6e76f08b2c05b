use catalog_server::{Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = setup_environment()?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Catalog server starting");

    let state = ServerState::initialize(&config).await?;

    let server = Server::new(config, state);
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "Server error");
        return Err(e);
    }
    Ok(())
}
