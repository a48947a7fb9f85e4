#[tokio::main]
async fn main() -> anyhow::Result<()> {
    backhouse_observability::init();

    let config = backhouse_api::config::AppConfig::from_env();
    let bind_addr = config.bind_addr.clone();

    let app = backhouse_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
