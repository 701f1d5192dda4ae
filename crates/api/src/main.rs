use std::net::SocketAddr;

use minuscule_api::WebConfig;
use minuscule_observability::LogMode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WebConfig::from_env();
    minuscule_observability::init(LogMode::from_production_flag(config.production));

    let app = minuscule_api::app::build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    tracing::info!(addr = %listener.local_addr()?, production = config.production, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
