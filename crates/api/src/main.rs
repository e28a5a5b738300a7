use anyhow::Context;

use fieldgate_api::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fieldgate_observability::init();

    let settings = Settings::from_env()?;
    let app = fieldgate_api::app::build_app(&settings).await?;

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")
}
