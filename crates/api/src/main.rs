use std::sync::Arc;

use anyhow::Context;

use gatehouse_api::config::ApiConfig;
use gatehouse_infra::InMemoryGrantStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatehouse_observability::init();

    let config = ApiConfig::from_env().context("reading configuration")?;

    let store = Arc::new(InMemoryGrantStore::new());
    if let Some(admin) = &config.bootstrap_admin {
        gatehouse_api::bootstrap::seed_admin(store.as_ref(), admin)
            .await
            .context("seeding bootstrap administrator")?;
    }

    let app = gatehouse_api::app::build_app(&config, store);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
