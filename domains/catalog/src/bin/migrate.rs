// Volha catalog - apply the embedded schema to DATABASE_URL

use tracing::{error, info};

use volha_common::{connect, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .init();

    info!("Configuration loaded successfully");

    let pool = connect(&config).await.map_err(|e| {
        error!("Failed to connect to database: {}", e);
        anyhow::anyhow!("Database connection failed: {}", e)
    })?;

    info!("Database connection established");

    volha_catalog::migrate(&pool).await.map_err(|e| {
        error!("Failed to apply migrations: {}", e);
        anyhow::anyhow!("Migration failed: {}", e)
    })?;

    info!("Catalog schema is up to date");
    pool.close().await;
    Ok(())
}
