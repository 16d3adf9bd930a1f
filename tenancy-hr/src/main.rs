use anyhow::Result;
use tenancy_core::Config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = Config::new();
    config.set("http.host", "127.0.0.1");
    config.set("http.port", "3030");
    config.load_env("TENANCY");

    let ax = tenancy_hr::build(config)?;

    if ax.app.config_snapshot().get_bool("seed.demo").unwrap_or(false) {
        let tenants = tenancy_hr::seed::demo(&ax.app).await?;
        info!(count = tenants.len(), "demo tenants seeded");
    }

    let host = ax.app.get("http.host").unwrap_or_else(|| "127.0.0.1".to_string());
    let port = ax.app.get("http.port").unwrap_or_else(|| "3030".to_string());

    ax.listen(format!("{host}:{port}")).await
}
