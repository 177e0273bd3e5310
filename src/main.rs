use anyhow::Context;
use launchgate_lib::bootstrap::{
    init_tracing_subscriber, load_or_default, resolve_settings, run_app,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_or_default().context("Failed to load configuration")?;
    let settings = resolve_settings(&config).context("Failed to resolve settings")?;

    init_tracing_subscriber(settings.log_dir.as_deref())
        .context("Failed to initialize tracing")?;
    tracing::info!(
        deadline_ms = settings.bootstrap_deadline.as_millis() as u64,
        data_dir = %settings.data_dir.display(),
        "launchgate starting"
    );

    run_app(settings).await
}
