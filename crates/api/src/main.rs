use anyhow::Result;
use voyage_api::build_app;
use voyage_core::VoyageConfig;
use voyage_observability::{init_tracing, LogSink};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("voyage_api", LogSink::Stdout);

    let config = VoyageConfig::from_env();
    let app = build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(
        bind = %config.bind,
        model = %config.gemini_model,
        model_configured = config.model_configured(),
        "voyage planner api started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
