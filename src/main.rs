//! ggufchat server binary
//!
//! Startup sequence: fetch the model artifact, load the engine, serve the chat
//! page. Any failure before the serve loop exits the process with an error.

use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ggufchat::inference::{EngineConfig, GenerationParams, LlamaEngine};
use ggufchat::server::{create_router, AppState};
use ggufchat::storage::huggingface;
use ggufchat::types::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ggufchat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = AppConfig::from_env();
    config.validate();

    info!(
        repo = %config.model.repo_id,
        file = %config.model.filename,
        "Starting ggufchat"
    );

    let models_dir = config.resolve_models_dir()?;
    let model_path = huggingface::fetch(&config.model, &models_dir).await?;
    info!(path = %model_path.display(), "Model artifact ready");

    let engine_config = EngineConfig {
        context_size: config.context_size,
        n_threads: config.n_threads,
        n_batch: config.n_batch,
        template: config.template.clone(),
    };
    // Loading a multi-GB model blocks for a long time
    let engine =
        tokio::task::spawn_blocking(move || LlamaEngine::load(&model_path, engine_config))
            .await??;

    let params = GenerationParams {
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
    };
    let state = AppState::new(engine, params, config.system_prompt.clone());
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
