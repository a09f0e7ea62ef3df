//! Mood Jukebox - Entry Point

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;

use mood_jukebox::{
    config::AppConfig, init_logging, server, MoodClassifier, SqliteCatalog, TrackCatalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("Starting Mood Jukebox");

    let config = AppConfig::load().context("Failed to load configuration")?;
    config
        .validate_for_server()
        .context("Missing required configuration")?;

    info!(
        model_dir = %config.classifier.model_dir.display(),
        load_policy = %config.classifier.load_policy,
        cuda = config.classifier.enable_cuda,
        "Configuration loaded"
    );

    let classifier = Arc::new(load_classifier(&config)?);
    info!(backend = classifier.backend_name(), "Mood classifier ready");

    let database_url = config
        .database
        .url
        .as_deref()
        .context("database.url is not set")?;
    let catalog = SqliteCatalog::connect(database_url, config.database.max_connections)
        .await
        .context("Failed to open track catalog")?;
    let catalog: Arc<dyn TrackCatalog> = Arc::new(catalog);

    let state = server::AppState::new(config.clone(), classifier, catalog);
    let app = server::create_router(state);

    let addr = config
        .server
        .socket_addr()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(%addr, "Server listening");
    info!(
        channel_id = ?config.chat.channel_id,
        "{}",
        mood_jukebox::mood::greeting(&config.chat.bot_name)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Load the ONNX classifier according to the configured policy
#[cfg(feature = "inference")]
fn load_classifier(config: &AppConfig) -> anyhow::Result<MoodClassifier> {
    use mood_jukebox::inference::{
        LoadPolicy, ModelPaths, OnnxClassifier, OnnxOptions, ReloadingClassifier,
    };

    let settings = &config.classifier;
    let paths = ModelPaths::new(
        &settings.model_dir,
        &settings.model_file,
        &settings.tokenizer_file,
    );
    let options = OnnxOptions {
        max_length: settings.max_length,
        intra_threads: settings.intra_threads,
        use_cuda: settings.enable_cuda,
    };

    let classifier = match settings.load_policy {
        LoadPolicy::Once => MoodClassifier::new(
            OnnxClassifier::load(&paths, options).context("Failed to load mood classifier")?,
        ),
        LoadPolicy::PerCall => MoodClassifier::new(
            ReloadingClassifier::new(paths, options)
                .context("Mood classifier artifacts not found")?,
        ),
    };
    Ok(classifier)
}

#[cfg(not(feature = "inference"))]
fn load_classifier(_config: &AppConfig) -> anyhow::Result<MoodClassifier> {
    anyhow::bail!("Built without the `inference` feature; no classifier backend available")
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
