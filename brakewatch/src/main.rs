use brakewatch::{config, model, observability, server};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Init
    observability::init_tracing();
    let metrics_handle = observability::init_metrics()?;

    // 2. Load Config
    let config = config::AppConfig::load()?;

    // 3. Resolve and load the model once; a failure degrades /predict, it does not stop startup
    let resolver = model::Resolver::from_config(&config.model);
    let outcome = model::loader::load_at_startup(&resolver, &config.model.tracking_uri);
    observability::record_model_loaded(outcome.is_loaded());
    match &outcome {
        model::LoadOutcome::Loaded { location, .. } => info!(%location, "Model ready"),
        model::LoadOutcome::Failed(failure) => {
            warn!(error = %failure.message, "Serving without a model")
        }
    }
    if config.errors.expose_details {
        warn!("Error details are exposed in responses; do not enable this in production");
    }

    // 4. Create Router
    let state = server::types::AppState::new(outcome).with_details(config.errors.expose_details);
    let app = server::routes::create_router(state, metrics_handle);

    // 5. Bind & Serve
    let listener =
        TcpListener::bind(format!("{}:{}", config.server.host, config.server.port)).await?;
    info!(
        "Server listening on http://{}:{}",
        config.server.host, config.server.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
