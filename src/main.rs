use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use facility_registry as registry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = registry::config::load_config()?;
    registry::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = registry::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        registry::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_sender, event_rx) = registry::events::channel(cfg.event_channel_capacity);
    let notifier: Arc<dyn registry::events::FacilityChangeNotifier> =
        Arc::new(registry::events::LoggingNotifier);
    tokio::spawn(registry::events::process_events(event_rx, notifier));

    let app_state = registry::AppState::new(db_arc.clone(), cfg.clone(), event_sender);
    let app = registry::build_router(app_state);

    // Bind and serve
    let addr = cfg.bind_addr();
    info!("facility-registry listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped; closing database pool");
    if let Ok(pool) = Arc::try_unwrap(db_arc) {
        registry::db::close_pool(pool).await?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
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
