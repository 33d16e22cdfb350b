mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = priceradar_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = priceradar_db::PoolConfig::from_app_config(&config);
    let pool = priceradar_db::connect_pool(&config.database_url, pool_config).await?;
    priceradar_db::run_migrations(&pool).await?;

    let store: Arc<dyn priceradar_engine::ObservationStore> =
        Arc::new(priceradar_db::PgObservationStore::new(pool.clone()));
    let engine = Arc::new(priceradar_engine::NearbyPriceEngine::new(
        Arc::clone(&store),
        config.default_radius_km,
        config.max_radius_km,
    ));
    let ingest = Arc::new(priceradar_engine::ObservationIngest::new(
        Arc::clone(&store),
        config.default_currency.clone(),
        config.max_batch_size,
    ));

    let auth = AuthState::from_config(&config);
    let app = build_app(
        AppState {
            engine,
            ingest,
            pool: Some(pool),
        },
        auth,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "priceradar server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
