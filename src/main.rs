use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_manager::config::database::DatabaseConfig;
use fleet_manager::config::environment::{EnvironmentConfig, StoreBackend};
use fleet_manager::database::DatabaseConnection;
use fleet_manager::repositories::{FleetStore, InMemoryStore, PgStore};
use fleet_manager::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚚 Fleet Manager API");
    info!("====================");

    let config = EnvironmentConfig::from_env()?;

    let store: Arc<dyn FleetStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let connection = match DatabaseConnection::connect(&db_config).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {:#}", e);
                    return Err(e);
                }
            };
            Arc::new(PgStore::new(connection.pool()))
        }
        StoreBackend::Memory => {
            warn!("⚠️ STORE_BACKEND=memory: los datos se pierden al reiniciar");
            Arc::new(InMemoryStore::new())
        }
    };

    let state = AppState::new(store, config.clone());

    if let Some(bootstrap) = &config.bootstrap_admin {
        state.auth.ensure_bootstrap_admin(bootstrap).await?;
    }

    let app = create_app(state);
    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   POST /auth/login · GET /auth/me");
    info!("   POST|GET /requests/:type · GET|PATCH /requests/:type/:id");
    info!("   POST|GET /users · GET|DELETE /users/:id · PATCH /users/:id/status");
    info!("   POST|GET /vehicles · GET|PATCH|DELETE /vehicles/:id");
    info!("   GET /audit · GET /audit/export");
    info!("   GET /reconciliation/vehicle-conditions · POST /reconciliation/vehicle-conditions/repair");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
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
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal SIGTERM recibida, apagando servidor...");
        },
    }
}
