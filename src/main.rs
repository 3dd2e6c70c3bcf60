use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use ride_dispatch::config::{
    database::run_migrations, DatabaseConfig, EnvironmentConfig, NotificationBackend,
    StoreBackend,
};
use ride_dispatch::notifications::broadcast_bus::PRUNE_INTERVAL;
use ride_dispatch::notifications::{BroadcastBus, NotificationBus, RedisBus};
use ride_dispatch::repositories::{
    CorporateRepository, CreditStore, InMemoryStore, PricingRepository, PricingStore,
    RideRepository, RideStore,
};
use ride_dispatch::{create_router, AppState};

type Stores = (Arc<dyn RideStore>, Arc<dyn PricingStore>, Arc<dyn CreditStore>);

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🚕 Ride Dispatch - núcleo de despacho");
    info!("================================================");
    info!("🌍 Entorno: {}", config.environment);

    let (rides, pricing, credit) = match build_stores(config.store_backend).await {
        Ok(stores) => stores,
        Err(e) => {
            error!("❌ Error inicializando el store: {}", e);
            return Err(e);
        }
    };

    let bus: Arc<dyn NotificationBus> = match config.notification_backend {
        NotificationBackend::Memory => {
            info!(
                "📡 Bus de notificaciones en proceso (capacidad {})",
                config.broadcast_capacity
            );
            let bus = BroadcastBus::new(config.broadcast_capacity);
            bus.spawn_pruner(PRUNE_INTERVAL);
            Arc::new(bus)
        }
        NotificationBackend::Redis => {
            let (bus, _publisher) =
                RedisBus::connect(&config.redis_url, &config.notification_channel_prefix).await?;
            Arc::new(bus)
        }
    };

    let addr = config.server_url();
    let app = create_router(AppState::new(config, rides, pricing, credit, bus));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🚕 Rides:");
    info!("   POST /api/rides - Reservar viaje");
    info!("   POST /api/rides/manual - Reserva manual (agente/admin)");
    info!("   POST /api/rides/quote - Cotizar tarifa");
    info!("   GET  /api/rides - Listar viajes");
    info!("   GET  /api/rides/:id - Obtener viaje");
    info!("   POST /api/rides/:id/accept - Aceptar viaje");
    info!("   PUT  /api/rides/:id/status - ARRIVED / STARTED");
    info!("   POST /api/rides/:id/complete - Completar con OTP");
    info!("   POST /api/rides/:id/cancel - Cancelar viaje");
    info!("   PUT  /api/rides/:id/location - Ubicación del partner");
    info!("   GET  /api/rides/:id/location - Última ubicación");
    info!("💳 Corporates:");
    info!("   PUT  /api/corporates/:id/credit-limit - Actualizar límite");
    info!("   GET  /api/corporates/:id/credit - Consultar crédito");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Servidor terminó con error: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

async fn build_stores(backend: StoreBackend) -> Result<Stores> {
    match backend {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = db_config.create_pool().await?;
            run_migrations(&pool).await?;
            info!("✅ PostgreSQL listo");
            let rides: Arc<dyn RideStore> = Arc::new(RideRepository::new(pool.clone()));
            let pricing: Arc<dyn PricingStore> = Arc::new(PricingRepository::new(pool.clone()));
            let credit: Arc<dyn CreditStore> = Arc::new(CorporateRepository::new(pool));
            Ok((rides, pricing, credit))
        }
        StoreBackend::Memory => {
            warn!("⚠️ STORE_BACKEND=memory: los datos se pierden al reiniciar");
            let store = Arc::new(InMemoryStore::new());
            let rides: Arc<dyn RideStore> = store.clone();
            let pricing: Arc<dyn PricingStore> = store.clone();
            let credit: Arc<dyn CreditStore> = store;
            Ok((rides, pricing, credit))
        }
    }
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
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
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
