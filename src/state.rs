//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::notifications::NotificationBus;
use crate::repositories::{CreditStore, PricingStore, RideStore};
use crate::services::{CreditService, FareService, NotificationService, RideService};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub rides: Arc<RideService>,
    pub credit: Arc<CreditService>,
}

impl AppState {
    /// Cablea los servicios sobre los stores y el transporte elegidos
    pub fn new(
        config: EnvironmentConfig,
        rides: Arc<dyn RideStore>,
        pricing: Arc<dyn PricingStore>,
        credit: Arc<dyn CreditStore>,
        bus: Arc<dyn NotificationBus>,
    ) -> Self {
        let credit = Arc::new(CreditService::new(credit));
        let ride_service = RideService::new(
            rides,
            FareService::new(pricing),
            credit.clone(),
            NotificationService::new(bus),
        );

        Self {
            config,
            rides: Arc::new(ride_service),
            credit,
        }
    }
}
