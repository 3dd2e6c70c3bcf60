//! Calculadora de tarifas
//!
//! Función pura sobre un snapshot inmutable de `CityPricing`. Se puede llamar
//! las veces que haga falta para cotizar antes de reservar.

use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{CityPricing, FareQuote};
use crate::repositories::PricingStore;
use crate::utils::errors::{validation_error, AppError, AppResult};
use crate::utils::validation::validate_distance;

/// Precisión monetaria
pub const CURRENCY_SCALE: u32 = 2;

/// Tarifa para `distance_km` según el pricing dado.
///
/// Hasta `base_km` inclusive se cobra `base_fare`; más allá se suma
/// `per_km_after_base` por km extra. Redondeo hacia arriba a 2 decimales.
/// Un resultado fuera del rango de `Decimal` es un error de validación.
pub fn calculate_fare(pricing: &CityPricing, distance_km: Decimal) -> AppResult<Decimal> {
    let fare = if distance_km <= pricing.base_km {
        Some(pricing.base_fare)
    } else {
        distance_km
            .checked_sub(pricing.base_km)
            .and_then(|extra_km| extra_km.checked_mul(pricing.per_km_after_base))
            .and_then(|extra| pricing.base_fare.checked_add(extra))
    };
    fare.map(|f| f.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::AwayFromZero))
        .ok_or_else(|| validation_error("distance out of range"))
}

pub struct FareService {
    pricing: Arc<dyn PricingStore>,
}

impl FareService {
    pub fn new(pricing: Arc<dyn PricingStore>) -> Self {
        Self { pricing }
    }

    pub async fn compute_fare(
        &self,
        distance_km: Decimal,
        city_id: Uuid,
        vehicle_type_id: Uuid,
    ) -> AppResult<FareQuote> {
        validate_distance(distance_km)?;

        let pricing = self
            .pricing
            .find_pricing(city_id, vehicle_type_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "pricing not configured for city '{}' and vehicle type '{}'",
                    city_id, vehicle_type_id
                ))
            })?;

        let fare = calculate_fare(&pricing, distance_km)?;
        debug!(
            "🧮 Tarifa {} para {} km (city {}, vehicle type {})",
            fare, distance_km, city_id, vehicle_type_id
        );

        Ok(FareQuote {
            city_id,
            vehicle_type_id,
            distance_km,
            fare,
        })
    }
}
