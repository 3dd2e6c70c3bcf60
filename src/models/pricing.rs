//! Modelo de CityPricing
//!
//! Configuración de tarifa por (ciudad, tipo de vehículo). La administra un
//! colaborador externo; para el núcleo es de solo lectura.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// CityPricing - mapea exactamente a la tabla city_pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CityPricing {
    pub id: Uuid,
    pub city_id: Uuid,
    pub vehicle_type_id: Uuid,
    /// Distancia cubierta por la tarifa base
    pub base_km: Decimal,
    pub base_fare: Decimal,
    pub per_km_after_base: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Resultado de una cotización
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareQuote {
    pub city_id: Uuid,
    pub vehicle_type_id: Uuid,
    pub distance_km: Decimal,
    pub fare: Decimal,
}
