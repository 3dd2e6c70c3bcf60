use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::PricingStore;
use crate::models::CityPricing;
use crate::utils::errors::AppResult;

pub struct PricingRepository {
    pool: PgPool,
}

impl PricingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PricingStore for PricingRepository {
    async fn find_pricing(
        &self,
        city_id: Uuid,
        vehicle_type_id: Uuid,
    ) -> AppResult<Option<CityPricing>> {
        let pricing = sqlx::query_as::<_, CityPricing>(
            r#"
            SELECT id, city_id, vehicle_type_id, base_km, base_fare, per_km_after_base, updated_at
            FROM city_pricing
            WHERE city_id = $1 AND vehicle_type_id = $2
            "#,
        )
        .bind(city_id)
        .bind(vehicle_type_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pricing)
    }
}
