//! Repositorios
//!
//! Interfaces de almacenamiento que consume el núcleo y sus implementaciones:
//! PostgreSQL (sqlx) para producción y `InMemoryStore` para tests y demos.
//!
//! Toda escritura de estado es condicional sobre el estado actual. Un
//! `Ok(None)` en una escritura condicional significa "cero filas afectadas".

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    CityPricing, CorporateCreditAccount, CreditDebit, GuardedTransition, NewRide,
    PartnerAssignment, Ride, RideFilter,
};
use crate::utils::errors::AppResult;

pub mod corporate_repository;
pub mod memory;
pub mod pricing_repository;
pub mod ride_repository;

pub use corporate_repository::CorporateRepository;
pub use memory::InMemoryStore;
pub use pricing_repository::PricingRepository;
pub use ride_repository::RideRepository;

#[async_trait]
pub trait RideStore: Send + Sync {
    async fn insert(&self, new_ride: NewRide) -> AppResult<Ride>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Ride>>;

    async fn list(&self, filter: &RideFilter) -> AppResult<Vec<Ride>>;

    /// PENDING -> ACCEPTED en una sola escritura condicional
    /// (`status = PENDING AND partner_id IS NULL`).
    async fn assign_partner(
        &self,
        ride_id: Uuid,
        assignment: PartnerAssignment,
    ) -> AppResult<Option<Ride>>;

    async fn transition(&self, transition: &GuardedTransition) -> AppResult<Option<Ride>>;

    /// STARTED -> COMPLETED. El débito corporativo, si lo hay, se aplica en la
    /// misma transacción.
    async fn complete(
        &self,
        ride_id: Uuid,
        partner_id: Uuid,
        debit: Option<CreditDebit>,
    ) -> AppResult<Option<Ride>>;
}

#[async_trait]
pub trait PricingStore: Send + Sync {
    async fn find_pricing(
        &self,
        city_id: Uuid,
        vehicle_type_id: Uuid,
    ) -> AppResult<Option<CityPricing>>;
}

#[async_trait]
pub trait CreditStore: Send + Sync {
    async fn find_account(&self, corporate_id: Uuid) -> AppResult<Option<CorporateCreditAccount>>;

    /// `credit_used += amount` y recálculo del balance, serializado por corporate
    async fn debit(
        &self,
        corporate_id: Uuid,
        amount: Decimal,
    ) -> AppResult<Option<CorporateCreditAccount>>;

    async fn update_limit(
        &self,
        corporate_id: Uuid,
        new_limit: Decimal,
    ) -> AppResult<Option<CorporateCreditAccount>>;
}
