//! Store en memoria
//!
//! Implementa los tres stores sobre un único `Mutex`. La comprobación del
//! estado esperado y la escritura ocurren bajo el mismo lock, lo que emula
//! el `UPDATE ... WHERE status = $expected` de PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CreditStore, PricingStore, RideStore};
use crate::models::{
    CityPricing, CorporateCreditAccount, CreditDebit, GuardedTransition, NewRide,
    PartnerAssignment, Ride, RideFilter, RideStatus,
};
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Debug, Default)]
struct MemoryState {
    rides: HashMap<Uuid, Ride>,
    pricing: HashMap<(Uuid, Uuid), CityPricing>,
    accounts: HashMap<Uuid, CorporateCreditAccount>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alta o reemplazo de pricing (lo hace el colaborador administrativo)
    pub async fn upsert_pricing(&self, pricing: CityPricing) {
        let mut state = self.state.lock().await;
        state
            .pricing
            .insert((pricing.city_id, pricing.vehicle_type_id), pricing);
    }

    pub async fn upsert_account(&self, account: CorporateCreditAccount) {
        let mut state = self.state.lock().await;
        state.accounts.insert(account.corporate_id, account);
    }

    pub async fn ride_count(&self) -> usize {
        self.state.lock().await.rides.len()
    }
}

#[async_trait]
impl RideStore for InMemoryStore {
    async fn insert(&self, new_ride: NewRide) -> AppResult<Ride> {
        let mut state = self.state.lock().await;
        if state.rides.contains_key(&new_ride.id) {
            return Err(AppError::Conflict(format!(
                "ride with id '{}' already exists",
                new_ride.id
            )));
        }
        let ride = Ride::from_new(new_ride, Utc::now());
        state.rides.insert(ride.id, ride.clone());
        Ok(ride)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Ride>> {
        Ok(self.state.lock().await.rides.get(&id).cloned())
    }

    async fn list(&self, filter: &RideFilter) -> AppResult<Vec<Ride>> {
        let state = self.state.lock().await;
        let mut rides: Vec<Ride> = state
            .rides
            .values()
            .filter(|ride| filter.matches(ride))
            .cloned()
            .collect();
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(rides
            .into_iter()
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }

    async fn assign_partner(
        &self,
        ride_id: Uuid,
        assignment: PartnerAssignment,
    ) -> AppResult<Option<Ride>> {
        let mut state = self.state.lock().await;
        let Some(ride) = state.rides.get_mut(&ride_id) else {
            return Ok(None);
        };
        if ride.status != RideStatus::Pending || ride.partner_id.is_some() {
            return Ok(None);
        }

        ride.partner_id = Some(assignment.partner_id);
        if assignment.vehicle_id.is_some() {
            ride.vehicle_id = assignment.vehicle_id;
        }
        if assignment.vendor_id.is_some() {
            ride.vendor_id = assignment.vendor_id;
        }
        ride.stamp(RideStatus::Accepted, Utc::now());
        Ok(Some(ride.clone()))
    }

    async fn transition(&self, transition: &GuardedTransition) -> AppResult<Option<Ride>> {
        let mut state = self.state.lock().await;
        let Some(ride) = state.rides.get_mut(&transition.ride_id) else {
            return Ok(None);
        };
        if ride.status != transition.from {
            return Ok(None);
        }
        if let Some(partner_id) = transition.partner_id {
            if !ride.is_assigned_to(partner_id) {
                return Ok(None);
            }
        }

        if transition.cancellation_reason.is_some() {
            ride.cancellation_reason = transition.cancellation_reason.clone();
        }
        ride.stamp(transition.to, Utc::now());
        Ok(Some(ride.clone()))
    }

    async fn complete(
        &self,
        ride_id: Uuid,
        partner_id: Uuid,
        debit: Option<CreditDebit>,
    ) -> AppResult<Option<Ride>> {
        let mut state = self.state.lock().await;

        let completable = state
            .rides
            .get(&ride_id)
            .map_or(false, |r| r.status == RideStatus::Started && r.is_assigned_to(partner_id));
        if !completable {
            return Ok(None);
        }

        // Débito primero: si la cuenta no existe no se toca el viaje
        if let Some(debit) = debit {
            let account = state
                .accounts
                .get_mut(&debit.corporate_id)
                .ok_or_else(|| not_found_error("Corporate", &debit.corporate_id))?;
            account.apply_debit(debit.amount)?;
        }

        let ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| not_found_error("Ride", &ride_id))?;
        ride.stamp(RideStatus::Completed, Utc::now());
        Ok(Some(ride.clone()))
    }
}

#[async_trait]
impl PricingStore for InMemoryStore {
    async fn find_pricing(
        &self,
        city_id: Uuid,
        vehicle_type_id: Uuid,
    ) -> AppResult<Option<CityPricing>> {
        let state = self.state.lock().await;
        Ok(state.pricing.get(&(city_id, vehicle_type_id)).cloned())
    }
}

#[async_trait]
impl CreditStore for InMemoryStore {
    async fn find_account(&self, corporate_id: Uuid) -> AppResult<Option<CorporateCreditAccount>> {
        Ok(self.state.lock().await.accounts.get(&corporate_id).cloned())
    }

    async fn debit(
        &self,
        corporate_id: Uuid,
        amount: Decimal,
    ) -> AppResult<Option<CorporateCreditAccount>> {
        let mut state = self.state.lock().await;
        match state.accounts.get_mut(&corporate_id) {
            Some(account) => {
                account.apply_debit(amount)?;
                Ok(Some(account.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_limit(
        &self,
        corporate_id: Uuid,
        new_limit: Decimal,
    ) -> AppResult<Option<CorporateCreditAccount>> {
        let mut state = self.state.lock().await;
        Ok(state.accounts.get_mut(&corporate_id).map(|account| {
            account.apply_limit(new_limit);
            account.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, PaymentMode};

    fn new_ride() -> NewRide {
        let spot = Location {
            latitude: 19.07,
            longitude: 72.87,
            address: "Gate 1".to_string(),
        };
        NewRide {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            vendor_id: None,
            corporate_id: None,
            vehicle_type_id: Uuid::new_v4(),
            city_id: Uuid::new_v4(),
            pickup: spot.clone(),
            drop: spot,
            distance_km: Decimal::new(8, 0),
            fare: Decimal::new(160, 0),
            payment_mode: PaymentMode::Direct,
            otp: "1234".to_string(),
            is_instant_booking: true,
            is_manual_booking: false,
            scheduled_at: None,
        }
    }

    #[tokio::test]
    async fn test_assign_partner_only_once() {
        let store = InMemoryStore::new();
        let ride = store.insert(new_ride()).await.unwrap();

        let first = PartnerAssignment {
            partner_id: Uuid::new_v4(),
            vehicle_id: None,
            vendor_id: None,
        };
        let second = PartnerAssignment {
            partner_id: Uuid::new_v4(),
            ..first
        };

        let won = store.assign_partner(ride.id, first).await.unwrap().unwrap();
        assert_eq!(won.partner_id, Some(first.partner_id));
        assert!(won.accepted_at.is_some());
        assert!(store.assign_partner(ride.id, second).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_with_stale_status_is_noop() {
        let store = InMemoryStore::new();
        let ride = store.insert(new_ride()).await.unwrap();

        let stale = GuardedTransition {
            ride_id: ride.id,
            from: RideStatus::Accepted,
            to: RideStatus::Arrived,
            partner_id: None,
            cancellation_reason: None,
        };
        assert!(store.transition(&stale).await.unwrap().is_none());
        let unchanged = store.find_by_id(ride.id).await.unwrap().unwrap();
        assert_eq!(unchanged, ride);
    }

    #[tokio::test]
    async fn test_complete_with_missing_account_leaves_ride_started() {
        let store = InMemoryStore::new();
        let ride = store.insert(new_ride()).await.unwrap();
        let partner_id = Uuid::new_v4();
        store
            .assign_partner(
                ride.id,
                PartnerAssignment {
                    partner_id,
                    vehicle_id: None,
                    vendor_id: None,
                },
            )
            .await
            .unwrap();
        for (from, to) in [
            (RideStatus::Accepted, RideStatus::Arrived),
            (RideStatus::Arrived, RideStatus::Started),
        ] {
            store
                .transition(&GuardedTransition {
                    ride_id: ride.id,
                    from,
                    to,
                    partner_id: Some(partner_id),
                    cancellation_reason: None,
                })
                .await
                .unwrap()
                .unwrap();
        }

        let debit = CreditDebit {
            corporate_id: Uuid::new_v4(),
            amount: Decimal::new(160, 0),
        };
        let result = store.complete(ride.id, partner_id, Some(debit)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        let current = store.find_by_id(ride.id).await.unwrap().unwrap();
        assert_eq!(current.status, RideStatus::Started);
    }
}
