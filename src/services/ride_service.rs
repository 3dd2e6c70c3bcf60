//! Servicio de ciclo de vida del viaje
//!
//! Orquesta la máquina de estados: cada operación sigue el mismo orden de
//! comprobaciones (existencia, arista legal, actor, compuerta, escritura
//! condicional) y publica el fan-out solo después de que el store confirma.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::ride_dto::{
    AcceptRideRequest, CancelRideRequest, CreateManualRideRequest, CreateRideRequest,
    FareQuoteRequest, LocationUpdateRequest,
};
use crate::models::{
    FareQuote, GuardedTransition, Identity, NewRide, PartnerAssignment, PaymentMode, Ride,
    RideAction, RideFilter, RideStatus, RideStatusUpdate,
};
use crate::notifications::PartnerLocation;
use crate::repositories::RideStore;
use crate::services::credit_service::CreditService;
use crate::services::fare_service::FareService;
use crate::services::notification_service::NotificationService;
use crate::services::otp_service::{generate_otp, verify_otp};
use crate::utils::errors::{
    forbidden_error, not_found_error, validation_error, AppError, AppResult,
};
use crate::utils::validation::{
    decimal_from_f64, validate_cancellation_reason, validate_coordinates,
};

/// Quién reserva y en nombre de quién
struct Booking {
    user_id: Uuid,
    created_by: Uuid,
    is_manual_booking: bool,
    scheduled_at: Option<chrono::DateTime<Utc>>,
}

/// Un carril por viaje: la escritura condicional y la publicación de su
/// evento se hacen sin que otra transición del mismo viaje se intercale.
#[derive(Default)]
struct RideLanes {
    lanes: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl RideLanes {
    async fn enter(&self, ride_id: Uuid) -> OwnedMutexGuard<()> {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
            lanes.entry(ride_id).or_default().clone()
        };
        lane.lock_owned().await
    }

    /// Tras un estado terminal ya no habrá más eventos del viaje
    fn close(&self, ride_id: Uuid) {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ride_id);
    }
}

pub struct RideService {
    rides: Arc<dyn RideStore>,
    fares: FareService,
    credit: Arc<CreditService>,
    notifier: NotificationService,
    lanes: RideLanes,
}

impl RideService {
    pub fn new(
        rides: Arc<dyn RideStore>,
        fares: FareService,
        credit: Arc<CreditService>,
        notifier: NotificationService,
    ) -> Self {
        Self {
            rides,
            fares,
            credit,
            notifier,
            lanes: RideLanes::default(),
        }
    }

    /// Cotización sin efectos: nunca crea un viaje
    pub async fn quote_fare(&self, request: &FareQuoteRequest) -> AppResult<FareQuote> {
        let distance_km = decimal_from_f64(request.distance_km, "distance_km")?;
        self.fares
            .compute_fare(distance_km, request.city_id, request.vehicle_type_id)
            .await
    }

    /// Reserva instantánea hecha por el propio usuario
    pub async fn create_ride(
        &self,
        caller: &Identity,
        request: CreateRideRequest,
    ) -> AppResult<Ride> {
        let user_id = match *caller {
            Identity::User(id) => id,
            _ => return Err(forbidden_error("create ride", "only users can book rides")),
        };

        self.book(
            request,
            Booking {
                user_id,
                created_by: user_id,
                is_manual_booking: false,
                scheduled_at: None,
            },
        )
        .await
    }

    /// Reserva manual de un agente o admin en nombre de un usuario
    pub async fn create_manual_ride(
        &self,
        caller: &Identity,
        request: CreateManualRideRequest,
    ) -> AppResult<Ride> {
        if !matches!(caller, Identity::Agent(_) | Identity::Admin(_)) {
            return Err(forbidden_error(
                "create manual ride",
                "only agents and admins can book on behalf of a user",
            ));
        }
        request.validate()?;

        if let Some(scheduled_at) = request.scheduled_at {
            if scheduled_at <= Utc::now() {
                return Err(validation_error("scheduled_at must be in the future"));
            }
        }

        self.book(
            request.ride,
            Booking {
                user_id: request.user_id,
                created_by: caller.id(),
                is_manual_booking: true,
                scheduled_at: request.scheduled_at,
            },
        )
        .await
    }

    async fn book(&self, request: CreateRideRequest, booking: Booking) -> AppResult<Ride> {
        request.validate()?;
        validate_coordinates(request.pickup.latitude, request.pickup.longitude)?;
        validate_coordinates(request.drop.latitude, request.drop.longitude)?;

        match (request.payment_mode, request.corporate_id) {
            (PaymentMode::Corporate, None) => {
                return Err(validation_error(
                    "corporate_id is required for corporate payment",
                ))
            }
            (PaymentMode::Direct | PaymentMode::Gateway, Some(_)) => {
                return Err(validation_error(
                    "corporate_id is only allowed for corporate payment",
                ))
            }
            _ => {}
        }

        let distance_km = decimal_from_f64(request.distance_km, "distance_km")?;
        let quote = self
            .fares
            .compute_fare(distance_km, request.city_id, request.vehicle_type_id)
            .await?;

        if let Some(corporate_id) = request.corporate_id {
            self.credit.check_credit(corporate_id, quote.fare).await?;
        }

        let new_ride = NewRide {
            id: Uuid::new_v4(),
            user_id: booking.user_id,
            created_by: booking.created_by,
            vendor_id: request.vendor_id,
            corporate_id: request.corporate_id,
            vehicle_type_id: request.vehicle_type_id,
            city_id: request.city_id,
            pickup: request.pickup.into(),
            drop: request.drop.into(),
            distance_km,
            fare: quote.fare,
            payment_mode: request.payment_mode,
            otp: generate_otp(),
            is_instant_booking: !booking.is_manual_booking,
            is_manual_booking: booking.is_manual_booking,
            scheduled_at: booking.scheduled_at,
        };

        let ride = self.rides.insert(new_ride).await?;
        info!(
            "🚕 Ride {} creado para user {} (tarifa {}, {:?})",
            ride.id, ride.user_id, ride.fare, ride.payment_mode
        );

        self.notifier.ride_created(&ride);
        Ok(ride)
    }

    async fn load(&self, ride_id: Uuid) -> AppResult<Ride> {
        self.rides
            .find_by_id(ride_id)
            .await?
            .ok_or_else(|| not_found_error("Ride", &ride_id))
    }

    /// El primer partner que confirma la escritura condicional gana
    pub async fn accept_ride(
        &self,
        caller: &Identity,
        ride_id: Uuid,
        request: AcceptRideRequest,
    ) -> AppResult<Ride> {
        let _lane = self.lanes.enter(ride_id).await;
        let ride = self.load(ride_id).await?;
        if ride.partner_id.is_some() {
            return Err(AppError::Conflict("ride already accepted".to_string()));
        }
        ride.status.apply(RideAction::Accept)?;

        let partner_id = caller
            .partner_id()
            .ok_or_else(|| forbidden_error("accept ride", "only partners can accept rides"))?;

        let assignment = PartnerAssignment {
            partner_id,
            vehicle_id: request.vehicle_id,
            vendor_id: request.vendor_id,
        };

        let accepted = match self.rides.assign_partner(ride_id, assignment).await? {
            Some(ride) => ride,
            None => {
                info!("🏁 Partner {} perdió la carrera por ride {}", partner_id, ride_id);
                return Err(AppError::Conflict("ride already accepted".to_string()));
            }
        };

        info!("✅ Ride {} aceptado por partner {}", ride_id, partner_id);
        self.notifier.ride_accepted(&accepted);
        Ok(accepted)
    }

    /// ACCEPTED -> ARRIVED y ARRIVED -> STARTED, solo el partner asignado
    pub async fn update_ride_status(
        &self,
        caller: &Identity,
        ride_id: Uuid,
        update: RideStatusUpdate,
    ) -> AppResult<Ride> {
        let action = update.action();
        let _lane = self.lanes.enter(ride_id).await;
        let ride = self.load(ride_id).await?;
        let next = ride.status.apply(action)?;
        let partner_id = self.assigned_partner(caller, &ride, action)?;

        let transition = GuardedTransition {
            ride_id,
            from: ride.status,
            to: next,
            partner_id: Some(partner_id),
            cancellation_reason: None,
        };
        let updated = self.guarded_write(&transition, action).await?;

        info!("🚦 Ride {} {} -> {}", ride_id, ride.status, updated.status);
        self.notifier.ride_progressed(&updated);
        Ok(updated)
    }

    /// STARTED -> COMPLETED tras validar el OTP. Un OTP erróneo deja el viaje
    /// en STARTED y se puede reintentar.
    pub async fn complete_ride(
        &self,
        caller: &Identity,
        ride_id: Uuid,
        otp: &str,
    ) -> AppResult<Ride> {
        let _lane = self.lanes.enter(ride_id).await;
        let ride = self.load(ride_id).await?;
        ride.status.apply(RideAction::Complete)?;
        let partner_id = self.assigned_partner(caller, &ride, RideAction::Complete)?;

        if let Err(err) = verify_otp(&ride.otp, otp) {
            warn!("🔐 OTP inválido para ride {} (partner {})", ride_id, partner_id);
            return Err(err);
        }

        let debit = CreditService::debit_for(&ride)?;
        let completed = self
            .rides
            .complete(ride_id, partner_id, debit)
            .await?
            .ok_or_else(|| lost_race(RideAction::Complete, ride_id))?;

        if let Some(debit) = debit {
            info!(
                "💳 Corporate {} debitado {} por ride {}",
                debit.corporate_id, debit.amount, ride_id
            );
        }
        info!("🏁 Ride {} completado", ride_id);
        self.notifier.ride_progressed(&completed);
        self.lanes.close(ride_id);
        Ok(completed)
    }

    /// Cancelación desde cualquier estado no terminal
    pub async fn cancel_ride(
        &self,
        caller: &Identity,
        ride_id: Uuid,
        request: CancelRideRequest,
    ) -> AppResult<Ride> {
        let _lane = self.lanes.enter(ride_id).await;
        let ride = self.load(ride_id).await?;
        let next = ride.status.apply(RideAction::Cancel)?;

        let allowed = match *caller {
            Identity::User(id) => ride.user_id == id,
            Identity::Partner(id) => ride.is_assigned_to(id),
            Identity::Admin(_) => true,
            Identity::Agent(id) => ride.created_by == id,
            Identity::Vendor(_) | Identity::Corporate(_) => false,
        };
        if !allowed {
            return Err(forbidden_error(
                "cancel ride",
                "only the rider, the assigned partner or an admin can cancel",
            ));
        }

        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        validate_cancellation_reason(reason.as_deref())?;

        let transition = GuardedTransition {
            ride_id,
            from: ride.status,
            to: next,
            partner_id: None,
            cancellation_reason: reason,
        };
        let cancelled = self.guarded_write(&transition, RideAction::Cancel).await?;

        info!(
            "🛑 Ride {} cancelado por {} desde {}",
            ride_id, caller, ride.status
        );
        self.notifier.ride_cancelled(&ride, &cancelled, caller);
        self.lanes.close(ride_id);
        Ok(cancelled)
    }

    pub async fn get_ride(&self, caller: &Identity, ride_id: Uuid) -> AppResult<Ride> {
        let ride = self.load(ride_id).await?;
        if !can_view(caller, &ride) {
            return Err(forbidden_error("view ride", "ride is not visible to caller"));
        }
        Ok(ride)
    }

    /// Listado con alcance por rol; los filtros explícitos se aplican encima
    pub async fn list_rides(
        &self,
        caller: &Identity,
        mut filter: RideFilter,
    ) -> AppResult<Vec<Ride>> {
        match *caller {
            Identity::User(id) => filter.user_id = Some(id),
            Identity::Partner(id) => filter.visible_to_partner = Some(id),
            Identity::Vendor(id) => filter.vendor_id = Some(id),
            Identity::Corporate(id) => filter.corporate_id = Some(id),
            Identity::Admin(_) | Identity::Agent(_) => {}
        }
        self.rides.list(&filter).await
    }

    /// Ubicación en vivo del partner asignado, solo a `ride:{id}`
    pub async fn update_partner_location(
        &self,
        caller: &Identity,
        ride_id: Uuid,
        request: &LocationUpdateRequest,
    ) -> AppResult<PartnerLocation> {
        let ride = self.load(ride_id).await?;
        if !ride.status.is_in_progress() {
            return Err(AppError::Conflict(format!(
                "cannot track a ride that is {}",
                ride.status
            )));
        }

        let partner_id = match caller.partner_id() {
            Some(id) if ride.is_assigned_to(id) => id,
            _ => {
                return Err(forbidden_error(
                    "update location",
                    "only the assigned partner can report location",
                ))
            }
        };

        request.validate()?;
        validate_coordinates(request.latitude, request.longitude)?;

        Ok(self
            .notifier
            .partner_location(ride_id, partner_id, request.latitude, request.longitude))
    }

    pub async fn last_location(
        &self,
        caller: &Identity,
        ride_id: Uuid,
    ) -> AppResult<PartnerLocation> {
        self.get_ride(caller, ride_id).await?;
        self.notifier.last_location(ride_id).ok_or_else(|| {
            AppError::NotFound(format!("no location recorded for ride '{}'", ride_id))
        })
    }

    fn assigned_partner(
        &self,
        caller: &Identity,
        ride: &Ride,
        action: RideAction,
    ) -> AppResult<Uuid> {
        match caller.partner_id() {
            Some(id) if ride.is_assigned_to(id) => Ok(id),
            _ => Err(forbidden_error(
                action.verb(),
                "only the assigned partner can do this",
            )),
        }
    }

    async fn guarded_write(
        &self,
        transition: &GuardedTransition,
        action: RideAction,
    ) -> AppResult<Ride> {
        self.rides
            .transition(transition)
            .await?
            .ok_or_else(|| lost_race(action, transition.ride_id))
    }
}

fn lost_race(action: RideAction, ride_id: Uuid) -> AppError {
    warn!("⚔️ Escritura condicional perdida: {} ride {}", action.verb(), ride_id);
    AppError::Conflict(format!(
        "cannot {} ride '{}': it changed state concurrently",
        action.verb(),
        ride_id
    ))
}

fn can_view(caller: &Identity, ride: &Ride) -> bool {
    match *caller {
        Identity::User(id) => ride.user_id == id,
        Identity::Partner(id) => ride.is_assigned_to(id) || ride.status == RideStatus::Pending,
        Identity::Vendor(id) => ride.vendor_id == Some(id),
        Identity::Corporate(id) => ride.corporate_id == Some(id),
        Identity::Admin(_) | Identity::Agent(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ride_dto::LocationInput;
    use crate::models::{CityPricing, CorporateCreditAccount};
    use crate::notifications::{BroadcastBus, Channel, RideEventKind};
    use crate::repositories::InMemoryStore;
    use rust_decimal::Decimal;

    struct Fixture {
        service: RideService,
        store: InMemoryStore,
        bus: Arc<BroadcastBus>,
        pricing: CityPricing,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let pricing = CityPricing {
            id: Uuid::new_v4(),
            city_id: Uuid::new_v4(),
            vehicle_type_id: Uuid::new_v4(),
            base_km: Decimal::new(5, 0),
            base_fare: Decimal::new(100, 0),
            per_km_after_base: Decimal::new(20, 0),
            updated_at: Utc::now(),
        };
        store.upsert_pricing(pricing.clone()).await;

        let bus = Arc::new(BroadcastBus::default());
        let shared = Arc::new(store.clone());
        let service = RideService::new(
            shared.clone(),
            FareService::new(shared.clone()),
            Arc::new(CreditService::new(shared)),
            NotificationService::new(bus.clone()),
        );
        Fixture {
            service,
            store,
            bus,
            pricing,
        }
    }

    fn request(pricing: &CityPricing, distance_km: f64) -> CreateRideRequest {
        CreateRideRequest {
            vehicle_type_id: pricing.vehicle_type_id,
            city_id: pricing.city_id,
            pickup: LocationInput {
                latitude: 19.07,
                longitude: 72.87,
                address: "Bandra West".to_string(),
            },
            drop: LocationInput {
                latitude: 19.11,
                longitude: 72.90,
                address: "Powai".to_string(),
            },
            distance_km,
            payment_mode: PaymentMode::Direct,
            corporate_id: None,
            vendor_id: None,
        }
    }

    async fn started_ride(f: &Fixture, partner: Identity) -> Ride {
        let user = Identity::User(Uuid::new_v4());
        let ride = f
            .service
            .create_ride(&user, request(&f.pricing, 8.0))
            .await
            .unwrap();
        f.service
            .accept_ride(&partner, ride.id, AcceptRideRequest::default())
            .await
            .unwrap();
        f.service
            .update_ride_status(&partner, ride.id, RideStatusUpdate::Arrived)
            .await
            .unwrap();
        f.service
            .update_ride_status(&partner, ride.id, RideStatusUpdate::Started)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_ride_computes_fare_and_otp() {
        let f = fixture().await;
        let user = Identity::User(Uuid::new_v4());
        let ride = f
            .service
            .create_ride(&user, request(&f.pricing, 8.0))
            .await
            .unwrap();

        assert_eq!(ride.status, RideStatus::Pending);
        assert_eq!(ride.fare, Decimal::new(160, 0));
        assert_eq!(ride.otp.len(), 4);
        assert!(ride.is_instant_booking);
        assert!(ride.partner_id.is_none());
    }

    #[tokio::test]
    async fn test_only_users_book_instant_rides() {
        let f = fixture().await;
        let partner = Identity::Partner(Uuid::new_v4());
        let result = f.service.create_ride(&partner, request(&f.pricing, 3.0)).await;
        assert!(matches!(result, Err(AppError::Authorization(_))));
        assert_eq!(f.store.ride_count().await, 0);
    }

    #[tokio::test]
    async fn test_corporate_payment_requires_corporate_id() {
        let f = fixture().await;
        let user = Identity::User(Uuid::new_v4());
        let mut req = request(&f.pricing, 3.0);
        req.payment_mode = PaymentMode::Corporate;
        let result = f.service.create_ride(&user, req).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_insufficient_credit_creates_nothing() {
        let f = fixture().await;
        let corporate_id = Uuid::new_v4();
        f.store
            .upsert_account(CorporateCreditAccount::new(corporate_id, Decimal::new(150, 0)))
            .await;

        let user = Identity::User(Uuid::new_v4());
        let mut req = request(&f.pricing, 8.0);
        req.payment_mode = PaymentMode::Corporate;
        req.corporate_id = Some(corporate_id);

        let result = f.service.create_ride(&user, req).await;
        assert!(matches!(result, Err(AppError::InsufficientCredit { .. })));
        assert_eq!(f.store.ride_count().await, 0);
    }

    #[tokio::test]
    async fn test_manual_booking_by_agent() {
        let f = fixture().await;
        let agent = Identity::Agent(Uuid::new_v4());
        let user_id = Uuid::new_v4();
        let scheduled_at = Utc::now() + chrono::Duration::hours(2);

        let ride = f
            .service
            .create_manual_ride(
                &agent,
                CreateManualRideRequest {
                    user_id,
                    ride: request(&f.pricing, 4.0),
                    scheduled_at: Some(scheduled_at),
                },
            )
            .await
            .unwrap();

        assert_eq!(ride.user_id, user_id);
        assert_eq!(ride.created_by, agent.id());
        assert!(ride.is_manual_booking);
        assert!(!ride.is_instant_booking);
        assert_eq!(ride.scheduled_at, Some(scheduled_at));

        // El agente que la creó puede cancelarla
        let cancelled = f
            .service
            .cancel_ride(&agent, ride.id, CancelRideRequest::default())
            .await
            .unwrap();
        assert_eq!(cancelled.status, RideStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_manual_booking_rejects_past_schedule() {
        let f = fixture().await;
        let admin = Identity::Admin(Uuid::new_v4());
        let result = f
            .service
            .create_manual_ride(
                &admin,
                CreateManualRideRequest {
                    user_id: Uuid::new_v4(),
                    ride: request(&f.pricing, 4.0),
                    scheduled_at: Some(Utc::now() - chrono::Duration::minutes(5)),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_second_accept_conflicts() {
        let f = fixture().await;
        let user = Identity::User(Uuid::new_v4());
        let ride = f
            .service
            .create_ride(&user, request(&f.pricing, 3.0))
            .await
            .unwrap();

        let a = Identity::Partner(Uuid::new_v4());
        let b = Identity::Partner(Uuid::new_v4());
        let vehicle_id = Uuid::new_v4();
        let accepted = f
            .service
            .accept_ride(
                &a,
                ride.id,
                AcceptRideRequest {
                    vehicle_id: Some(vehicle_id),
                    vendor_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(accepted.partner_id, Some(a.id()));
        assert_eq!(accepted.vehicle_id, Some(vehicle_id));

        let err = f
            .service
            .accept_ride(&b, ride.id, AcceptRideRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Conflict: ride already accepted");
    }

    #[tokio::test]
    async fn test_only_assigned_partner_moves_the_ride() {
        let f = fixture().await;
        let user = Identity::User(Uuid::new_v4());
        let partner = Identity::Partner(Uuid::new_v4());
        let ride = f
            .service
            .create_ride(&user, request(&f.pricing, 3.0))
            .await
            .unwrap();
        f.service
            .accept_ride(&partner, ride.id, AcceptRideRequest::default())
            .await
            .unwrap();

        let intruder = Identity::Partner(Uuid::new_v4());
        let result = f
            .service
            .update_ride_status(&intruder, ride.id, RideStatusUpdate::Arrived)
            .await;
        assert!(matches!(result, Err(AppError::Authorization(_))));

        // Saltar ARRIVED es un conflicto antes que un problema de actor
        let result = f
            .service
            .update_ride_status(&intruder, ride.id, RideStatusUpdate::Started)
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_wrong_otp_keeps_ride_started() {
        let f = fixture().await;
        let partner = Identity::Partner(Uuid::new_v4());
        let ride = started_ride(&f, partner).await;
        let wrong = if ride.otp == "0000" { "1111" } else { "0000" };

        let result = f.service.complete_ride(&partner, ride.id, wrong).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        let current = f.service.get_ride(&partner, ride.id).await.unwrap();
        assert_eq!(current.status, RideStatus::Started);
        assert!(current.completed_at.is_none());

        let completed = f
            .service
            .complete_ride(&partner, ride.id, &ride.otp)
            .await
            .unwrap();
        assert_eq!(completed.status, RideStatus::Completed);
        assert!(completed.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_after_accept_clears_partner_and_notifies_it() {
        let f = fixture().await;
        let user = Identity::User(Uuid::new_v4());
        let partner = Identity::Partner(Uuid::new_v4());
        let mut partner_rx = f.bus.subscribe(Channel::Partner(partner.id()));

        let ride = f
            .service
            .create_ride(&user, request(&f.pricing, 3.0))
            .await
            .unwrap();
        f.service
            .accept_ride(&partner, ride.id, AcceptRideRequest::default())
            .await
            .unwrap();

        let cancelled = f
            .service
            .cancel_ride(
                &user,
                ride.id,
                CancelRideRequest {
                    reason: Some("  plans changed ".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(cancelled.partner_id.is_none());
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("plans changed"));

        assert_eq!(partner_rx.recv().await.unwrap().kind, RideEventKind::RideAssigned);
        assert_eq!(
            partner_rx.recv().await.unwrap().kind,
            RideEventKind::RideCancelledByUser
        );

        let again = f
            .service
            .cancel_ride(&user, ride.id, CancelRideRequest::default())
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_stranger_cannot_cancel() {
        let f = fixture().await;
        let user = Identity::User(Uuid::new_v4());
        let ride = f
            .service
            .create_ride(&user, request(&f.pricing, 3.0))
            .await
            .unwrap();
        let other = Identity::User(Uuid::new_v4());
        let result = f
            .service
            .cancel_ride(&other, ride.id, CancelRideRequest::default())
            .await;
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_listing_is_scoped_by_role() {
        let f = fixture().await;
        let alice = Identity::User(Uuid::new_v4());
        let bob = Identity::User(Uuid::new_v4());
        let partner = Identity::Partner(Uuid::new_v4());

        let mine = f
            .service
            .create_ride(&alice, request(&f.pricing, 3.0))
            .await
            .unwrap();
        let open = f
            .service
            .create_ride(&bob, request(&f.pricing, 3.0))
            .await
            .unwrap();
        f.service
            .accept_ride(&partner, mine.id, AcceptRideRequest::default())
            .await
            .unwrap();

        let for_alice = f
            .service
            .list_rides(&alice, RideFilter::default())
            .await
            .unwrap();
        assert_eq!(for_alice.len(), 1);
        assert_eq!(for_alice[0].id, mine.id);

        // Un partner ve lo suyo más lo pendiente
        let for_partner = f
            .service
            .list_rides(&partner, RideFilter::default())
            .await
            .unwrap();
        assert_eq!(for_partner.len(), 2);

        let other_partner = Identity::Partner(Uuid::new_v4());
        let visible = f
            .service
            .list_rides(&other_partner, RideFilter::default())
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, open.id);

        let admin = Identity::Admin(Uuid::new_v4());
        let accepted_only = f
            .service
            .list_rides(
                &admin,
                RideFilter {
                    status: Some(RideStatus::Accepted),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(accepted_only.len(), 1);
    }

    #[tokio::test]
    async fn test_location_requires_ride_in_progress() {
        let f = fixture().await;
        let user = Identity::User(Uuid::new_v4());
        let partner = Identity::Partner(Uuid::new_v4());
        let ride = f
            .service
            .create_ride(&user, request(&f.pricing, 3.0))
            .await
            .unwrap();
        let update = LocationUpdateRequest {
            latitude: 19.08,
            longitude: 72.88,
        };

        let pending = f
            .service
            .update_partner_location(&partner, ride.id, &update)
            .await;
        assert!(matches!(pending, Err(AppError::Conflict(_))));

        f.service
            .accept_ride(&partner, ride.id, AcceptRideRequest::default())
            .await
            .unwrap();
        assert!(matches!(
            f.service.last_location(&user, ride.id).await,
            Err(AppError::NotFound(_))
        ));

        f.service
            .update_partner_location(&partner, ride.id, &update)
            .await
            .unwrap();
        let last = f.service.last_location(&user, ride.id).await.unwrap();
        assert_eq!(last.partner_id, partner.id());
        assert_eq!(last.latitude, 19.08);
    }

    #[tokio::test]
    async fn test_quote_does_not_create_ride() {
        let f = fixture().await;
        let quote = f
            .service
            .quote_fare(&FareQuoteRequest {
                distance_km: 12.5,
                city_id: f.pricing.city_id,
                vehicle_type_id: f.pricing.vehicle_type_id,
            })
            .await
            .unwrap();
        assert_eq!(quote.fare, Decimal::new(250, 0));
        assert_eq!(f.store.ride_count().await, 0);
    }
}
