//! Modelo de Ride
//!
//! Este módulo contiene el struct Ride, sus enums de estado y pago, y la
//! tabla de transiciones de la máquina de estados del viaje.
//! Mapea exactamente a la tabla `rides` del schema PostgreSQL.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use uuid::Uuid;

use crate::utils::errors::{illegal_transition_error, AppResult};

/// Estado del viaje - mapea al ENUM ride_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ride_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Pending,
    Accepted,
    Arrived,
    Started,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "PENDING",
            RideStatus::Accepted => "ACCEPTED",
            RideStatus::Arrived => "ARRIVED",
            RideStatus::Started => "STARTED",
            RideStatus::Completed => "COMPLETED",
            RideStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Estados en los que `partner_id` debe estar asignado
    pub fn requires_partner(&self) -> bool {
        matches!(
            self,
            RideStatus::Accepted | RideStatus::Arrived | RideStatus::Started | RideStatus::Completed
        )
    }

    /// Estados en los que el partner asignado emite ubicación
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            RideStatus::Accepted | RideStatus::Arrived | RideStatus::Started
        )
    }

    /// Aplica una acción sobre el estado actual.
    ///
    /// Devuelve el estado destino o `Conflict` si la arista no existe en la tabla.
    pub fn apply(self, action: RideAction) -> AppResult<RideStatus> {
        let next = match (self, action) {
            (RideStatus::Pending, RideAction::Accept) => RideStatus::Accepted,
            (RideStatus::Accepted, RideAction::MarkArrived) => RideStatus::Arrived,
            (RideStatus::Arrived, RideAction::MarkStarted) => RideStatus::Started,
            (RideStatus::Started, RideAction::Complete) => RideStatus::Completed,
            (
                RideStatus::Pending
                | RideStatus::Accepted
                | RideStatus::Arrived
                | RideStatus::Started,
                RideAction::Cancel,
            ) => RideStatus::Cancelled,
            (from, action) => return Err(illegal_transition_error(action.verb(), from)),
        };
        Ok(next)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Eventos que mueven la máquina de estados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideAction {
    Accept,
    MarkArrived,
    MarkStarted,
    Complete,
    Cancel,
}

impl RideAction {
    pub fn verb(&self) -> &'static str {
        match self {
            RideAction::Accept => "accept",
            RideAction::MarkArrived => "mark arrived",
            RideAction::MarkStarted => "start",
            RideAction::Complete => "complete",
            RideAction::Cancel => "cancel",
        }
    }
}

/// Actualizaciones de estado permitidas vía `updateRideStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatusUpdate {
    Arrived,
    Started,
}

impl RideStatusUpdate {
    pub fn action(&self) -> RideAction {
        match self {
            RideStatusUpdate::Arrived => RideAction::MarkArrived,
            RideStatusUpdate::Started => RideAction::MarkStarted,
        }
    }
}

/// Modo de pago - mapea al ENUM payment_mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "payment_mode", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    Direct,
    Corporate,
    Gateway,
}

/// Estado de pago - lo escribe el colaborador de pagos, el núcleo solo lo lee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Ride principal - mapea exactamente a la tabla rides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Ride {
    pub id: Uuid,
    pub user_id: Uuid,
    pub partner_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub corporate_id: Option<Uuid>,
    pub vehicle_type_id: Uuid,
    pub city_id: Uuid,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub pickup_address: String,
    pub drop_latitude: f64,
    pub drop_longitude: f64,
    pub drop_address: String,
    pub distance_km: Decimal,
    pub fare: Decimal,
    pub payment_mode: PaymentMode,
    pub payment_status: PaymentStatus,
    pub status: RideStatus,
    #[serde(skip_serializing, default)]
    pub otp: String,
    pub is_instant_booking: bool,
    pub is_manual_booking: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Ride {
    /// Construye el viaje inicial en PENDING a partir de los datos validados
    pub fn from_new(new_ride: NewRide, created_at: DateTime<Utc>) -> Self {
        Self {
            id: new_ride.id,
            user_id: new_ride.user_id,
            partner_id: None,
            vendor_id: new_ride.vendor_id,
            vehicle_id: None,
            corporate_id: new_ride.corporate_id,
            vehicle_type_id: new_ride.vehicle_type_id,
            city_id: new_ride.city_id,
            pickup_latitude: new_ride.pickup.latitude,
            pickup_longitude: new_ride.pickup.longitude,
            pickup_address: new_ride.pickup.address,
            drop_latitude: new_ride.drop.latitude,
            drop_longitude: new_ride.drop.longitude,
            drop_address: new_ride.drop.address,
            distance_km: new_ride.distance_km,
            fare: new_ride.fare,
            payment_mode: new_ride.payment_mode,
            payment_status: PaymentStatus::Pending,
            status: RideStatus::Pending,
            otp: new_ride.otp,
            is_instant_booking: new_ride.is_instant_booking,
            is_manual_booking: new_ride.is_manual_booking,
            scheduled_at: new_ride.scheduled_at,
            created_by: new_ride.created_by,
            cancellation_reason: None,
            created_at,
            accepted_at: None,
            arrived_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
        }
    }

    pub fn is_assigned_to(&self, partner_id: Uuid) -> bool {
        self.partner_id == Some(partner_id)
    }

    pub fn is_corporate(&self) -> bool {
        self.payment_mode == PaymentMode::Corporate && self.corporate_id.is_some()
    }

    /// Registra el timestamp de la transición tomada
    pub fn stamp(&mut self, status: RideStatus, at: DateTime<Utc>) {
        self.status = status;
        match status {
            RideStatus::Pending => {}
            RideStatus::Accepted => self.accepted_at = Some(at),
            RideStatus::Arrived => self.arrived_at = Some(at),
            RideStatus::Started => self.started_at = Some(at),
            RideStatus::Completed => self.completed_at = Some(at),
            RideStatus::Cancelled => {
                self.cancelled_at = Some(at);
                self.partner_id = None;
            }
        }
    }
}

/// Punto de recogida o destino
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// Datos de un viaje nuevo, con la tarifa ya calculada
#[derive(Debug, Clone)]
pub struct NewRide {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_by: Uuid,
    pub vendor_id: Option<Uuid>,
    pub corporate_id: Option<Uuid>,
    pub vehicle_type_id: Uuid,
    pub city_id: Uuid,
    pub pickup: Location,
    pub drop: Location,
    pub distance_km: Decimal,
    pub fare: Decimal,
    pub payment_mode: PaymentMode,
    pub otp: String,
    pub is_instant_booking: bool,
    pub is_manual_booking: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Asignación del partner ganador en un accept
#[derive(Debug, Clone, Copy)]
pub struct PartnerAssignment {
    pub partner_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
}

/// Escritura condicional sobre un viaje: solo aplica si el estado actual es `from`
#[derive(Debug, Clone)]
pub struct GuardedTransition {
    pub ride_id: Uuid,
    pub from: RideStatus,
    pub to: RideStatus,
    /// Si está presente, el viaje debe estar asignado a este partner
    pub partner_id: Option<Uuid>,
    pub cancellation_reason: Option<String>,
}

/// Débito de crédito corporativo que acompaña al COMPLETED
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditDebit {
    pub corporate_id: Uuid,
    pub amount: Decimal,
}

/// Filtros para listados de viajes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RideFilter {
    pub status: Option<RideStatus>,
    pub user_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub corporate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub is_manual_booking: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Alcance de partner: sus viajes asignados más los PENDING abiertos
    #[serde(skip)]
    pub visible_to_partner: Option<Uuid>,
}

impl RideFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Evalúa el filtro contra un viaje en memoria
    pub fn matches(&self, ride: &Ride) -> bool {
        self.status.map_or(true, |s| ride.status == s)
            && self.user_id.map_or(true, |id| ride.user_id == id)
            && self.partner_id.map_or(true, |id| ride.partner_id == Some(id))
            && self.vendor_id.map_or(true, |id| ride.vendor_id == Some(id))
            && self.corporate_id.map_or(true, |id| ride.corporate_id == Some(id))
            && self.city_id.map_or(true, |id| ride.city_id == id)
            && self
                .is_manual_booking
                .map_or(true, |m| ride.is_manual_booking == m)
            && self.visible_to_partner.map_or(true, |id| {
                ride.partner_id == Some(id) || ride.status == RideStatus::Pending
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::AppError;

    #[test]
    fn test_happy_path_edges() {
        let mut status = RideStatus::Pending;
        for action in [
            RideAction::Accept,
            RideAction::MarkArrived,
            RideAction::MarkStarted,
            RideAction::Complete,
        ] {
            status = status.apply(action).unwrap();
        }
        assert_eq!(status, RideStatus::Completed);
    }

    #[test]
    fn test_cancel_only_from_non_terminal() {
        for from in [
            RideStatus::Pending,
            RideStatus::Accepted,
            RideStatus::Arrived,
            RideStatus::Started,
        ] {
            assert_eq!(from.apply(RideAction::Cancel).unwrap(), RideStatus::Cancelled);
        }
        for from in [RideStatus::Completed, RideStatus::Cancelled] {
            assert!(matches!(
                from.apply(RideAction::Cancel),
                Err(AppError::Conflict(_))
            ));
        }
    }

    #[test]
    fn test_skipping_states_is_rejected() {
        let err = RideStatus::Pending.apply(RideAction::MarkArrived).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Conflict: cannot mark arrived a ride that is PENDING"
        );
        assert!(RideStatus::Accepted.apply(RideAction::Complete).is_err());
        assert!(RideStatus::Started.apply(RideAction::Accept).is_err());
    }

    #[test]
    fn test_partner_invariant_states() {
        assert!(!RideStatus::Pending.requires_partner());
        assert!(RideStatus::Completed.requires_partner());
        assert!(!RideStatus::Cancelled.requires_partner());
    }

    #[test]
    fn test_filter_limits_are_clamped() {
        let filter = RideFilter {
            limit: Some(10_000),
            offset: Some(-3),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), RideFilter::MAX_LIMIT);
        assert_eq!(filter.effective_offset(), 0);
    }
}
