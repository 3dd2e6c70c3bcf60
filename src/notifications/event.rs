use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Ride;

/// Tipo de evento publicado en el fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RideEventKind {
    RideCreated,
    NewRideRequest,
    RideAssigned,
    RideAccepted,
    RideArrived,
    RideStarted,
    RideCompleted,
    RideCancelledByUser,
    RideCancelledByPartner,
    RideCancelledByAdmin,
    RideStatusChanged,
    PartnerLocation,
}

impl RideEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideEventKind::RideCreated => "ride_created",
            RideEventKind::NewRideRequest => "new_ride_request",
            RideEventKind::RideAssigned => "ride_assigned",
            RideEventKind::RideAccepted => "ride_accepted",
            RideEventKind::RideArrived => "ride_arrived",
            RideEventKind::RideStarted => "ride_started",
            RideEventKind::RideCompleted => "ride_completed",
            RideEventKind::RideCancelledByUser => "ride_cancelled_by_user",
            RideEventKind::RideCancelledByPartner => "ride_cancelled_by_partner",
            RideEventKind::RideCancelledByAdmin => "ride_cancelled_by_admin",
            RideEventKind::RideStatusChanged => "ride_status_changed",
            RideEventKind::PartnerLocation => "partner_location",
        }
    }
}

/// Última posición conocida del partner en un viaje (no se persiste)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerLocation {
    pub ride_id: Uuid,
    pub partner_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Ride(Box<Ride>),
    Location(PartnerLocation),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideEvent {
    #[serde(rename = "type")]
    pub kind: RideEventKind,
    pub ride_id: Uuid,
    pub message: String,
    pub payload: EventPayload,
    pub emitted_at: DateTime<Utc>,
}

impl RideEvent {
    pub fn for_ride(kind: RideEventKind, ride: &Ride, message: impl Into<String>) -> Self {
        Self {
            kind,
            ride_id: ride.id,
            message: message.into(),
            payload: EventPayload::Ride(Box::new(ride.clone())),
            emitted_at: Utc::now(),
        }
    }

    pub fn for_location(location: PartnerLocation) -> Self {
        Self {
            kind: RideEventKind::PartnerLocation,
            ride_id: location.ride_id,
            message: "Partner location updated".to_string(),
            payload: EventPayload::Location(location),
            emitted_at: Utc::now(),
        }
    }

    /// Snapshot del viaje, si el evento es de ciclo de vida
    pub fn ride(&self) -> Option<&Ride> {
        match &self.payload {
            EventPayload::Ride(ride) => Some(ride),
            EventPayload::Location(_) => None,
        }
    }
}
