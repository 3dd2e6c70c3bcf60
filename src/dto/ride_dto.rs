use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CorporateCreditAccount, Location, PaymentMode, Ride, RideStatusUpdate};
use crate::notifications::PartnerLocation;
use crate::utils::validation::validate_not_blank;

// Punto de recogida o destino tal como llega del cliente
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationInput {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(length(min = 1, max = 500), custom = "validate_not_blank")]
    pub address: String,
}

impl From<LocationInput> for Location {
    fn from(input: LocationInput) -> Self {
        Location {
            latitude: input.latitude,
            longitude: input.longitude,
            address: input.address.trim().to_string(),
        }
    }
}

// Request para reservar un viaje (el llamador es el usuario)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRideRequest {
    pub vehicle_type_id: Uuid,
    pub city_id: Uuid,
    #[validate]
    pub pickup: LocationInput,
    #[validate]
    pub drop: LocationInput,
    pub distance_km: f64,
    pub payment_mode: PaymentMode,
    pub corporate_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
}

// Request de reserva manual hecha por un agente o admin en nombre de un usuario
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateManualRideRequest {
    pub user_id: Uuid,
    #[validate]
    #[serde(flatten)]
    pub ride: CreateRideRequest,
    pub scheduled_at: Option<DateTime<Utc>>,
}

// Request de cotización, nunca crea un viaje
#[derive(Debug, Clone, Deserialize)]
pub struct FareQuoteRequest {
    pub distance_km: f64,
    pub city_id: Uuid,
    pub vehicle_type_id: Uuid,
}

// Request de aceptación con el vehículo y vendor con los que opera el partner
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptRideRequest {
    pub vehicle_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRideStatusRequest {
    pub status: RideStatusUpdate,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompleteRideRequest {
    #[validate(length(min = 1, max = 16))]
    pub otp: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CancelRideRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationUpdateRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCreditLimitRequest {
    pub credit_limit: Decimal,
}

// Response de viaje. El OTP solo se muestra a quien reservó.
#[derive(Debug, Clone, Serialize)]
pub struct RideResponse {
    #[serde(flatten)]
    pub ride: Ride,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

impl RideResponse {
    pub fn public(ride: Ride) -> Self {
        Self { ride, otp: None }
    }

    pub fn with_otp(ride: Ride) -> Self {
        let otp = Some(ride.otp.clone());
        Self { ride, otp }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditAccountResponse {
    pub corporate_id: Uuid,
    pub credit_limit: Decimal,
    pub credit_used: Decimal,
    pub credit_balance: Decimal,
}

impl From<CorporateCreditAccount> for CreditAccountResponse {
    fn from(account: CorporateCreditAccount) -> Self {
        Self {
            corporate_id: account.corporate_id,
            credit_limit: account.credit_limit,
            credit_used: account.credit_used,
            credit_balance: account.credit_balance,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationResponse {
    pub ride_id: Uuid,
    pub partner_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<PartnerLocation> for LocationResponse {
    fn from(location: PartnerLocation) -> Self {
        Self {
            ride_id: location.ride_id,
            partner_id: location.partner_id,
            latitude: location.latitude,
            longitude: location.longitude,
            recorded_at: location.recorded_at,
        }
    }
}

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}
