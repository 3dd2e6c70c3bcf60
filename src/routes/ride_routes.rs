use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::ride_dto::{
    AcceptRideRequest, ApiResponse, CancelRideRequest, CompleteRideRequest,
    CreateManualRideRequest, CreateRideRequest, FareQuoteRequest, LocationResponse,
    LocationUpdateRequest, RideResponse, UpdateRideStatusRequest,
};
use crate::middleware::AuthenticatedCaller;
use crate::models::{FareQuote, Identity, Ride, RideFilter};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_ride_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_ride).get(list_rides))
        .route("/manual", post(create_manual_ride))
        .route("/quote", post(quote_fare))
        .route("/:id", get(get_ride))
        .route("/:id/accept", post(accept_ride))
        .route("/:id/status", put(update_ride_status))
        .route("/:id/complete", post(complete_ride))
        .route("/:id/cancel", post(cancel_ride))
        .route("/:id/location", put(update_location).get(last_location))
}

// Quien reservó ve el OTP para dárselo al partner al final del viaje
fn ride_response(caller: &Identity, ride: Ride) -> RideResponse {
    let id = caller.id();
    if ride.user_id == id || ride.created_by == id {
        RideResponse::with_otp(ride)
    } else {
        RideResponse::public(ride)
    }
}

async fn create_ride(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(request): Json<CreateRideRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RideResponse>>), AppError> {
    let ride = state.rides.create_ride(&caller, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            RideResponse::with_otp(ride),
            "Ride created",
        )),
    ))
}

async fn create_manual_ride(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(request): Json<CreateManualRideRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RideResponse>>), AppError> {
    let ride = state.rides.create_manual_ride(&caller, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            RideResponse::with_otp(ride),
            "Manual ride created",
        )),
    ))
}

async fn quote_fare(
    State(state): State<AppState>,
    AuthenticatedCaller(_caller): AuthenticatedCaller,
    Json(request): Json<FareQuoteRequest>,
) -> Result<Json<ApiResponse<FareQuote>>, AppError> {
    let quote = state.rides.quote_fare(&request).await?;
    Ok(Json(ApiResponse::success(quote)))
}

async fn list_rides(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Query(filter): Query<RideFilter>,
) -> Result<Json<ApiResponse<Vec<RideResponse>>>, AppError> {
    let rides = state.rides.list_rides(&caller, filter).await?;
    let rides = rides
        .into_iter()
        .map(|ride| ride_response(&caller, ride))
        .collect();
    Ok(Json(ApiResponse::success(rides)))
}

async fn get_ride(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RideResponse>>, AppError> {
    let ride = state.rides.get_ride(&caller, id).await?;
    Ok(Json(ApiResponse::success(ride_response(&caller, ride))))
}

async fn accept_ride(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<Uuid>,
    request: Option<Json<AcceptRideRequest>>,
) -> Result<Json<ApiResponse<RideResponse>>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let ride = state.rides.accept_ride(&caller, id, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        RideResponse::public(ride),
        "Ride accepted",
    )))
}

async fn update_ride_status(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRideStatusRequest>,
) -> Result<Json<ApiResponse<RideResponse>>, AppError> {
    let ride = state
        .rides
        .update_ride_status(&caller, id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(RideResponse::public(ride))))
}

async fn complete_ride(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteRideRequest>,
) -> Result<Json<ApiResponse<RideResponse>>, AppError> {
    request.validate()?;
    let ride = state.rides.complete_ride(&caller, id, &request.otp).await?;
    Ok(Json(ApiResponse::success_with_message(
        RideResponse::public(ride),
        "Ride completed",
    )))
}

async fn cancel_ride(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelRideRequest>>,
) -> Result<Json<ApiResponse<RideResponse>>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;
    let ride = state.rides.cancel_ride(&caller, id, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        ride_response(&caller, ride),
        "Ride cancelled",
    )))
}

async fn update_location(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<Uuid>,
    Json(request): Json<LocationUpdateRequest>,
) -> Result<Json<ApiResponse<LocationResponse>>, AppError> {
    let location = state
        .rides
        .update_partner_location(&caller, id, &request)
        .await?;
    Ok(Json(ApiResponse::success(location.into())))
}

async fn last_location(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LocationResponse>>, AppError> {
    let location = state.rides.last_location(&caller, id).await?;
    Ok(Json(ApiResponse::success(location.into())))
}
