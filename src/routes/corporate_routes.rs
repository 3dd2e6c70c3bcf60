use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use crate::dto::ride_dto::{ApiResponse, CreditAccountResponse, UpdateCreditLimitRequest};
use crate::middleware::AuthenticatedCaller;
use crate::models::Identity;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, AppError};

pub fn create_corporate_router() -> Router<AppState> {
    Router::new()
        .route("/:id/credit-limit", put(update_credit_limit))
        .route("/:id/credit", get(get_credit))
}

async fn update_credit_limit(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCreditLimitRequest>,
) -> Result<Json<ApiResponse<CreditAccountResponse>>, AppError> {
    if !caller.is_admin() {
        return Err(forbidden_error(
            "update credit limit",
            "only admins can change credit limits",
        ));
    }
    let account = state.credit.update_limit(id, request.credit_limit).await?;
    Ok(Json(ApiResponse::success_with_message(
        account.into(),
        "Credit limit updated",
    )))
}

async fn get_credit(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CreditAccountResponse>>, AppError> {
    let allowed = match caller {
        Identity::Admin(_) => true,
        Identity::Corporate(corporate_id) => corporate_id == id,
        _ => false,
    };
    if !allowed {
        return Err(forbidden_error(
            "view credit",
            "only admins or the corporate itself can view credit",
        ));
    }
    let account = state.credit.account(id).await?;
    Ok(Json(ApiResponse::success(account.into())))
}
