//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del núcleo de viajes
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Authorization(String),

    #[error("Insufficient credit for corporate {corporate_id}: required {required}, available {available}")]
    InsufficientCredit {
        corporate_id: Uuid,
        required: Decimal,
        available: Decimal,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl AppError {
    /// Código estable para clientes de la API
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Authorization(_) => "FORBIDDEN",
            AppError::InsufficientCredit { .. } => "INSUFFICIENT_CREDIT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Database(_) => "DB_ERROR",
            AppError::Migration(_) => "MIGRATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::InsufficientCredit { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Migration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (label, message, details) = match &self {
            AppError::Validation(msg) => ("Validation Error", msg.clone(), None),
            AppError::NotFound(msg) => ("Not Found", msg.clone(), None),
            AppError::Conflict(msg) => ("Conflict", msg.clone(), None),
            AppError::Authorization(msg) => ("Forbidden", msg.clone(), None),
            AppError::Unauthorized(msg) => ("Unauthorized", msg.clone(), None),
            AppError::InsufficientCredit {
                corporate_id,
                required,
                available,
            } => (
                "Insufficient Credit",
                "Corporate credit limit would be exceeded".to_string(),
                Some(json!({
                    "corporate_id": corporate_id,
                    "required": required.to_string(),
                    "available": available.to_string(),
                })),
            ),
            AppError::Database(e) => {
                error!("❌ Database error: {}", e);
                (
                    "Database Error",
                    "An error occurred while accessing the database".to_string(),
                    None,
                )
            }
            AppError::Migration(e) => {
                error!("❌ Migration error: {}", e);
                (
                    "Database Error",
                    "An error occurred while migrating the database".to_string(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                error!("❌ Internal error: {}", msg);
                (
                    "Internal Server Error",
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
        };

        if status.is_client_error() {
            warn!("⚠️ {} ({}): {}", label, code, message);
        }

        let body = ErrorResponse {
            error: label.to_string(),
            message,
            details,
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &Uuid) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para transiciones ilegales de la máquina de estados
pub fn illegal_transition_error(event: &str, status: impl std::fmt::Display) -> AppError {
    AppError::Conflict(format!("cannot {} a ride that is {}", event, status))
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Authorization(format!("Cannot {}: {}", operation, reason))
}

/// Función helper para crear errores de validación
pub fn validation_error(message: impl Into<String>) -> AppError {
    AppError::Validation(message.into())
}
