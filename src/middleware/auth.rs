//! Autenticación JWT
//!
//! Extractor que resuelve el llamador una sola vez en el borde HTTP. Los
//! handlers reciben `AuthenticatedCaller` y pasan el `Identity` al núcleo.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::debug;

use crate::{
    models::Identity,
    state::AppState,
    utils::{
        errors::AppError,
        jwt::{extract_token_from_header, verify_token, JwtConfig},
    },
};

/// Llamador autenticado que se inyecta en los handlers
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedCaller(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Extraer token del header Authorization
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized("Token de autorización requerido".to_string())
            })?;
        let token = extract_token_from_header(auth_header)?;

        let claims = verify_token(token, &JwtConfig::from(&state.config))?;
        let identity = claims.identity()?;
        debug!("🔑 Llamador autenticado: {}", identity);

        Ok(AuthenticatedCaller(identity))
    }
}
