//! Utilidades JWT
//!
//! Los tokens los emite el colaborador de identidad. Aquí solo se verifican,
//! y se generan para tooling y tests.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::environment::EnvironmentConfig,
    models::{Identity, Role},
    utils::errors::{AppError, AppResult},
};

/// Claims del JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // id del llamador
    pub role: String, // USER, PARTNER, ADMIN, VENDOR, AGENT, CORPORATE
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    /// Resolver el llamador. Un rol desconocido o un `sub` no-UUID es 401.
    pub fn identity(&self) -> AppResult<Identity> {
        let role: Role = self.role.parse()?;
        let id = Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("invalid subject in token".to_string()))?;
        Ok(Identity::new(role, id))
    }
}

/// Configuración de JWT
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration: u64,
}

impl From<&EnvironmentConfig> for JwtConfig {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiration: config.jwt_expiration,
        }
    }
}

/// Generar JWT token para un llamador
pub fn generate_token(identity: &Identity, config: &JwtConfig) -> AppResult<String> {
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(config.expiration as i64);

    let claims = Claims {
        sub: identity.id().to_string(),
        role: identity.role().as_str().to_string(),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Error generando token: {}", e)))
}

/// Verificar y decodificar JWT token
pub fn verify_token(token: &str, config: &JwtConfig) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Token inválido: {}", e)))
}

/// Extraer token del header Authorization
pub fn extract_token_from_header(auth_header: &str) -> AppResult<&str> {
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(AppError::Unauthorized("Token no puede estar vacío".to_string())),
        None => Err(AppError::Unauthorized(
            "Header Authorization debe comenzar con 'Bearer '".to_string(),
        )),
    }
}
