//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y la selección de backends
//! de almacenamiento y notificaciones.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::str::FromStr;

use crate::notifications::broadcast_bus::DEFAULT_CAPACITY;

/// Dónde viven viajes, pricing y crédito
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("STORE_BACKEND desconocido: '{}'", other)),
        }
    }
}

/// Transporte del fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    Memory,
    Redis,
}

impl FromStr for NotificationBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "broadcast" => Ok(NotificationBackend::Memory),
            "redis" => Ok(NotificationBackend::Redis),
            other => Err(anyhow!("NOTIFICATION_BACKEND desconocido: '{}'", other)),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    /// Vida de los tokens emitidos por `generate_token`, en segundos
    pub jwt_expiration: u64,
    pub log_level: String,
    pub cors_origins: Vec<String>,
    pub store_backend: StoreBackend,
    pub notification_backend: NotificationBackend,
    pub redis_url: String,
    pub notification_channel_prefix: String,
    pub broadcast_capacity: usize,
}

impl Default for EnvironmentConfig {
    /// Valores de desarrollo local, todo en memoria
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            jwt_secret: "development-secret-change-me".to_string(),
            jwt_expiration: 86_400,
            log_level: "info".to_string(),
            cors_origins: vec!["*".to_string()],
            store_backend: StoreBackend::Memory,
            notification_backend: NotificationBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            notification_channel_prefix: "rides".to_string(),
            broadcast_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl EnvironmentConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == "production" => {
                return Err(anyhow!("JWT_SECRET must be set in production"))
            }
            _ => defaults.jwt_secret,
        };

        Ok(Self {
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            jwt_secret,
            jwt_expiration: parse_var("JWT_EXPIRATION", defaults.jwt_expiration)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            store_backend: parse_var("STORE_BACKEND", defaults.store_backend)?,
            notification_backend: parse_var(
                "NOTIFICATION_BACKEND",
                defaults.notification_backend,
            )?,
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            notification_channel_prefix: env::var("NOTIFICATION_CHANNEL_PREFIX")
                .unwrap_or(defaults.notification_channel_prefix),
            broadcast_capacity: parse_var("BROADCAST_CAPACITY", defaults.broadcast_capacity)?,
            environment,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("{} tiene un valor inválido: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
