//! Middleware del sistema
//!
//! Este módulo contiene la autenticación del llamador y la configuración
//! de CORS.

pub mod auth;
pub mod cors;

pub use auth::AuthenticatedCaller;
pub use cors::*;
