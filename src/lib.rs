//! Núcleo de despacho de viajes
//!
//! Máquina de estados del viaje, resolución concurrente de aceptaciones,
//! cálculo de tarifas, compuerta de crédito corporativo, compuerta OTP de
//! finalización y fan-out de notificaciones en tiempo real.

pub mod config;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
pub use utils::errors::{AppError, AppResult};
