//! Services module
//!
//! Este módulo contiene la lógica de negocio del núcleo de despacho.
//! Los servicios reciben sus stores y el transporte de notificaciones
//! inyectados; no conocen HTTP ni el motor de persistencia.

pub mod credit_service;
pub mod fare_service;
pub mod notification_service;
pub mod otp_service;
pub mod ride_service;

pub use credit_service::CreditService;
pub use fare_service::{calculate_fare, FareService};
pub use notification_service::NotificationService;
pub use ride_service::RideService;
