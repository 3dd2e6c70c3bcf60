//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos del núcleo de viajes,
//! mapeados al schema PostgreSQL de `migrations/`.

pub mod corporate;
pub mod identity;
pub mod pricing;
pub mod ride;

pub use corporate::CorporateCreditAccount;
pub use identity::{Identity, Role};
pub use pricing::{CityPricing, FareQuote};
pub use ride::{
    CreditDebit, GuardedTransition, Location, NewRide, PartnerAssignment, PaymentMode,
    PaymentStatus, Ride, RideAction, RideFilter, RideStatus, RideStatusUpdate,
};
