//! DTOs de la API
//!
//! Requests validados con `validator` y responses en el sobre `ApiResponse`.

pub mod ride_dto;

pub use ride_dto::ApiResponse;
