//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use validator::ValidationError;

use super::errors::{validation_error, AppResult};

pub const MAX_CANCELLATION_REASON: usize = 500;

/// Cota superior de distancia, dentro de `NUMERIC(10,4)`
pub const MAX_DISTANCE_KM: i64 = 100_000;

/// Validar que un string no esté vacío (para `#[validate(custom)]`)
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// La distancia del viaje debe ser estrictamente positiva y acotada
pub fn validate_distance(distance_km: Decimal) -> AppResult<()> {
    if distance_km <= Decimal::ZERO {
        return Err(validation_error(format!(
            "distance must be greater than 0 km, got {}",
            distance_km
        )));
    }
    if distance_km > Decimal::from(MAX_DISTANCE_KM) {
        return Err(validation_error(format!(
            "distance out of range: at most {} km, got {}",
            MAX_DISTANCE_KM, distance_km
        )));
    }
    Ok(())
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> AppResult<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(validation_error(format!("invalid latitude {}", latitude)));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(validation_error(format!("invalid longitude {}", longitude)));
    }
    Ok(())
}

pub fn validate_cancellation_reason(reason: Option<&str>) -> AppResult<()> {
    match reason {
        Some(r) if r.chars().count() > MAX_CANCELLATION_REASON => Err(validation_error(format!(
            "cancellation reason must be at most {} characters",
            MAX_CANCELLATION_REASON
        ))),
        _ => Ok(()),
    }
}

/// Convertir un f64 de la API a Decimal
pub fn decimal_from_f64(value: f64, field: &str) -> AppResult<Decimal> {
    if !value.is_finite() {
        return Err(validation_error(format!("{} must be a finite number", field)));
    }
    Decimal::from_f64(value)
        .map(|d| d.normalize())
        .ok_or_else(|| validation_error(format!("{} is out of range", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validate_distance() {
        assert!(validate_distance(Decimal::new(1, 4)).is_ok());
        assert!(validate_distance(Decimal::ZERO).is_err());
        assert!(validate_distance(Decimal::new(-5, 0)).is_err());
        assert!(validate_distance(Decimal::from(MAX_DISTANCE_KM)).is_ok());
        assert!(validate_distance(Decimal::from(MAX_DISTANCE_KM + 1)).is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(19.076, 72.877).is_ok());
        assert!(validate_coordinates(90.5, 0.0).is_err());
        assert!(validate_coordinates(0.0, -181.0).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_decimal_from_f64() {
        assert_eq!(
            decimal_from_f64(5.0001, "distance_km").unwrap(),
            Decimal::from_str("5.0001").unwrap()
        );
        assert!(decimal_from_f64(f64::INFINITY, "distance_km").is_err());
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Terminal 2").is_ok());
        assert!(validate_not_blank("   ").is_err());
    }
}
