//! Compuerta OTP de finalización
//!
//! Cada viaje recibe su propio secreto al crearse. Es independiente de
//! cualquier secreto personal que lleve el colaborador de identidad.

use constant_time_eq::constant_time_eq;
use rand::Rng;

use crate::utils::errors::{validation_error, AppResult};

pub const OTP_LENGTH: usize = 4;

pub fn generate_otp() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..10u32.pow(OTP_LENGTH as u32));
    format!("{:0width$}", value, width = OTP_LENGTH)
}

/// Igualdad exacta byte a byte, en tiempo constante respecto al contenido
pub fn verify_otp(stored: &str, supplied: &str) -> AppResult<()> {
    if constant_time_eq(stored.as_bytes(), supplied.as_bytes()) {
        Ok(())
    } else {
        Err(validation_error("invalid otp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_otp_shape() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), OTP_LENGTH);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_verify_otp() {
        assert!(verify_otp("0427", "0427").is_ok());
        assert!(verify_otp("0427", " 0427 ").is_err());
        assert!(verify_otp("0427", "0427\n").is_err());
        assert!(verify_otp("0427", "427").is_err());
        assert!(verify_otp("0427", "0428").is_err());
        assert!(verify_otp("0427", "").is_err());
    }
}
