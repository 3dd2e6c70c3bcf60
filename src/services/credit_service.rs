//! Compuerta de crédito corporativo
//!
//! `check_credit` es una comprobación puntual en el momento de reservar: no
//! deja retención. El débito real ocurre al completar el viaje.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::corporate::validate_debit_amount;
use crate::models::{CorporateCreditAccount, CreditDebit, Ride};
use crate::repositories::CreditStore;
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};

pub struct CreditService {
    store: Arc<dyn CreditStore>,
}

impl CreditService {
    pub fn new(store: Arc<dyn CreditStore>) -> Self {
        Self { store }
    }

    pub async fn account(&self, corporate_id: Uuid) -> AppResult<CorporateCreditAccount> {
        self.store
            .find_account(corporate_id)
            .await?
            .ok_or_else(|| not_found_error("Corporate", &corporate_id))
    }

    /// Falla con `InsufficientCredit` si `credit_used + fare > credit_limit`
    pub async fn check_credit(
        &self,
        corporate_id: Uuid,
        fare: Decimal,
    ) -> AppResult<CorporateCreditAccount> {
        let account = self.account(corporate_id).await?;
        if !account.can_cover(fare) {
            warn!(
                "💳 Crédito insuficiente para corporate {}: usado {}, límite {}, tarifa {}",
                corporate_id, account.credit_used, account.credit_limit, fare
            );
            return Err(AppError::InsufficientCredit {
                corporate_id,
                required: fare,
                available: account.credit_balance,
            });
        }
        Ok(account)
    }

    pub async fn debit(
        &self,
        corporate_id: Uuid,
        amount: Decimal,
    ) -> AppResult<CorporateCreditAccount> {
        validate_debit_amount(amount)?;
        let account = self
            .store
            .debit(corporate_id, amount)
            .await?
            .ok_or_else(|| not_found_error("Corporate", &corporate_id))?;
        info!(
            "💳 Corporate {} debitado {} (balance {})",
            corporate_id, amount, account.credit_balance
        );
        Ok(account)
    }

    pub async fn update_limit(
        &self,
        corporate_id: Uuid,
        new_limit: Decimal,
    ) -> AppResult<CorporateCreditAccount> {
        if new_limit < Decimal::ZERO {
            return Err(validation_error("credit limit must not be negative"));
        }
        let account = self
            .store
            .update_limit(corporate_id, new_limit)
            .await?
            .ok_or_else(|| not_found_error("Corporate", &corporate_id))?;
        info!(
            "💳 Límite de corporate {} actualizado a {} (balance {})",
            corporate_id, new_limit, account.credit_balance
        );
        Ok(account)
    }

    /// Débito que debe acompañar al COMPLETED de este viaje, si factura a un
    /// corporate. Pasa por la misma validación que `debit`.
    pub fn debit_for(ride: &Ride) -> AppResult<Option<CreditDebit>> {
        let corporate_id = match ride.corporate_id {
            Some(id) if ride.is_corporate() => id,
            _ => return Ok(None),
        };
        validate_debit_amount(ride.fare)?;
        Ok(Some(CreditDebit {
            corporate_id,
            amount: ride.fare,
        }))
    }
}
