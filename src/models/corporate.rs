//! Vista de crédito corporativo
//!
//! Proyección del colaborador Corporate con el invariante
//! `credit_balance = max(0, credit_limit - credit_used)`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::{validation_error, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CorporateCreditAccount {
    pub corporate_id: Uuid,
    pub credit_limit: Decimal,
    pub credit_used: Decimal,
    pub credit_balance: Decimal,
}

impl CorporateCreditAccount {
    pub fn new(corporate_id: Uuid, credit_limit: Decimal) -> Self {
        Self {
            corporate_id,
            credit_limit,
            credit_used: Decimal::ZERO,
            credit_balance: compute_balance(credit_limit, Decimal::ZERO),
        }
    }

    /// ¿Cabe `fare` dentro del límite sin mutar nada?
    pub fn can_cover(&self, fare: Decimal) -> bool {
        self.credit_used
            .checked_add(fare)
            .map_or(false, |total| total <= self.credit_limit)
    }

    pub fn apply_debit(&mut self, amount: Decimal) -> AppResult<()> {
        validate_debit_amount(amount)?;
        self.credit_used = self
            .credit_used
            .checked_add(amount)
            .ok_or_else(|| validation_error("debit amount out of range"))?;
        self.credit_balance = compute_balance(self.credit_limit, self.credit_used);
        Ok(())
    }

    pub fn apply_limit(&mut self, new_limit: Decimal) {
        self.credit_limit = new_limit;
        self.credit_balance = compute_balance(self.credit_limit, self.credit_used);
    }

    pub fn is_consistent(&self) -> bool {
        self.credit_balance == compute_balance(self.credit_limit, self.credit_used)
    }
}

pub fn validate_debit_amount(amount: Decimal) -> AppResult<()> {
    if amount < Decimal::ZERO {
        return Err(validation_error("debit amount must not be negative"));
    }
    Ok(())
}

pub fn compute_balance(credit_limit: Decimal, credit_used: Decimal) -> Decimal {
    (credit_limit - credit_used).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_never_negative() {
        let mut account = CorporateCreditAccount::new(Uuid::new_v4(), Decimal::new(100, 0));
        account.apply_debit(Decimal::new(150, 0)).unwrap();
        assert_eq!(account.credit_balance, Decimal::ZERO);
        assert!(account.is_consistent());

        account.apply_limit(Decimal::new(400, 0));
        assert_eq!(account.credit_balance, Decimal::new(250, 0));
    }

    #[test]
    fn test_can_cover_is_inclusive() {
        let account = CorporateCreditAccount::new(Uuid::new_v4(), Decimal::new(160, 0));
        assert!(account.can_cover(Decimal::new(160, 0)));
        assert!(!account.can_cover(Decimal::new(16001, 2)));
        assert!(!account.can_cover(Decimal::MAX));
    }

    #[test]
    fn test_bad_debits_leave_account_untouched() {
        let mut account = CorporateCreditAccount::new(Uuid::new_v4(), Decimal::new(100, 0));
        account.apply_debit(Decimal::new(40, 0)).unwrap();
        let before = account.clone();

        assert!(account.apply_debit(Decimal::new(-1, 0)).is_err());
        assert!(account.apply_debit(Decimal::MAX).is_err());
        assert_eq!(account, before);
    }
}
