use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::CreditStore;
use crate::models::CorporateCreditAccount;
use crate::utils::errors::AppResult;

pub struct CorporateRepository {
    pool: PgPool,
}

impl CorporateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Débito atómico: el incremento y el recálculo del balance van en la misma
/// sentencia, así Postgres serializa los débitos concurrentes por fila.
pub(crate) async fn debit_with<'e, E>(
    executor: E,
    corporate_id: Uuid,
    amount: Decimal,
) -> Result<Option<CorporateCreditAccount>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, CorporateCreditAccount>(
        r#"
        UPDATE corporates
        SET credit_used = credit_used + $2,
            credit_balance = GREATEST(0, credit_limit - (credit_used + $2))
        WHERE id = $1
        RETURNING id AS corporate_id, credit_limit, credit_used, credit_balance
        "#,
    )
    .bind(corporate_id)
    .bind(amount)
    .fetch_optional(executor)
    .await
}

#[async_trait]
impl CreditStore for CorporateRepository {
    async fn find_account(&self, corporate_id: Uuid) -> AppResult<Option<CorporateCreditAccount>> {
        let account = sqlx::query_as::<_, CorporateCreditAccount>(
            r#"
            SELECT id AS corporate_id, credit_limit, credit_used, credit_balance
            FROM corporates
            WHERE id = $1
            "#,
        )
        .bind(corporate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn debit(
        &self,
        corporate_id: Uuid,
        amount: Decimal,
    ) -> AppResult<Option<CorporateCreditAccount>> {
        let account = debit_with(&self.pool, corporate_id, amount).await?;
        debug!("💳 Débito {} sobre corporate {}", amount, corporate_id);
        Ok(account)
    }

    async fn update_limit(
        &self,
        corporate_id: Uuid,
        new_limit: Decimal,
    ) -> AppResult<Option<CorporateCreditAccount>> {
        let account = sqlx::query_as::<_, CorporateCreditAccount>(
            r#"
            UPDATE corporates
            SET credit_limit = $2,
                credit_balance = GREATEST(0, $2 - credit_used)
            WHERE id = $1
            RETURNING id AS corporate_id, credit_limit, credit_used, credit_balance
            "#,
        )
        .bind(corporate_id)
        .bind(new_limit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }
}
