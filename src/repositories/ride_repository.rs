use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use super::corporate_repository::debit_with;
use super::RideStore;
use crate::models::{
    CreditDebit, GuardedTransition, NewRide, PartnerAssignment, PaymentStatus, Ride, RideFilter,
    RideStatus,
};
use crate::utils::errors::{not_found_error, AppResult};

pub struct RideRepository {
    pool: PgPool,
}

impl RideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RideStore for RideRepository {
    async fn insert(&self, new_ride: NewRide) -> AppResult<Ride> {
        let ride = sqlx::query_as::<_, Ride>(
            r#"
            INSERT INTO rides (
                id, user_id, vendor_id, corporate_id, vehicle_type_id, city_id,
                pickup_latitude, pickup_longitude, pickup_address,
                drop_latitude, drop_longitude, drop_address,
                distance_km, fare, payment_mode, payment_status, status, otp,
                is_instant_booking, is_manual_booking, scheduled_at, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    'PENDING', $17, $18, $19, $20, $21, $22)
            RETURNING *
            "#,
        )
        .bind(new_ride.id)
        .bind(new_ride.user_id)
        .bind(new_ride.vendor_id)
        .bind(new_ride.corporate_id)
        .bind(new_ride.vehicle_type_id)
        .bind(new_ride.city_id)
        .bind(new_ride.pickup.latitude)
        .bind(new_ride.pickup.longitude)
        .bind(&new_ride.pickup.address)
        .bind(new_ride.drop.latitude)
        .bind(new_ride.drop.longitude)
        .bind(&new_ride.drop.address)
        .bind(new_ride.distance_km)
        .bind(new_ride.fare)
        .bind(new_ride.payment_mode)
        .bind(PaymentStatus::Pending)
        .bind(&new_ride.otp)
        .bind(new_ride.is_instant_booking)
        .bind(new_ride.is_manual_booking)
        .bind(new_ride.scheduled_at)
        .bind(new_ride.created_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(ride)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Ride>> {
        let ride = sqlx::query_as::<_, Ride>("SELECT * FROM rides WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ride)
    }

    async fn list(&self, filter: &RideFilter) -> AppResult<Vec<Ride>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM rides WHERE TRUE");

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(user_id) = filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(partner_id) = filter.partner_id {
            builder.push(" AND partner_id = ").push_bind(partner_id);
        }
        if let Some(vendor_id) = filter.vendor_id {
            builder.push(" AND vendor_id = ").push_bind(vendor_id);
        }
        if let Some(corporate_id) = filter.corporate_id {
            builder.push(" AND corporate_id = ").push_bind(corporate_id);
        }
        if let Some(city_id) = filter.city_id {
            builder.push(" AND city_id = ").push_bind(city_id);
        }
        if let Some(manual) = filter.is_manual_booking {
            builder.push(" AND is_manual_booking = ").push_bind(manual);
        }
        if let Some(partner_id) = filter.visible_to_partner {
            builder
                .push(" AND (partner_id = ")
                .push_bind(partner_id)
                .push(" OR status = ")
                .push_bind(RideStatus::Pending)
                .push(")");
        }

        builder
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(filter.effective_limit())
            .push(" OFFSET ")
            .push_bind(filter.effective_offset());

        let rides = builder
            .build_query_as::<Ride>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rides)
    }

    async fn assign_partner(
        &self,
        ride_id: Uuid,
        assignment: PartnerAssignment,
    ) -> AppResult<Option<Ride>> {
        // Una sola sentencia: gana exactamente un partner
        let ride = sqlx::query_as::<_, Ride>(
            r#"
            UPDATE rides
            SET partner_id = $2,
                vehicle_id = COALESCE($3, vehicle_id),
                vendor_id = COALESCE($4, vendor_id),
                status = 'ACCEPTED',
                accepted_at = $5
            WHERE id = $1 AND status = 'PENDING' AND partner_id IS NULL
            RETURNING *
            "#,
        )
        .bind(ride_id)
        .bind(assignment.partner_id)
        .bind(assignment.vehicle_id)
        .bind(assignment.vendor_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if ride.is_none() {
            debug!("🏁 Accept perdido para ride {} (partner {})", ride_id, assignment.partner_id);
        }
        Ok(ride)
    }

    async fn transition(&self, transition: &GuardedTransition) -> AppResult<Option<Ride>> {
        let ride = sqlx::query_as::<_, Ride>(
            r#"
            UPDATE rides
            SET status = $3,
                arrived_at = CASE WHEN $3 = 'ARRIVED'::ride_status THEN $4 ELSE arrived_at END,
                started_at = CASE WHEN $3 = 'STARTED'::ride_status THEN $4 ELSE started_at END,
                cancelled_at = CASE WHEN $3 = 'CANCELLED'::ride_status THEN $4 ELSE cancelled_at END,
                partner_id = CASE WHEN $3 = 'CANCELLED'::ride_status THEN NULL ELSE partner_id END,
                cancellation_reason = COALESCE($5, cancellation_reason)
            WHERE id = $1
              AND status = $2
              AND ($6::uuid IS NULL OR partner_id = $6)
            RETURNING *
            "#,
        )
        .bind(transition.ride_id)
        .bind(transition.from)
        .bind(transition.to)
        .bind(Utc::now())
        .bind(&transition.cancellation_reason)
        .bind(transition.partner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ride)
    }

    async fn complete(
        &self,
        ride_id: Uuid,
        partner_id: Uuid,
        debit: Option<CreditDebit>,
    ) -> AppResult<Option<Ride>> {
        let mut tx = self.pool.begin().await?;

        let ride = sqlx::query_as::<_, Ride>(
            r#"
            UPDATE rides
            SET status = 'COMPLETED', completed_at = $3
            WHERE id = $1 AND status = 'STARTED' AND partner_id = $2
            RETURNING *
            "#,
        )
        .bind(ride_id)
        .bind(partner_id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(ride) = ride else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(debit) = debit {
            let account = debit_with(&mut *tx, debit.corporate_id, debit.amount).await?;
            if account.is_none() {
                tx.rollback().await?;
                return Err(not_found_error("Corporate", &debit.corporate_id));
            }
        }

        tx.commit().await?;
        info!("✅ Ride {} completado en una sola transacción", ride.id);
        Ok(Some(ride))
    }
}
