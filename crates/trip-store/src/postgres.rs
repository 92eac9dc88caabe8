use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{MessageId, TripId};
use domain::{Trip, TripStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::records::{InboxRecord, OutboxRecord};
use crate::store::TripStore;

/// PostgreSQL-backed trip store.
///
/// Trips are stored as a JSONB snapshot next to a denormalized `status`
/// column; the guarded update is `UPDATE … WHERE id = $1 AND status = $2`
/// inside a transaction that also inserts the outbox (and inbox) rows, so
/// a lost race rolls back without any partial effect. This is the
/// compare-and-swap substitute for row locks that preserves the
/// single-acceptance invariant.
#[derive(Clone)]
pub struct PostgresTripStore {
    pool: PgPool,
}

impl PostgresTripStore {
    /// Creates a new PostgreSQL trip store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_trip(row: PgRow) -> Result<Trip> {
        let payload: serde_json::Value = row.try_get("payload")?;
        Ok(serde_json::from_value(payload)?)
    }

    fn row_to_outbox(row: PgRow) -> Result<OutboxRecord> {
        Ok(OutboxRecord {
            id: row.try_get("id")?,
            aggregate_id: row.try_get("aggregate_id")?,
            aggregate_type: row.try_get("aggregate_type")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            processed: row.try_get("processed")?,
        })
    }

    async fn insert_outbox_rows(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        outbox: &[OutboxRecord],
    ) -> Result<()> {
        for record in outbox {
            sqlx::query(
                r#"
                INSERT INTO trip_outbox (id, aggregate_id, aggregate_type, event_type, payload, created_at, processed)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(record.id)
            .bind(record.aggregate_id)
            .bind(&record.aggregate_type)
            .bind(&record.event_type)
            .bind(&record.payload)
            .bind(record.created_at)
            .bind(record.processed)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Performs the conditional status swap; maps a missed swap to
    /// NotFound or StatusConflict by re-reading the row.
    async fn cas_update(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        trip: &Trip,
        expected: TripStatus,
    ) -> Result<()> {
        let payload = serde_json::to_value(trip)?;
        let result = sqlx::query(
            "UPDATE trips SET status = $1, payload = $2, updated_at = now() WHERE id = $3 AND status = $4",
        )
        .bind(trip.status().as_str())
        .bind(&payload)
        .bind(trip.id().as_uuid())
        .bind(expected.as_str())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let actual: Option<String> = sqlx::query_scalar("SELECT status FROM trips WHERE id = $1")
                .bind(trip.id().as_uuid())
                .fetch_optional(&mut **tx)
                .await?;

            tracing::debug!(
                trip_id = %trip.id(),
                expected = %expected,
                actual = actual.as_deref().unwrap_or("<missing>"),
                "status swap lost"
            );
            return Err(Self::swap_failure(trip.id(), expected, actual));
        }
        Ok(())
    }

    /// Maps a missed swap to the error the caller sees: NotFound when the
    /// row is gone, StatusConflict when someone else won the race, and
    /// CorruptStatus when the stored column does not parse.
    fn swap_failure(trip_id: TripId, expected: TripStatus, actual: Option<String>) -> StoreError {
        match actual {
            None => StoreError::NotFound(trip_id),
            Some(status) => match TripStatus::from_str(&status) {
                Ok(actual) => StoreError::StatusConflict {
                    trip_id,
                    expected,
                    actual,
                },
                Err(_) => StoreError::CorruptStatus { trip_id, status },
            },
        }
    }
}

#[async_trait]
impl TripStore for PostgresTripStore {
    async fn insert(&self, trip: &Trip) -> Result<()> {
        let payload = serde_json::to_value(trip)?;
        sqlx::query(
            "INSERT INTO trips (id, status, payload, created_at, updated_at) VALUES ($1, $2, $3, now(), now())",
        )
        .bind(trip.id().as_uuid())
        .bind(trip.status().as_str())
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateTrip(trip.id());
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn get(&self, trip_id: TripId) -> Result<Option<Trip>> {
        let row = sqlx::query("SELECT payload FROM trips WHERE id = $1")
            .bind(trip_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_trip).transpose()
    }

    async fn update(
        &self,
        trip: &Trip,
        expected: TripStatus,
        outbox: Vec<OutboxRecord>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::cas_update(&mut tx, trip, expected).await?;
        Self::insert_outbox_rows(&mut tx, &outbox).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_with_inbox(
        &self,
        trip: &Trip,
        expected: TripStatus,
        inbox: InboxRecord,
        outbox: Vec<OutboxRecord>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // The inbox insert doubles as the duplicate-delivery gate: a
        // second consumer racing past the is_processed check loses here
        // and rolls back without touching the trip.
        let inserted = sqlx::query(
            r#"
            INSERT INTO trip_inbox (message_id, event_type, processed_at, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id) DO NOTHING
            "#,
        )
        .bind(inbox.message_id.as_uuid())
        .bind(&inbox.event_type)
        .bind(inbox.processed_at)
        .bind(&inbox.status)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::DuplicateMessage(inbox.message_id));
        }

        Self::cas_update(&mut tx, trip, expected).await?;
        Self::insert_outbox_rows(&mut tx, &outbox).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn is_processed(&self, message_id: MessageId) -> Result<bool> {
        let exists: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT processed_at FROM trip_inbox WHERE message_id = $1")
                .bind(message_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(exists.is_some())
    }

    async fn fetch_unprocessed_outbox(&self, limit: i64) -> Result<Vec<OutboxRecord>> {
        let rows = sqlx::query(
            "SELECT id, aggregate_id, aggregate_type, event_type, payload, created_at, processed
             FROM trip_outbox WHERE NOT processed ORDER BY created_at ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_outbox).collect()
    }

    async fn mark_outbox_processed(&self, ids: &[Uuid]) -> Result<()> {
        sqlx::query("UPDATE trip_outbox SET processed = TRUE WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
