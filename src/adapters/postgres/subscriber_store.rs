//! PostgreSQL implementation of SubscriberStore.
//!
//! Field-level merges happen inside a single `INSERT ... ON CONFLICT`
//! statement, so independent metric and subscription updates racing on the
//! same row never overwrite each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{
    ChatUserId, DomainError, ErrorCode, ExternalUserId, SubscriptionId, Timestamp,
};
use crate::domain::subscriber::{Subscriber, SubscriberPatch, SubscriptionStatus};
use crate::domain::tiers::{Metrics, TierLevel};
use crate::ports::SubscriberStore;

const SELECT_COLUMNS: &str = r#"
    external_user_id, chat_user_id, email, rank_score, earnings, follower_count,
    active_tier_level, subscription_id, subscription_status, expires_at,
    created_at, updated_at
"#;

/// PostgreSQL implementation of the SubscriberStore port.
pub struct PostgresSubscriberStore {
    pool: PgPool,
}

impl PostgresSubscriberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to run migrations: {}", e)))
    }

    async fn fetch_one_by(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<Subscriber>, DomainError> {
        let query = format!("SELECT {} FROM subscribers WHERE {} = $1", SELECT_COLUMNS, column);
        let row: Option<SubscriberRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find subscriber", e))?;

        row.map(Subscriber::try_from).transpose()
    }
}

/// Database row representation of a subscriber.
#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    external_user_id: String,
    chat_user_id: Option<String>,
    email: Option<String>,
    rank_score: i64,
    earnings: f64,
    follower_count: i64,
    active_tier_level: Option<String>,
    subscription_id: Option<String>,
    subscription_status: String,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = DomainError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let subscription_status =
            SubscriptionStatus::parse(&row.subscription_status).ok_or_else(|| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid subscription status: {}", row.subscription_status),
                )
            })?;
        let active_tier_level = row
            .active_tier_level
            .map(|level| {
                TierLevel::parse(&level).ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Invalid tier level: {}", level),
                    )
                })
            })
            .transpose()?;

        Ok(Subscriber {
            external_user_id: ExternalUserId::new(row.external_user_id).map_err(corrupt_row)?,
            chat_user_id: row.chat_user_id.map(ChatUserId::new).transpose().map_err(corrupt_row)?,
            email: row.email,
            metrics: Metrics::new(
                u64::try_from(row.rank_score).unwrap_or(0),
                row.earnings,
                u64::try_from(row.follower_count).unwrap_or(0),
            ),
            active_tier_level,
            subscription_id: row
                .subscription_id
                .map(SubscriptionId::new)
                .transpose()
                .map_err(corrupt_row)?,
            subscription_status,
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn corrupt_row(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored identifier: {}", err))
}

fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, err))
}

fn to_bigint(field: &str, value: u64) -> Result<i64, DomainError> {
    i64::try_from(value)
        .map_err(|_| DomainError::validation(field, format!("{} is out of range", field)))
}

#[async_trait]
impl SubscriberStore for PostgresSubscriberStore {
    async fn upsert(
        &self,
        external_user_id: &ExternalUserId,
        patch: SubscriberPatch,
    ) -> Result<Subscriber, DomainError> {
        patch.metrics.validate()?;

        let rank_score = patch
            .metrics
            .rank_score
            .map(|v| to_bigint("rank_score", v))
            .transpose()?;
        let follower_count = patch
            .metrics
            .follower_count
            .map(|v| to_bigint("follower_count", v))
            .transpose()?;
        let subscription = patch.subscription.as_ref();

        // $9 flags whether the subscription group is being written; when it
        // is, NULL tier level is a real value rather than "keep".
        let query = format!(
            r#"
            INSERT INTO subscribers (
                external_user_id, email, rank_score, earnings, follower_count,
                active_tier_level, subscription_id, subscription_status, expires_at,
                created_at, updated_at
            ) VALUES (
                $1, $2, COALESCE($3, 0), COALESCE($4, 0), COALESCE($5, 0),
                $6, $7, COALESCE($8, 'none'), $10,
                clock_timestamp(), clock_timestamp()
            )
            ON CONFLICT (external_user_id) DO UPDATE SET
                email = COALESCE($2, subscribers.email),
                rank_score = COALESCE($3, subscribers.rank_score),
                earnings = COALESCE($4, subscribers.earnings),
                follower_count = COALESCE($5, subscribers.follower_count),
                active_tier_level = CASE WHEN $9 THEN $6 ELSE subscribers.active_tier_level END,
                subscription_id = CASE WHEN $9 THEN $7 ELSE subscribers.subscription_id END,
                subscription_status = CASE WHEN $9 THEN $8 ELSE subscribers.subscription_status END,
                expires_at = CASE WHEN $9 THEN $10 ELSE subscribers.expires_at END,
                updated_at = GREATEST(
                    clock_timestamp(),
                    subscribers.updated_at + INTERVAL '1 microsecond'
                )
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let row: SubscriberRow = sqlx::query_as(&query)
            .bind(external_user_id.as_str())
            .bind(patch.email.as_deref())
            .bind(rank_score)
            .bind(patch.metrics.earnings)
            .bind(follower_count)
            .bind(subscription.and_then(|s| s.tier_level).map(|l| l.as_str()))
            .bind(subscription.map(|s| s.subscription_id.as_str()))
            .bind(subscription.map(|s| s.status.as_str()))
            .bind(subscription.is_some())
            .bind(subscription.map(|s| *s.expires_at.as_datetime()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to upsert subscriber", e))?;

        Subscriber::try_from(row)
    }

    async fn get_by_external_id(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Subscriber>, DomainError> {
        self.fetch_one_by("external_user_id", external_user_id.as_str()).await
    }

    async fn get_by_chat_id(
        &self,
        chat_user_id: &ChatUserId,
    ) -> Result<Option<Subscriber>, DomainError> {
        self.fetch_one_by("chat_user_id", chat_user_id.as_str()).await
    }

    async fn list_expired(&self, now: Timestamp) -> Result<Vec<Subscriber>, DomainError> {
        let query = format!(
            r#"
            SELECT {} FROM subscribers
            WHERE subscription_status = 'active'
              AND expires_at < $1
            ORDER BY expires_at
            "#,
            SELECT_COLUMNS
        );
        let rows: Vec<SubscriberRow> = sqlx::query_as(&query)
            .bind(now.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list expired subscribers", e))?;

        rows.into_iter().map(Subscriber::try_from).collect()
    }

    async fn clear_subscription(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Subscriber>, DomainError> {
        let query = format!(
            r#"
            UPDATE subscribers SET
                active_tier_level = NULL,
                subscription_id = NULL,
                subscription_status = 'none',
                expires_at = NULL,
                updated_at = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')
            WHERE external_user_id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        let row: Option<SubscriberRow> = sqlx::query_as(&query)
            .bind(external_user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to clear subscription", e))?;

        row.map(Subscriber::try_from).transpose()
    }

    async fn link_chat_identity(
        &self,
        external_user_id: &ExternalUserId,
        chat_user_id: &ChatUserId,
    ) -> Result<Subscriber, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        sqlx::query(
            r#"
            UPDATE subscribers SET
                chat_user_id = NULL,
                updated_at = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')
            WHERE chat_user_id = $2 AND external_user_id <> $1
            "#,
        )
        .bind(external_user_id.as_str())
        .bind(chat_user_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to unlink previous chat identity owner", e))?;

        let query = format!(
            r#"
            INSERT INTO subscribers (external_user_id, chat_user_id, created_at, updated_at)
            VALUES ($1, $2, clock_timestamp(), clock_timestamp())
            ON CONFLICT (external_user_id) DO UPDATE SET
                chat_user_id = $2,
                updated_at = GREATEST(
                    clock_timestamp(),
                    subscribers.updated_at + INTERVAL '1 microsecond'
                )
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        let row: SubscriberRow = sqlx::query_as(&query)
            .bind(external_user_id.as_str())
            .bind(chat_user_id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to link chat identity", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit chat link", e))?;

        Subscriber::try_from(row)
    }
}
