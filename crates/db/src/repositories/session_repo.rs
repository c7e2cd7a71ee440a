//! Repository for the `user_sessions` table.

use dashlabel_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::session::{CreateSession, UserSession};

const COLUMNS: &str = "id, user_id, refresh_token_hash, expires_at, revoked_at, created_at";

pub struct SessionRepo;

impl SessionRepo {
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<UserSession, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut conn, input).await
    }

    async fn insert(
        conn: &mut PgConnection,
        input: &CreateSession,
    ) -> Result<UserSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions (user_id, refresh_token_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(input.expires_at)
            .fetch_one(conn)
            .await
    }

    /// Session for `hash` if it is neither revoked nor expired at `now`.
    pub async fn find_live(
        pool: &PgPool,
        hash: &str,
        now: Timestamp,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE refresh_token_hash = $1
               AND revoked_at IS NULL
               AND expires_at > $2"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(hash)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Revoke session `used` and insert `next` in one transaction.
    ///
    /// Returns `None`, with nothing written, when `used` was already revoked.
    /// Of two refreshes racing on one token, only one gets a new session.
    pub async fn rotate(
        pool: &PgPool,
        used: DbId,
        next: &CreateSession,
        now: Timestamp,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE user_sessions SET revoked_at = $2
             WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(used)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if revoked == 0 {
            return Ok(None);
        }

        let session = Self::insert(&mut tx, next).await?;
        tx.commit().await?;
        Ok(Some(session))
    }

    /// Revoke every live session of a user. Returns how many were revoked.
    pub async fn revoke_all_for_user(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = $2
             WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
