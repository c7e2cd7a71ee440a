//! Refresh-token sessions.

use dashlabel_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row of `user_sessions`. The refresh token itself is never stored.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    /// Set once the token has been used for a refresh or the user logged out.
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl UserSession {
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
}
