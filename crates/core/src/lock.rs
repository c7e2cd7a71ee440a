//! Exclusive annotation lock rules.
//!
//! A video carries at most one lock holder (`locked_by`) and the time the lock
//! was taken (`lock_time`). A lock older than the TTL is abandoned and any user
//! may take it over. Expiry is evaluated lazily: only [`evaluate_acquire`] and
//! next-video selection look at `lock_time`. [`check_ownership`] deliberately
//! does not, so a holder whose lock went stale keeps working until someone else
//! actually reclaims the video.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};
use crate::workflow::VideoStatus;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default lock TTL in seconds (one hour).
pub const DEFAULT_LOCK_TTL_SECS: i64 = 3600;

/// Smallest configurable TTL in seconds.
pub const MIN_LOCK_TTL_SECS: i64 = 1;

/// Message returned when a live lock belongs to someone else.
pub const ALREADY_LOCKED_MSG: &str = "Video is already locked by another user";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The lock fields of a video at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSnapshot {
    pub locked_by: Option<DbId>,
    pub lock_time: Option<Timestamp>,
}

/// How an acquire attempt was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Nobody held the lock.
    Fresh,
    /// The requester already held it; `lock_time` is refreshed.
    Reentrant,
    /// Another user's lock had expired and was taken over.
    Reclaimed { previous_holder: DbId },
}

/// Lock state reported back to the client after a successful start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockState {
    pub video_id: DbId,
    pub status: VideoStatus,
    pub locked_by: Option<DbId>,
    pub lock_time: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Validate a configured lock TTL.
pub fn validate_ttl(ttl_secs: i64) -> Result<(), CoreError> {
    if ttl_secs < MIN_LOCK_TTL_SECS {
        return Err(CoreError::Validation(format!(
            "Lock TTL must be at least {MIN_LOCK_TTL_SECS} second(s), got {ttl_secs}"
        )));
    }
    Ok(())
}

/// The instant before which a `lock_time` counts as stale.
pub fn stale_cutoff(now: Timestamp, ttl: Duration) -> Timestamp {
    now - ttl
}

/// Whether a lock taken at `lock_time` has reached its TTL at `now`.
///
/// A holder without a recorded `lock_time` cannot prove the lock is live, so it
/// counts as expired.
pub fn is_expired(lock_time: Option<Timestamp>, now: Timestamp, ttl: Duration) -> bool {
    match lock_time {
        Some(at) => now - at >= ttl,
        None => true,
    }
}

/// Decide whether `requester` may take the lock described by `snapshot`.
///
/// Fails with [`CoreError::Conflict`] only when a different user holds a lock
/// younger than `ttl`.
pub fn evaluate_acquire(
    snapshot: LockSnapshot,
    requester: DbId,
    now: Timestamp,
    ttl: Duration,
) -> Result<AcquireOutcome, CoreError> {
    match snapshot.locked_by {
        None => Ok(AcquireOutcome::Fresh),
        Some(holder) if holder == requester => Ok(AcquireOutcome::Reentrant),
        Some(holder) => {
            if is_expired(snapshot.lock_time, now, ttl) {
                Ok(AcquireOutcome::Reclaimed {
                    previous_holder: holder,
                })
            } else {
                Err(CoreError::Conflict(ALREADY_LOCKED_MSG.into()))
            }
        }
    }
}

/// Pure ownership predicate. Does not consider expiry.
pub fn check_ownership(locked_by: Option<DbId>, requester: DbId) -> bool {
    locked_by == Some(requester)
}

/// Guard used before every mutating annotation operation.
pub fn require_ownership(locked_by: Option<DbId>, requester: DbId) -> Result<(), CoreError> {
    if check_ownership(locked_by, requester) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "You do not hold the annotation lock for this video".into(),
        ))
    }
}

/// Decide whether `requester` may release the lock.
pub fn evaluate_release(locked_by: Option<DbId>, requester: DbId) -> Result<(), CoreError> {
    if check_ownership(locked_by, requester) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "You are not allowed to unlock this video".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
