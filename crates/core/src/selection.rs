//! Next-video selection.
//!
//! A video is eligible for annotation when it is `unannotated`, or when it is
//! `in_progress` under a lock that has outlived the TTL. Eligible videos are
//! served oldest upload first. The database query in the `db` crate encodes
//! the same predicate; [`select_next`] is the in-process equivalent.

use chrono::Duration;

use crate::types::{DbId, Timestamp};
use crate::workflow::VideoStatus;

/// The fields of a video that selection looks at.
pub trait QueueEntry {
    fn id(&self) -> DbId;
    fn status(&self) -> VideoStatus;
    fn lock_time(&self) -> Option<Timestamp>;
    fn upload_date(&self) -> Timestamp;
}

/// Candidate predicate.
///
/// `in_progress` videos qualify only once `now - lock_time` strictly exceeds
/// the TTL. Completed videos never qualify.
pub fn is_candidate(
    status: VideoStatus,
    lock_time: Option<Timestamp>,
    now: Timestamp,
    ttl: Duration,
) -> bool {
    match status {
        VideoStatus::Unannotated => true,
        VideoStatus::InProgress => match lock_time {
            Some(at) => now - at > ttl,
            None => true,
        },
        VideoStatus::Completed => false,
    }
}

/// Pick the oldest eligible entry. Ties on `upload_date` break on id so the
/// order is stable.
pub fn select_next<'a, T, I>(entries: I, now: Timestamp, ttl: Duration) -> Option<&'a T>
where
    T: QueueEntry + 'a,
    I: IntoIterator<Item = &'a T>,
{
    entries
        .into_iter()
        .filter(|e| is_candidate(e.status(), e.lock_time(), now, ttl))
        .min_by_key(|e| (e.upload_date(), e.id()))
}
