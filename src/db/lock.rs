use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// What a write lock is guarding. Becomes part of the lock id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTag {
    PollUpdate,
    VoteUpdate,
    Init,
}

impl LockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockTag::PollUpdate => "pollUpdate",
            LockTag::VoteUpdate => "voteUpdate",
            LockTag::Init => "init",
        }
    }
}

/// Optimistic-concurrency token for data object writes.
///
/// Two writers that build a lock id for the same asset and tag inside the same
/// time bucket collide; the second one is rejected by the store until the
/// first releases the lock or the window passes. Writers whose timestamps
/// round to different buckets are not excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockId {
    value: String,
    window: Duration,
}

impl LockId {
    pub fn bucketed(asset_id: &str, tag: LockTag, now: DateTime<Utc>, window: Duration) -> Self {
        let window_ms = window.num_milliseconds().max(1);
        // Round to the nearest bucket boundary
        let bucket = (now.timestamp_millis() + window_ms / 2).div_euclid(window_ms) * window_ms;

        Self {
            value: format!("{}-{}-{}", asset_id, tag.as_str(), bucket),
            window,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, Clone)]
pub struct LockOptions {
    pub lock_id: LockId,
    pub release_lock: bool,
}
