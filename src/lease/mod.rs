//! Run-exclusivity lease
//!
//! Only one audit should run at a time in a shared deployment. The lease is
//! an explicit object handed to [`crate::run_exclusive`]: a holder keeps it
//! by renewing it, and a lease not renewed within its TTL can be reclaimed
//! by anyone, so a crashed run never locks the service out for good.

use crate::AuditError;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};

/// Lower bound of a lease TTL, in seconds
const MIN_TTL_SECS: i64 = 120;
/// Per-page allowance added to the base TTL, in seconds
const SECS_PER_PAGE: i64 = 3;
const BASE_TTL_SECS: i64 = 180;
/// Page counts above this get the same TTL
const MAX_TTL_PAGES: i64 = 1_000_000;

/// TTL long enough for an audit of `max_pages` pages
pub fn lease_ttl_for(max_pages: usize) -> Duration {
    let pages = i64::try_from(max_pages)
        .unwrap_or(MAX_TTL_PAGES)
        .min(MAX_TTL_PAGES);
    let secs = (pages * SECS_PER_PAGE + BASE_TTL_SECS).max(MIN_TTL_SECS);
    Duration::seconds(secs)
}

/// Current owner of a lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseHolder {
    pub id: String,
    pub acquired_at: DateTime<Utc>,
    pub renewed_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl LeaseHolder {
    /// Checks if the holder failed to renew within its TTL
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.renewed_at > self.ttl
    }
}

/// A reclaimable, single-holder lease
#[derive(Debug, Default)]
pub struct AuditLease {
    holder: Mutex<Option<LeaseHolder>>,
}

impl AuditLease {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<LeaseHolder>> {
        self.holder.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Takes the lease for `id`
    ///
    /// Succeeds when the lease is free, already held by `id` (which renews
    /// it), or held by someone whose TTL has elapsed.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - `id` now holds the lease
    /// * `Err(AuditError::Busy)` - Another live holder has it
    pub fn try_acquire(&self, id: &str, ttl: Duration) -> Result<(), AuditError> {
        self.try_acquire_at(id, ttl, Utc::now())
    }

    fn try_acquire_at(&self, id: &str, ttl: Duration, now: DateTime<Utc>) -> Result<(), AuditError> {
        let mut holder = self.lock();
        match holder.as_mut() {
            Some(current) if current.id == id => {
                current.renewed_at = now;
                current.ttl = ttl;
                return Ok(());
            }
            Some(current) if !current.is_expired(now) => {
                return Err(AuditError::Busy {
                    holder: current.id.clone(),
                });
            }
            Some(current) => {
                tracing::warn!("Reclaiming expired audit lease held by {}", current.id);
            }
            None => {}
        }
        *holder = Some(LeaseHolder {
            id: id.to_string(),
            acquired_at: now,
            renewed_at: now,
            ttl,
        });
        Ok(())
    }

    /// Extends the lease; returns false when `id` does not hold it
    pub fn renew(&self, id: &str) -> bool {
        match self.lock().as_mut() {
            Some(current) if current.id == id => {
                current.renewed_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Gives the lease up; a no-op unless `id` holds it
    pub fn release(&self, id: &str) {
        let mut holder = self.lock();
        if holder.as_ref().is_some_and(|current| current.id == id) {
            *holder = None;
        }
    }

    /// Whether someone other than `id` holds a live lease
    pub fn is_busy(&self, id: &str) -> bool {
        self.is_busy_at(id, Utc::now())
    }

    fn is_busy_at(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|current| current.id != id && !current.is_expired(now))
    }

    /// Snapshot of the current holder, expired or not
    pub fn holder(&self) -> Option<LeaseHolder> {
        self.lock().clone()
    }
}
