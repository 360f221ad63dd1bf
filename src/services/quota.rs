//! Daily accept quotas
//!
//! Counters are bucketed by UTC calendar day under
//! `target:{id}:accepts:{YYYY-MM-DD}`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{error::AppResult, models::Target, repository::QuotaStore};

/// UTC calendar day a visit falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl From<DateTime<Utc>> for DateKey {
    fn from(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp.date_naive())
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Counter key for one target on one day
pub fn accepts_key(target_id: &str, date: DateKey) -> String {
    format!("target:{}:accepts:{}", target_id, date)
}

#[derive(Clone)]
pub struct QuotaService {
    store: Arc<dyn QuotaStore>,
    ttl_seconds: u64,
}

impl QuotaService {
    pub fn new(store: Arc<dyn QuotaStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    /// Accepts recorded for a target on a day
    pub async fn accepts(&self, target_id: &str, date: DateKey) -> AppResult<i64> {
        self.store.get_count(&accepts_key(target_id, date)).await
    }

    /// Whether the target can still take a visit on `date`
    pub async fn has_quota(&self, target: &Target, date: DateKey) -> AppResult<bool> {
        let accepts = self.accepts(&target.id, date).await?;
        Ok(accepts < i64::from(target.max_accepts_per_day))
    }

    /// Count one accept and return the new total
    pub async fn record_accept(&self, target_id: &str, date: DateKey) -> AppResult<i64> {
        self.store
            .increment_and_expire(&accepts_key(target_id, date), self.ttl_seconds)
            .await
    }

    pub async fn undo_accept(&self, target_id: &str, date: DateKey) -> AppResult<i64> {
        self.store.decrement(&accepts_key(target_id, date)).await
    }
}
