//! Routing decision engine
//!
//! For each visit: load every target, keep those whose rules admit the visit
//! and that still have quota for the visit's UTC day, pick the highest value
//! (first one wins ties), and count the accept against the winner.

use std::sync::Arc;

use crate::{
    config::QuotaEnforcement,
    error::AppResult,
    models::{RoutingDecision, Target, Visit},
    repository::TargetRepository,
};

use super::quota::{DateKey, QuotaService};

/// Whether the target's acceptance rules admit a visit from `geo_state` at UTC `hour`
pub fn is_eligible(target: &Target, geo_state: &str, hour: u32) -> bool {
    target.accept.admits(geo_state, hour)
}

/// Highest `value` wins; on a tie the earliest target in `candidates` is kept.
/// `None` only for an empty slice.
pub fn select_best(candidates: &[Target]) -> Option<&Target> {
    let mut iter = candidates.iter();
    let mut best = iter.next()?;
    for candidate in iter {
        if candidate.value > best.value {
            best = candidate;
        }
    }
    Some(best)
}

#[derive(Clone)]
pub struct RoutingService {
    targets: Arc<dyn TargetRepository>,
    quota: QuotaService,
    enforcement: QuotaEnforcement,
}

impl RoutingService {
    pub fn new(
        targets: Arc<dyn TargetRepository>,
        quota: QuotaService,
        enforcement: QuotaEnforcement,
    ) -> Self {
        Self {
            targets,
            quota,
            enforcement,
        }
    }

    /// Decide where a visit goes. Storage failures are returned as-is, with no retry.
    pub async fn route(&self, visit: &Visit) -> AppResult<RoutingDecision> {
        let hour = visit.hour_of_day();
        let date = DateKey::from(visit.timestamp);
        tracing::debug!(
            "Routing visitor from {} at hour {} on {}",
            visit.geo_state,
            hour,
            visit.timestamp.to_rfc3339()
        );

        let targets = self.targets.get_all().await?;
        if targets.is_empty() {
            tracing::debug!("No targets registered, rejecting");
            return Ok(RoutingDecision::reject());
        }

        let mut candidates = self
            .eligible_targets(targets, &visit.geo_state, hour, date)
            .await?;

        loop {
            let Some(best) = select_best(&candidates) else {
                tracing::debug!("No eligible target for {} at hour {}", visit.geo_state, hour);
                return Ok(RoutingDecision::reject());
            };

            let accepts = self.quota.record_accept(&best.id, date).await?;

            if self.enforcement == QuotaEnforcement::Strict
                && accepts > i64::from(best.max_accepts_per_day)
            {
                // Lost the race for the last slot
                self.quota.undo_accept(&best.id, date).await?;
                tracing::debug!("Target {} filled up concurrently, trying next", best.id);
                let full = best.id.clone();
                candidates.retain(|t| t.id != full);
                continue;
            }

            tracing::info!(
                target_id = %best.id,
                accepts,
                max_accepts_per_day = best.max_accepts_per_day,
                "Visitor accepted"
            );
            return Ok(RoutingDecision::accept(best));
        }
    }

    /// Targets admitting the visit with quota left, in repository order
    async fn eligible_targets(
        &self,
        targets: Vec<Target>,
        geo_state: &str,
        hour: u32,
        date: DateKey,
    ) -> AppResult<Vec<Target>> {
        let mut eligible = Vec::with_capacity(targets.len());
        for target in targets {
            if !is_eligible(&target, geo_state, hour) {
                continue;
            }
            if self.quota.has_quota(&target, date).await? {
                eligible.push(target);
            }
        }
        Ok(eligible)
    }
}
