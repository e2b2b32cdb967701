use std::sync::Arc;

use chrono::{DateTime, Utc};
use palisade_core::{IdentityKey, ScoreBreakdown, SignalBundle};
use palisade_detect::{compute_breakdown, ScoreConfig};
use palisade_limit::SlidingWindowLimiter;
use palisade_reputation::ReputationChecker;

/// Per-request scoring pipeline: record the attempt against the sliding
/// window, run the bounded reputation lookup, then fold everything into
/// one breakdown. The reputation call happens after the limiter update
/// has completed, so no limiter lock is ever held across external I/O.
pub struct GatePipeline {
    limiter: Arc<SlidingWindowLimiter>,
    reputation: Arc<ReputationChecker>,
    score_cfg: ScoreConfig,
}

impl GatePipeline {
    pub fn new(
        limiter: Arc<SlidingWindowLimiter>,
        reputation: Arc<ReputationChecker>,
        score_cfg: ScoreConfig,
    ) -> Self {
        Self {
            limiter,
            reputation,
            score_cfg,
        }
    }

    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    /// Score one login attempt. Records it against the rate limit: every
    /// attempt counts, whatever the eventual credential outcome.
    pub async fn evaluate(
        &self,
        key: &IdentityKey,
        bundle: &SignalBundle,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let count = self.limiter.record_attempt(key, now);
        let limited = self.limiter.exceeds_limit(count);
        let reputation = self.reputation.check(&key.address).await;
        compute_breakdown(bundle, limited, &reputation, &self.score_cfg)
    }

    /// Score without mutating the window, for the operator debug surface.
    pub async fn evaluate_readonly(
        &self,
        key: &IdentityKey,
        bundle: &SignalBundle,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let count = self.limiter.peek(key, now);
        // The hypothetical attempt would count toward its own limit.
        let limited = self.limiter.exceeds_limit(count + 1);
        let reputation = self.reputation.check(&key.address).await;
        compute_breakdown(bundle, limited, &reputation, &self.score_cfg)
    }
}
