use palisade_core::{
    Decision, LayerKind, LayerScore, ReputationReport, ScoreBreakdown, SignalBundle,
};
use serde::Deserialize;

use crate::{fingerprint, headless, timing};

/// Scoring knobs, loaded once at startup and read-only thereafter. The
/// block threshold is the single tunable governing the false-positive /
/// false-negative tradeoff; everything else fixes the per-rule penalties.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreConfig {
    #[serde(default = "default_block_threshold")]
    pub block_threshold: i64,
    #[serde(default = "default_min_interaction_ms")]
    pub min_interaction_ms: u64,
    #[serde(default = "default_min_typing_ms")]
    pub min_typing_ms: u64,
    #[serde(default = "default_fast_submission_penalty")]
    pub fast_submission_penalty: i64,
    #[serde(default = "default_fast_typing_penalty")]
    pub fast_typing_penalty: i64,
    #[serde(default = "default_invalid_metadata_penalty")]
    pub invalid_metadata_penalty: i64,
    #[serde(default = "default_limited_penalty")]
    pub limited_penalty: i64,
}

fn default_block_threshold() -> i64 {
    100
}
fn default_min_interaction_ms() -> u64 {
    800
}
fn default_min_typing_ms() -> u64 {
    150
}
fn default_fast_submission_penalty() -> i64 {
    50
}
fn default_fast_typing_penalty() -> i64 {
    25
}
fn default_invalid_metadata_penalty() -> i64 {
    30
}
// Must exceed any sane block threshold on its own.
fn default_limited_penalty() -> i64 {
    100
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            block_threshold: default_block_threshold(),
            min_interaction_ms: default_min_interaction_ms(),
            min_typing_ms: default_min_typing_ms(),
            fast_submission_penalty: default_fast_submission_penalty(),
            fast_typing_penalty: default_fast_typing_penalty(),
            invalid_metadata_penalty: default_invalid_metadata_penalty(),
            limited_penalty: default_limited_penalty(),
        }
    }
}

/// Combine the independently-computed layers into one breakdown. Each
/// sub-score is derived only from its own inputs; aggregation is a plain
/// sum, so the layers commute and none can observe another's value.
pub fn compute_breakdown(
    bundle: &SignalBundle,
    rate_limited: bool,
    reputation: &ReputationReport,
    cfg: &ScoreConfig,
) -> ScoreBreakdown {
    let timing = timing::analyze_timing(bundle.raw_metadata.as_deref(), bundle.timing_hint, cfg);
    let headless = headless::analyze_headless(bundle.headless_score);

    let mut rate_limit = LayerScore::new(LayerKind::RateLimit);
    if rate_limited {
        rate_limit.add(cfg.limited_penalty, "rate_limit_exceeded");
    }

    let mut rep_layer = LayerScore::new(LayerKind::Reputation);
    if reputation.penalty > 0 {
        let flag = match reputation.verdict {
            palisade_core::ReputationVerdict::Malicious => "reputation_malicious",
            palisade_core::ReputationVerdict::Suspicious => "reputation_suspicious",
            _ => "reputation_penalty",
        };
        rep_layer.add(reputation.penalty, flag);
    }

    let fingerprint = fingerprint::validate(bundle.fingerprint.as_deref());

    let total = timing
        .score
        .saturating_add(headless.score)
        .saturating_add(rate_limit.score)
        .saturating_add(rep_layer.score);

    let decision = if total >= cfg.block_threshold {
        Decision::Blocked
    } else {
        Decision::Allowed
    };

    ScoreBreakdown {
        timing,
        headless,
        rate_limit,
        reputation: rep_layer,
        fingerprint,
        total,
        threshold: cfg.block_threshold,
        decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_core::{FingerprintStatus, ReputationVerdict};

    fn bundle(timing_meta: &str, headless: i64) -> SignalBundle {
        SignalBundle {
            timing_hint: None,
            headless_score: Some(headless),
            fingerprint: Some("1uw9zpc".to_string()),
            raw_metadata: Some(timing_meta.to_string()),
        }
    }

    #[test]
    fn total_is_exact_sum_of_layers() {
        let rep = ReputationReport {
            verdict: ReputationVerdict::Suspicious,
            penalty: 30,
            detail: None,
        };
        let b = compute_breakdown(
            &bundle(r#"{"t_load_to_submit": 400}"#, 45),
            true,
            &rep,
            &ScoreConfig::default(),
        );
        assert_eq!(
            b.total,
            b.timing.score + b.headless.score + b.rate_limit.score + b.reputation.score
        );
        assert_eq!(b.total, 50 + 45 + 100 + 30);
    }

    #[test]
    fn fast_submission_alone_stays_below_default_threshold() {
        // 400 ms dwell, no keypress, clean everything else: 50 < 100.
        let b = compute_breakdown(
            &bundle(r#"{"t_load_to_submit": 400}"#, 0),
            false,
            &ReputationReport::unknown(),
            &ScoreConfig::default(),
        );
        assert_eq!(b.timing.score, 50);
        assert_eq!(b.total, 50);
        assert_eq!(b.decision, Decision::Allowed);
    }

    #[test]
    fn fast_submission_blocks_at_tighter_threshold() {
        let cfg = ScoreConfig {
            block_threshold: 60,
            ..ScoreConfig::default()
        };
        let allowed = compute_breakdown(
            &bundle(r#"{"t_load_to_submit": 400}"#, 0),
            false,
            &ReputationReport::unknown(),
            &cfg,
        );
        // 50 is still below a threshold of 60.
        assert_eq!(allowed.decision, Decision::Allowed);
    }

    #[test]
    fn webdriver_flag_blocks_regardless_of_other_layers() {
        // Automation flag contributes 100 client-side; normal timing,
        // no rate limit, no reputation.
        let b = compute_breakdown(
            &bundle(r#"{"t_load_to_submit": 6000, "t_typing_duration": 2500}"#, 100),
            false,
            &ReputationReport::unknown(),
            &ScoreConfig::default(),
        );
        assert_eq!(b.total, 100);
        assert_eq!(b.decision, Decision::Blocked);
    }

    #[test]
    fn rate_limited_blocks_independent_of_signals() {
        let b = compute_breakdown(
            &bundle(r#"{"t_load_to_submit": 6000, "t_typing_duration": 2500}"#, 0),
            true,
            &ReputationReport::unknown(),
            &ScoreConfig::default(),
        );
        assert_eq!(b.rate_limit.score, 100);
        assert_eq!(b.decision, Decision::Blocked);
    }

    #[test]
    fn unknown_reputation_contributes_zero() {
        let b = compute_breakdown(
            &bundle(r#"{"t_load_to_submit": 6000, "t_typing_duration": 2500}"#, 0),
            false,
            &ReputationReport::unknown(),
            &ScoreConfig::default(),
        );
        assert_eq!(b.reputation.score, 0);
        assert_eq!(b.decision, Decision::Allowed);
    }

    #[test]
    fn aggregation_is_order_independent() {
        // Same inputs, layers computed from disjoint state: swapping the
        // reputation and rate-limit contributions cannot change the total.
        let rep80 = ReputationReport {
            verdict: ReputationVerdict::Malicious,
            penalty: 80,
            detail: None,
        };
        let a = compute_breakdown(
            &bundle("{}", 20),
            false,
            &rep80,
            &ScoreConfig::default(),
        );
        assert_eq!(a.total, 50 + 20 + 80);
    }

    #[test]
    fn empty_bundle_is_scored_not_rejected() {
        // Scripting-disabled client: no sentinel fields at all.
        let b = compute_breakdown(
            &SignalBundle::default(),
            false,
            &ReputationReport::unknown(),
            &ScoreConfig::default(),
        );
        assert_eq!(b.fingerprint, FingerprintStatus::Missing);
        assert_eq!(b.timing.score, 50);
        assert_eq!(b.headless.score, 0);
        assert_eq!(b.decision, Decision::Allowed);
    }
}
