use palisade_core::{LayerKind, LayerScore, TimingMetadata};

use crate::scoring::ScoreConfig;

/// Recompute the timing sub-score from the raw metadata the collector
/// attached to the submission. The client also sends its own pre-computed
/// timing score, but that value is an untrusted hint: it is compared
/// against the recomputation and logged on disagreement, never scored.
pub fn analyze_timing(
    raw_metadata: Option<&str>,
    client_hint: Option<i64>,
    cfg: &ScoreConfig,
) -> LayerScore {
    let mut result = LayerScore::new(LayerKind::Timing);

    let meta: TimingMetadata = match raw_metadata {
        None => TimingMetadata::default(),
        Some(raw) => match serde_json::from_str(raw) {
            Ok(meta) => meta,
            Err(e) => {
                // A client that sends garbage where the collector sends
                // JSON is not running the collector.
                tracing::debug!(error = %e, "unparseable timing metadata");
                result.add(cfg.invalid_metadata_penalty, "invalid_metadata");
                return result;
            }
        },
    };

    // Missing interaction time is treated as zero: a submission with no
    // measured page dwell is at least as suspicious as an instant one.
    let interaction_ms = meta.t_load_to_submit.unwrap_or(0);
    if interaction_ms < cfg.min_interaction_ms {
        result.add(cfg.fast_submission_penalty, "fast_submission");
    }

    // Typing duration only counts when a keypress actually happened;
    // an absent duration must not read as "impossibly fast typing".
    if let Some(typing_ms) = meta.t_typing_duration {
        if typing_ms > 0 && typing_ms < cfg.min_typing_ms {
            result.add(cfg.fast_typing_penalty, "fast_typing");
        }
    }

    if meta.t_first_focus.is_none() {
        result.flag("no_focus_event");
    }

    if let Some(hint) = client_hint {
        if hint != result.score {
            tracing::debug!(
                client = hint,
                server = result.score,
                "client timing hint disagrees with recomputation"
            );
            result.flag("client_hint_mismatch");
        }
    }

    result
}
