use palisade_core::{LayerKind, LayerScore};

/// Fold the collector's headless probe total into a layer score. The
/// probes inspect state only the client can observe (webdriver flags,
/// plugin counts, GPU renderer strings), so the reported value is used
/// as-is: an untrusted hint that raises the bar for an attacker without
/// being solely determinative.
pub fn analyze_headless(reported: Option<i64>) -> LayerScore {
    let mut result = LayerScore::new(LayerKind::Headless);

    let score = match reported {
        None => {
            result.flag("no_headless_report");
            return result;
        }
        Some(v) if v < 0 => {
            // A negative total cannot come from the collector's additive
            // battery; clamp so the aggregate can never be pulled down.
            result.flag("negative_score_clamped");
            0
        }
        Some(v) => v,
    };

    result.score = score;

    if score >= 100 {
        result.flag("webdriver_flag_detected");
    } else if score >= 50 {
        result.flag("multiple_headless_indicators");
    } else if score >= 20 {
        result.flag("suspicious_browser_properties");
    }

    result
}
