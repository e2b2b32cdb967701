use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Untrusted signal payload attached to one login attempt by the in-page
/// collector. Everything here is client-controlled and treated as a hint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalBundle {
    /// Client-computed timing score. Recorded for comparison only; the
    /// server recomputes the timing layer from `metadata`.
    pub timing_hint: Option<i64>,
    /// Client-computed headless probe total. Used as-is since the probed
    /// state is only observable in the client.
    pub headless_score: Option<i64>,
    /// Rolling-hash device fingerprint, radix-36.
    pub fingerprint: Option<String>,
    /// Raw `sentinel_metadata` field, JSON-encoded timing timestamps.
    /// Kept unparsed so malformed input can be scored rather than rejected.
    pub raw_metadata: Option<String>,
}

/// Timing timestamps measured by the collector, all in milliseconds
/// relative to page load. Fields are optional because the corresponding
/// events may never fire (a bot can submit without ever focusing a field).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingMetadata {
    #[serde(default)]
    pub t_load_to_submit: Option<u64>,
    #[serde(default)]
    pub t_first_focus: Option<u64>,
    #[serde(default)]
    pub t_first_key: Option<u64>,
    #[serde(default)]
    pub t_typing_duration: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    Timing,
    Headless,
    RateLimit,
    Reputation,
}

/// One layer's contribution to the total, plus diagnostic flags naming the
/// rules that fired. Flags are for logs and the debug surface only; they
/// never reach the requesting client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerScore {
    pub layer: LayerKind,
    pub score: i64,
    pub flags: Vec<String>,
}

impl LayerScore {
    pub fn new(layer: LayerKind) -> Self {
        Self {
            layer,
            score: 0,
            flags: Vec::new(),
        }
    }

    pub fn add(&mut self, points: i64, flag: &str) {
        self.score = self.score.saturating_add(points);
        self.flags.push(flag.to_string());
    }

    pub fn flag(&mut self, flag: &str) {
        self.flags.push(flag.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerprintStatus {
    Present,
    Missing,
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allowed,
    Blocked,
}

/// Ephemeral result of scoring one request. Exposed read-only through the
/// debug surface; discarded once the request completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub timing: LayerScore,
    pub headless: LayerScore,
    pub rate_limit: LayerScore,
    pub reputation: LayerScore,
    pub fingerprint: FingerprintStatus,
    pub total: i64,
    pub threshold: i64,
    pub decision: Decision,
}

impl ScoreBreakdown {
    pub fn blocked(&self) -> bool {
        self.decision == Decision::Blocked
    }
}

/// Verdict of a reputation lookup for one address. `Unknown` is the
/// fail-open result for every failure mode of the external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReputationVerdict {
    Unknown,
    Clean,
    Suspicious,
    Malicious,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationReport {
    pub verdict: ReputationVerdict,
    pub penalty: i64,
    pub detail: Option<String>,
}

impl ReputationReport {
    pub fn unknown() -> Self {
        Self {
            verdict: ReputationVerdict::Unknown,
            penalty: 0,
            detail: None,
        }
    }
}

impl Default for ReputationReport {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Composite key scoping the rate limiter: one window per
/// (client address, claimed username) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub address: String,
    pub username: String,
}

impl IdentityKey {
    pub fn new(address: &str, username: &str) -> Self {
        Self {
            address: address.trim().to_string(),
            username: username.trim().to_lowercase(),
        }
    }
}

/// One audited login attempt, as persisted for operator statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptLog {
    pub id: String,
    pub username: String,
    pub ip_address: String,
    pub user_agent: String,
    pub bot_score: i64,
    pub blocked: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_key_normalizes_username() {
        let a = IdentityKey::new("10.0.0.1", "  Demo ");
        let b = IdentityKey::new("10.0.0.1", "demo");
        assert_eq!(a, b);
    }

    #[test]
    fn layer_score_saturates_instead_of_wrapping() {
        let mut s = LayerScore::new(LayerKind::Headless);
        s.add(i64::MAX, "a");
        s.add(100, "b");
        assert_eq!(s.score, i64::MAX);
        assert_eq!(s.flags, vec!["a", "b"]);
    }

    #[test]
    fn timing_metadata_tolerates_missing_fields() {
        let meta: TimingMetadata = serde_json::from_str("{}").unwrap();
        assert!(meta.t_load_to_submit.is_none());
        assert!(meta.t_first_key.is_none());

        let meta: TimingMetadata =
            serde_json::from_str(r#"{"t_load_to_submit": 400, "t_first_key": null}"#).unwrap();
        assert_eq!(meta.t_load_to_submit, Some(400));
        assert!(meta.t_first_key.is_none());
    }
}
