use std::time::Duration;

use palisade_core::{ReputationReport, ReputationVerdict};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct ReputationConfig {
    /// Base URL of the reputation service. Unset means the layer is a no-op.
    pub endpoint: Option<Url>,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    2000
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Response shape shared by the common IP-scoring services; every field
/// is optional so a partial body still degrades instead of erroring.
#[derive(Debug, Deserialize)]
struct ReputationBody {
    #[serde(default)]
    fraud_score: Option<f64>,
    #[serde(default)]
    proxy: Option<bool>,
    #[serde(default)]
    vpn: Option<bool>,
}

const MALICIOUS_PENALTY: i64 = 80;
const SUSPICIOUS_PENALTY: i64 = 30;
const FRAUD_SCORE_CUTOFF: f64 = 75.0;

/// Optional lookup of a client address against an external reputation
/// service. Strictly fail-open: timeout, transport error, bad status, or
/// bad body all come back as `Unknown` with zero penalty, because an
/// outage in a third-party service must never block every login. No
/// retries either; a retry would tax every login with extra latency.
pub struct ReputationChecker {
    client: reqwest::Client,
    endpoint: Option<Url>,
    api_key: Option<String>,
    timeout: Duration,
}

impl ReputationChecker {
    pub fn new(cfg: &ReputationConfig) -> Self {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            timeout,
        }
    }

    pub fn noop() -> Self {
        Self::new(&ReputationConfig::default())
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }

    pub async fn check(&self, address: &str) -> ReputationReport {
        let (endpoint, api_key) = match (&self.endpoint, &self.api_key) {
            (Some(e), Some(k)) => (e, k),
            _ => {
                debug!("reputation service not configured, skipping lookup");
                return ReputationReport::unknown();
            }
        };

        let url = match endpoint.join(&format!("{}/{}", api_key, address)) {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "reputation url construction failed");
                return ReputationReport::unknown();
            }
        };

        // The client already carries a timeout; this outer bound also
        // covers connection setup and body streaming in one place.
        let response = match tokio::time::timeout(self.timeout, self.client.get(url).send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                warn!(ip = %address, error = %e, "reputation lookup failed");
                return ReputationReport::unknown();
            }
            Err(_) => {
                warn!(ip = %address, timeout_ms = self.timeout.as_millis() as u64, "reputation lookup timed out");
                return ReputationReport::unknown();
            }
        };

        if !response.status().is_success() {
            warn!(ip = %address, status = %response.status(), "reputation service returned error status");
            return ReputationReport::unknown();
        }

        let body: ReputationBody = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(ip = %address, error = %e, "reputation response was not valid json");
                return ReputationReport::unknown();
            }
        };

        classify(&body)
    }
}

fn classify(body: &ReputationBody) -> ReputationReport {
    if body.fraud_score.unwrap_or(0.0) > FRAUD_SCORE_CUTOFF {
        return ReputationReport {
            verdict: ReputationVerdict::Malicious,
            penalty: MALICIOUS_PENALTY,
            detail: Some(format!("fraud_score={:.0}", body.fraud_score.unwrap_or(0.0))),
        };
    }
    if body.proxy.unwrap_or(false) || body.vpn.unwrap_or(false) {
        return ReputationReport {
            verdict: ReputationVerdict::Suspicious,
            penalty: SUSPICIOUS_PENALTY,
            detail: Some("proxy_or_vpn".to_string()),
        };
    }
    ReputationReport {
        verdict: ReputationVerdict::Clean,
        penalty: 0,
        detail: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_keeps_the_serde_timeout() {
        let from_code = ReputationConfig::default();
        let from_toml: ReputationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(from_code.timeout_ms, 2000);
        assert_eq!(from_code.timeout_ms, from_toml.timeout_ms);
        assert!(from_code.endpoint.is_none());
    }

    #[tokio::test]
    async fn unconfigured_checker_is_neutral() {
        let checker = ReputationChecker::noop();
        assert!(!checker.is_configured());
        let report = checker.check("203.0.113.9").await;
        assert_eq!(report.verdict, ReputationVerdict::Unknown);
        assert_eq!(report.penalty, 0);
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_unknown() {
        // RFC 5737 test address with a tight timeout: the lookup fails,
        // the verdict must not.
        let cfg = ReputationConfig {
            endpoint: Some("http://192.0.2.1:9/".parse().unwrap()),
            api_key: Some("test-key".to_string()),
            timeout_ms: 50,
        };
        let checker = ReputationChecker::new(&cfg);
        let report = checker.check("203.0.113.9").await;
        assert_eq!(report.verdict, ReputationVerdict::Unknown);
        assert_eq!(report.penalty, 0);
    }

    #[test]
    fn high_fraud_score_is_malicious() {
        let report = classify(&ReputationBody {
            fraud_score: Some(92.0),
            proxy: Some(false),
            vpn: None,
        });
        assert_eq!(report.verdict, ReputationVerdict::Malicious);
        assert_eq!(report.penalty, 80);
    }

    #[test]
    fn proxy_or_vpn_is_suspicious() {
        let report = classify(&ReputationBody {
            fraud_score: Some(10.0),
            proxy: Some(true),
            vpn: None,
        });
        assert_eq!(report.verdict, ReputationVerdict::Suspicious);
        assert_eq!(report.penalty, 30);
    }

    #[test]
    fn clean_body_has_zero_penalty() {
        let report = classify(&ReputationBody {
            fraud_score: Some(3.0),
            proxy: Some(false),
            vpn: Some(false),
        });
        assert_eq!(report.verdict, ReputationVerdict::Clean);
        assert_eq!(report.penalty, 0);
    }

    #[test]
    fn partial_body_is_tolerated() {
        let body: ReputationBody = serde_json::from_str("{}").unwrap();
        assert_eq!(classify(&body).verdict, ReputationVerdict::Clean);
    }
}
