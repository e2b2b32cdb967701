use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use palisade_core::{AttemptLog, FingerprintStatus, IdentityKey, SignalBundle};
use palisade_db::PalisadeDb;
use palisade_guard::inject_collector;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::decision::GatePipeline;
use crate::pages::{login_page, success_page, REJECTION_MESSAGE};
use crate::validator::CredentialValidator;

pub struct GateState {
    pub pipeline: GatePipeline,
    pub db: Option<PalisadeDb>,
    pub validator: Arc<dyn CredentialValidator>,
    /// Pre-rendered collector script, injected into every served page.
    pub collector: String,
    pub debug_enabled: bool,
}

/// Login submission plus the collector's sentinel fields. Everything
/// beyond the credentials is optional: a scripting-disabled client sends
/// none of it and is scored conservatively rather than rejected.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub sentinel_timing: Option<String>,
    pub sentinel_headless: Option<String>,
    pub sentinel_fingerprint: Option<String>,
    pub sentinel_metadata: Option<String>,
}

pub fn gate_router(state: Arc<GateState>) -> Router {
    let mut router = Router::new()
        .route("/", get(login_form_handler))
        .route("/login", post(login_handler))
        .route("/healthz", get(health_handler));

    if state.debug_enabled {
        // Operator tuning surface; never registered in production runs.
        let debug = Router::new()
            .route("/debug/score", post(debug_score_handler))
            .route("/debug/stats", get(debug_stats_handler))
            .layer(CorsLayer::permissive());
        router = router.merge(debug);
    }

    router.with_state(state)
}

/// Proxy headers win over the peer address so deployments behind a
/// reverse proxy key on the real client, not the proxy. Without either,
/// the accepted connection's address keeps direct clients distinct.
fn extract_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn extract_user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Lift the transported fields into a bundle. Unparseable numerics are
/// dropped to absent rather than erroring: the scoring layers own the
/// policy for missing fields.
fn bundle_from_form(form: &LoginForm) -> SignalBundle {
    SignalBundle {
        timing_hint: form.sentinel_timing.as_deref().and_then(|s| s.trim().parse().ok()),
        headless_score: form
            .sentinel_headless
            .as_deref()
            .and_then(|s| s.trim().parse().ok()),
        fingerprint: form
            .sentinel_fingerprint
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        raw_metadata: form.sentinel_metadata.clone(),
    }
}

async fn login_form_handler(State(state): State<Arc<GateState>>) -> Html<String> {
    Html(inject_collector(&login_page(None), &state.collector))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "palisade-gate"
    }))
}

/// Uniform refusal: same status, same body, whichever layer or credential
/// check produced it.
fn rejection(state: &GateState) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Html(inject_collector(
            &login_page(Some(REJECTION_MESSAGE)),
            &state.collector,
        )),
    )
        .into_response()
}

async fn login_handler(
    State(state): State<Arc<GateState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let now = Utc::now();
    let ip = extract_ip(&headers, Some(peer));
    let user_agent = extract_user_agent(&headers);
    let key = IdentityKey::new(&ip, &form.username);
    let bundle = bundle_from_form(&form);

    let breakdown = state.pipeline.evaluate(&key, &bundle, now).await;

    info!(
        ip = %key.address,
        user = %key.username,
        total = breakdown.total,
        timing = breakdown.timing.score,
        headless = breakdown.headless.score,
        rate_limit = breakdown.rate_limit.score,
        reputation = breakdown.reputation.score,
        blocked = breakdown.blocked(),
        "login attempt scored"
    );

    if let Some(ref db) = state.db {
        if breakdown.fingerprint == FingerprintStatus::Present {
            if let Some(ref fp) = bundle.fingerprint {
                if let Err(e) = db.record_fingerprint(fp, &key.address, now) {
                    warn!(error = %e, "failed to record fingerprint sighting");
                }
            }
        }
        let attempt = AttemptLog {
            id: uuid::Uuid::new_v4().to_string(),
            username: key.username.clone(),
            ip_address: key.address.clone(),
            user_agent,
            bot_score: breakdown.total,
            blocked: breakdown.blocked(),
            timestamp: now,
        };
        if let Err(e) = db.record_attempt(&attempt) {
            warn!(error = %e, "failed to record login attempt");
        }
    }

    if breakdown.blocked() {
        return rejection(&state);
    }

    // Forwarded: credentials cross the boundary untouched, and nothing
    // from the scoring run leaks into the validator's outcome.
    if state.validator.verify(&form.username, &form.password) {
        Html(success_page(&form.username)).into_response()
    } else {
        rejection(&state)
    }
}

async fn debug_score_handler(
    State(state): State<Arc<GateState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Json<serde_json::Value> {
    let ip = extract_ip(&headers, Some(peer));
    let key = IdentityKey::new(&ip, &form.username);
    let bundle = bundle_from_form(&form);

    let breakdown = state
        .pipeline
        .evaluate_readonly(&key, &bundle, Utc::now())
        .await;

    Json(serde_json::to_value(&breakdown).unwrap_or_default())
}

async fn debug_stats_handler(
    State(state): State<Arc<GateState>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let db = state.db.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    let stats = db
        .stats(Utc::now())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(serde_json::to_value(&stats).unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> LoginForm {
        let mut f = LoginForm {
            username: String::new(),
            password: String::new(),
            sentinel_timing: None,
            sentinel_headless: None,
            sentinel_fingerprint: None,
            sentinel_metadata: None,
        };
        for (k, v) in fields {
            match *k {
                "username" => f.username = v.to_string(),
                "sentinel_timing" => f.sentinel_timing = Some(v.to_string()),
                "sentinel_headless" => f.sentinel_headless = Some(v.to_string()),
                "sentinel_fingerprint" => f.sentinel_fingerprint = Some(v.to_string()),
                "sentinel_metadata" => f.sentinel_metadata = Some(v.to_string()),
                _ => unreachable!(),
            }
        }
        f
    }

    #[test]
    fn numeric_sentinels_parse() {
        let b = bundle_from_form(&form(&[
            ("sentinel_timing", "50"),
            ("sentinel_headless", "145"),
            ("sentinel_fingerprint", "1uw9zpc"),
        ]));
        assert_eq!(b.timing_hint, Some(50));
        assert_eq!(b.headless_score, Some(145));
        assert_eq!(b.fingerprint.as_deref(), Some("1uw9zpc"));
    }

    #[test]
    fn garbage_sentinels_become_absent() {
        let b = bundle_from_form(&form(&[
            ("sentinel_timing", "fifty"),
            ("sentinel_headless", "NaN"),
            ("sentinel_fingerprint", "   "),
        ]));
        assert!(b.timing_hint.is_none());
        assert!(b.headless_score.is_none());
        assert!(b.fingerprint.is_none());
    }

    #[test]
    fn forwarded_header_wins_and_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.2".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.3".parse().unwrap());
        let peer: SocketAddr = "10.0.0.4:9999".parse().unwrap();
        assert_eq!(extract_ip(&headers, Some(peer)), "203.0.113.9");
    }

    #[test]
    fn real_ip_beats_the_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.4".parse().unwrap());
        let peer: SocketAddr = "10.0.0.4:9999".parse().unwrap();
        assert_eq!(extract_ip(&headers, Some(peer)), "198.51.100.4");
    }

    #[test]
    fn proxyless_clients_keep_distinct_peer_addresses() {
        // No proxy headers at all: direct clients must not collapse onto
        // one shared rate-limit key.
        let a: SocketAddr = "203.0.113.9:50412".parse().unwrap();
        let b: SocketAddr = "198.51.100.4:50413".parse().unwrap();
        let ip_a = extract_ip(&HeaderMap::new(), Some(a));
        let ip_b = extract_ip(&HeaderMap::new(), Some(b));
        assert_eq!(ip_a, "203.0.113.9");
        assert_eq!(ip_b, "198.51.100.4");
        assert_ne!(ip_a, ip_b);

        assert_eq!(extract_ip(&HeaderMap::new(), None), "unknown");
    }
}
