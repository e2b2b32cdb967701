use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use palisade_db::PalisadeDb;
use palisade_gate::{gate_router, GatePipeline, GateState, StaticCredentials};
use palisade_guard::{collector_script, CollectorTiming};
use palisade_limit::SlidingWindowLimiter;
use palisade_reputation::ReputationChecker;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

use crate::config::PalisadeConfig;

pub async fn run_serve(config: PalisadeConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = std::path::Path::new(&config.db.path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Admission control never depends on the audit store: if it cannot be
    // opened the gate still runs and only the history goes dark.
    let db = match PalisadeDb::open(&config.db.path) {
        Ok(db) => {
            info!(path = %config.db.path, "audit database opened");
            Some(db)
        }
        Err(e) => {
            warn!(path = %config.db.path, error = %e, "audit database unavailable, continuing without history");
            None
        }
    };

    let limiter = Arc::new(SlidingWindowLimiter::new(&config.limit));
    let reputation = Arc::new(ReputationChecker::new(&config.reputation));
    if reputation.is_configured() {
        info!("reputation service configured");
    }

    let collector = collector_script(
        &config.collector,
        &CollectorTiming {
            min_interaction_ms: config.score.min_interaction_ms,
            min_typing_ms: config.score.min_typing_ms,
            fast_submission_penalty: config.score.fast_submission_penalty,
            fast_typing_penalty: config.score.fast_typing_penalty,
        },
    );

    let pipeline = GatePipeline::new(limiter.clone(), reputation, config.score.clone());
    let validator = Arc::new(StaticCredentials::new(
        &config.auth.username,
        &config.auth.password,
    ));

    if config.gate.debug {
        warn!("debug endpoints enabled, do not run this in production");
    }

    let state = Arc::new(GateState {
        pipeline,
        db: db.as_ref().map(|d| d.clone_handle()),
        validator,
        collector,
        debug_enabled: config.gate.debug,
    });

    let bind = config.gate.bind.clone();
    let port = config.gate.port;
    let gate_handle = tokio::spawn(async move {
        let router = gate_router(state);
        let addr = format!("{}:{}", bind, port);
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("gate listening on {}", addr);
                // Peer addresses feed the rate-limit identity key when no
                // proxy headers are present.
                let service = router.into_make_service_with_connect_info::<SocketAddr>();
                if let Err(e) = axum::serve(listener, service).await {
                    error!("gate server error: {}", e);
                }
            }
            Err(e) => error!("gate bind failed on {}: {}", addr, e),
        }
    });

    let prune_limiter = limiter.clone();
    let prune_secs = config.limit.prune_interval_secs;
    let prune_handle = tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(prune_secs.max(1)));
        loop {
            tick.tick().await;
            prune_limiter.prune_stale(Utc::now());
        }
    });

    let purge_handle = match (db, config.db.retention_days) {
        (Some(db), Some(days)) => Some(tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(86_400));
            loop {
                tick.tick().await;
                match db.purge_older_than(days, Utc::now()) {
                    Ok(0) => {}
                    Ok(purged) => info!(purged, days, "purged aged attempt rows"),
                    Err(e) => warn!(error = %e, "attempt purge failed"),
                }
            }
        })),
        _ => None,
    };

    info!(
        threshold = config.score.block_threshold,
        max_attempts = config.limit.max_attempts,
        window_secs = config.limit.window_secs,
        "palisade gate running"
    );

    tokio::select! {
        _ = gate_handle => error!("gate task exited"),
        _ = prune_handle => error!("prune task exited"),
        _ = async { if let Some(h) = purge_handle { h.await.ok(); } else { std::future::pending::<()>().await; } } => {
            error!("purge task exited")
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    info!("gate stopped");
    Ok(())
}
