mod config;
mod serve;

use chrono::Utc;
use clap::{Parser, Subcommand};
use palisade_core::{ReputationReport, SignalBundle};
use palisade_db::PalisadeDb;
use palisade_detect::{compute_breakdown, ScoreConfig};

#[derive(Parser)]
#[command(name = "palisade")]
#[command(about = "Multi-signal bot scoring in front of a login form")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the login gate.
    Serve {
        #[arg(short = 'f', long, default_value = "palisade.toml", help = "Path to config file")]
        config: String,
    },
    /// Score a signal bundle offline, without touching rate limit state.
    Score {
        #[arg(long, help = "Raw timing metadata JSON, as sent in sentinel_metadata")]
        metadata: Option<String>,
        #[arg(long, help = "Client headless score, as sent in sentinel_headless")]
        headless: Option<i64>,
        #[arg(long, help = "Client fingerprint, as sent in sentinel_fingerprint")]
        fingerprint: Option<String>,
        #[arg(long, help = "Override the block threshold")]
        threshold: Option<i64>,
    },
    /// Print audit statistics from the attempt database.
    Stats {
        #[arg(long, default_value = "./palisade-data/palisade.db")]
        db: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palisade=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config: config_path } => {
            let cfg = if std::path::Path::new(&config_path).exists() {
                match config::PalisadeConfig::from_file(&config_path) {
                    Ok(cfg) => cfg,
                    Err(e) => {
                        eprintln!("error: failed to load config {}: {}", config_path, e);
                        std::process::exit(1);
                    }
                }
            } else {
                config::PalisadeConfig::default()
            };
            serve::run_serve(cfg).await
        }
        Commands::Score {
            metadata,
            headless,
            fingerprint,
            threshold,
        } => run_score(metadata, headless, fingerprint, threshold),
        Commands::Stats { db } => run_stats(db),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run_score(
    metadata: Option<String>,
    headless: Option<i64>,
    fingerprint: Option<String>,
    threshold: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = ScoreConfig::default();
    if let Some(t) = threshold {
        cfg.block_threshold = t;
    }

    let bundle = SignalBundle {
        timing_hint: None,
        headless_score: headless,
        fingerprint,
        raw_metadata: metadata,
    };

    let b = compute_breakdown(&bundle, false, &ReputationReport::unknown(), &cfg);

    println!("--- score breakdown ---");
    for layer in [&b.timing, &b.headless, &b.rate_limit, &b.reputation] {
        println!("{:?}: {} {:?}", layer.layer, layer.score, layer.flags);
    }
    println!("fingerprint: {:?}", b.fingerprint);
    println!("\ntotal: {} (threshold {})", b.total, b.threshold);
    println!("decision: {:?}", b.decision);

    Ok(())
}

fn run_stats(db_path: String) -> Result<(), Box<dyn std::error::Error>> {
    let db = PalisadeDb::open(&db_path)?;
    let stats = db.stats(Utc::now())?;

    println!("--- last 24h ---");
    println!("attempts: {}", stats.attempts_24h);
    println!("blocked: {}", stats.blocked_24h);
    println!("avg bot score: {:.1}", stats.avg_bot_score_24h);
    println!("unique ips: {}", stats.unique_ips_24h);

    if !stats.top_blocked_ips.is_empty() {
        println!("\ntop blocked ips:");
        for (ip, count) in &stats.top_blocked_ips {
            println!("  {} ({})", ip, count);
        }
    }

    Ok(())
}
