use palisade_detect::ScoreConfig;
use palisade_guard::HeadlessWeights;
use palisade_limit::LimitConfig;
use palisade_reputation::ReputationConfig;
use serde::Deserialize;

#[derive(Default, Deserialize)]
pub struct PalisadeConfig {
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub limit: LimitConfig,
    #[serde(default)]
    pub reputation: ReputationConfig,
    #[serde(default)]
    pub collector: HeadlessWeights,
    #[serde(default)]
    pub db: DbConfig,
}

#[derive(Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_gate_bind")]
    pub bind: String,
    #[serde(default = "default_gate_port")]
    pub port: u16,
    /// Exposes /debug/score and /debug/stats. Tuning aid only.
    #[serde(default)]
    pub debug: bool,
}

/// Demo credential pair handed to the static validator. A deployment
/// replaces the validator, not this section.
#[derive(Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_username")]
    pub username: String,
    #[serde(default = "default_auth_password")]
    pub password: String,
}

#[derive(Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Attempt rows older than this are purged daily. Unset keeps everything.
    pub retention_days: Option<i64>,
}

fn default_gate_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_gate_port() -> u16 {
    5001
}
fn default_auth_username() -> String {
    "demo".to_string()
}
fn default_auth_password() -> String {
    "password".to_string()
}
fn default_db_path() -> String {
    "./palisade-data/palisade.db".to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bind: default_gate_bind(),
            port: default_gate_port(),
            debug: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: default_auth_username(),
            password: default_auth_password(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            retention_days: None,
        }
    }
}

impl PalisadeConfig {
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
