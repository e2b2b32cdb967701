use palisade_core::{PalisadeError, PalisadeResult};
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> PalisadeResult<()> {
    conn.execute_batch(SCHEMA_V1)
        .map_err(|e| PalisadeError::Database(e.to_string()))?;
    Ok(())
}

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS login_attempts (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    ip_address TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    user_agent TEXT NOT NULL DEFAULT '',
    bot_score INTEGER NOT NULL DEFAULT 0,
    blocked INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS fingerprint_history (
    fingerprint TEXT NOT NULL,
    ip_address TEXT NOT NULL,
    first_seen INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    request_count INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (fingerprint, ip_address)
);

CREATE INDEX IF NOT EXISTS idx_attempts_username_ip ON login_attempts(username, ip_address);
CREATE INDEX IF NOT EXISTS idx_attempts_timestamp ON login_attempts(timestamp);
CREATE INDEX IF NOT EXISTS idx_attempts_blocked ON login_attempts(blocked);
CREATE INDEX IF NOT EXISTS idx_fingerprint ON fingerprint_history(fingerprint);
CREATE INDEX IF NOT EXISTS idx_fingerprint_ip ON fingerprint_history(ip_address);
"#;
