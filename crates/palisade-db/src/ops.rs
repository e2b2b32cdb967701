use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use palisade_core::{AttemptLog, PalisadeError, PalisadeResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

/// Audit store for login attempts and fingerprint sightings. This is not
/// the rate limiter's backing store: the in-memory limiter stays
/// authoritative, so a database failure degrades observability without
/// ever changing a login decision.
pub struct PalisadeDb {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FingerprintRecord {
    pub fingerprint: String,
    pub ip_address: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub request_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub attempts_24h: i64,
    pub blocked_24h: i64,
    pub avg_bot_score_24h: f64,
    pub unique_ips_24h: i64,
    pub top_blocked_ips: Vec<(String, i64)>,
}

impl PalisadeDb {
    pub fn open(path: &str) -> PalisadeResult<Self> {
        let conn = Connection::open(path).map_err(|e| PalisadeError::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
        )
        .map_err(|e| PalisadeError::Database(e.to_string()))?;
        crate::schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> PalisadeResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| PalisadeError::Database(e.to_string()))?;
        crate::schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn clone_handle(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }

    fn with_conn<F, T>(&self, f: F) -> PalisadeResult<T>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PalisadeError::Database(e.to_string()))?;
        f(&conn).map_err(|e| PalisadeError::Database(e.to_string()))
    }

    pub fn record_attempt(&self, attempt: &AttemptLog) -> PalisadeResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO login_attempts (id, username, ip_address, timestamp, user_agent, bot_score, blocked) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    attempt.id,
                    attempt.username,
                    attempt.ip_address,
                    attempt.timestamp.timestamp(),
                    attempt.user_agent,
                    attempt.bot_score,
                    attempt.blocked as i32,
                ],
            )?;
            Ok(())
        })
    }

    pub fn recent_attempts(
        &self,
        username: &str,
        ip_address: &str,
        window_secs: i64,
        now: DateTime<Utc>,
    ) -> PalisadeResult<Vec<AttemptLog>> {
        let cutoff = now.timestamp() - window_secs;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, ip_address, timestamp, user_agent, bot_score, blocked FROM login_attempts WHERE username = ?1 AND ip_address = ?2 AND timestamp >= ?3 ORDER BY timestamp DESC",
            )?;
            let rows = stmt.query_map(params![username, ip_address, cutoff], |row| {
                let ts: i64 = row.get(3)?;
                let blocked: i32 = row.get(6)?;
                Ok(AttemptLog {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    ip_address: row.get(2)?,
                    timestamp: Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now),
                    user_agent: row.get(4)?,
                    bot_score: row.get(5)?,
                    blocked: blocked != 0,
                })
            })?;
            rows.collect()
        })
    }

    /// Upsert one fingerprint sighting, bumping `last_seen` and the
    /// request counter on repeats.
    pub fn record_fingerprint(
        &self,
        fingerprint: &str,
        ip_address: &str,
        now: DateTime<Utc>,
    ) -> PalisadeResult<()> {
        let ts = now.timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO fingerprint_history (fingerprint, ip_address, first_seen, last_seen, request_count) VALUES (?1, ?2, ?3, ?3, 1)
                 ON CONFLICT(fingerprint, ip_address) DO UPDATE SET last_seen = ?3, request_count = request_count + 1",
                params![fingerprint, ip_address, ts],
            )?;
            Ok(())
        })
    }

    pub fn fingerprint_history(&self, fingerprint: &str) -> PalisadeResult<Option<FingerprintRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT fingerprint, ip_address, first_seen, last_seen, request_count FROM fingerprint_history WHERE fingerprint = ?1 ORDER BY last_seen DESC LIMIT 1",
                params![fingerprint],
                |row| {
                    let first: i64 = row.get(2)?;
                    let last: i64 = row.get(3)?;
                    Ok(FingerprintRecord {
                        fingerprint: row.get(0)?,
                        ip_address: row.get(1)?,
                        first_seen: Utc.timestamp_opt(first, 0).single().unwrap_or_else(Utc::now),
                        last_seen: Utc.timestamp_opt(last, 0).single().unwrap_or_else(Utc::now),
                        request_count: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    /// How many distinct usernames one device fingerprint has attempted
    /// recently, across all addresses. Operator-facing input for the
    /// out-of-band correlation the core deliberately does not score.
    pub fn usernames_per_fingerprint(
        &self,
        fingerprint: &str,
        window_secs: i64,
        now: DateTime<Utc>,
    ) -> PalisadeResult<i64> {
        let cutoff = now.timestamp() - window_secs;
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(DISTINCT la.username) FROM login_attempts la
                 JOIN fingerprint_history fh ON fh.ip_address = la.ip_address
                 WHERE fh.fingerprint = ?1 AND la.timestamp >= ?2",
                params![fingerprint, cutoff],
                |row| row.get(0),
            )
        })
    }

    pub fn purge_older_than(&self, days: i64, now: DateTime<Utc>) -> PalisadeResult<usize> {
        let cutoff = now.timestamp() - days * 86_400;
        self.with_conn(|conn| {
            let attempts =
                conn.execute("DELETE FROM login_attempts WHERE timestamp < ?1", params![cutoff])?;
            let fingerprints = conn.execute(
                "DELETE FROM fingerprint_history WHERE last_seen < ?1",
                params![cutoff],
            )?;
            Ok(attempts + fingerprints)
        })
    }

    pub fn stats(&self, now: DateTime<Utc>) -> PalisadeResult<DbStats> {
        let cutoff = now.timestamp() - 86_400;
        self.with_conn(|conn| {
            let (attempts, blocked, avg_score): (i64, i64, f64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(blocked), 0), COALESCE(AVG(bot_score), 0.0) FROM login_attempts WHERE timestamp >= ?1",
                params![cutoff],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            let unique_ips: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT ip_address) FROM login_attempts WHERE timestamp >= ?1",
                params![cutoff],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT ip_address, COUNT(*) AS n FROM login_attempts WHERE blocked = 1 AND timestamp >= ?1 GROUP BY ip_address ORDER BY n DESC LIMIT 10",
            )?;
            let top_blocked_ips = stmt
                .query_map(params![cutoff], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(DbStats {
                attempts_24h: attempts,
                blocked_24h: blocked,
                avg_bot_score_24h: avg_score,
                unique_ips_24h: unique_ips,
                top_blocked_ips,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(username: &str, ip: &str, score: i64, blocked: bool, now: DateTime<Utc>) -> AttemptLog {
        AttemptLog {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            ip_address: ip.to_string(),
            user_agent: "test-agent".to_string(),
            bot_score: score,
            blocked,
            timestamp: now,
        }
    }

    #[test]
    fn attempts_round_trip_within_window() {
        let db = PalisadeDb::open_in_memory().unwrap();
        let now = Utc::now();
        db.record_attempt(&attempt("demo", "203.0.113.9", 50, false, now)).unwrap();
        db.record_attempt(&attempt("demo", "203.0.113.9", 150, true, now)).unwrap();
        db.record_attempt(&attempt("other", "203.0.113.9", 0, false, now)).unwrap();

        let recent = db.recent_attempts("demo", "203.0.113.9", 300, now).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().any(|a| a.blocked));
    }

    #[test]
    fn old_attempts_fall_out_of_the_query_window() {
        let db = PalisadeDb::open_in_memory().unwrap();
        let now = Utc::now();
        let old = now - chrono::Duration::seconds(400);
        db.record_attempt(&attempt("demo", "203.0.113.9", 0, false, old)).unwrap();
        let recent = db.recent_attempts("demo", "203.0.113.9", 300, now).unwrap();
        assert!(recent.is_empty());
    }

    #[test]
    fn fingerprint_upsert_bumps_counter() {
        let db = PalisadeDb::open_in_memory().unwrap();
        let now = Utc::now();
        db.record_fingerprint("1uw9zpc", "203.0.113.9", now).unwrap();
        db.record_fingerprint("1uw9zpc", "203.0.113.9", now + chrono::Duration::seconds(5))
            .unwrap();

        let rec = db.fingerprint_history("1uw9zpc").unwrap().unwrap();
        assert_eq!(rec.request_count, 2);
        assert!(rec.last_seen > rec.first_seen);
        assert!(db.fingerprint_history("zzzzzzz").unwrap().is_none());
    }

    #[test]
    fn purge_removes_expired_rows() {
        let db = PalisadeDb::open_in_memory().unwrap();
        let now = Utc::now();
        let stale = now - chrono::Duration::days(10);
        db.record_attempt(&attempt("demo", "203.0.113.9", 0, false, stale)).unwrap();
        db.record_attempt(&attempt("demo", "203.0.113.9", 0, false, now)).unwrap();
        db.record_fingerprint("1uw9zpc", "203.0.113.9", stale).unwrap();

        let removed = db.purge_older_than(7, now).unwrap();
        assert_eq!(removed, 2);
        let recent = db.recent_attempts("demo", "203.0.113.9", 86_400, now).unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn stats_summarize_last_day() {
        let db = PalisadeDb::open_in_memory().unwrap();
        let now = Utc::now();
        db.record_attempt(&attempt("demo", "203.0.113.9", 150, true, now)).unwrap();
        db.record_attempt(&attempt("demo", "203.0.113.9", 120, true, now)).unwrap();
        db.record_attempt(&attempt("alice", "198.51.100.4", 10, false, now)).unwrap();

        let stats = db.stats(now).unwrap();
        assert_eq!(stats.attempts_24h, 3);
        assert_eq!(stats.blocked_24h, 2);
        assert_eq!(stats.unique_ips_24h, 2);
        assert_eq!(stats.top_blocked_ips[0], ("203.0.113.9".to_string(), 2));
    }
}
