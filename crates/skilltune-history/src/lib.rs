use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use skilltune_types::{ScoreReport, SessionOutcome};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// A finished tuning session as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub id: String,
    pub skill: String,
    pub started_at: DateTime<Utc>,
    pub outcome: String,
    pub original_description: String,
    pub final_description: String,
    pub rounds: i64,
}

/// One scored round of a stored session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    pub session_id: String,
    pub round: i64,
    pub description: String,
    pub correct: i64,
    pub total: i64,
    pub verdict: String,
    pub report: ScoreReport,
}

/// Tuning history kept in SQLite
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    /// Open (or create) the history database at `database_path`
    pub async fn new(database_path: &str) -> Result<Self> {
        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let pool = SqlitePool::connect(&database_url)
            .await
            .with_context(|| format!("Failed to open history database {}", database_path))?;

        let store = Self { pool };
        store.run_migrations().await?;

        info!("History store initialized with database: {}", database_path);
        Ok(store)
    }

    /// Private in-memory database, gone when the store is dropped
    pub async fn in_memory() -> Result<Self> {
        // one connection: every sqlite::memory: connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                skill TEXT NOT NULL,
                started_at TEXT NOT NULL,
                outcome TEXT NOT NULL,
                original_description TEXT NOT NULL,
                final_description TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS rounds (
                session_id TEXT NOT NULL,
                round INTEGER NOT NULL,
                description TEXT NOT NULL,
                correct INTEGER NOT NULL,
                total INTEGER NOT NULL,
                verdict TEXT NOT NULL,
                report_json TEXT NOT NULL,
                PRIMARY KEY (session_id, round),
                FOREIGN KEY (session_id) REFERENCES sessions(id)
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_skill ON sessions(skill);
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("History migrations completed");
        Ok(())
    }

    /// Store a finished session and all of its rounds. Returns the session id.
    pub async fn record_session(
        &self,
        skill: &str,
        started_at: DateTime<Utc>,
        outcome: &SessionOutcome,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let (original, recommended) = match outcome {
            SessionOutcome::Ready(s) => (&s.original, &s.tuned),
            SessionOutcome::EscalateToUser(s) | SessionOutcome::Cancelled(s) => {
                (&s.original, &s.best)
            }
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, skill, started_at, outcome, original_description, final_description)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(skill)
        .bind(started_at.to_rfc3339())
        .bind(outcome.label())
        .bind(&original.description)
        .bind(&recommended.description)
        .execute(&mut *tx)
        .await?;

        for record in outcome.history() {
            let report_json = serde_json::to_string(&record.report)?;
            sqlx::query(
                r#"
                INSERT INTO rounds (session_id, round, description, correct, total, verdict, report_json)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(record.round as i64)
            .bind(&record.descriptor.description)
            .bind(record.report.overall.correct as i64)
            .bind(record.report.overall.total as i64)
            .bind(record.report.verdict.to_string())
            .bind(report_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Recorded {} session {} for '{}' ({} rounds)",
            outcome.label(),
            id,
            skill,
            outcome.history().len()
        );
        Ok(id)
    }

    /// Most recent sessions first
    pub async fn recent_sessions(&self, limit: i64) -> Result<Vec<SessionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT
                s.id,
                s.skill,
                s.started_at,
                s.outcome,
                s.original_description,
                s.final_description,
                (SELECT COUNT(*) FROM rounds r WHERE r.session_id = s.id) AS rounds
            FROM sessions s
            ORDER BY s.started_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let started_at: String = row.get("started_at");
                Ok(SessionRecord {
                    id: row.get("id"),
                    skill: row.get("skill"),
                    started_at: parse_timestamp(&started_at)?,
                    outcome: row.get("outcome"),
                    original_description: row.get("original_description"),
                    final_description: row.get("final_description"),
                    rounds: row.get("rounds"),
                })
            })
            .collect()
    }

    /// Rounds of one session in order
    pub async fn rounds_for(&self, session_id: &str) -> Result<Vec<RoundRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, round, description, correct, total, verdict, report_json
            FROM rounds
            WHERE session_id = ?
            ORDER BY round ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let report_json: String = row.get("report_json");
                let report = serde_json::from_str(&report_json)
                    .context("Stored round report is not valid JSON")?;
                Ok(RoundRecord {
                    session_id: row.get("session_id"),
                    round: row.get("round"),
                    description: row.get("description"),
                    correct: row.get("correct"),
                    total: row.get("total"),
                    verdict: row.get("verdict"),
                    report,
                })
            })
            .collect()
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp in history: {}", value))?;
    Ok(parsed.with_timezone(&Utc))
}
