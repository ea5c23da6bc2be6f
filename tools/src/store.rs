//! SQLite archive of simulation runs.
//!
//! RULE: Only store.rs talks to the database.
//! The quantification core never persists anything; the runner decides
//! what to keep.

use anyhow::Result;
use chrono::{DateTime, Utc};
use riskquant_core::simulation::{SimulationRequest, SimulationResult};
use rusqlite::{params, Connection};
use serde::Serialize;

pub struct RunStore {
    conn: Connection,
}

/// One archived run, without the bulky JSON columns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub risk_id: Option<String>,
    pub seed: u64,
    pub run_index: u64,
    pub iterations: u32,
    pub mode: String,
    pub mean: f64,
    pub p90: f64,
    pub created_at: DateTime<Utc>,
}

pub struct NewRun<'a> {
    pub risk_id: Option<&'a str>,
    pub seed: u64,
    pub run_index: u64,
    pub request: &'a SimulationRequest,
    pub result: &'a SimulationResult,
}

impl RunStore {
    /// Open (or create) the archive at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(include_str!("../migrations/001_simulation_runs.sql"))?;
        Ok(())
    }

    /// Archive a completed run. Returns the generated run id.
    pub fn insert_run(&self, run: &NewRun<'_>) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let mode = serde_json::to_value(run.result.mode)?
            .as_str()
            .unwrap_or_default()
            .to_string();

        self.conn.execute(
            "INSERT INTO simulation_run
                (run_id, risk_id, seed, run_index, iterations, mode, mean, p90,
                 request_json, result_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run_id,
                run.risk_id,
                run.seed as i64,
                run.run_index as i64,
                run.result.iterations as i64,
                mode,
                run.result.statistics.mean,
                run.result.percentiles.p90,
                serde_json::to_string(run.request)?,
                serde_json::to_string(run.result)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(run_id)
    }

    /// Most recent runs first.
    pub fn recent_runs(&self, limit: u32) -> Result<Vec<RunSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, risk_id, seed, run_index, iterations, mode, mean, p90, created_at
             FROM simulation_run
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, f64>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(run_id, risk_id, seed, run_index, iterations, mode, mean, p90, created_at)|
                 -> Result<RunSummary> {
                    Ok(RunSummary {
                        run_id,
                        risk_id,
                        seed: seed as u64,
                        run_index: run_index as u64,
                        iterations: iterations as u32,
                        mode,
                        mean,
                        p90,
                        created_at: DateTime::parse_from_rfc3339(&created_at)?
                            .with_timezone(&Utc),
                    })
                },
            )
            .collect()
    }

    pub fn load_result(&self, run_id: &str) -> Result<Option<SimulationResult>> {
        let mut stmt = self
            .conn
            .prepare("SELECT result_json FROM simulation_run WHERE run_id = ?1")?;
        let mut rows = stmt.query(params![run_id])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }
}
