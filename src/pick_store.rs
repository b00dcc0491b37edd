use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::algo_settings::{AlgoSettings, RawAlgoSettings};
use crate::markets::ScoreSelector;
use crate::picks::{MarketCategory, PickRecord};

const CACHE_DIR: &str = "fixture_picks";
const DB_FILE: &str = "picks.sqlite";

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS algo_settings (
            user_id TEXT NOT NULL,
            team_id INTEGER NOT NULL,
            minimum_sample_size INTEGER NOT NULL,
            minimum_qualifying_percent INTEGER NOT NULL,
            form_window INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, team_id)
        );

        CREATE TABLE IF NOT EXISTS pick_snapshots (
            snapshot_date TEXT NOT NULL,
            fixture_id INTEGER NOT NULL,
            team_id INTEGER NULL,
            period TEXT NOT NULL,
            market_label TEXT NOT NULL,
            market_category TEXT NOT NULL,
            sample_size INTEGER NOT NULL,
            percent_green INTEGER NOT NULL,
            meets_criteria INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pick_snapshots_date ON pick_snapshots(snapshot_date);
        CREATE INDEX IF NOT EXISTS idx_pick_snapshots_fixture ON pick_snapshots(fixture_id);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Overwrite the whole (user, team) record with the normalized settings.
pub fn save_settings(
    conn: &Connection,
    user_id: &str,
    team_id: u32,
    raw: &RawAlgoSettings,
) -> Result<AlgoSettings> {
    let settings = AlgoSettings::normalize(Some(raw));
    conn.execute(
        r#"
        INSERT INTO algo_settings (
            user_id, team_id, minimum_sample_size, minimum_qualifying_percent, form_window, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(user_id, team_id) DO UPDATE SET
            minimum_sample_size = excluded.minimum_sample_size,
            minimum_qualifying_percent = excluded.minimum_qualifying_percent,
            form_window = excluded.form_window,
            updated_at = excluded.updated_at
        "#,
        params![
            user_id,
            team_id as i64,
            settings.minimum_sample_size as i64,
            settings.minimum_qualifying_percent as i64,
            settings.form_window as i64,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert algo settings")?;
    Ok(settings)
}

pub fn load_settings(
    conn: &Connection,
    user_id: &str,
    team_id: u32,
) -> Result<Option<RawAlgoSettings>> {
    conn.query_row(
        r#"
        SELECT minimum_sample_size, minimum_qualifying_percent, form_window
        FROM algo_settings
        WHERE user_id = ?1 AND team_id = ?2
        "#,
        params![user_id, team_id as i64],
        |row| {
            Ok(RawAlgoSettings {
                minimum_sample_size: row.get(0)?,
                minimum_qualifying_percent: row.get(1)?,
                form_window: row.get(2)?,
            })
        },
    )
    .optional()
    .context("query algo settings")
}

/// Stored settings for (user, team) normalized against `defaults`.
pub fn settings_for(
    conn: &Connection,
    user_id: &str,
    team_id: u32,
    defaults: &AlgoSettings,
) -> Result<AlgoSettings> {
    let raw = load_settings(conn, user_id, team_id)?;
    Ok(AlgoSettings::normalize_with(raw.as_ref(), defaults))
}

/// Replace the snapshot for `date` with `picks`. Returns rows written.
pub fn save_pick_snapshot(
    conn: &mut Connection,
    date: NaiveDate,
    picks: &[PickRecord],
) -> Result<usize> {
    let day = date.format("%Y-%m-%d").to_string();
    let created_at = Utc::now().to_rfc3339();
    let tx = conn.transaction().context("begin snapshot transaction")?;
    tx.execute(
        "DELETE FROM pick_snapshots WHERE snapshot_date = ?1",
        params![day],
    )
    .context("clear previous snapshot")?;
    {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT INTO pick_snapshots (
                    snapshot_date, fixture_id, team_id, period, market_label, market_category,
                    sample_size, percent_green, meets_criteria, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .context("prepare snapshot insert")?;
        for pick in picks {
            let fixture_id = i64::try_from(pick.fixture_id)
                .map_err(|_| anyhow!("fixture id {} out of range", pick.fixture_id))?;
            stmt.execute(params![
                day,
                fixture_id,
                pick.team_id.map(i64::from),
                pick.period.as_str(),
                pick.market_label,
                pick.market_category.as_str(),
                pick.sample_size as i64,
                pick.percent_green as i64,
                bool_to_i64(pick.meets_criteria),
                created_at,
            ])
            .context("insert snapshot row")?;
        }
    }
    tx.commit().context("commit snapshot transaction")?;
    info!(date = %day, rows = picks.len(), "saved pick snapshot");
    Ok(picks.len())
}

pub fn load_pick_snapshot(conn: &Connection, date: NaiveDate) -> Result<Vec<PickRecord>> {
    let day = date.format("%Y-%m-%d").to_string();
    let mut stmt = conn
        .prepare(
            r#"
            SELECT fixture_id, team_id, period, market_label, market_category,
                   sample_size, percent_green, meets_criteria
            FROM pick_snapshots
            WHERE snapshot_date = ?1
            ORDER BY rowid ASC
            "#,
        )
        .context("prepare snapshot query")?;

    let rows = stmt
        .query_map(params![day], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)? != 0,
            ))
        })
        .context("query snapshot rows")?;

    let mut out = Vec::new();
    for row in rows {
        let (fixture_id, team_id, period, label, category, sample, percent, meets) =
            row.context("decode snapshot row")?;
        out.push(PickRecord {
            fixture_id: u64::try_from(fixture_id).context("negative fixture id in snapshot")?,
            team_id: team_id.and_then(|id| u32::try_from(id).ok()),
            period: ScoreSelector::parse(&period)
                .ok_or_else(|| anyhow!("unknown period `{period}` in snapshot"))?,
            market_label: label,
            market_category: MarketCategory::parse(&category)
                .ok_or_else(|| anyhow!("unknown market category `{category}` in snapshot"))?,
            sample_size: u32::try_from(sample)
                .with_context(|| format!("sample size {sample} out of range in snapshot"))?,
            percent_green: u8::try_from(percent)
                .ok()
                .filter(|p| *p <= 100)
                .ok_or_else(|| anyhow!("percent {percent} out of range in snapshot"))?,
            meets_criteria: meets,
        });
    }
    Ok(out)
}

fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}
