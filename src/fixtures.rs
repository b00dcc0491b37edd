use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{MalformedFixture, RejectedFixture};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScorePair {
    pub home: u8,
    pub away: u8,
}

impl ScorePair {
    pub fn new(home: u8, away: u8) -> Self {
        Self { home, away }
    }

    pub fn total(self) -> u32 {
        u32::from(self.home) + u32::from(self.away)
    }

    pub fn swapped(self) -> ScorePair {
        ScorePair {
            home: self.away,
            away: self.home,
        }
    }

    /// Goals scored after `earlier`, per side. `None` if either side would go negative.
    pub fn checked_sub(self, earlier: ScorePair) -> Option<ScorePair> {
        Some(ScorePair {
            home: self.home.checked_sub(earlier.home)?,
            away: self.away.checked_sub(earlier.away)?,
        })
    }
}

/// Provider-agnostic view of one match.
///
/// Scores are kept as whole pairs: a record never carries a home full-time
/// score without the away one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalFixture {
    pub fixture_id: u64,
    pub kickoff_utc: DateTime<Utc>,
    pub league_id: Option<u32>,
    pub season: Option<String>,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub full_time: Option<ScorePair>,
    pub half_time: Option<ScorePair>,
}

impl CanonicalFixture {
    pub fn is_played(&self) -> bool {
        self.full_time.is_some()
    }

    pub fn involves(&self, team_id: u32) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    pub fn goals_home_full_time(&self) -> Option<u8> {
        self.full_time.map(|s| s.home)
    }

    pub fn goals_away_full_time(&self) -> Option<u8> {
        self.full_time.map(|s| s.away)
    }

    pub fn goals_home_half_time(&self) -> Option<u8> {
        self.half_time.map(|s| s.home)
    }

    pub fn goals_away_half_time(&self) -> Option<u8> {
        self.half_time.map(|s| s.away)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub fixtures: Vec<CanonicalFixture>,
    pub rejected: Vec<RejectedFixture>,
}

/// Parse a provider payload and normalize every fixture in it.
///
/// Accepts a bare array, an API-Football envelope (`response`) or a FotMob
/// page (`matches` / `fixtures.allMatches`).
pub fn normalize_json(raw: &str) -> Result<NormalizedBatch> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(NormalizedBatch::default());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid fixtures json")?;
    let records = root
        .as_array()
        .or_else(|| root.get("response").and_then(|v| v.as_array()))
        .or_else(|| root.get("matches").and_then(|v| v.as_array()))
        .or_else(|| {
            root.get("fixtures")
                .and_then(|v| v.get("allMatches"))
                .and_then(|v| v.as_array())
        })
        .ok_or_else(|| anyhow!("fixtures json has no recognizable record list"))?;
    Ok(normalize_batch(records))
}

/// Normalize a batch of raw records. Malformed records are reported, never fatal.
///
/// Output keeps input order; when a fixture id repeats, the later record
/// replaces the earlier one in place.
pub fn normalize_batch(records: &[Value]) -> NormalizedBatch {
    let results: Vec<Result<CanonicalFixture, RejectedFixture>> = records
        .par_iter()
        .enumerate()
        .map(|(index, raw)| {
            normalize_fixture(raw).map_err(|reason| RejectedFixture {
                index,
                fixture_id: peek_fixture_id(raw),
                reason,
            })
        })
        .collect();

    let mut batch = NormalizedBatch::default();
    let mut positions: HashMap<u64, usize> = HashMap::new();
    let mut duplicates = 0usize;
    for result in results {
        match result {
            Ok(fixture) => {
                if let Some(&pos) = positions.get(&fixture.fixture_id) {
                    batch.fixtures[pos] = fixture;
                    duplicates += 1;
                } else {
                    positions.insert(fixture.fixture_id, batch.fixtures.len());
                    batch.fixtures.push(fixture);
                }
            }
            Err(rejected) => {
                warn!(
                    index = rejected.index,
                    fixture_id = ?rejected.fixture_id,
                    reason = %rejected.reason,
                    "skipping malformed fixture"
                );
                batch.rejected.push(rejected);
            }
        }
    }

    debug!(
        accepted = batch.fixtures.len(),
        rejected = batch.rejected.len(),
        duplicates,
        "normalized fixture batch"
    );
    batch
}

pub fn normalize_fixture(raw: &Value) -> Result<CanonicalFixture, MalformedFixture> {
    if !raw.is_object() {
        return Err(MalformedFixture::NotAnObject);
    }
    let parts = if raw.get("fixture").is_some_and(Value::is_object) && raw.get("teams").is_some() {
        api_football_parts(raw)
    } else if raw.get("home").is_some_and(Value::is_object) {
        fotmob_parts(raw)
    } else {
        flat_parts(raw)
    };
    assemble(parts)
}

struct RawParts<'a> {
    fixture_id: Option<&'a Value>,
    kickoff: Option<&'a Value>,
    home_team_id: Option<&'a Value>,
    away_team_id: Option<&'a Value>,
    league_id: Option<&'a Value>,
    season: Option<&'a Value>,
    full_time: Option<ScorePair>,
    half_time: Option<ScorePair>,
    /// Provider says the result is final. Scores of anything else are ignored.
    finished: bool,
}

fn assemble(parts: RawParts<'_>) -> Result<CanonicalFixture, MalformedFixture> {
    let fixture_id = parts
        .fixture_id
        .and_then(as_u64_any)
        .ok_or(MalformedFixture::MissingIdentity("fixture id"))?;
    let home_team_id = parts
        .home_team_id
        .and_then(as_u32_any)
        .ok_or(MalformedFixture::MissingIdentity("home team id"))?;
    let away_team_id = parts
        .away_team_id
        .and_then(as_u32_any)
        .ok_or(MalformedFixture::MissingIdentity("away team id"))?;
    let kickoff = parts
        .kickoff
        .filter(|v| !v.is_null())
        .ok_or(MalformedFixture::MissingIdentity("kickoff"))?;
    let kickoff_utc =
        parse_kickoff(kickoff).ok_or_else(|| MalformedFixture::BadKickoff(kickoff.to_string()))?;

    if !parts.finished && (parts.full_time.is_some() || parts.half_time.is_some()) {
        debug!(fixture_id, "ignoring scores of unfinished fixture");
    }
    let full_time = parts.full_time.filter(|_| parts.finished);
    let half_time = match (full_time, parts.half_time.filter(|_| parts.finished)) {
        (Some(ft), Some(ht)) if ht.home <= ft.home && ht.away <= ft.away => Some(ht),
        (_, Some(ht)) => {
            debug!(fixture_id, ?ht, ?full_time, "dropping inconsistent half-time score");
            None
        }
        _ => None,
    };

    Ok(CanonicalFixture {
        fixture_id,
        kickoff_utc,
        league_id: parts.league_id.and_then(as_u32_any),
        season: parts.season.and_then(season_string),
        home_team_id,
        away_team_id,
        full_time,
        half_time,
    })
}

const API_FOOTBALL_FINISHED: &[&str] = &["FT", "AET", "PEN"];

fn api_football_parts(v: &Value) -> RawParts<'_> {
    let fixture = v.get("fixture");
    let league = v.get("league");
    let teams = v.get("teams");
    let score = v.get("score");

    // `goals` includes extra time; lines settle on the 90 minute score.
    let full_time = pair_from_object(score.and_then(|s| s.get("fulltime")))
        .or_else(|| pair_from_object(v.get("goals")));
    let half_time = pair_from_object(score.and_then(|s| s.get("halftime")));
    let finished = fixture
        .and_then(|f| f.get("status"))
        .and_then(|s| s.get("short"))
        .and_then(|x| x.as_str())
        .is_some_and(|short| API_FOOTBALL_FINISHED.contains(&short.trim()));

    RawParts {
        fixture_id: fixture.and_then(|f| f.get("id")),
        kickoff: fixture.and_then(|f| f.get("date").or_else(|| f.get("timestamp"))),
        home_team_id: teams.and_then(|t| t.get("home")).and_then(|h| h.get("id")),
        away_team_id: teams.and_then(|t| t.get("away")).and_then(|a| a.get("id")),
        league_id: league.and_then(|l| l.get("id")),
        season: league.and_then(|l| l.get("season")),
        full_time,
        half_time,
        finished,
    }
}

fn fotmob_parts(v: &Value) -> RawParts<'_> {
    let status = v.get("status");
    let home = v.get("home");
    let away = v.get("away");

    let full_time = score_pair(
        home.and_then(|h| h.get("score")),
        away.and_then(|a| a.get("score")),
    )
    .or_else(|| {
        status
            .and_then(|s| s.get("scoreStr"))
            .and_then(|x| x.as_str())
            .and_then(parse_score_pair)
    });
    let half_time = pair_from_object(v.get("halfTime")).or_else(|| {
        status
            .and_then(|s| s.get("htScoreStr"))
            .and_then(|x| x.as_str())
            .and_then(parse_score_pair)
    });

    let flag = |key: &str| {
        status
            .and_then(|s| s.get(key))
            .and_then(|x| x.as_bool())
            .unwrap_or(false)
    };
    let finished = flag("finished") && !flag("cancelled") && !flag("awarded");

    RawParts {
        fixture_id: v.get("id"),
        kickoff: status
            .and_then(|s| s.get("utcTime"))
            .or_else(|| v.get("utcTime")),
        home_team_id: home.and_then(|h| h.get("id")),
        away_team_id: away.and_then(|a| a.get("id")),
        league_id: v.get("leagueId"),
        season: v.get("season"),
        full_time,
        half_time,
        finished,
    }
}

fn flat_parts(v: &Value) -> RawParts<'_> {
    RawParts {
        fixture_id: first_of(v, &["fixtureId", "fixture_id", "id"]),
        kickoff: first_of(v, &["kickoffUtc", "kickoff_utc", "kickoff", "date"]),
        home_team_id: first_of(v, &["homeTeamId", "home_team_id"]),
        away_team_id: first_of(v, &["awayTeamId", "away_team_id"]),
        league_id: first_of(v, &["leagueId", "league_id"]),
        season: first_of(v, &["season"]),
        full_time: score_pair(
            first_of(v, &["goalsHomeFullTime", "goals_home_full_time", "homeGoals"]),
            first_of(v, &["goalsAwayFullTime", "goals_away_full_time", "awayGoals"]),
        ),
        half_time: score_pair(
            first_of(v, &["goalsHomeHalfTime", "goals_home_half_time"]),
            first_of(v, &["goalsAwayHalfTime", "goals_away_half_time"]),
        ),
        // Flat records carry no status; an explicit `finished: false` still wins.
        finished: v.get("finished").and_then(|x| x.as_bool()).unwrap_or(true),
    }
}

fn first_of<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| v.get(*k))
        .find(|x| !x.is_null())
}

fn pair_from_object(v: Option<&Value>) -> Option<ScorePair> {
    let v = v?;
    score_pair(v.get("home"), v.get("away"))
}

fn score_pair(home: Option<&Value>, away: Option<&Value>) -> Option<ScorePair> {
    Some(ScorePair {
        home: goal_count(home?)?,
        away: goal_count(away?)?,
    })
}

fn goal_count(v: &Value) -> Option<u8> {
    u8::try_from(as_i64_any(v)?).ok()
}

fn parse_score_pair(raw: &str) -> Option<ScorePair> {
    let mut goals: Vec<u8> = Vec::with_capacity(2);
    let mut digits = String::new();
    let mut dashes = 0usize;
    for ch in raw.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if !digits.is_empty() {
            goals.push(digits.parse().ok()?);
            digits.clear();
            dashes = 0;
            if goals.len() == 2 {
                break;
            }
        }
        if ch == '-' {
            dashes += 1;
        }
        // One dash may separate the pair; any other is a minus sign.
        let separators = if goals.is_empty() { 0 } else { 1 };
        if dashes > separators {
            return None;
        }
    }
    match goals.as_slice() {
        [home, away] => Some(ScorePair::new(*home, *away)),
        _ => None,
    }
}

fn parse_kickoff(v: &Value) -> Option<DateTime<Utc>> {
    if let Some(secs) = v.as_i64() {
        return DateTime::from_timestamp(secs, 0);
    }
    let raw = v.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn peek_fixture_id(v: &Value) -> Option<u64> {
    v.get("fixture")
        .and_then(|f| f.get("id"))
        .or_else(|| first_of(v, &["fixtureId", "fixture_id", "id"]))
        .and_then(as_u64_any)
}

fn season_string(v: &Value) -> Option<String> {
    if let Some(s) = v.as_str() {
        let trimmed = s.trim();
        return (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    v.as_i64().map(|n| n.to_string())
}

fn as_u64_any(v: &Value) -> Option<u64> {
    u64::try_from(as_i64_any(v)?).ok()
}

fn as_u32_any(v: &Value) -> Option<u32> {
    u32::try_from(as_i64_any(v)?).ok()
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    // Some feeds send whole numbers as floats ("2.0").
    if let Some(f) = v.as_f64() {
        return (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_score_pair_works() {
        assert_eq!(parse_score_pair("2 - 1"), Some(ScorePair::new(2, 1)));
        assert_eq!(parse_score_pair("FT 0 : 0"), Some(ScorePair::new(0, 0)));
        assert_eq!(parse_score_pair("ab"), None);
    }

    #[test]
    fn negative_score_strings_are_rejected() {
        assert_eq!(parse_score_pair("-1 - 2"), None);
        assert_eq!(parse_score_pair("1 - -2"), None);
        assert_eq!(parse_score_pair("1-2"), Some(ScorePair::new(1, 2)));
        assert_eq!(parse_score_pair("300 - 1"), None);
    }

    #[test]
    fn one_sided_full_time_is_absent() {
        let raw = json!({
            "fixtureId": 7,
            "kickoffUtc": "2024-03-02T15:00:00Z",
            "homeTeamId": 1,
            "awayTeamId": 2,
            "goalsHomeFullTime": 3,
            "goalsAwayFullTime": null
        });
        let f = normalize_fixture(&raw).unwrap();
        assert_eq!(f.full_time, None);
        assert_eq!(f.goals_home_full_time(), None);
    }

    #[test]
    fn half_time_above_full_time_is_dropped() {
        let raw = json!({
            "fixtureId": 8,
            "kickoffUtc": 1709391600,
            "homeTeamId": 1,
            "awayTeamId": 2,
            "goalsHomeFullTime": 1,
            "goalsAwayFullTime": 0,
            "goalsHomeHalfTime": 2,
            "goalsAwayHalfTime": 0
        });
        let f = normalize_fixture(&raw).unwrap();
        assert_eq!(f.full_time, Some(ScorePair::new(1, 0)));
        assert_eq!(f.half_time, None);
    }

    #[test]
    fn negative_and_text_goals_are_absent_not_zero() {
        let raw = json!({
            "fixtureId": "9",
            "kickoffUtc": "2024-03-02 15:00",
            "homeTeamId": "1",
            "awayTeamId": 2,
            "goalsHomeFullTime": -1,
            "goalsAwayFullTime": 0,
            "goalsHomeHalfTime": "n/a",
            "goalsAwayHalfTime": 0
        });
        let f = normalize_fixture(&raw).unwrap();
        assert_eq!(f.fixture_id, 9);
        assert_eq!(f.home_team_id, 1);
        assert!(f.full_time.is_none());
        assert!(f.half_time.is_none());
    }

    #[test]
    fn non_numeric_team_id_is_malformed() {
        let raw = json!({
            "fixtureId": 10,
            "kickoffUtc": "2024-03-02T15:00:00Z",
            "homeTeamId": "arsenal",
            "awayTeamId": 2
        });
        assert_eq!(
            normalize_fixture(&raw),
            Err(MalformedFixture::MissingIdentity("home team id"))
        );
    }

    #[test]
    fn unparseable_kickoff_is_malformed() {
        let raw = json!({
            "fixtureId": 11,
            "kickoffUtc": "next saturday",
            "homeTeamId": 1,
            "awayTeamId": 2
        });
        assert!(matches!(
            normalize_fixture(&raw),
            Err(MalformedFixture::BadKickoff(_))
        ));
    }
}
