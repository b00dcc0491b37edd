use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algo_settings::AlgoSettings;
use crate::fixtures::CanonicalFixture;
use crate::markets::{PeriodDistributions, Side, aggregate_all, aggregate_all_for_side};
use crate::picks::{PickRecord, evaluate_distribution};
use crate::scope::{FixtureQuery, Scope};
use crate::streaks::{StreakSummary, analyze_team};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamReport {
    pub team_id: u32,
    pub periods: PeriodDistributions,
    pub streaks: StreakSummary,
}

/// Markets and streaks for one team over its history before `before` (all of it when `None`).
pub fn team_report(
    history: &[CanonicalFixture],
    team_id: u32,
    before: Option<DateTime<Utc>>,
    settings: &AlgoSettings,
) -> TeamReport {
    let mut query = FixtureQuery::new(Scope::team(team_id));
    query.before = before;
    let selected = query.select(history);
    let periods = aggregate_all(&selected);

    let streaks = analyze_team(selected, team_id, settings.form_window as usize);

    TeamReport {
        team_id,
        periods,
        streaks,
    }
}

/// Picks for an upcoming fixture, one block per side, each computed from
/// that team's results before kickoff and judged with that team's settings.
///
/// Past scores are oriented so the team sits on its side of this fixture:
/// "Double Chance 1X" in the away block is the away team's record of not
/// winning, whatever side it played on at the time.
pub fn fixture_picks(
    upcoming: &CanonicalFixture,
    history: &[CanonicalFixture],
    home_settings: &AlgoSettings,
    away_settings: &AlgoSettings,
) -> Vec<PickRecord> {
    let mut out = Vec::new();
    for (team_id, side, settings) in [
        (upcoming.home_team_id, Side::Home, home_settings),
        (upcoming.away_team_id, Side::Away, away_settings),
    ] {
        let selected = FixtureQuery::new(Scope::team(team_id))
            .before(upcoming.kickoff_utc)
            .select(history);
        let periods = aggregate_all_for_side(&selected, team_id, side);
        for dist in periods.iter() {
            out.extend(evaluate_distribution(
                upcoming.fixture_id,
                Some(team_id),
                dist,
                settings,
            ));
        }
    }
    out
}

/// `fixture_picks` for many fixtures in parallel; output follows input order.
pub fn picks_for_fixtures<F>(
    upcoming: &[CanonicalFixture],
    history: &[CanonicalFixture],
    settings_for: F,
) -> Vec<PickRecord>
where
    F: Fn(u32) -> AlgoSettings + Sync,
{
    let per_fixture: Vec<Vec<PickRecord>> = upcoming
        .par_iter()
        .map(|f| {
            let home = settings_for(f.home_team_id);
            let away = settings_for(f.away_team_id);
            fixture_picks(f, history, &home, &away)
        })
        .collect();
    let out: Vec<PickRecord> = per_fixture.into_iter().flatten().collect();
    debug!(
        fixtures = upcoming.len(),
        records = out.len(),
        qualifying = out.iter().filter(|r| r.meets_criteria).count(),
        "evaluated fixture picks"
    );
    out
}
