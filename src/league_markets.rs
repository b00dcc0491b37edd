use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fixtures::CanonicalFixture;
use crate::markets::{MarketDistribution, ScoreSelector, aggregate};
use crate::scope::{FixtureQuery, Scope, Venue};

/// A distribution tagged with the partition it was computed over, so a
/// league sample is never read as a team sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedDistribution {
    pub scope: Scope,
    pub distribution: MarketDistribution,
}

pub fn aggregate_scope(
    fixtures: &[CanonicalFixture],
    query: &FixtureQuery,
    selector: ScoreSelector,
) -> ScopedDistribution {
    let selected = query.select(fixtures);
    ScopedDistribution {
        scope: query.scope.clone(),
        distribution: aggregate(selected, selector),
    }
}

pub fn aggregate_league(
    fixtures: &[CanonicalFixture],
    league_id: u32,
    season: Option<&str>,
    selector: ScoreSelector,
) -> ScopedDistribution {
    let query = FixtureQuery::new(Scope::League {
        league_id,
        season: season.map(|s| s.to_string()),
    });
    aggregate_scope(fixtures, &query, selector)
}

pub fn aggregate_team(
    fixtures: &[CanonicalFixture],
    team_id: u32,
    venue: Venue,
    selector: ScoreSelector,
) -> ScopedDistribution {
    let query = FixtureQuery::new(Scope::Team { team_id, venue });
    aggregate_scope(fixtures, &query, selector)
}

pub fn league_team_ids(
    fixtures: &[CanonicalFixture],
    league_id: u32,
    season: Option<&str>,
) -> Vec<u32> {
    let scope = Scope::League {
        league_id,
        season: season.map(|s| s.to_string()),
    };
    let ids: BTreeSet<u32> = fixtures
        .iter()
        .filter(|f| scope.includes(f))
        .flat_map(|f| [f.home_team_id, f.away_team_id])
        .collect();
    ids.into_iter().collect()
}

/// Team-level distributions for every team in a league, restricted to that
/// league's fixtures. Teams are aggregated in parallel; output is in team id order.
pub fn league_team_distributions(
    fixtures: &[CanonicalFixture],
    league_id: u32,
    season: Option<&str>,
    selector: ScoreSelector,
) -> Vec<ScopedDistribution> {
    let league_scope = Scope::League {
        league_id,
        season: season.map(|s| s.to_string()),
    };
    let league_fixtures: Vec<&CanonicalFixture> = fixtures
        .iter()
        .filter(|f| league_scope.includes(f))
        .collect();
    let team_ids = league_team_ids(fixtures, league_id, season);
    debug!(
        league_id,
        teams = team_ids.len(),
        fixtures = league_fixtures.len(),
        "aggregating league teams"
    );

    team_ids
        .par_iter()
        .map(|&team_id| {
            let scope = Scope::team(team_id);
            let distribution = aggregate(
                league_fixtures.iter().copied().filter(|f| scope.includes(f)),
                selector,
            );
            ScopedDistribution {
                scope,
                distribution,
            }
        })
        .collect()
}
