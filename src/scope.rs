use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fixtures::CanonicalFixture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    #[default]
    All,
    Home,
    Away,
}

/// Which partition of the fixture pool an aggregation runs over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Team { team_id: u32, venue: Venue },
    League { league_id: u32, season: Option<String> },
}

impl Scope {
    pub fn team(team_id: u32) -> Self {
        Scope::Team {
            team_id,
            venue: Venue::All,
        }
    }

    pub fn league(league_id: u32) -> Self {
        Scope::League {
            league_id,
            season: None,
        }
    }

    pub fn includes(&self, fixture: &CanonicalFixture) -> bool {
        match self {
            Scope::Team { team_id, venue } => match venue {
                Venue::All => fixture.involves(*team_id),
                Venue::Home => fixture.home_team_id == *team_id,
                Venue::Away => fixture.away_team_id == *team_id,
            },
            Scope::League { league_id, season } => {
                fixture.league_id == Some(*league_id)
                    && season
                        .as_deref()
                        .is_none_or(|s| fixture.season.as_deref() == Some(s))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureQuery {
    pub scope: Scope,
    /// Only fixtures kicking off strictly before this instant.
    pub before: Option<DateTime<Utc>>,
    /// Keep the N most recent played fixtures.
    pub last: Option<usize>,
}

impl FixtureQuery {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            before: None,
            last: None,
        }
    }

    pub fn before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.before = Some(cutoff);
        self
    }

    pub fn last(mut self, n: usize) -> Self {
        self.last = Some(n);
        self
    }

    /// Matching fixtures, newest first.
    pub fn select<'a>(&self, fixtures: &'a [CanonicalFixture]) -> Vec<&'a CanonicalFixture> {
        let mut out: Vec<&CanonicalFixture> = fixtures
            .iter()
            .filter(|f| self.scope.includes(f))
            .filter(|f| self.before.is_none_or(|cutoff| f.kickoff_utc < cutoff))
            .collect();
        sort_newest_first(&mut out);
        if let Some(n) = self.last {
            out.retain(|f| f.is_played());
            out.truncate(n);
        }
        out
    }
}

pub fn sort_newest_first(fixtures: &mut [&CanonicalFixture]) {
    fixtures.sort_by(|a, b| {
        b.kickoff_utc
            .cmp(&a.kickoff_utc)
            .then(b.fixture_id.cmp(&a.fixture_id))
    });
}
