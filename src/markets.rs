use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fixtures::{CanonicalFixture, ScorePair};

/// Which score pair an aggregation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSelector {
    FullTime,
    HalfTime,
    /// Full-time minus half-time, per side.
    SecondHalf,
}

impl ScoreSelector {
    pub const ALL: [ScoreSelector; 3] = [
        ScoreSelector::FullTime,
        ScoreSelector::HalfTime,
        ScoreSelector::SecondHalf,
    ];

    pub fn pick(self, fixture: &CanonicalFixture) -> Option<ScorePair> {
        match self {
            ScoreSelector::FullTime => fixture.full_time,
            ScoreSelector::HalfTime => fixture.half_time,
            ScoreSelector::SecondHalf => {
                let ft = fixture.full_time?;
                let ht = fixture.half_time?;
                let second = ft.checked_sub(ht);
                debug_assert!(
                    second.is_some(),
                    "fixture {} has half-time {ht:?} above full-time {ft:?}",
                    fixture.fixture_id
                );
                second
            }
        }
    }

    /// Prefix used in market labels ("" for full time).
    pub fn label_prefix(self) -> &'static str {
        match self {
            ScoreSelector::FullTime => "",
            ScoreSelector::HalfTime => "1H ",
            ScoreSelector::SecondHalf => "2H ",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreSelector::FullTime => "full_time",
            ScoreSelector::HalfTime => "half_time",
            ScoreSelector::SecondHalf => "second_half",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full_time" | "ft" => Some(ScoreSelector::FullTime),
            "half_time" | "ht" | "1h" => Some(ScoreSelector::HalfTime),
            "second_half" | "2h" => Some(ScoreSelector::SecondHalf),
            _ => None,
        }
    }
}

/// An over/under threshold, stored as the whole-goal floor (2.5 -> 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GoalLine(u8);

pub const GOAL_LINES: [GoalLine; 6] = [
    GoalLine(0),
    GoalLine(1),
    GoalLine(2),
    GoalLine(3),
    GoalLine(4),
    GoalLine(5),
];

impl GoalLine {
    pub fn is_over(self, total_goals: u32) -> bool {
        total_goals > u32::from(self.0)
    }

    pub fn label(self) -> String {
        format!("{}.5", self.0)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let whole = raw.trim().strip_suffix(".5")?.parse::<u8>().ok()?;
        GOAL_LINES.iter().copied().find(|line| line.0 == whole)
    }
}

impl fmt::Display for GoalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.5", self.0)
    }
}

impl From<GoalLine> for String {
    fn from(line: GoalLine) -> Self {
        line.label()
    }
}

impl TryFrom<String> for GoalLine {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        GoalLine::parse(&raw).ok_or_else(|| format!("unknown goal line `{raw}`"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub raw: u32,
    pub percent: u8,
}

impl Tally {
    pub fn of(raw: u32, sample_size: u32) -> Self {
        Self {
            raw,
            percent: percent(raw, sample_size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub home_wins: u32,
    pub draws: u32,
    pub away_wins: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DoubleChance {
    /// 1X
    pub home_or_draw: Tally,
    /// X2
    pub draw_or_away: Tally,
    /// 12
    pub home_or_away: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDistribution {
    pub selector: ScoreSelector,
    pub sample_size: u32,
    pub over_by_line: BTreeMap<GoalLine, Tally>,
    pub under_by_line: BTreeMap<GoalLine, Tally>,
    pub double_chance: DoubleChance,
    pub outcomes: OutcomeCounts,
}

impl MarketDistribution {
    pub fn over(&self, line: GoalLine) -> Tally {
        self.over_by_line.get(&line).copied().unwrap_or_default()
    }

    pub fn under(&self, line: GoalLine) -> Tally {
        self.under_by_line.get(&line).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

pub fn classify_outcome(score: ScorePair) -> Outcome {
    if score.home > score.away {
        Outcome::Home
    } else if score.home < score.away {
        Outcome::Away
    } else {
        Outcome::Draw
    }
}

/// Over/under and double-chance distribution of `fixtures` for one period.
///
/// Fixtures without the selected score pair are left out of the sample.
pub fn aggregate<'a, I>(fixtures: I, selector: ScoreSelector) -> MarketDistribution
where
    I: IntoIterator<Item = &'a CanonicalFixture>,
{
    aggregate_scores(fixtures.into_iter().filter_map(|f| selector.pick(f)), selector)
}

/// Which end of an upcoming fixture a team occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

/// Like [`aggregate`] over `team_id`'s fixtures, with every past score turned
/// so the team sits on `side`. Outcomes and double chance then read as they
/// would for an upcoming fixture where the team plays on that side.
pub fn aggregate_for_side<'a, I>(
    fixtures: I,
    selector: ScoreSelector,
    team_id: u32,
    side: Side,
) -> MarketDistribution
where
    I: IntoIterator<Item = &'a CanonicalFixture>,
{
    let scores = fixtures.into_iter().filter_map(|f| {
        let score = selector.pick(f)?;
        let played_as = if f.home_team_id == team_id {
            Side::Home
        } else if f.away_team_id == team_id {
            Side::Away
        } else {
            return None;
        };
        Some(if played_as == side { score } else { score.swapped() })
    });
    aggregate_scores(scores, selector)
}

fn aggregate_scores<I>(scores: I, selector: ScoreSelector) -> MarketDistribution
where
    I: IntoIterator<Item = ScorePair>,
{
    let mut sample_size = 0u32;
    let mut over = [0u32; GOAL_LINES.len()];
    let mut outcomes = OutcomeCounts::default();

    for score in scores {
        sample_size += 1;
        let total = score.total();
        for (idx, line) in GOAL_LINES.iter().enumerate() {
            if line.is_over(total) {
                over[idx] += 1;
            }
        }
        match classify_outcome(score) {
            Outcome::Home => outcomes.home_wins += 1,
            Outcome::Draw => outcomes.draws += 1,
            Outcome::Away => outcomes.away_wins += 1,
        }
    }

    let mut over_by_line = BTreeMap::new();
    let mut under_by_line = BTreeMap::new();
    for (idx, line) in GOAL_LINES.iter().enumerate() {
        over_by_line.insert(*line, Tally::of(over[idx], sample_size));
        under_by_line.insert(*line, Tally::of(sample_size - over[idx], sample_size));
    }

    // Draws sit in both 1X and X2, as the market itself counts them.
    let double_chance = DoubleChance {
        home_or_draw: Tally::of(outcomes.home_wins + outcomes.draws, sample_size),
        draw_or_away: Tally::of(outcomes.draws + outcomes.away_wins, sample_size),
        home_or_away: Tally::of(outcomes.home_wins + outcomes.away_wins, sample_size),
    };

    MarketDistribution {
        selector,
        sample_size,
        over_by_line,
        under_by_line,
        double_chance,
        outcomes,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDistributions {
    pub full_time: MarketDistribution,
    pub half_time: MarketDistribution,
    pub second_half: MarketDistribution,
}

impl PeriodDistributions {
    pub fn get(&self, selector: ScoreSelector) -> &MarketDistribution {
        match selector {
            ScoreSelector::FullTime => &self.full_time,
            ScoreSelector::HalfTime => &self.half_time,
            ScoreSelector::SecondHalf => &self.second_half,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketDistribution> {
        [&self.full_time, &self.half_time, &self.second_half].into_iter()
    }
}

pub fn aggregate_all(fixtures: &[&CanonicalFixture]) -> PeriodDistributions {
    PeriodDistributions {
        full_time: aggregate(fixtures.iter().copied(), ScoreSelector::FullTime),
        half_time: aggregate(fixtures.iter().copied(), ScoreSelector::HalfTime),
        second_half: aggregate(fixtures.iter().copied(), ScoreSelector::SecondHalf),
    }
}

pub fn aggregate_all_for_side(
    fixtures: &[&CanonicalFixture],
    team_id: u32,
    side: Side,
) -> PeriodDistributions {
    let period = |selector| aggregate_for_side(fixtures.iter().copied(), selector, team_id, side);
    PeriodDistributions {
        full_time: period(ScoreSelector::FullTime),
        half_time: period(ScoreSelector::HalfTime),
        second_half: period(ScoreSelector::SecondHalf),
    }
}

/// `round(raw / sample_size * 100)`, halves rounded up, 0 for an empty sample.
pub fn percent(raw: u32, sample_size: u32) -> u8 {
    if sample_size == 0 {
        return 0;
    }
    let raw = u64::from(raw.min(sample_size));
    let n = u64::from(sample_size);
    ((raw * 200 + n) / (2 * n)) as u8
}
