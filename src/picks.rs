use serde::{Deserialize, Serialize};

use crate::algo_settings::AlgoSettings;
use crate::markets::{GOAL_LINES, MarketDistribution, ScoreSelector, Tally};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCategory {
    OverUnder,
    DoubleChance,
}

impl MarketCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketCategory::OverUnder => "over_under",
            MarketCategory::DoubleChance => "double_chance",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "over_under" => Some(MarketCategory::OverUnder),
            "double_chance" => Some(MarketCategory::DoubleChance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRecord {
    pub fixture_id: u64,
    /// Team whose history produced the numbers; `None` for league-wide samples.
    pub team_id: Option<u32>,
    pub period: ScoreSelector,
    pub market_label: String,
    pub market_category: MarketCategory,
    pub sample_size: u32,
    pub percent_green: u8,
    pub meets_criteria: bool,
}

pub fn meets_criteria(sample_size: u32, percent: u8, settings: &AlgoSettings) -> bool {
    sample_size >= settings.minimum_sample_size && percent >= settings.minimum_qualifying_percent
}

/// One record per over line, under line and double-chance bucket. Each is
/// judged on its own; there is no verdict for the distribution as a whole.
pub fn evaluate_distribution(
    fixture_id: u64,
    team_id: Option<u32>,
    dist: &MarketDistribution,
    settings: &AlgoSettings,
) -> Vec<PickRecord> {
    let prefix = dist.selector.label_prefix();
    let record = |label: String, category: MarketCategory, tally: Tally| PickRecord {
        fixture_id,
        team_id,
        period: dist.selector,
        market_label: label,
        market_category: category,
        sample_size: dist.sample_size,
        percent_green: tally.percent,
        meets_criteria: meets_criteria(dist.sample_size, tally.percent, settings),
    };

    let mut out = Vec::with_capacity(GOAL_LINES.len() * 2 + 3);
    for line in GOAL_LINES {
        out.push(record(
            format!("{prefix}Over {line}"),
            MarketCategory::OverUnder,
            dist.over(line),
        ));
        out.push(record(
            format!("{prefix}Under {line}"),
            MarketCategory::OverUnder,
            dist.under(line),
        ));
    }
    let dc = &dist.double_chance;
    for (code, tally) in [
        ("1X", dc.home_or_draw),
        ("X2", dc.draw_or_away),
        ("12", dc.home_or_away),
    ] {
        out.push(record(
            format!("{prefix}Double Chance {code}"),
            MarketCategory::DoubleChance,
            tally,
        ));
    }
    out
}

pub fn qualifying(records: &[PickRecord]) -> Vec<&PickRecord> {
    records.iter().filter(|r| r.meets_criteria).collect()
}
