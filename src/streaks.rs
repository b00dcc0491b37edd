use serde::{Deserialize, Serialize};

use crate::fixtures::CanonicalFixture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Win,
    Draw,
    Loss,
}

impl MatchResult {
    pub fn letter(self) -> char {
        match self {
            MatchResult::Win => 'W',
            MatchResult::Draw => 'D',
            MatchResult::Loss => 'L',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LongestStreaks {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl LongestStreaks {
    fn slot(&mut self, result: MatchResult) -> &mut u32 {
        match result {
            MatchResult::Win => &mut self.win,
            MatchResult::Draw => &mut self.draw,
            MatchResult::Loss => &mut self.loss,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakSummary {
    /// `None` only when there is no result at all (length 0).
    pub current_streak_type: Option<MatchResult>,
    pub current_streak_length: u32,
    pub longest_streaks_by_type: LongestStreaks,
    /// Most recent results, newest first, capped at the form window.
    pub form: Vec<MatchResult>,
}

/// Result of a played fixture from `team_id`'s side.
pub fn result_for_team(fixture: &CanonicalFixture, team_id: u32) -> Option<MatchResult> {
    let score = fixture.full_time?;
    let (own, other) = if fixture.home_team_id == team_id {
        (score.home, score.away)
    } else if fixture.away_team_id == team_id {
        (score.away, score.home)
    } else {
        return None;
    };
    Some(if own > other {
        MatchResult::Win
    } else if own < other {
        MatchResult::Loss
    } else {
        MatchResult::Draw
    })
}

/// Run length of the most recent result type. Input is newest first.
pub fn current_streak(newest_first: &[MatchResult]) -> (Option<MatchResult>, u32) {
    let Some(&head) = newest_first.first() else {
        return (None, 0);
    };
    let len = newest_first.iter().take_while(|r| **r == head).count();
    (Some(head), len as u32)
}

/// Longest run per result type. Input is oldest first.
pub fn longest_streaks(oldest_first: &[MatchResult]) -> LongestStreaks {
    let mut best = LongestStreaks::default();
    let mut prev: Option<MatchResult> = None;
    let mut run = 0u32;
    for &result in oldest_first {
        run = if prev == Some(result) { run + 1 } else { 1 };
        prev = Some(result);
        let slot = best.slot(result);
        *slot = (*slot).max(run);
    }
    best
}

/// Streak summary for one team. Ordering is done here, not by the caller:
/// fixtures may arrive in any order and unplayed ones are skipped.
pub fn analyze_team<'a, I>(fixtures: I, team_id: u32, form_window: usize) -> StreakSummary
where
    I: IntoIterator<Item = &'a CanonicalFixture>,
{
    let mut played: Vec<&CanonicalFixture> = fixtures
        .into_iter()
        .filter(|f| f.involves(team_id) && f.is_played())
        .collect();
    played.sort_by(|a, b| {
        b.kickoff_utc
            .cmp(&a.kickoff_utc)
            .then(b.fixture_id.cmp(&a.fixture_id))
    });

    let newest_first: Vec<MatchResult> = played
        .iter()
        .filter_map(|f| result_for_team(f, team_id))
        .collect();
    let oldest_first: Vec<MatchResult> = newest_first.iter().rev().copied().collect();

    let (current_streak_type, current_streak_length) = current_streak(&newest_first);
    StreakSummary {
        current_streak_type,
        current_streak_length,
        longest_streaks_by_type: longest_streaks(&oldest_first),
        form: newest_first.iter().take(form_window).copied().collect(),
    }
}

pub fn form_string(results: &[MatchResult]) -> String {
    results.iter().map(|r| r.letter()).collect()
}
