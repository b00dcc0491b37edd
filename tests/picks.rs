use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use serde_json::json;

use fixture_picks::algo_settings::{AlgoSettings, RawAlgoSettings};
use fixture_picks::fixtures::{CanonicalFixture, ScorePair, normalize_json};
use fixture_picks::markets::{ScoreSelector, aggregate};
use fixture_picks::picks::{MarketCategory, evaluate_distribution, meets_criteria, qualifying};
use fixture_picks::team_report::{fixture_picks, picks_for_fixtures, team_report};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn split_mixed() -> (Vec<CanonicalFixture>, Vec<CanonicalFixture>) {
    let batch = normalize_json(&read_fixture("mixed_providers.json")).expect("fixture should parse");
    batch.fixtures.into_iter().partition(|f| f.is_played())
}

fn fixture_1005(upcoming: &[CanonicalFixture]) -> CanonicalFixture {
    upcoming
        .iter()
        .find(|f| f.fixture_id == 1005)
        .cloned()
        .expect("1005 is upcoming")
}

fn lenient(v: serde_json::Value) -> AlgoSettings {
    AlgoSettings::normalize(Some(&RawAlgoSettings::from_value(&v)))
}

#[test]
fn small_sample_never_qualifies() {
    let settings = AlgoSettings::default();
    assert!(!meets_criteria(4, 80, &settings));
    assert!(meets_criteria(5, 60, &settings));
    assert!(!meets_criteria(5, 59, &settings));
}

#[test]
fn each_line_is_judged_on_its_own() {
    let totals = [(2, 1), (1, 2), (3, 0), (1, 0), (0, 0)];
    let pool: Vec<CanonicalFixture> = totals
        .iter()
        .enumerate()
        .map(|(i, &(h, a))| CanonicalFixture {
            fixture_id: i as u64,
            kickoff_utc: Utc.with_ymd_and_hms(2024, 3, 1 + i as u32, 15, 0, 0).unwrap(),
            league_id: None,
            season: None,
            home_team_id: 1,
            away_team_id: 2,
            full_time: Some(ScorePair::new(h, a)),
            half_time: None,
        })
        .collect();
    let dist = aggregate(&pool, ScoreSelector::FullTime);
    let rows = evaluate_distribution(77, None, &dist, &AlgoSettings::default());
    let verdict = |label: &str| {
        rows.iter()
            .find(|r| r.market_label == label)
            .map(|r| (r.percent_green, r.meets_criteria))
            .expect("label present")
    };
    assert_eq!(verdict("Over 0.5"), (80, true));
    assert_eq!(verdict("Over 2.5"), (60, true));
    assert_eq!(verdict("Over 3.5"), (0, false));
    assert_eq!(verdict("Under 3.5"), (100, true));
    assert_eq!(verdict("Under 1.5"), (40, false));
    // 3 home wins, 1 away win, 1 draw.
    assert_eq!(verdict("Double Chance 1X"), (80, true));
    assert_eq!(verdict("Double Chance X2"), (40, false));
    assert_eq!(verdict("Double Chance 12"), (80, true));

    let hits = qualifying(&rows);
    assert_eq!(hits.len(), rows.iter().filter(|r| r.meets_criteria).count());
    assert!(hits.iter().all(|r| r.fixture_id == 77 && r.sample_size == 5));
    assert_eq!(
        rows.iter()
            .filter(|r| r.market_category == MarketCategory::DoubleChance)
            .count(),
        3
    );
}

#[test]
fn settings_are_clamped_and_defaulted() {
    assert_eq!(
        lenient(json!({"minimumQualifyingPercent": 150})).minimum_qualifying_percent,
        100
    );
    assert_eq!(lenient(json!({})), AlgoSettings::default());
    assert_eq!(lenient(json!({"formWindow": 500})).form_window, 50);
    assert_eq!(lenient(json!({"minimum_sample_size": 0})).minimum_sample_size, 1);

    let once = lenient(json!({"minimumSampleSize": -2, "minimumQualifyingPercent": -9}));
    let twice = AlgoSettings::normalize(Some(&RawAlgoSettings::from(once)));
    assert_eq!(once, twice);
}

#[test]
fn upcoming_fixture_uses_only_earlier_history() {
    let (mut history, upcoming) = split_mixed();
    // Live, cancelled and postponed records are not history.
    let mut pending: Vec<u64> = upcoming.iter().map(|f| f.fixture_id).collect();
    pending.sort_unstable();
    assert_eq!(pending, vec![1005, 1009, 1010, 1011, 1012]);
    let fixture = &fixture_1005(&upcoming);

    // Played after kickoff, must not leak into the sample.
    history.push(CanonicalFixture {
        fixture_id: 9000,
        kickoff_utc: Utc.with_ymd_and_hms(2024, 10, 5, 14, 0, 0).unwrap(),
        league_id: Some(39),
        season: Some("2024".to_string()),
        home_team_id: 33,
        away_team_id: 40,
        full_time: Some(ScorePair::new(5, 5)),
        half_time: Some(ScorePair::new(2, 2)),
    });

    let home_settings = lenient(json!({"minimumSampleSize": 4, "minimumQualifyingPercent": 75}));
    let picks = fixture_picks(fixture, &history, &home_settings, &AlgoSettings::default());
    assert_eq!(picks.len(), 2 * 3 * 15);

    let home: Vec<_> = picks.iter().filter(|p| p.team_id == Some(33)).collect();
    let away: Vec<_> = picks.iter().filter(|p| p.team_id == Some(37)).collect();
    assert_eq!(home.len(), 45);
    assert!(home.iter().all(|p| p.sample_size == 4 && p.fixture_id == 1005));
    assert!(away.iter().all(|p| p.sample_size == 0 && !p.meets_criteria));

    let first = &picks[0];
    assert_eq!(first.period, ScoreSelector::FullTime);
    assert_eq!(first.market_label, "Over 0.5");
    assert_eq!((first.percent_green, first.meets_criteria), (75, true));

    let find = |label: &str| {
        home.iter()
            .find(|p| p.market_label == label)
            .map(|p| (p.percent_green, p.meets_criteria))
            .expect("label present")
    };
    assert_eq!(find("Over 2.5"), (50, false));
    assert_eq!(find("Double Chance 1X"), (100, true));
    assert_eq!(find("Double Chance 12"), (50, false));
    // Half-time pairs: 1-0, 0-0, 1-1, 1-0.
    assert_eq!(find("1H Over 0.5"), (75, true));
    assert_eq!(find("1H Under 1.5"), (75, true));
}

#[test]
fn away_block_reads_double_chance_from_the_away_side() {
    // Team 37 won its last five, all at home; next it travels to team 33.
    let mut history: Vec<CanonicalFixture> = (0..5u32)
        .map(|i| CanonicalFixture {
            fixture_id: 500 + u64::from(i),
            kickoff_utc: Utc.with_ymd_and_hms(2024, 8, 3 + i * 7, 15, 0, 0).unwrap(),
            league_id: Some(39),
            season: Some("2024".to_string()),
            home_team_id: 37,
            away_team_id: 40 + i,
            full_time: Some(ScorePair::new(3, 0)),
            half_time: Some(ScorePair::new(1, 0)),
        })
        .collect();
    let upcoming = CanonicalFixture {
        fixture_id: 600,
        kickoff_utc: Utc.with_ymd_and_hms(2024, 9, 28, 15, 0, 0).unwrap(),
        league_id: Some(39),
        season: Some("2024".to_string()),
        home_team_id: 33,
        away_team_id: 37,
        full_time: None,
        half_time: None,
    };
    history.push(upcoming.clone());

    let settings = AlgoSettings::default();
    let picks = fixture_picks(&upcoming, &history, &settings, &settings);
    let away = |label: &str| {
        picks
            .iter()
            .find(|p| p.team_id == Some(37) && p.market_label == label)
            .map(|p| (p.sample_size, p.percent_green, p.meets_criteria))
            .expect("label present")
    };
    assert_eq!(away("Double Chance X2"), (5, 100, true));
    assert_eq!(away("Double Chance 12"), (5, 100, true));
    assert_eq!(away("Double Chance 1X"), (5, 0, false));
    assert_eq!(away("1H Double Chance X2"), (5, 100, true));
    // Goal lines are unaffected by which side the team is on.
    assert_eq!(away("Over 2.5"), (5, 100, true));

    // The same history read for a home fixture keeps the home view.
    let mut reversed = upcoming.clone();
    reversed.home_team_id = 37;
    reversed.away_team_id = 33;
    let home_picks = fixture_picks(&reversed, &history, &settings, &settings);
    let home_1x = home_picks
        .iter()
        .find(|p| p.team_id == Some(37) && p.market_label == "Double Chance 1X")
        .expect("label present");
    assert_eq!((home_1x.percent_green, home_1x.meets_criteria), (100, true));
}

#[test]
fn batch_output_follows_input_order() {
    let (history, pending) = split_mixed();
    let first = fixture_1005(&pending);
    let mut second = first.clone();
    second.fixture_id = 2000;
    second.home_team_id = 34;
    second.away_team_id = 35;
    let upcoming = vec![first, second];

    let picks = picks_for_fixtures(&upcoming, &history, |_| AlgoSettings::default());
    assert_eq!(picks.len(), 2 * 90);
    assert!(picks[..90].iter().all(|p| p.fixture_id == 1005));
    assert!(picks[90..].iter().all(|p| p.fixture_id == 2000));
    assert_eq!(picks[90].team_id, Some(34));
    assert_eq!(picks[135].team_id, Some(35));

    let serial: Vec<_> = upcoming
        .iter()
        .flat_map(|f| {
            fixture_picks(f, &history, &AlgoSettings::default(), &AlgoSettings::default())
        })
        .collect();
    assert_eq!(picks, serial);
}

#[test]
fn team_report_covers_periods_and_streaks() {
    let (history, _) = split_mixed();
    let report = team_report(&history, 33, None, &AlgoSettings::default());
    assert_eq!(report.team_id, 33);
    assert_eq!(report.periods.full_time.sample_size, 4);
    assert_eq!(report.periods.second_half.sample_size, 4);
    assert_eq!(report.streaks.form.len(), 4);

    let cutoff = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
    let earlier = team_report(&history, 33, Some(cutoff), &AlgoSettings::default());
    assert_eq!(earlier.periods.full_time.sample_size, 3);
    assert_eq!(earlier.streaks.current_streak_length, 1);
}
