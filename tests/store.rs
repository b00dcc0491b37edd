use chrono::NaiveDate;
use rusqlite::Connection;

use fixture_picks::algo_settings::{AlgoSettings, RawAlgoSettings};
use fixture_picks::markets::ScoreSelector;
use fixture_picks::pick_store::{
    init_schema, load_pick_snapshot, load_settings, save_pick_snapshot, save_settings,
    settings_for,
};
use fixture_picks::picks::{MarketCategory, PickRecord};

fn memory_db() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory sqlite");
    init_schema(&conn).expect("schema");
    conn
}

fn pick(fixture_id: u64, label: &str, percent: u8, meets: bool) -> PickRecord {
    PickRecord {
        fixture_id,
        team_id: Some(33),
        period: ScoreSelector::HalfTime,
        market_label: label.to_string(),
        market_category: MarketCategory::OverUnder,
        sample_size: 6,
        percent_green: percent,
        meets_criteria: meets,
    }
}

#[test]
fn settings_are_normalized_before_storage() {
    let conn = memory_db();
    let saved = save_settings(
        &conn,
        "alice",
        33,
        &RawAlgoSettings {
            minimum_sample_size: Some(-3),
            minimum_qualifying_percent: Some(140),
            form_window: None,
        },
    )
    .expect("save");
    assert_eq!(
        saved,
        AlgoSettings {
            minimum_sample_size: 1,
            minimum_qualifying_percent: 100,
            form_window: 5,
        }
    );

    let stored = load_settings(&conn, "alice", 33).expect("load").expect("row");
    assert_eq!(stored, RawAlgoSettings::from(saved));
}

#[test]
fn saving_again_replaces_the_record() {
    let conn = memory_db();
    let first = RawAlgoSettings {
        minimum_sample_size: Some(8),
        minimum_qualifying_percent: Some(70),
        form_window: Some(10),
    };
    save_settings(&conn, "alice", 33, &first).expect("save");
    let second = RawAlgoSettings {
        minimum_sample_size: Some(3),
        ..Default::default()
    };
    save_settings(&conn, "alice", 33, &second).expect("overwrite");

    let effective = settings_for(&conn, "alice", 33, &AlgoSettings::default()).expect("read");
    assert_eq!(effective.minimum_sample_size, 3);
    assert_eq!(effective.minimum_qualifying_percent, 60);
    assert_eq!(effective.form_window, 5);
}

#[test]
fn missing_settings_fall_back_to_defaults() {
    let conn = memory_db();
    save_settings(&conn, "alice", 33, &RawAlgoSettings::default()).expect("save");
    assert!(load_settings(&conn, "bob", 33).expect("load").is_none());

    let defaults = AlgoSettings {
        minimum_sample_size: 9,
        minimum_qualifying_percent: 80,
        form_window: 3,
    };
    assert_eq!(settings_for(&conn, "bob", 33, &defaults).expect("read"), defaults);
    assert_eq!(settings_for(&conn, "alice", 34, &defaults).expect("read"), defaults);
}

#[test]
fn snapshot_for_a_date_is_replaced_whole() {
    let mut conn = memory_db();
    let day = NaiveDate::from_ymd_opt(2024, 9, 20).unwrap();
    let other_day = NaiveDate::from_ymd_opt(2024, 9, 21).unwrap();

    let first = vec![
        pick(1005, "1H Over 0.5", 83, true),
        pick(1005, "1H Under 0.5", 17, false),
    ];
    assert_eq!(save_pick_snapshot(&mut conn, day, &first).expect("save"), 2);
    assert_eq!(load_pick_snapshot(&conn, day).expect("load"), first);

    let mut league_row = pick(1006, "Double Chance 1X", 100, true);
    league_row.team_id = None;
    league_row.period = ScoreSelector::FullTime;
    league_row.market_category = MarketCategory::DoubleChance;
    save_pick_snapshot(&mut conn, other_day, std::slice::from_ref(&league_row)).expect("save");

    let replacement = vec![pick(1005, "1H Over 1.5", 50, false)];
    save_pick_snapshot(&mut conn, day, &replacement).expect("replace");
    assert_eq!(load_pick_snapshot(&conn, day).expect("load"), replacement);
    assert_eq!(load_pick_snapshot(&conn, other_day).expect("load"), vec![league_row]);
}

#[test]
fn corrupt_snapshot_rows_are_errors() {
    let mut conn = memory_db();
    let day = NaiveDate::from_ymd_opt(2024, 9, 22).unwrap();
    save_pick_snapshot(&mut conn, day, &[pick(1005, "Over 1.5", 70, true)]).expect("save");

    conn.execute("UPDATE pick_snapshots SET sample_size = -4", [])
        .expect("corrupt sample size");
    assert!(load_pick_snapshot(&conn, day).is_err());

    conn.execute("UPDATE pick_snapshots SET sample_size = 6, percent_green = 140", [])
        .expect("corrupt percent");
    assert!(load_pick_snapshot(&conn, day).is_err());

    conn.execute("UPDATE pick_snapshots SET percent_green = 70", [])
        .expect("repair");
    assert_eq!(load_pick_snapshot(&conn, day).expect("load").len(), 1);
}
