use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use tracing::info;

use fixture_picks::algo_settings::AlgoSettings;
use fixture_picks::config::{init_tracing, with_pool};
use fixture_picks::fixtures::{CanonicalFixture, normalize_json};
use fixture_picks::league_markets::{aggregate_league, league_team_distributions};
use fixture_picks::markets::{GOAL_LINES, MarketDistribution, ScoreSelector};
use fixture_picks::pick_store;
use fixture_picks::picks::qualifying;
use fixture_picks::scope::Scope;
use fixture_picks::streaks::form_string;
use fixture_picks::team_report::{picks_for_fixtures, team_report};

const DEFAULT_USER: &str = "default";

fn main() -> Result<()> {
    let cfg = init_tracing();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let fixtures_path = arg_value(&args, "--fixtures")
        .map(PathBuf::from)
        .context("usage: pick_report --fixtures <file.json> [--team ID] [--league ID] [--season S] [--db PATH] [--user ID] [--date YYYY-MM-DD]")?;
    let team_id = parse_u32_arg(&args, "--team")?;
    let league_id = parse_u32_arg(&args, "--league")?;
    let season = arg_value(&args, "--season");
    let user_id = arg_value(&args, "--user").unwrap_or_else(|| DEFAULT_USER.to_string());
    let snapshot_date = match arg_value(&args, "--date") {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .with_context(|| format!("invalid --date `{raw}`"))?,
        None => Utc::now().date_naive(),
    };
    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| cfg.db_path.clone());

    let raw = fs::read_to_string(&fixtures_path)
        .with_context(|| format!("read fixtures file {}", fixtures_path.display()))?;
    let batch = normalize_json(&raw)?;
    info!(
        path = %fixtures_path.display(),
        accepted = batch.fixtures.len(),
        rejected = batch.rejected.len(),
        "loaded fixtures"
    );

    println!("Fixtures: {}", batch.fixtures.len());
    if !batch.rejected.is_empty() {
        println!("Rejected: {}", batch.rejected.len());
        for rej in batch.rejected.iter().take(8) {
            let id = rej
                .fixture_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!(" - record #{} (fixture {id}): {}", rej.index, rej.reason);
        }
    }

    let (history, upcoming): (Vec<CanonicalFixture>, Vec<CanonicalFixture>) =
        batch.fixtures.into_iter().partition(|f| f.is_played());

    let mut conn = match db_path.as_ref() {
        Some(path) => Some(pick_store::open_db(path)?),
        None => None,
    };
    let defaults = cfg.default_settings;
    let pool = cfg.build_pool();

    if let Some(league_id) = league_id {
        println!();
        println!("League {league_id}{}", season.as_deref().map(|s| format!(" season {s}")).unwrap_or_default());
        for selector in ScoreSelector::ALL {
            let scoped = aggregate_league(&history, league_id, season.as_deref(), selector);
            print_distribution("league", &scoped.distribution);
        }
        let rows = with_pool(&pool, || {
            league_team_distributions(&history, league_id, season.as_deref(), ScoreSelector::FullTime)
        });
        println!("  team       n   O1.5  O2.5  O3.5    1X    X2    12");
        for row in &rows {
            let Scope::Team { team_id, .. } = row.scope else {
                continue;
            };
            let d = &row.distribution;
            println!(
                "  {:<8} {:>3}  {:>4}% {:>4}% {:>4}% {:>4}% {:>4}% {:>4}%",
                team_id,
                d.sample_size,
                d.over(GOAL_LINES[1]).percent,
                d.over(GOAL_LINES[2]).percent,
                d.over(GOAL_LINES[3]).percent,
                d.double_chance.home_or_draw.percent,
                d.double_chance.draw_or_away.percent,
                d.double_chance.home_or_away.percent,
            );
        }
    }

    if let Some(team_id) = team_id {
        let settings = match conn.as_ref() {
            Some(conn) => pick_store::settings_for(conn, &user_id, team_id, &defaults)?,
            None => defaults,
        };
        let report = team_report(&history, team_id, None, &settings);
        println!();
        println!("Team {team_id}");
        for dist in report.periods.iter() {
            print_distribution("team", dist);
        }
        let streaks = &report.streaks;
        let current = streaks
            .current_streak_type
            .map(|r| format!("{}{}", r.letter(), streaks.current_streak_length))
            .unwrap_or_else(|| "none".to_string());
        println!(
            "  form {}  current {}  longest W{} D{} L{}",
            form_string(&streaks.form),
            current,
            streaks.longest_streaks_by_type.win,
            streaks.longest_streaks_by_type.draw,
            streaks.longest_streaks_by_type.loss,
        );
    }

    if upcoming.is_empty() {
        return Ok(());
    }

    let team_ids: BTreeSet<u32> = upcoming
        .iter()
        .flat_map(|f| [f.home_team_id, f.away_team_id])
        .collect();
    let mut per_team: HashMap<u32, AlgoSettings> = HashMap::new();
    if let Some(conn) = conn.as_ref() {
        for id in team_ids {
            per_team.insert(id, pick_store::settings_for(conn, &user_id, id, &defaults)?);
        }
    }

    let picks = with_pool(&pool, || {
        picks_for_fixtures(&upcoming, &history, |team| {
            per_team.get(&team).copied().unwrap_or(defaults)
        })
    });
    let hits = qualifying(&picks);
    println!();
    println!(
        "Upcoming fixtures: {}  picks evaluated: {}  qualifying: {}",
        upcoming.len(),
        picks.len(),
        hits.len()
    );
    for pick in hits {
        println!(
            "  fixture {} team {} {:<24} {:>3}% (n={})",
            pick.fixture_id,
            pick.team_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            pick.market_label,
            pick.percent_green,
            pick.sample_size,
        );
    }

    if let Some(conn) = conn.as_mut() {
        let written = pick_store::save_pick_snapshot(conn, snapshot_date, &picks)?;
        println!("Snapshot {snapshot_date}: {written} rows");
    }

    Ok(())
}

fn print_distribution(title: &str, dist: &MarketDistribution) {
    println!("  {title} {} n={}", dist.selector.as_str(), dist.sample_size);
    let overs = GOAL_LINES
        .iter()
        .map(|line| format!("O{line} {:>3}%", dist.over(*line).percent))
        .collect::<Vec<_>>()
        .join("  ");
    println!("    {overs}");
    println!(
        "    1X {:>3}%  X2 {:>3}%  12 {:>3}%",
        dist.double_chance.home_or_draw.percent,
        dist.double_chance.draw_or_away.percent,
        dist.double_chance.home_or_away.percent,
    );
}

fn parse_u32_arg(args: &[String], name: &str) -> Result<Option<u32>> {
    let Some(raw) = arg_value(args, name) else {
        return Ok(None);
    };
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| anyhow!("{name} expects a numeric id, got `{raw}`"))
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
