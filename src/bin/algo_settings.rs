use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use fixture_picks::algo_settings::{AlgoSettings, RawAlgoSettings};
use fixture_picks::config::init_tracing;
use fixture_picks::pick_store;

fn main() -> Result<()> {
    let cfg = init_tracing();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let user_id = arg_value(&args, "--user")
        .context("usage: algo_settings --user ID --team ID [--min-sample N] [--min-percent P] [--form-window W] [--db PATH]")?;
    let team_id = arg_value(&args, "--team")
        .context("missing --team")?
        .parse::<u32>()
        .map_err(|_| anyhow!("--team expects a numeric id"))?;

    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| cfg.db_path.clone())
        .or_else(pick_store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let conn = pick_store::open_db(&db_path)?;

    let update = RawAlgoSettings {
        minimum_sample_size: parse_i64_arg(&args, "--min-sample")?,
        minimum_qualifying_percent: parse_i64_arg(&args, "--min-percent")?,
        form_window: parse_i64_arg(&args, "--form-window")?,
    };

    let stored = pick_store::load_settings(&conn, &user_id, team_id)?;
    if update == RawAlgoSettings::default() {
        let effective = AlgoSettings::normalize_with(stored.as_ref(), &cfg.default_settings);
        println!("DB: {}", db_path.display());
        println!(
            "user {user_id} team {team_id}: {}",
            if stored.is_some() { "stored" } else { "defaults" }
        );
        print_settings(&effective);
        return Ok(());
    }

    // Whole-record overwrite: flags not given take the configured defaults.
    let record = update.filled_from(&cfg.default_settings);
    let saved = pick_store::save_settings(&conn, &user_id, team_id, &record)?;
    println!("Saved settings for user {user_id} team {team_id}");
    print_settings(&saved);
    Ok(())
}

fn print_settings(s: &AlgoSettings) {
    println!("  minimum sample size:        {}", s.minimum_sample_size);
    println!("  minimum qualifying percent: {}%", s.minimum_qualifying_percent);
    println!("  form window:                {}", s.form_window);
}

fn parse_i64_arg(args: &[String], name: &str) -> Result<Option<i64>> {
    let Some(raw) = arg_value(args, name) else {
        return Ok(None);
    };
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| anyhow!("{name} expects an integer, got `{raw}`"))
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
