use std::env;
use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use crate::algo_settings::{AlgoSettings, RawAlgoSettings};

const DEFAULT_PARALLELISM: usize = 4;

static CONFIG: OnceCell<EngineConfig> = OnceCell::new();

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Settings applied to teams with no stored record (PICKS_MIN_SAMPLE_SIZE,
    /// PICKS_MIN_PERCENT, PICKS_FORM_WINDOW).
    pub default_settings: AlgoSettings,
    /// Worker threads for batch aggregation (PICKS_PARALLELISM).
    pub parallelism: usize,
    /// tracing filter directive (PICKS_LOG).
    pub log_filter: String,
    /// SQLite store override (PICKS_DB_PATH).
    pub db_path: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let raw = RawAlgoSettings {
            minimum_sample_size: env_i64("PICKS_MIN_SAMPLE_SIZE"),
            minimum_qualifying_percent: env_i64("PICKS_MIN_PERCENT"),
            form_window: env_i64("PICKS_FORM_WINDOW"),
        };
        Self {
            default_settings: AlgoSettings::normalize(Some(&raw)),
            parallelism: env::var("PICKS_PARALLELISM")
                .ok()
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(DEFAULT_PARALLELISM)
                .clamp(1, 32),
            log_filter: opt_env("PICKS_LOG").unwrap_or_else(|| "info".to_string()),
            db_path: opt_env("PICKS_DB_PATH").map(PathBuf::from),
        }
    }

    /// Process-wide config, read from the environment on first use.
    pub fn global() -> &'static EngineConfig {
        CONFIG.get_or_init(EngineConfig::from_env)
    }

    pub fn build_pool(&self) -> Option<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()
            .ok()
    }
}

/// Run `action` inside `pool` when one could be built, else on the global rayon pool.
pub fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

/// Load `.env.local` / `.env` and install the fmt subscriber. Binaries call this once.
pub fn init_tracing() -> &'static EngineConfig {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let cfg = EngineConfig::global();
    let filter = EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    cfg
}

fn env_i64(key: &str) -> Option<i64> {
    opt_env(key).and_then(|val| val.trim().parse::<i64>().ok())
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}
