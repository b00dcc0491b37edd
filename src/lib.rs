pub mod algo_settings;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod league_markets;
pub mod markets;
pub mod pick_store;
pub mod picks;
pub mod scope;
pub mod streaks;
pub mod team_report;
