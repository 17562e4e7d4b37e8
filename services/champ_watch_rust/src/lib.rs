//! champ_watch_rust - championship watch bot for a fixed list of FRC teams

pub mod config;
pub mod formatters;
pub mod rankings;
pub mod seen_state;
pub mod watcher;

pub use config::Config;
pub use seen_state::{NotifyKind, SeenState};
pub use watcher::{ChampWatcher, Sources, WatchSettings};
