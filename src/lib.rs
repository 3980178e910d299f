pub mod config;
pub mod report;
pub mod setlist;
pub mod stats;

/// Artist counted when none is configured.
pub const DEFAULT_ARTIST: &str = "Die Ärzte";

/// Application name for XDG paths
pub const APP_NAME: &str = "setstats";
