use crate::error::{AppError, Result};

pub const FPL_API_URL: &str = "https://fantasy.premierleague.com/api";

/// Default file the JSON history backend reads and rewrites.
pub const HISTORY_PATH: &str = "user_betting_history.json";

/// Most recent bet records kept per user. Older records are dropped on write.
pub const HISTORY_CAP: usize = 50;

/// Records averaged when deriving a user's baseline odds.
pub const BASELINE_WINDOW: usize = 10;

/// Gameweek refresh interval (seconds).
pub const GAMEWEEK_REFRESH_INTERVAL_SECS: u64 = 300;

/// Legs the generator pads up to from the extra pool.
pub const MIN_LEGS: usize = 4;

/// High-profile legs per suggestion.
pub const MAX_HIGH_PROFILE_LEGS: usize = 2;

/// Names that mark a player as high profile. Matched as lower-case substrings of
/// the display name, so "son" also matches "Robertson".
pub const CURATED_NAMES: &[&str] = &[
    "salah", "haaland", "kane", "de bruyne", "bruno", "son", "rashford", "saka",
    "martinelli", "odegaard", "palmer", "foden", "grealish", "van dijk", "dias",
    "stones", "walker", "alisson", "ederson",
];

/// Odds adjustment constants. Quoted odds are externally visible, so these must
/// not drift.
pub mod odds {
    /// Baseline for a user with no history; also the normaliser for the history multiplier.
    pub const DEFAULT_BASELINE: f64 = 1.2;
    /// Baseline when the recent average luck level is exactly zero.
    pub const NEUTRAL_BASELINE: f64 = 1.5;
    pub const BASELINE_MIN: f64 = 1.1;
    pub const BASELINE_MAX: f64 = 6.0;
    /// Baseline slope per unit of positive average luck.
    pub const BASELINE_LUCKY_STEP: f64 = 0.3;
    /// Baseline slope per unit of negative average luck.
    pub const BASELINE_SAFE_STEP: f64 = 0.2;

    /// Odds multiplier step per positive luck level.
    pub const LUCKY_STEP: f64 = 0.2;
    /// Odds multiplier step per negative luck level.
    pub const SAFE_STEP: f64 = 0.15;

    pub const MIN_ODDS: f64 = 1.1;
    /// Ceiling when luck level > 0.
    pub const MAX_ODDS_LUCKY: f64 = 8.0;
    /// Ceiling when luck level <= 0.
    pub const MAX_ODDS: f64 = 5.0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBackend {
    Json,
    Sqlite,
}

impl std::str::FromStr for HistoryBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(HistoryBackend::Json),
            "sqlite" => Ok(HistoryBackend::Sqlite),
            other => Err(AppError::Config(format!(
                "HISTORY_BACKEND must be json or sqlite, got {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for HistoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryBackend::Json => write!(f, "json"),
            HistoryBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    pub fpl_api_url: String,
    /// Manager-id lookup service (PLAYER_LOOKUP_URL). Lookup is disabled when unset.
    pub player_lookup_url: Option<String>,
    pub history_backend: HistoryBackend,
    /// JSON history file (HISTORY_PATH)
    pub history_path: String,
    /// SQLite file used when HISTORY_BACKEND=sqlite (DB_PATH)
    pub db_path: String,
    pub gameweek_refresh_secs: u64,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            fpl_api_url: std::env::var("FPL_API_URL")
                .unwrap_or_else(|_| FPL_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            player_lookup_url: std::env::var("PLAYER_LOOKUP_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            history_backend: std::env::var("HISTORY_BACKEND")
                .unwrap_or_else(|_| "json".to_string())
                .parse()?,
            history_path: std::env::var("HISTORY_PATH").unwrap_or_else(|_| HISTORY_PATH.to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "betbuilder.db".to_string()),
            gameweek_refresh_secs: std::env::var("GAMEWEEK_REFRESH_SECS")
                .unwrap_or_else(|_| GAMEWEEK_REFRESH_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(GAMEWEEK_REFRESH_INTERVAL_SECS),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .unwrap_or(30),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_backend_parses_case_insensitively() {
        assert_eq!("JSON".parse::<HistoryBackend>().unwrap(), HistoryBackend::Json);
        assert_eq!(" sqlite ".parse::<HistoryBackend>().unwrap(), HistoryBackend::Sqlite);
        assert!("redis".parse::<HistoryBackend>().is_err());
    }
}
