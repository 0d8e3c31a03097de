use std::env;
use std::path::PathBuf;

use crate::dataset::default_deliveries_path;
use crate::encoding::default_encodings_path;
use crate::predictor::default_model_path;
use crate::sequence::SetupWindow;
use crate::stats::Analysis;

/// Accepted range, in balls, for the probability horizon.
pub const HORIZON_BALLS: std::ops::RangeInclusive<u32> = 1..=120;

/// Runtime settings gathered from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub deliveries_path: PathBuf,
    pub encodings_path: PathBuf,
    pub model_path: PathBuf,
    pub analysis: Analysis,
    pub seed: Option<u64>,
    /// `RUST_LOG` directives, read after the dotenv files.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deliveries_path: default_deliveries_path(),
            encodings_path: default_encodings_path(),
            model_path: default_model_path(),
            analysis: Analysis::default(),
            seed: None,
            log_filter: None,
        }
    }
}

impl Config {
    /// Loads `.env.local` then `.env` (first one wins per key) and reads the
    /// `CRICKET_*` variables. Unparseable numbers fall back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_vars()
    }

    fn from_vars() -> Self {
        let defaults = Analysis::default();
        let setup_window = match opt_env("CRICKET_SETUP_WINDOW").as_deref() {
            Some("match" | "within_match") => SetupWindow::WithinMatch,
            _ => defaults.setup_window,
        };
        Self {
            deliveries_path: opt_env("CRICKET_DELIVERIES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_deliveries_path),
            encodings_path: opt_env("CRICKET_ENCODINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_encodings_path),
            model_path: opt_env("CRICKET_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_model_path),
            analysis: Analysis {
                horizon: clamp_horizon(
                    parsed_env("CRICKET_PROB_HORIZON").unwrap_or(defaults.horizon),
                ),
                min_scatter_balls: parsed_env("CRICKET_MIN_SCATTER_BALLS")
                    .unwrap_or(defaults.min_scatter_balls),
                max_spell_overs: parsed_env("CRICKET_MAX_SPELL_OVERS")
                    .unwrap_or(defaults.max_spell_overs)
                    .clamp(1, 20),
                setup_window,
            },
            seed: parsed_env("CRICKET_SEED"),
            log_filter: opt_env("RUST_LOG"),
        }
    }

    /// Command-line horizon override, held to the same range as the variable.
    pub fn set_horizon(&mut self, balls: u32) {
        self.analysis.horizon = clamp_horizon(balls);
    }
}

fn clamp_horizon(balls: u32) -> u32 {
    balls.clamp(*HORIZON_BALLS.start(), *HORIZON_BALLS.end())
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        if val.trim().is_empty() {
            None
        } else {
            Some(val.trim().to_string())
        }
    })
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    opt_env(key).and_then(|val| val.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_analysis_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.analysis.horizon, 10);
        assert_eq!(cfg.analysis.min_scatter_balls, 10);
        assert_eq!(cfg.analysis.max_spell_overs, 4);
        assert_eq!(cfg.analysis.setup_window, SetupWindow::AcrossMatches);
        assert!(cfg.seed.is_none());
        assert!(cfg.log_filter.is_none());
    }

    #[test]
    fn horizon_override_is_clamped() {
        let mut cfg = Config::default();
        cfg.set_horizon(0);
        assert_eq!(cfg.analysis.horizon, 1);
        cfg.set_horizon(3_000_000_000);
        assert_eq!(cfg.analysis.horizon, 120);
        cfg.set_horizon(36);
        assert_eq!(cfg.analysis.horizon, 36);
    }

    #[test]
    fn unset_keys_read_as_none() {
        assert_eq!(opt_env("CRICKET_TEST_SURELY_UNSET_KEY"), None);
        assert_eq!(parsed_env::<u32>("CRICKET_TEST_SURELY_UNSET_KEY"), None);
    }
}
