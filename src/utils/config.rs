// src/utils/config.rs - Environment-driven run configuration

use log::{info, warn};
use std::env;

use crate::matching::recency::RECENCY_WINDOW_DAYS;

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Days a same-name candidate's creation timestamp may be old and
    /// still win the recency tie-break.
    pub recency_window_days: i64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            recency_window_days: RECENCY_WINDOW_DAYS,
        }
    }
}

impl ReconcileConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let recency_window_days = match env::var("RECENCY_WINDOW_DAYS") {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(days) if days >= 0 => days,
                _ => {
                    warn!(
                        "Ignoring invalid RECENCY_WINDOW_DAYS={:?}; using default {}",
                        raw, RECENCY_WINDOW_DAYS
                    );
                    RECENCY_WINDOW_DAYS
                }
            },
            Err(_) => RECENCY_WINDOW_DAYS,
        };

        Self {
            recency_window_days,
        }
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!(
            "⚙️ Reconcile config: recency window = {} days{}",
            self.recency_window_days,
            if self.recency_window_days != RECENCY_WINDOW_DAYS {
                " (overridden)"
            } else {
                ""
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test body: the tests share RECENCY_WINDOW_DAYS and cargo runs
    // test threads in parallel.
    #[test]
    fn test_from_env() {
        env::remove_var("RECENCY_WINDOW_DAYS");
        let config = ReconcileConfig::from_env();
        assert_eq!(config.recency_window_days, RECENCY_WINDOW_DAYS);

        env::set_var("RECENCY_WINDOW_DAYS", "14");
        let config = ReconcileConfig::from_env();
        assert_eq!(config.recency_window_days, 14);

        env::set_var("RECENCY_WINDOW_DAYS", "-3");
        let config = ReconcileConfig::from_env();
        assert_eq!(config.recency_window_days, RECENCY_WINDOW_DAYS);

        env::remove_var("RECENCY_WINDOW_DAYS");
    }
}
