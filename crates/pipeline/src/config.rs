//! Task tracker configuration loaded from environment variables.

use std::time::Duration;

use storyreel_core::task::{
    PollPolicy, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_MAX_POLL_DURATION, DEFAULT_POLL_INTERVAL,
};

#[derive(Debug, Clone, Default)]
pub struct TrackerConfig {
    pub policy: PollPolicy,
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env var                       | Default |
    /// |-------------------------------|---------|
    /// | `TASK_POLL_INTERVAL_SECS`     | `12`    |
    /// | `TASK_POLL_MAX_ATTEMPTS`      | `150`   |
    /// | `TASK_POLL_MAX_DURATION_SECS` | `1800`  |
    ///
    /// A limit of `0` disables that guard.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str| var(key).and_then(|s| s.trim().parse::<u64>().ok());

        let interval = number("TASK_POLL_INTERVAL_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let max_attempts = match number("TASK_POLL_MAX_ATTEMPTS") {
            Some(0) => None,
            Some(n) => Some(u32::try_from(n).unwrap_or(u32::MAX)),
            None => Some(DEFAULT_MAX_POLL_ATTEMPTS),
        };
        let max_duration = match number("TASK_POLL_MAX_DURATION_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_MAX_POLL_DURATION),
        };

        Self {
            policy: PollPolicy {
                interval,
                max_attempts,
                max_duration,
            },
        }
    }
}
