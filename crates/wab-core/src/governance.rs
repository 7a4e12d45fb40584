use std::{sync::Arc, time::Duration};

use crate::{
    config::{ConfigStore, StorePaths},
    security::{RateLimitSettings, RateLimiter},
};

/// Outcome of the pre-dispatch governance check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandDecision {
    Allowed,
    /// Listed in `disabled_commands`.
    Disabled,
    /// Throttled; `retry_after` is zero when only the burst window is full.
    Throttled { retry_after: Duration },
}

/// Process-wide governance services, built once at startup and passed by reference
/// to every message handler.
#[derive(Clone)]
pub struct Governance {
    pub config: Arc<ConfigStore>,
    pub limiter: Arc<RateLimiter>,
}

impl Governance {
    /// Load the config store and build the rate limiter from its `rate_limit` section.
    pub fn bootstrap(paths: StorePaths) -> Self {
        let config = Arc::new(ConfigStore::open(paths));

        let settings = config
            .get_as::<RateLimitSettings>("rate_limit")
            .unwrap_or_else(|| {
                tracing::warn!("invalid rate_limit section; using built-in policy");
                RateLimitSettings::default()
            });
        tracing::info!(
            enabled = settings.enabled,
            burst_limit = settings.burst_limit,
            "rate limiter configured"
        );

        Self {
            config,
            limiter: Arc::new(RateLimiter::new(settings.into())),
        }
    }

    /// Decide whether `actor` may run `command` now. Does not record the invocation.
    pub fn check_command(&self, actor: &str, command: &str) -> CommandDecision {
        if !self.config.is_command_enabled(command) {
            return CommandDecision::Disabled;
        }
        if self.limiter.is_limited(actor, command) {
            return CommandDecision::Throttled {
                retry_after: self.limiter.get_remaining_cooldown(actor, command),
            };
        }
        CommandDecision::Allowed
    }
}
