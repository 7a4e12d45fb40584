use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

// ============== Policy ==============

/// Throttling tunables, fixed for the lifetime of a `RateLimiter`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimitPolicy {
    pub enabled: bool,
    /// Minimum gap between any two commands from one actor.
    pub user_cooldown: Duration,
    /// Minimum gap between two uses of the same command by one actor.
    pub command_cooldown: Duration,
    /// Max invocations inside `burst_window`; 0 disables the burst gate.
    pub burst_limit: u32,
    pub burst_window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        RateLimitSettings::default().into()
    }
}

/// The `rate_limit` config section (seconds as plain numbers).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub user_cooldown_secs: f64,
    pub command_cooldown_secs: f64,
    pub burst_limit: u32,
    pub burst_window_secs: f64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            user_cooldown_secs: 3.0,
            command_cooldown_secs: 2.0,
            burst_limit: 5,
            burst_window_secs: 10.0,
        }
    }
}

impl From<RateLimitSettings> for RateLimitPolicy {
    fn from(s: RateLimitSettings) -> Self {
        Self {
            enabled: s.enabled,
            user_cooldown: secs(s.user_cooldown_secs),
            command_cooldown: secs(s.command_cooldown_secs),
            burst_limit: s.burst_limit,
            burst_window: secs(s.burst_window_secs),
        }
    }
}

/// Negative and NaN become zero, overflow saturates.
fn secs(v: f64) -> Duration {
    if v.is_nan() || v <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(v).unwrap_or(Duration::MAX)
}

// ============== Rate Limiter (Cooldowns + Sliding Window) ==============

#[derive(Debug, Default)]
struct ActorState {
    last_command: Option<Instant>,
    command_last_use: HashMap<String, Instant>,
    burst: VecDeque<Instant>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Invocations still inside the burst window.
    pub recent_invocations: usize,
    pub burst_limit: u32,
    pub user_cooldown_remaining: Duration,
}

/// Per-actor throttle shared by all message handlers.
///
/// The actor map is locked only to look up (or create) an actor's slot; each slot
/// has its own lock, so different actors never wait on each other.
/// State lives in memory only and is gone after a restart.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    actors: Mutex<HashMap<String, Arc<Mutex<ActorState>>>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            actors: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn is_limited(&self, actor: &str, command: &str) -> bool {
        self.is_limited_at(actor, command, Instant::now())
    }

    /// True if any of the three gates (actor cooldown, command cooldown, burst
    /// window) is closed at `now`.
    ///
    /// All gates are evaluated on every call: the burst check also prunes expired
    /// timestamps, so it must run even when an earlier gate already tripped.
    pub fn is_limited_at(&self, actor: &str, command: &str, now: Instant) -> bool {
        if !self.policy.enabled {
            return false;
        }
        let Some(slot) = self.existing(actor) else {
            return false;
        };
        let mut state = lock(&slot);

        let user_hot = state
            .last_command
            .is_some_and(|t| now.saturating_duration_since(t) < self.policy.user_cooldown);
        let command_hot = state
            .command_last_use
            .get(command)
            .is_some_and(|t| now.saturating_duration_since(*t) < self.policy.command_cooldown);
        let burst_full = self.prune_burst(&mut state, now);

        let limited = user_hot || command_hot || burst_full;
        if limited {
            tracing::debug!(
                actor,
                command,
                user_hot,
                command_hot,
                burst_full,
                "rate limited"
            );
        }
        limited
    }

    pub fn record(&self, actor: &str, command: &str) {
        self.record_at(actor, command, Instant::now());
    }

    /// Stamp `now` into all three slices. Does not check `is_limited` itself.
    pub fn record_at(&self, actor: &str, command: &str, now: Instant) {
        let slot = self.slot(actor);
        let mut state = lock(&slot);
        state.last_command = Some(now);
        state.command_last_use.insert(command.to_string(), now);
        state.burst.push_back(now);
    }

    pub fn get_remaining_cooldown(&self, actor: &str, command: &str) -> Duration {
        self.get_remaining_cooldown_at(actor, command, Instant::now())
    }

    /// Larger of the two cooldown remainders, floored at zero. Ignores the burst window.
    pub fn get_remaining_cooldown_at(&self, actor: &str, command: &str, now: Instant) -> Duration {
        if !self.policy.enabled {
            return Duration::ZERO;
        }
        let Some(slot) = self.existing(actor) else {
            return Duration::ZERO;
        };
        let state = lock(&slot);

        let user = remaining(state.last_command, self.policy.user_cooldown, now);
        let per_command = remaining(
            state.command_last_use.get(command).copied(),
            self.policy.command_cooldown,
            now,
        );
        user.max(per_command)
    }

    pub fn status(&self, actor: &str) -> RateLimitStatus {
        self.status_at(actor, Instant::now())
    }

    /// Snapshot for an actor; does not prune.
    pub fn status_at(&self, actor: &str, now: Instant) -> RateLimitStatus {
        let (recent, last_command) = match self.existing(actor) {
            Some(slot) => {
                let state = lock(&slot);
                let recent = state
                    .burst
                    .iter()
                    .filter(|t| now.saturating_duration_since(**t) < self.policy.burst_window)
                    .count();
                (recent, state.last_command)
            }
            None => (0, None),
        };

        RateLimitStatus {
            recent_invocations: recent,
            burst_limit: self.policy.burst_limit,
            user_cooldown_remaining: remaining(last_command, self.policy.user_cooldown, now),
        }
    }

    pub fn reset_user(&self, actor: &str) {
        lock(&self.actors).remove(actor);
    }

    pub fn reset_all(&self) {
        lock(&self.actors).clear();
    }

    /// Number of actors with tracked state.
    pub fn tracked_actors(&self) -> usize {
        lock(&self.actors).len()
    }

    fn existing(&self, actor: &str) -> Option<Arc<Mutex<ActorState>>> {
        lock(&self.actors).get(actor).cloned()
    }

    fn slot(&self, actor: &str) -> Arc<Mutex<ActorState>> {
        lock(&self.actors)
            .entry(actor.to_string())
            .or_default()
            .clone()
    }

    /// Drop timestamps outside the window; true if the remaining count hits the limit.
    fn prune_burst(&self, state: &mut ActorState, now: Instant) -> bool {
        let window = self.policy.burst_window;
        state
            .burst
            .retain(|t| now.saturating_duration_since(*t) < window);
        self.policy.burst_limit > 0 && state.burst.len() >= self.policy.burst_limit as usize
    }
}

fn remaining(last: Option<Instant>, cooldown: Duration, now: Instant) -> Duration {
    match last {
        Some(t) => cooldown.saturating_sub(now.saturating_duration_since(t)),
        None => Duration::ZERO,
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
