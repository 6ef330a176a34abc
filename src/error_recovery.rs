// src/error_recovery.rs
//! Recovery policy for aborted tasks.
//!
//! A task never retries inside itself. Recovery is eventual: the entity stays
//! pending and a later scheduler refill hands it to a fresh task. What this
//! module decides is how long a worker stays away from the remote source
//! after an abort.

use crate::error::FailureClass;
use std::time::Duration;

/// Worker cooldowns keyed by the class of the failure that ended a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    /// Pause after a rate-limit signal from the remote source
    pub rate_limit: Duration,
    /// Pause after a transient or persistence failure
    pub failure: Duration,
}

impl CooldownPolicy {
    pub fn new(rate_limit: Duration, failure: Duration) -> Self {
        Self {
            rate_limit,
            failure,
        }
    }

    /// A policy that never pauses.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// How long a worker waits before claiming its next task.
    ///
    /// A rate limit that carries a server-advertised retry delay waits for
    /// the longer of the two. Access denial needs no pause: the entity is
    /// terminal and says nothing about the remote source's load.
    pub fn cooldown_for(&self, class: FailureClass, retry_after: Option<Duration>) -> Option<Duration> {
        let pause = match class {
            FailureClass::RateLimited => retry_after
                .map(|hint| hint.max(self.rate_limit))
                .unwrap_or(self.rate_limit),
            FailureClass::Transient | FailureClass::Persistence => self.failure,
            FailureClass::AccessDenied => Duration::ZERO,
        };
        (!pause.is_zero()).then_some(pause)
    }
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_RATE_LIMIT_COOLDOWN,
            crate::constants::DEFAULT_FAILURE_COOLDOWN,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_uses_the_longer_pause() {
        let policy = CooldownPolicy::new(Duration::from_secs(60), Duration::from_secs(15));
        assert_eq!(
            policy.cooldown_for(FailureClass::RateLimited, None),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            policy.cooldown_for(FailureClass::RateLimited, Some(Duration::from_secs(900))),
            Some(Duration::from_secs(900))
        );
    }

    #[test]
    fn transient_failures_use_failure_pause() {
        let policy = CooldownPolicy::new(Duration::from_secs(60), Duration::from_secs(15));
        assert_eq!(
            policy.cooldown_for(FailureClass::Transient, None),
            Some(Duration::from_secs(15))
        );
        assert_eq!(
            policy.cooldown_for(FailureClass::Persistence, None),
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn access_denied_and_zero_policies_do_not_pause() {
        let policy = CooldownPolicy::default();
        assert_eq!(policy.cooldown_for(FailureClass::AccessDenied, None), None);
        assert_eq!(
            CooldownPolicy::none().cooldown_for(FailureClass::RateLimited, None),
            None
        );
    }
}
