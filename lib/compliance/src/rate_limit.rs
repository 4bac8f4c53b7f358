//! Run-rate limiting per account and platform.
//!
//! Keeps an account from dispatching more runs against a platform than the
//! platform tolerates. Windows are fixed: the count resets once a full
//! window has passed since the first run in it.

use chrono::{DateTime, Duration, Utc};
use postflow_core::{AccountId, Platform};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// A run limit for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLimit {
    /// Maximum runs per window.
    pub max_runs: u32,
    /// Window duration in seconds.
    pub window_seconds: u32,
}

impl RunLimit {
    #[must_use]
    pub fn new(max_runs: u32, window_seconds: u32) -> Self {
        Self {
            max_runs,
            window_seconds,
        }
    }

    #[must_use]
    pub fn per_hour(max_runs: u32) -> Self {
        Self::new(max_runs, 3600)
    }

    #[must_use]
    pub fn per_day(max_runs: u32) -> Self {
        Self::new(max_runs, 86400)
    }

    fn window(&self) -> Duration {
        Duration::seconds(i64::from(self.window_seconds))
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// No limit applies to the requested platforms.
    Unlimited,
    /// The run is allowed.
    Allowed {
        /// Runs left in the tightest window.
        remaining: u32,
        resets_at: DateTime<Utc>,
    },
    /// A limit is exhausted.
    Exceeded {
        platform: Platform,
        retry_after: Duration,
        resets_at: DateTime<Utc>,
    },
}

impl RateLimitResult {
    /// Returns true if the run may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Exceeded { .. })
    }
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: DateTime<Utc>,
}

/// A fixed-window limiter keyed by `(account, platform)`.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RunRateLimiter {
    limits: BTreeMap<Platform, RunLimit>,
    state: Arc<Mutex<HashMap<(AccountId, Platform), WindowState>>>,
}

impl RunRateLimiter {
    #[must_use]
    pub fn new(limits: BTreeMap<Platform, RunLimit>) -> Self {
        Self {
            limits,
            state: Arc::default(),
        }
    }

    /// Takes one run from every listed platform's window, or none.
    pub fn try_acquire(&self, account_id: AccountId, platforms: &[Platform]) -> RateLimitResult {
        self.try_acquire_at(account_id, platforms, Utc::now())
    }

    /// Like [`Self::try_acquire`], at an explicit instant.
    ///
    /// All windows are checked before any is charged, so a run rejected on
    /// one platform does not consume quota on another.
    pub fn try_acquire_at(
        &self,
        account_id: AccountId,
        platforms: &[Platform],
        now: DateTime<Utc>,
    ) -> RateLimitResult {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut limited: Vec<(Platform, RunLimit)> = platforms
            .iter()
            .filter_map(|p| self.limits.get(p).map(|limit| (*p, *limit)))
            .collect();
        limited.sort_by_key(|(platform, _)| *platform);
        limited.dedup_by_key(|(platform, _)| *platform);
        if limited.is_empty() {
            return RateLimitResult::Unlimited;
        }

        for (platform, limit) in &limited {
            let window = state
                .entry((account_id, *platform))
                .or_insert_with(|| WindowState {
                    count: 0,
                    window_start: now,
                });
            if now - window.window_start >= limit.window() {
                window.window_start = now;
                window.count = 0;
            }
            if window.count >= limit.max_runs {
                let resets_at = window.window_start + limit.window();
                debug!(%account_id, %platform, %resets_at, "run limit exceeded");
                return RateLimitResult::Exceeded {
                    platform: *platform,
                    retry_after: resets_at - now,
                    resets_at,
                };
            }
        }

        let mut remaining = u32::MAX;
        let mut resets_at = now;
        for (platform, limit) in &limited {
            if let Some(window) = state.get_mut(&(account_id, *platform)) {
                window.count += 1;
                let left = limit.max_runs - window.count;
                if left <= remaining {
                    remaining = left;
                    resets_at = window.window_start + limit.window();
                }
            }
        }

        RateLimitResult::Allowed {
            remaining,
            resets_at,
        }
    }

    /// Returns one run to every listed platform's window.
    ///
    /// Undoes a successful [`Self::try_acquire`] for a run that was never
    /// dispatched. Counts never go below zero.
    pub fn release(&self, account_id: AccountId, platforms: &[Platform]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut limited: Vec<Platform> = platforms
            .iter()
            .copied()
            .filter(|p| self.limits.contains_key(p))
            .collect();
        limited.sort();
        limited.dedup();
        for platform in limited {
            if let Some(window) = state.get_mut(&(account_id, platform)) {
                window.count = window.count.saturating_sub(1);
            }
        }
    }

    /// Forgets all windows for an account.
    pub fn reset(&self, account_id: AccountId) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.retain(|(account, _), _| *account != account_id);
    }

    #[must_use]
    pub fn limits(&self) -> &BTreeMap<Platform, RunLimit> {
        &self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_runs: u32) -> RunRateLimiter {
        RunRateLimiter::new(BTreeMap::from([(Platform::X, RunLimit::per_hour(max_runs))]))
    }

    #[test]
    fn allows_under_limit() {
        let limiter = limiter(3);
        let account = AccountId::new();

        for expected in (0..3).rev() {
            match limiter.try_acquire(account, &[Platform::X]) {
                RateLimitResult::Allowed { remaining, .. } => assert_eq!(remaining, expected),
                other => panic!("expected Allowed, got {other:?}"),
            }
        }
    }

    #[test]
    fn release_returns_quota() {
        let limiter = limiter(1);
        let account = AccountId::new();

        assert!(limiter.try_acquire(account, &[Platform::X]).is_allowed());
        assert!(!limiter.try_acquire(account, &[Platform::X]).is_allowed());

        limiter.release(account, &[Platform::X, Platform::X]);
        assert!(limiter.try_acquire(account, &[Platform::X]).is_allowed());

        // Unlimited platforms and unknown accounts are ignored.
        limiter.release(AccountId::new(), &[Platform::Instagram]);
    }

    #[test]
    fn blocks_over_limit() {
        let limiter = limiter(2);
        let account = AccountId::new();
        let now = Utc::now();

        assert!(limiter.try_acquire_at(account, &[Platform::X], now).is_allowed());
        assert!(limiter.try_acquire_at(account, &[Platform::X], now).is_allowed());

        let result = limiter.try_acquire_at(account, &[Platform::X], now);
        assert_eq!(
            result,
            RateLimitResult::Exceeded {
                platform: Platform::X,
                retry_after: Duration::seconds(3600),
                resets_at: now + Duration::seconds(3600),
            }
        );
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = limiter(1);
        let account = AccountId::new();
        let start = Utc::now();

        assert!(limiter.try_acquire_at(account, &[Platform::X], start).is_allowed());
        assert!(!limiter.try_acquire_at(account, &[Platform::X], start + Duration::minutes(59)).is_allowed());
        assert!(limiter.try_acquire_at(account, &[Platform::X], start + Duration::hours(1)).is_allowed());
    }

    #[test]
    fn accounts_are_isolated() {
        let limiter = limiter(1);
        let first = AccountId::new();
        let second = AccountId::new();

        assert!(limiter.try_acquire(first, &[Platform::X]).is_allowed());
        assert!(!limiter.try_acquire(first, &[Platform::X]).is_allowed());
        assert!(limiter.try_acquire(second, &[Platform::X]).is_allowed());
    }

    #[test]
    fn unlimited_platforms_pass() {
        let limiter = limiter(1);
        let account = AccountId::new();
        assert_eq!(
            limiter.try_acquire(account, &[Platform::Instagram]),
            RateLimitResult::Unlimited
        );
        assert_eq!(limiter.try_acquire(account, &[]), RateLimitResult::Unlimited);
    }

    #[test]
    fn rejected_run_charges_nothing() {
        let limiter = RunRateLimiter::new(BTreeMap::from([
            (Platform::X, RunLimit::per_hour(1)),
            (Platform::Linkedin, RunLimit::per_hour(5)),
        ]));
        let account = AccountId::new();
        let now = Utc::now();

        assert!(limiter.try_acquire_at(account, &[Platform::X], now).is_allowed());
        assert!(!limiter.try_acquire_at(account, &[Platform::Linkedin, Platform::X], now).is_allowed());

        match limiter.try_acquire_at(account, &[Platform::Linkedin], now) {
            RateLimitResult::Allowed { remaining, .. } => assert_eq!(remaining, 4),
            other => panic!("expected Allowed, got {other:?}"),
        }
    }

    #[test]
    fn reset_clears_account_windows() {
        let limiter = limiter(1);
        let account = AccountId::new();

        assert!(limiter.try_acquire(account, &[Platform::X]).is_allowed());
        limiter.reset(account);
        assert!(limiter.try_acquire(account, &[Platform::X]).is_allowed());
    }
}
