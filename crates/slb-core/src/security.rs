use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::domain::UserId;

// ============== Authorization ==============

/// An empty allowlist means the bot is open to everyone; otherwise the
/// sender must be on it. Senderless updates are never authorized.
pub fn is_authorized(user_id: Option<UserId>, allowed_users: &[i64]) -> bool {
    if allowed_users.is_empty() {
        return true;
    }
    match user_id {
        Some(id) => allowed_users.contains(&id.0),
        None => false,
    }
}

// ============== Rate Limiter (Token Bucket) ==============

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    updated: Instant,
}

/// Per-user token bucket: `max_requests` per `window`, refilled continuously.
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    capacity: f64,
    refill_per_sec: f64,
    buckets: HashMap<UserId, Bucket>,
}

impl RateLimiter {
    pub fn new(enabled: bool, max_requests: u32, window: Duration) -> Self {
        let capacity = f64::from(max_requests);
        Self {
            enabled,
            capacity,
            refill_per_sec: capacity / window.as_secs_f64().max(1e-9),
            buckets: HashMap::new(),
        }
    }

    /// `None` if the request may proceed, `Some(wait)` if it is limited.
    pub fn check(&mut self, user: UserId) -> Option<Duration> {
        self.check_at(user, Instant::now())
    }

    pub fn check_at(&mut self, user: UserId, now: Instant) -> Option<Duration> {
        if !self.enabled {
            return None;
        }

        let bucket = self.buckets.entry(user).or_insert(Bucket {
            tokens: self.capacity,
            updated: now,
        });

        let elapsed = now.duration_since(bucket.updated).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.updated = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return None;
        }

        let secs = (1.0 - bucket.tokens) / self.refill_per_sec;
        Some(Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allowlist_is_open() {
        assert!(is_authorized(Some(UserId(42)), &[]));
        assert!(!is_authorized(Some(UserId(42)), &[1, 2]));
        assert!(is_authorized(Some(UserId(2)), &[1, 2]));
        assert!(!is_authorized(None, &[1]));
        // A senderless update against an open bot is still fine.
        assert!(is_authorized(None, &[]));
    }

    #[test]
    fn limiter_refills_over_time() {
        let start = Instant::now();
        let mut rl = RateLimiter::new(true, 2, Duration::from_secs(10));
        let u = UserId(1);

        assert!(rl.check_at(u, start).is_none());
        assert!(rl.check_at(u, start).is_none());
        let wait = rl.check_at(u, start).expect("third request is limited");
        assert!(wait > Duration::ZERO);

        // 2 tokens / 10s: one token back after 5 seconds.
        assert!(rl.check_at(u, start + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn limiter_is_per_user_and_can_be_disabled() {
        let start = Instant::now();
        let mut rl = RateLimiter::new(true, 1, Duration::from_secs(60));
        assert!(rl.check_at(UserId(1), start).is_none());
        assert!(rl.check_at(UserId(1), start).is_some());
        assert!(rl.check_at(UserId(2), start).is_none());

        let mut off = RateLimiter::new(false, 1, Duration::from_secs(60));
        for _ in 0..10 {
            assert!(off.check_at(UserId(1), start).is_none());
        }
    }
}
