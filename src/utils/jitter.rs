//! Randomized durations for cache expiry
//!
//! Entries written at the same moment (a burst of first requests after a
//! deploy, say) must not all expire at the same moment later. Every TTL
//! drawn here is uniform within its window.

use rand::Rng;
use std::time::Duration;

/// Draw a duration uniformly from `[min, max]` at one-second resolution
///
/// # Examples
/// ```
/// use icon_proxy::utils::jitter::jittered_duration;
/// use std::time::Duration;
///
/// let ttl = jittered_duration(Duration::from_secs(60), Duration::from_secs(120));
/// assert!(ttl >= Duration::from_secs(60) && ttl <= Duration::from_secs(120));
/// ```
pub fn jittered_duration(min: Duration, max: Duration) -> Duration {
    let (low, high) = (min.as_secs(), max.as_secs());
    if low >= high {
        return Duration::from_secs(low);
    }
    Duration::from_secs(rand::rng().random_range(low..=high))
}

/// Draw a whole number of days uniformly from `[min_days, max_days]`
pub fn random_whole_days(min_days: u64, max_days: u64) -> Duration {
    let days = if min_days >= max_days {
        min_days
    } else {
        rand::rng().random_range(min_days..=max_days)
    };
    Duration::from_secs(days * 86_400)
}
