// Adaptive polling scheduler
//
// The next poll wait scales with how recently the last event arrived:
// an active conversation polls quickly, a dormant one backs off toward
// the maximum. The scheduler owns a single deadline that the engine's
// drive loop sleeps on; re-scheduling always replaces it, so timers never
// stack.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// Compute the adaptive wait: half the age of the most recent event,
/// clamped to the configured bounds.
pub fn compute_wait(
    now: DateTime<Utc>,
    last_event: Option<DateTime<Utc>>,
    min: Duration,
    max: Duration,
) -> Duration {
    let Some(last) = last_event else {
        return max;
    };
    let age_ms = (now - last).num_milliseconds().max(0) as u64;
    Duration::from_millis(age_ms / 2).clamp(min, max)
}

/// Owns the single pending poll deadline
#[derive(Debug)]
pub struct RefreshScheduler {
    min: Duration,
    max: Duration,
    deadline: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            deadline: None,
        }
    }

    /// Arm the next poll. An explicit wait (manual refresh) bypasses the
    /// adaptive formula once; either way any previously pending deadline
    /// is replaced, never stacked.
    pub fn schedule(&mut self, explicit: Option<Duration>, last_event: Option<DateTime<Utc>>) {
        let wait = explicit.unwrap_or_else(|| compute_wait(Utc::now(), last_event, self.min, self.max));
        tracing::debug!(wait_ms = wait.as_millis() as u64, "poll scheduled");
        self.deadline = Some(Instant::now() + wait);
    }

    /// Push the pending deadline back by the minimum wait; used when the
    /// deadline fires while a poll is still in flight.
    pub fn defer(&mut self) {
        tracing::debug!("poll deferred, previous poll still in flight");
        self.deadline = Some(Instant::now() + self.min);
    }

    /// Disarm the pending deadline
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MIN: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(60);

    #[test]
    fn wait_is_half_the_event_age() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let last = Utc.timestamp_opt(1_000 - 20, 0).unwrap();
        assert_eq!(compute_wait(now, Some(last), MIN, MAX), Duration::from_secs(10));
    }

    #[test]
    fn wait_is_always_within_bounds() {
        let now = Utc.timestamp_opt(1_000_000, 0).unwrap();
        for age_s in [0i64, 1, 2, 59, 1_000, 100_000, 10_000_000] {
            let last = now - chrono::Duration::seconds(age_s);
            let wait = compute_wait(now, Some(last), MIN, MAX);
            assert!(wait >= MIN, "age {age_s}: {wait:?} below min");
            assert!(wait <= MAX, "age {age_s}: {wait:?} above max");
        }
        // Future-dated last event clamps to the minimum rather than underflowing
        let future = now + chrono::Duration::seconds(30);
        assert_eq!(compute_wait(now, Some(future), MIN, MAX), MIN);
        // No events at all backs off fully
        assert_eq!(compute_wait(now, None, MIN, MAX), MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduling_replaces_the_pending_deadline() {
        let mut scheduler = RefreshScheduler::new(MIN, MAX);
        scheduler.schedule(Some(Duration::from_secs(30)), None);
        let first = scheduler.deadline().unwrap();

        scheduler.schedule(Some(Duration::from_secs(2)), None);
        let second = scheduler.deadline().unwrap();
        assert!(second < first);

        // Only one deadline exists; firing consumes it
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(scheduler.fire_due(Instant::now()));
        assert!(!scheduler.fire_due(Instant::now()));
        assert!(scheduler.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn defer_pushes_the_deadline_back() {
        let mut scheduler = RefreshScheduler::new(MIN, MAX);
        scheduler.schedule(Some(Duration::from_millis(0)), None);
        assert!(scheduler.fire_due(Instant::now()));

        scheduler.defer();
        assert!(!scheduler.fire_due(Instant::now()));
        tokio::time::advance(MIN).await;
        assert!(scheduler.fire_due(Instant::now()));
    }

    #[test]
    fn cancel_disarms() {
        let mut scheduler = RefreshScheduler::new(MIN, MAX);
        scheduler.schedule(None, None);
        scheduler.cancel();
        assert!(scheduler.deadline().is_none());
    }
}
