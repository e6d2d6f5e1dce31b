use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

/// Per-user throttle for the channel-listing command. Owned by whichever
/// command surface needs it and passed in explicitly; in-memory only, so a
/// restart clears it. Callers exempt privileged users by not consulting it.
pub struct CooldownTracker {
    window: TimeDelta,
    last_seen: HashMap<i64, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window: TimeDelta::seconds(window_secs.try_into().unwrap_or(i64::MAX)),
            last_seen: HashMap::new(),
        }
    }

    /// Whether `user_id` may act at `now`. An allowed action is recorded;
    /// a refused one is not, so the window counts from the last allowed use.
    pub fn check_and_update(&mut self, user_id: i64, now: DateTime<Utc>) -> bool {
        let allowed = self
            .last_seen
            .get(&user_id)
            .is_none_or(|last| now - *last >= self.window);
        if allowed {
            self.last_seen.insert(user_id, now);
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn first_use_is_allowed() {
        let mut tracker = CooldownTracker::new(60);
        assert!(tracker.check_and_update(1, at(0)));
    }

    #[test]
    fn repeat_within_window_is_refused() {
        let mut tracker = CooldownTracker::new(60);
        assert!(tracker.check_and_update(1, at(0)));
        assert!(!tracker.check_and_update(1, at(59)));
    }

    #[test]
    fn repeat_after_window_is_allowed() {
        let mut tracker = CooldownTracker::new(60);
        assert!(tracker.check_and_update(1, at(0)));
        assert!(tracker.check_and_update(1, at(60)));
    }

    #[test]
    fn refused_attempt_does_not_extend_the_window() {
        let mut tracker = CooldownTracker::new(60);
        assert!(tracker.check_and_update(1, at(0)));
        assert!(!tracker.check_and_update(1, at(30)));
        // Counts from the allowed use at t=0, not the refusal at t=30.
        assert!(tracker.check_and_update(1, at(60)));
    }

    #[test]
    fn users_are_tracked_independently() {
        let mut tracker = CooldownTracker::new(60);
        assert!(tracker.check_and_update(1, at(0)));
        assert!(tracker.check_and_update(2, at(1)));
        assert!(!tracker.check_and_update(1, at(2)));
    }

    #[test]
    fn zero_window_never_refuses() {
        let mut tracker = CooldownTracker::new(0);
        assert!(tracker.check_and_update(1, at(0)));
        assert!(tracker.check_and_update(1, at(0)));
    }
}
