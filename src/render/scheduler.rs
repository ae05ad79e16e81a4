use std::time::{Duration, Instant};

/// Proof that a tick was due for a particular schedule.
///
/// Running a token whose schedule has since been cancelled is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickToken {
    generation: u64,
}

/// Fixed-period recurring tick, polled from a single execution context.
#[derive(Clone, Debug)]
pub struct TickSchedule {
    generation: u64,
    interval: Duration,
    next_due: Instant,
}

impl TickSchedule {
    pub fn start(generation: u64, interval: Duration, now: Instant) -> Self {
        Self {
            generation,
            interval,
            next_due: now + interval,
        }
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn due(&self, now: Instant) -> Option<TickToken> {
        (now >= self.next_due).then_some(TickToken {
            generation: self.generation,
        })
    }

    pub fn accepts(&self, token: TickToken) -> bool {
        token.generation == self.generation
    }

    /// Moves to the next period. A schedule that fell more than one period
    /// behind re-bases on `now` rather than firing a burst of late ticks.
    pub fn advance(&mut self, now: Instant) {
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_interval() {
        let t0 = Instant::now();
        let period = Duration::from_millis(40);
        let mut schedule = TickSchedule::start(1, period, t0);
        assert!(schedule.due(t0).is_none());
        assert!(schedule.due(t0 + Duration::from_millis(39)).is_none());
        let token = schedule.due(t0 + period).unwrap();
        assert!(schedule.accepts(token));
        schedule.advance(t0 + period);
        assert_eq!(schedule.next_due(), t0 + period * 2);
    }

    #[test]
    fn late_schedule_rebases_instead_of_bursting() {
        let t0 = Instant::now();
        let period = Duration::from_millis(40);
        let mut schedule = TickSchedule::start(1, period, t0);
        let late = t0 + Duration::from_millis(500);
        schedule.advance(late);
        assert_eq!(schedule.next_due(), late + period);
    }

    #[test]
    fn tokens_from_other_generations_are_refused() {
        let t0 = Instant::now();
        let old = TickSchedule::start(1, Duration::from_millis(10), t0);
        let token = old.due(t0 + Duration::from_millis(10)).unwrap();
        let fresh = TickSchedule::start(2, Duration::from_millis(10), t0);
        assert!(!fresh.accepts(token));
    }
}
