//! Cancellable timers driven by a caller-supplied clock
//!
//! Nothing here sleeps. The owner calls `poll(now)` from its event loop (the TUI
//! tick) and acts when a timer reports it fired, which lets tests advance time
//! by handing in later `Instant`s.

use std::time::{Duration, Instant};

/// One-shot timer; rescheduling replaces the pending deadline
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `delay` after `now`, dropping any earlier deadline
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True exactly once, on the first poll at or after the deadline
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Recurring timer
#[derive(Debug, Clone, Default)]
pub struct IntervalTimer {
    period: Option<Duration>,
    next: Option<Instant>,
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking every `period`, replacing any running schedule
    pub fn start(&mut self, now: Instant, period: Duration) {
        self.period = Some(period);
        self.next = Some(now + period);
    }

    pub fn cancel(&mut self) {
        self.period = None;
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.period.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// True when a tick is due. Missed ticks collapse into one and the next
    /// tick is scheduled a full period after `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match (self.period, self.next) {
            (Some(period), Some(next)) if now >= next => {
                self.next = Some(now + period);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debouncer_fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();

        debouncer.schedule(start, Duration::from_millis(300));
        debouncer.schedule(start + Duration::from_millis(200), Duration::from_millis(300));

        assert!(!debouncer.poll(start + Duration::from_millis(400)));
        assert!(debouncer.poll(start + Duration::from_millis(500)));
        assert!(!debouncer.poll(start + Duration::from_millis(900)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_cancelled_debouncer_never_fires() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();
        debouncer.schedule(start, Duration::from_millis(10));
        debouncer.cancel();
        assert!(!debouncer.poll(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_interval_ticks_and_collapses_missed_ticks() {
        let start = Instant::now();
        let mut timer = IntervalTimer::new();
        timer.start(start, Duration::from_secs(5));

        assert!(!timer.poll(start + Duration::from_secs(4)));
        assert!(timer.poll(start + Duration::from_secs(5)));
        // long stall: one tick, not three
        assert!(timer.poll(start + Duration::from_secs(21)));
        assert!(!timer.poll(start + Duration::from_secs(22)));
        assert!(timer.poll(start + Duration::from_secs(26)));

        timer.cancel();
        assert!(!timer.is_running());
        assert!(!timer.poll(start + Duration::from_secs(60)));
    }
}
