//! Single-threaded cooperative tick source
//!
//! At most one timer is armed at a time. Arming always disarms the previous
//! timer first, and every fire carries the id of the timer that produced it,
//! so a fire from a timer that has since been disarmed can be recognised and
//! dropped.

/// What a timer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Pre-roll display ticks
    Display,
    /// Response window deadline
    ResponseTimeout,
    /// Fast-forward resolution ticks
    Resolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// An armed timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timer {
    pub id: TimerId,
    pub kind: TimerKind,
    /// Next fire time (ms on the driver clock)
    pub due_ms: f64,
    /// Repeat interval; `None` for one-shot timers
    pub period_ms: Option<f64>,
}

/// A timer fire delivered to the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerFired {
    pub id: TimerId,
    pub kind: TimerKind,
    pub at_ms: f64,
}

#[derive(Debug, Default)]
pub struct TickScheduler {
    active: Option<Timer>,
    next_id: u64,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a repeating timer, first fire one period from `now_ms`
    pub fn arm_interval(&mut self, kind: TimerKind, now_ms: f64, period_ms: f64) -> TimerId {
        self.arm(kind, now_ms + period_ms, Some(period_ms))
    }

    /// Arm a one-shot timer firing `delay_ms` from `now_ms`
    pub fn arm_timeout(&mut self, kind: TimerKind, now_ms: f64, delay_ms: f64) -> TimerId {
        self.arm(kind, now_ms + delay_ms, None)
    }

    fn arm(&mut self, kind: TimerKind, due_ms: f64, period_ms: Option<f64>) -> TimerId {
        if let Some(old) = self.disarm() {
            log::debug!("Replacing armed {:?} timer with {:?}", old.kind, kind);
        }
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.active = Some(Timer {
            id,
            kind,
            due_ms,
            period_ms,
        });
        id
    }

    /// Disarm the active timer (no-op when nothing is armed)
    pub fn disarm(&mut self) -> Option<Timer> {
        self.active.take()
    }

    pub fn active(&self) -> Option<&Timer> {
        self.active.as_ref()
    }

    pub fn is_current(&self, id: TimerId) -> bool {
        self.active.is_some_and(|t| t.id == id)
    }

    /// When the active timer fires next
    pub fn next_due(&self) -> Option<f64> {
        self.active.map(|t| t.due_ms)
    }

    /// Take the fire that is due at `now_ms`, if any.
    ///
    /// Intervals are rescheduled one period later; one-shots disarm.
    pub fn poll(&mut self, now_ms: f64) -> Option<TimerFired> {
        let timer = self.active.as_mut()?;
        if timer.due_ms > now_ms {
            return None;
        }
        let fired = TimerFired {
            id: timer.id,
            kind: timer.kind,
            at_ms: timer.due_ms,
        };
        if let Some(period) = timer.period_ms {
            timer.due_ms += period;
        } else {
            self.active = None;
        }
        Some(fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_repeats() {
        let mut s = TickScheduler::new();
        let id = s.arm_interval(TimerKind::Display, 0.0, 25.0);
        assert_eq!(s.poll(24.0), None);
        let fired = s.poll(25.0).unwrap();
        assert_eq!(fired.id, id);
        assert_eq!(fired.kind, TimerKind::Display);
        assert_eq!(s.next_due(), Some(50.0));
        assert!(s.is_current(id));
    }

    #[test]
    fn test_timeout_fires_once() {
        let mut s = TickScheduler::new();
        s.arm_timeout(TimerKind::ResponseTimeout, 100.0, 1000.0);
        assert!(s.poll(1100.0).is_some());
        assert!(s.poll(5000.0).is_none());
        assert!(s.active().is_none());
    }

    #[test]
    fn test_arming_replaces_previous() {
        let mut s = TickScheduler::new();
        let first = s.arm_timeout(TimerKind::ResponseTimeout, 0.0, 1000.0);
        let second = s.arm_interval(TimerKind::Resolution, 10.0, 5.0);
        assert_ne!(first, second);
        assert!(!s.is_current(first));
        assert_eq!(s.active().unwrap().kind, TimerKind::Resolution);
    }

    #[test]
    fn test_disarm_is_idempotent() {
        let mut s = TickScheduler::new();
        s.arm_interval(TimerKind::Display, 0.0, 25.0);
        assert!(s.disarm().is_some());
        assert!(s.disarm().is_none());
        assert_eq!(s.next_due(), None);
    }
}
