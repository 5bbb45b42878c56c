//! Timer scheduler: a small fixed set of armed one-shots driving every
//! subsystem IRQ and reload in the system, plus the watchdog.
//!
//! The reference engine keeps this as a short array rather than a generic
//! priority queue — there are never more than a handful of live timers, so a
//! linear scan for the minimum remaining count is both simpler and faster
//! than a heap.

/// Identifies which subsystem a timer callback belongs to. The orchestrator
/// matches on this after `consume()` reports a firing; no boxed closures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Watchdog,
    VideoScanline,
    VideoIrq,
    SoundTimerA,
    SoundTimerB,
    MailboxSlice,
    Rtc,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    kind: TimerKind,
    active: bool,
    remaining: i64,
    /// Cycles to re-arm with after firing, if `repeat` is true.
    period: i64,
    repeat: bool,
}

/// A fixed-capacity scheduler over the timer kinds enumerated above.
pub struct TimerScheduler {
    timers: Vec<Timer>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        let kinds = [
            TimerKind::Watchdog,
            TimerKind::VideoScanline,
            TimerKind::VideoIrq,
            TimerKind::SoundTimerA,
            TimerKind::SoundTimerB,
            TimerKind::MailboxSlice,
            TimerKind::Rtc,
        ];
        Self {
            timers: kinds
                .iter()
                .map(|&kind| Timer {
                    kind,
                    active: false,
                    remaining: 0,
                    period: 0,
                    repeat: false,
                })
                .collect(),
        }
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Timer {
        self.timers.iter_mut().find(|t| t.kind == kind).expect("known timer kind")
    }

    /// Arm (or re-arm) a timer. A `count <= 0` is honored as a single
    /// immediate fire on the next `consume()` call (the `TimerUnderflow`
    /// condition from the design doc), rather than silently dropped.
    pub fn arm(&mut self, kind: TimerKind, count: i64, repeat: bool, period: i64) {
        let t = self.slot(kind);
        t.active = true;
        t.remaining = count.max(0);
        t.repeat = repeat;
        t.period = period;
    }

    pub fn disarm(&mut self, kind: TimerKind) {
        self.slot(kind).active = false;
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.timers.iter().find(|t| t.kind == kind).is_some_and(|t| t.active)
    }

    /// Cycles remaining until the next active timer fires, or `None` if no
    /// timer is armed.
    pub fn next_event(&self) -> Option<u64> {
        self.timers
            .iter()
            .filter(|t| t.active)
            .map(|t| t.remaining.max(0) as u64)
            .min()
    }

    /// Decrement every active timer by `elapsed` master cycles and return
    /// the kinds that crossed zero (fired), re-arming repeating timers with
    /// their configured period.
    pub fn consume(&mut self, elapsed: u64) -> Vec<TimerKind> {
        let mut fired = Vec::new();
        for t in self.timers.iter_mut().filter(|t| t.active) {
            t.remaining -= elapsed as i64;
            if t.remaining <= 0 {
                fired.push(t.kind);
                if t.repeat {
                    t.remaining += t.period.max(1);
                } else {
                    t.active = false;
                }
            }
        }
        fired
    }

    /// Clear every timer, as on `reset()`.
    pub fn clear(&mut self) {
        for t in self.timers.iter_mut() {
            t.active = false;
            t.remaining = 0;
        }
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_exactly_once_per_crossing() {
        let mut s = TimerScheduler::new();
        s.arm(TimerKind::VideoScanline, 10, false, 0);
        assert_eq!(s.next_event(), Some(10));
        let fired = s.consume(5);
        assert!(fired.is_empty());
        let fired = s.consume(5);
        assert_eq!(fired, vec![TimerKind::VideoScanline]);
        assert!(!s.is_active(TimerKind::VideoScanline));
    }

    #[test]
    fn repeating_timer_rearms() {
        let mut s = TimerScheduler::new();
        s.arm(TimerKind::Rtc, 100, true, 100);
        let fired = s.consume(100);
        assert_eq!(fired, vec![TimerKind::Rtc]);
        assert!(s.is_active(TimerKind::Rtc));
        assert_eq!(s.next_event(), Some(100));
    }

    #[test]
    fn zero_count_fires_immediately() {
        let mut s = TimerScheduler::new();
        s.arm(TimerKind::VideoIrq, 0, false, 0);
        let fired = s.consume(1);
        assert_eq!(fired, vec![TimerKind::VideoIrq]);
    }

    #[test]
    fn negative_count_clamped_to_zero_fires_immediately() {
        let mut s = TimerScheduler::new();
        s.arm(TimerKind::VideoIrq, -5, false, 0);
        let fired = s.consume(1);
        assert_eq!(fired, vec![TimerKind::VideoIrq]);
    }

    #[test]
    fn inactive_timers_ignored_by_next_event() {
        let s = TimerScheduler::new();
        assert_eq!(s.next_event(), None);
    }

    #[test]
    fn disarm_stops_future_firing() {
        let mut s = TimerScheduler::new();
        s.arm(TimerKind::Watchdog, 10, false, 0);
        s.disarm(TimerKind::Watchdog);
        let fired = s.consume(100);
        assert!(fired.is_empty());
    }

    #[test]
    fn clear_resets_all() {
        let mut s = TimerScheduler::new();
        s.arm(TimerKind::Watchdog, 10, true, 10);
        s.arm(TimerKind::Rtc, 10, true, 10);
        s.clear();
        assert_eq!(s.next_event(), None);
    }
}
