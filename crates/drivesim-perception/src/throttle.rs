//! [`Throttle`] – leading + trailing edge rate limiter.
//!
//! A pure state machine; it owns no timer.  The host feeds it the current
//! time on every [`request`][Throttle::request] and fires
//! [`poll`][Throttle::poll] when [`next_deadline`][Throttle::next_deadline]
//! comes due.
//!
//! ```text
//!            request            request (mid-window)
//!   Idle ──────────────► Cooling ───────────────────► Scheduled(latest)
//!    ▲    emit now          │ ▲                          │
//!    │                      │ │ poll ≥ deadline:         │
//!    └── poll ≥ deadline ───┘ └── emit latest, restart ──┘
//! ```
//!
//! At most one value is emitted per window.  A burst emits its first value
//! immediately and its last value when the window closes.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use drivesim_perception::throttle::Throttle;
//!
//! let ms = Duration::from_millis;
//! let mut t = Throttle::new(ms(50));
//! assert_eq!(t.request(ms(0), 'a'), Some('a'));
//! assert_eq!(t.request(ms(10), 'b'), None);
//! assert_eq!(t.request(ms(30), 'c'), None);
//! assert_eq!(t.next_deadline(), Some(ms(50)));
//! assert_eq!(t.poll(ms(50)), Some('c'));
//! ```

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum State<T> {
    Idle,
    /// A value was emitted; the window is still open with nothing pending.
    Cooling { deadline: Duration },
    /// The window is open and `value` is waiting for its trailing emit.
    Scheduled { value: T, deadline: Duration },
}

#[derive(Debug, Clone)]
pub struct Throttle<T> {
    window: Duration,
    state: State<T>,
}

impl<T> Throttle<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: State::Idle,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Offer `value` at time `now`.  Returns it back when it should be
    /// delivered immediately; otherwise it is held (replacing any older
    /// pending value) for the trailing edge.
    pub fn request(&mut self, now: Duration, value: T) -> Option<T> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Cooling { deadline } | State::Scheduled { deadline, .. } if now < deadline => {
                self.state = State::Scheduled { value, deadline };
                None
            }
            // Idle, or the window already lapsed without a poll: a newer value
            // supersedes anything pending.
            _ => {
                self.state = State::Cooling {
                    deadline: now + self.window,
                };
                Some(value)
            }
        }
    }

    /// Advance the timer to `now`.  Returns the trailing value when the
    /// window has closed with one pending.
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Scheduled { value, deadline } if now >= deadline => {
                self.state = State::Cooling {
                    deadline: now + self.window,
                };
                Some(value)
            }
            State::Cooling { deadline } if now >= deadline => None,
            other => {
                self.state = other;
                None
            }
        }
    }

    /// When the host timer must next fire, if a trailing value is pending.
    pub fn next_deadline(&self) -> Option<Duration> {
        match self.state {
            State::Scheduled { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    /// True when no window is open.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Drop any pending value and close the window.  Returns the dropped
    /// value.
    pub fn cancel(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Scheduled { value, .. } => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn burst_yields_leading_and_trailing_only() {
        let mut t = Throttle::new(ms(50));
        let mut emitted = Vec::new();
        for at in [0, 10, 20, 30] {
            if let Some(v) = t.request(ms(at), at) {
                emitted.push((at, v));
            }
        }
        let deadline = t.next_deadline().unwrap();
        assert_eq!(deadline, ms(50));
        if let Some(v) = t.poll(deadline) {
            emitted.push((50, v));
        }
        assert_eq!(emitted, vec![(0, 0), (50, 30)]);

        // Window restarted at the trailing emit; nothing else pending.
        assert_eq!(t.next_deadline(), None);
        assert_eq!(t.poll(ms(100)), None);
        assert!(t.is_idle());
    }

    #[test]
    fn single_request_has_no_trailing_emit() {
        let mut t = Throttle::new(ms(50));
        assert_eq!(t.request(ms(0), 1), Some(1));
        assert_eq!(t.next_deadline(), None);
        assert_eq!(t.poll(ms(50)), None);
        assert!(t.is_idle());
    }

    #[test]
    fn request_after_idle_fires_immediately() {
        let mut t = Throttle::new(ms(50));
        t.request(ms(0), 1);
        t.poll(ms(50));
        assert_eq!(t.request(ms(200), 2), Some(2));
    }

    #[test]
    fn request_during_post_trailing_window_is_deferred() {
        let mut t = Throttle::new(ms(50));
        t.request(ms(0), 1);
        t.request(ms(10), 2);
        assert_eq!(t.poll(ms(50)), Some(2));
        assert_eq!(t.request(ms(60), 3), None);
        assert_eq!(t.next_deadline(), Some(ms(100)));
        assert_eq!(t.poll(ms(99)), None);
        assert_eq!(t.poll(ms(100)), Some(3));
    }

    #[test]
    fn steady_stream_never_exceeds_rate() {
        let mut t = Throttle::new(ms(50));
        let mut emits = Vec::new();
        for now in (0..=500).step_by(5) {
            if let Some(d) = t.next_deadline() {
                if ms(now) >= d {
                    if t.poll(ms(now)).is_some() {
                        emits.push(now);
                    }
                }
            }
            if t.request(ms(now), now).is_some() {
                emits.push(now);
            }
        }
        for pair in emits.windows(2) {
            assert!(pair[1] - pair[0] >= 50, "emits too close: {pair:?}");
        }
        assert!(emits.len() >= 10);
    }

    #[test]
    fn late_request_supersedes_missed_trailing() {
        let mut t = Throttle::new(ms(50));
        t.request(ms(0), 1);
        t.request(ms(10), 2);
        // Host never fired the timer; a newer value arrives after the window.
        assert_eq!(t.request(ms(80), 3), Some(3));
        assert_eq!(t.next_deadline(), None);
    }

    #[test]
    fn cancel_drops_pending_value() {
        let mut t = Throttle::new(ms(50));
        t.request(ms(0), 1);
        t.request(ms(10), 2);
        assert_eq!(t.cancel(), Some(2));
        assert!(t.is_idle());
        assert_eq!(t.poll(ms(50)), None);
    }

    #[test]
    fn zero_window_passes_everything() {
        let mut t = Throttle::new(Duration::ZERO);
        assert_eq!(t.request(ms(0), 1), Some(1));
        assert_eq!(t.request(ms(0), 2), Some(2));
    }
}
