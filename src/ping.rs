//! Ping/pong liveness tracking.
//!
//! The tracker never touches a clock itself; callers pass `now` in. After
//! `interval` without inbound data a PING is due. If nothing at all arrives
//! within `timeout` of sending it, the connection is considered dead.

use std::time::{Duration, Instant};

/// What the caller should do after [`PingTracker::poll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PingAction {
    /// Nothing to do.
    Idle,
    /// Send a liveness PING.
    SendPing,
    /// The server stopped talking; close the transport.
    TimedOut,
}

#[derive(Clone, Debug)]
struct Pending {
    token: String,
    sent: Instant,
}

/// Timer state for one connection.
#[derive(Clone, Debug)]
pub struct PingTracker {
    interval: Duration,
    timeout: Duration,
    last_activity: Option<Instant>,
    pending: Option<Pending>,
    counter: u64,
}

impl PingTracker {
    /// New tracker; idle until the first [`activity`](Self::activity).
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            last_activity: None,
            pending: None,
            counter: 0,
        }
    }

    /// Record inbound data.
    pub fn activity(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Decide whether a PING is due or the connection timed out.
    pub fn poll(&mut self, now: Instant) -> PingAction {
        let Some(last) = self.last_activity else {
            return PingAction::Idle;
        };

        if let Some(pending) = &self.pending {
            if now.saturating_duration_since(pending.sent) < self.timeout {
                return PingAction::Idle;
            }
            if last <= pending.sent {
                return PingAction::TimedOut;
            }
            // Data kept flowing but the PONG never came; try again later.
            self.pending = None;
        }

        if now.saturating_duration_since(last) >= self.interval {
            PingAction::SendPing
        } else {
            PingAction::Idle
        }
    }

    /// Register an outgoing PING and return its token.
    pub fn start(&mut self, now: Instant) -> String {
        self.counter += 1;
        let token = format!("slirc-{}", self.counter);
        self.pending = Some(Pending {
            token: token.clone(),
            sent: now,
        });
        token
    }

    /// Time since the outstanding PING was sent.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|p| now.saturating_duration_since(p.sent))
    }

    /// Match a PONG token. Returns the lag when it answers our PING.
    pub fn pong(&mut self, token: &str, now: Instant) -> Option<Duration> {
        match &self.pending {
            Some(p) if p.token == token => {
                let lag = now.saturating_duration_since(p.sent);
                self.pending = None;
                Some(lag)
            }
            _ => None,
        }
    }

    /// True while a PING is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn test_idle_until_activity() {
        let mut tracker = PingTracker::new(10 * SEC, 5 * SEC);
        let t0 = Instant::now();
        assert_eq!(tracker.poll(t0 + 100 * SEC), PingAction::Idle);
        tracker.activity(t0);
        assert_eq!(tracker.poll(t0 + 5 * SEC), PingAction::Idle);
        assert_eq!(tracker.poll(t0 + 10 * SEC), PingAction::SendPing);
    }

    #[test]
    fn test_pong_measures_lag() {
        let mut tracker = PingTracker::new(10 * SEC, 5 * SEC);
        let t0 = Instant::now();
        tracker.activity(t0);
        let token = tracker.start(t0 + 10 * SEC);
        assert!(tracker.is_pending());
        assert_eq!(tracker.pong("other", t0 + 11 * SEC), None);
        assert_eq!(tracker.pong(&token, t0 + 12 * SEC), Some(2 * SEC));
        assert!(!tracker.is_pending());
    }

    #[test]
    fn test_timeout_needs_silence() {
        let t0 = Instant::now();
        let mut tracker = PingTracker::new(10 * SEC, 5 * SEC);
        tracker.activity(t0);
        tracker.start(t0 + 10 * SEC);
        assert_eq!(tracker.poll(t0 + 12 * SEC), PingAction::Idle);
        assert_eq!(tracker.poll(t0 + 15 * SEC), PingAction::TimedOut);

        let mut tracker = PingTracker::new(10 * SEC, 5 * SEC);
        tracker.activity(t0);
        tracker.start(t0 + 10 * SEC);
        tracker.activity(t0 + 11 * SEC);
        assert_eq!(tracker.poll(t0 + 15 * SEC), PingAction::Idle);
        assert!(!tracker.is_pending());
        assert_eq!(tracker.poll(t0 + 21 * SEC), PingAction::SendPing);
    }
}
