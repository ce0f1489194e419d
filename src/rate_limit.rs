use std::time::Duration;

const SECOND: Duration = Duration::from_secs(1);

/// Whole-second countdown gating one control.
///
/// The countdown is driven by [`Cooldown::advance`] from the event loop, so a
/// test can simulate time by feeding durations. Starting an active cooldown
/// restarts it; there is never more than one countdown per instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cooldown {
    period_secs: u32,
    remaining: u32,
    carry: Duration,
}

impl Cooldown {
    pub fn new(period_secs: u32) -> Self {
        Self {
            period_secs,
            remaining: 0,
            carry: Duration::ZERO,
        }
    }

    pub fn start(&mut self) {
        self.remaining = self.period_secs;
        self.carry = Duration::ZERO;
    }

    pub fn cancel(&mut self) {
        self.remaining = 0;
        self.carry = Duration::ZERO;
    }

    /// Returns true when the visible remaining count changed.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.carry += elapsed;
        let before = self.remaining;
        while self.carry >= SECOND && self.remaining > 0 {
            self.carry -= SECOND;
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            self.carry = Duration::ZERO;
        }
        before != self.remaining
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Control label: the countdown while active, `idle` otherwise.
    pub fn label(&self, idle: &str) -> String {
        if self.is_active() {
            format!("Wait {}s", self.remaining)
        } else {
            idle.to_string()
        }
    }
}

/// One-shot timer. Arming replaces any pending deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delay {
    period: Duration,
    pending: Option<Duration>,
}

impl Delay {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            pending: None,
        }
    }

    pub fn arm(&mut self) {
        self.pending = Some(self.period);
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns true exactly once, on the advance that crosses the deadline.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        let Some(left) = self.pending else {
            return false;
        };
        if elapsed >= left {
            self.pending = None;
            true
        } else {
            self.pending = Some(left - elapsed);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_counts_down_per_second() {
        let mut cooldown = Cooldown::new(60);
        cooldown.start();
        assert_eq!(cooldown.remaining(), 60);
        assert_eq!(cooldown.label("Send"), "Wait 60s");

        for _ in 0..59 {
            assert!(cooldown.advance(SECOND));
        }
        assert_eq!(cooldown.remaining(), 1);
        assert!(cooldown.advance(SECOND));
        assert!(!cooldown.is_active());
        assert_eq!(cooldown.label("Send"), "Send");
        assert!(!cooldown.advance(SECOND));
    }

    #[test]
    fn cooldown_accumulates_partial_ticks() {
        let mut cooldown = Cooldown::new(3);
        cooldown.start();
        assert!(!cooldown.advance(Duration::from_millis(400)));
        assert!(!cooldown.advance(Duration::from_millis(400)));
        assert!(cooldown.advance(Duration::from_millis(400)));
        assert_eq!(cooldown.remaining(), 2);
        assert!(cooldown.advance(Duration::from_secs(10)));
        assert_eq!(cooldown.remaining(), 0);
    }

    #[test]
    fn restarting_cooldown_replaces_previous_countdown() {
        let mut cooldown = Cooldown::new(30);
        cooldown.start();
        cooldown.advance(Duration::from_millis(10_500));
        cooldown.start();
        assert_eq!(cooldown.remaining(), 30);
        cooldown.advance(Duration::from_millis(600));
        assert_eq!(cooldown.remaining(), 30);
    }

    #[test]
    fn delay_fires_once() {
        let mut delay = Delay::new(Duration::from_secs(3));
        delay.arm();
        assert!(!delay.advance(Duration::from_secs(2)));
        delay.arm();
        assert!(!delay.advance(Duration::from_secs(2)));
        assert!(delay.advance(Duration::from_secs(1)));
        assert!(!delay.advance(Duration::from_secs(5)));
        assert!(!delay.is_armed());
    }
}
