use crate::{error::ClientResult, game::Mode, notice::Notices, rate_limit::Cooldown};

/// Per-mode double-launch guard. A launch blocks the same mode for the guard
/// period; a failed launch lifts the block immediately.
#[derive(Debug, Clone)]
pub struct LaunchGuard {
    plus: Cooldown,
    plus_up: Cooldown,
}

impl LaunchGuard {
    pub fn new(period_secs: u32) -> Self {
        Self {
            plus: Cooldown::new(period_secs),
            plus_up: Cooldown::new(period_secs),
        }
    }

    fn slot(&self, mode: Mode) -> &Cooldown {
        match mode {
            Mode::Plus => &self.plus,
            Mode::PlusUp => &self.plus_up,
        }
    }

    fn slot_mut(&mut self, mode: Mode) -> &mut Cooldown {
        match mode {
            Mode::Plus => &mut self.plus,
            Mode::PlusUp => &mut self.plus_up,
        }
    }

    pub fn is_blocked(&self, mode: Mode) -> bool {
        self.slot(mode).is_active()
    }

    pub fn label(&self, mode: Mode) -> String {
        self.slot(mode)
            .label(&format!("Launch {}", mode.display_name()))
    }

    /// Arms the guard. Returns false while the previous launch is still cooling down.
    pub fn begin(&mut self, mode: Mode, notices: &mut Notices) -> bool {
        if self.is_blocked(mode) {
            return false;
        }
        self.slot_mut(mode).start();
        notices.info(format!(
            "Sending {} launch command...",
            mode.display_name()
        ));
        true
    }

    pub fn finish(&mut self, mode: Mode, result: ClientResult<()>, notices: &mut Notices) {
        match result {
            Ok(()) => notices.success("Launch command sent"),
            Err(err) => {
                self.slot_mut(mode).cancel();
                notices.error(format!("Launch failed: {}", err.notice_text()));
            }
        }
    }

    pub fn tick(&mut self, elapsed: std::time::Duration) {
        self.plus.advance(elapsed);
        self.plus_up.advance(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::time::Duration;

    #[test]
    fn guard_blocks_same_mode_only() {
        let mut guard = LaunchGuard::new(30);
        let mut notices = Notices::default();
        assert!(guard.begin(Mode::Plus, &mut notices));
        assert!(!guard.begin(Mode::Plus, &mut notices));
        assert!(guard.begin(Mode::PlusUp, &mut notices));
        assert_eq!(guard.label(Mode::Plus), "Wait 30s");

        guard.finish(Mode::Plus, Ok(()), &mut notices);
        guard.tick(Duration::from_secs(29));
        assert!(guard.is_blocked(Mode::Plus));
        guard.tick(Duration::from_secs(1));
        assert!(!guard.is_blocked(Mode::Plus));
        assert_eq!(guard.label(Mode::Plus), "Launch PLUS");
    }

    #[test]
    fn failed_launch_lifts_guard() {
        let mut guard = LaunchGuard::new(30);
        let mut notices = Notices::default();
        guard.begin(Mode::PlusUp, &mut notices);
        guard.finish(
            Mode::PlusUp,
            Err(ClientError::Domain("game executable not found".to_string())),
            &mut notices,
        );
        assert!(!guard.is_blocked(Mode::PlusUp));
        assert_eq!(
            notices.latest().map(|toast| toast.message.as_str()),
            Some("Launch failed: game executable not found")
        );
    }
}
