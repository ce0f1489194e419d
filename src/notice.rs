use std::time::Duration;

const TOAST_TTL: Duration = Duration::from_secs(5);
const TOAST_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warn,
    Error,
}

/// Auto-dismissing notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    /// `None` keeps the toast until another one pushes it out.
    remaining: Option<Duration>,
}

/// Notice that stays until dismissed or actioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    GamePatch,
    SelfUpdate { version: String, notes: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentNotice {
    pub availability: Availability,
    /// Disabled while its action request is in flight.
    pub busy: bool,
}

impl PersistentNotice {
    pub fn title(&self) -> String {
        match &self.availability {
            Availability::GamePatch => "Game client update required".to_string(),
            Availability::SelfUpdate { version, .. } => format!("New version available: {version}"),
        }
    }

    pub fn detail(&self) -> String {
        match &self.availability {
            Availability::GamePatch => "Run the patcher to update the game".to_string(),
            Availability::SelfUpdate { notes, .. } if notes.trim().is_empty() => {
                "Release notes: none".to_string()
            }
            Availability::SelfUpdate { notes, .. } => format!("Release notes: {notes}"),
        }
    }
}

/// Everything the presentation layer needs to show as notices.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    toasts: Vec<Toast>,
    persistent: Vec<PersistentNotice>,
}

impl Notices {
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message.into(), ToastLevel::Info, Some(TOAST_TTL));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message.into(), ToastLevel::Success, Some(TOAST_TTL));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(message.into(), ToastLevel::Warn, Some(TOAST_TTL));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message.into(), ToastLevel::Error, Some(TOAST_TTL));
    }

    /// Toast without expiry, e.g. while a long-running request is pending.
    pub fn sticky(&mut self, message: impl Into<String>, level: ToastLevel) {
        self.push(message.into(), level, None);
    }

    fn push(&mut self, message: String, level: ToastLevel, remaining: Option<Duration>) {
        self.toasts.push(Toast {
            message,
            level,
            remaining,
        });
        if self.toasts.len() > TOAST_LIMIT {
            let overflow = self.toasts.len() - TOAST_LIMIT;
            self.toasts.drain(0..overflow);
        }
    }

    pub fn tick(&mut self, elapsed: Duration) {
        for toast in &mut self.toasts {
            if let Some(left) = toast.remaining {
                toast.remaining = Some(left.saturating_sub(elapsed));
            }
        }
        self.toasts
            .retain(|toast| toast.remaining.map_or(true, |left| !left.is_zero()));
    }

    /// Drops toasts that have no expiry.
    pub fn clear_sticky(&mut self) {
        self.toasts.retain(|toast| toast.remaining.is_some());
    }

    #[cfg(test)]
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.last()
    }

    /// Drains all toasts; used by the headless runner to print them.
    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    pub fn show_availability(&mut self, availability: Availability) {
        let same_kind = |notice: &PersistentNotice| {
            std::mem::discriminant(&notice.availability) == std::mem::discriminant(&availability)
        };
        self.persistent.retain(|notice| !same_kind(notice));
        self.persistent.push(PersistentNotice {
            availability,
            busy: false,
        });
    }

    pub fn persistent(&self) -> &[PersistentNotice] {
        &self.persistent
    }

    pub fn game_patch(&self) -> Option<&PersistentNotice> {
        self.persistent
            .iter()
            .find(|notice| notice.availability == Availability::GamePatch)
    }

    pub fn self_update(&self) -> Option<&PersistentNotice> {
        self.persistent
            .iter()
            .find(|notice| matches!(notice.availability, Availability::SelfUpdate { .. }))
    }

    pub fn set_busy(&mut self, availability: &Availability, busy: bool) {
        if let Some(notice) = self
            .persistent
            .iter_mut()
            .find(|notice| &notice.availability == availability)
        {
            notice.busy = busy;
        }
    }

    pub fn dismiss(&mut self, availability: &Availability) {
        self.persistent
            .retain(|notice| &notice.availability != availability);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_expire_but_availability_notices_persist() {
        let mut notices = Notices::default();
        notices.info("checking updates");
        notices.show_availability(Availability::GamePatch);
        notices.tick(Duration::from_secs(6));
        assert!(notices.toasts().is_empty());
        assert!(notices.game_patch().is_some());

        notices.dismiss(&Availability::GamePatch);
        assert!(notices.persistent().is_empty());
    }

    #[test]
    fn sticky_toast_survives_ticks() {
        let mut notices = Notices::default();
        notices.sticky("preparing update", ToastLevel::Info);
        notices.tick(Duration::from_secs(600));
        assert_eq!(notices.toasts().len(), 1);
    }

    #[test]
    fn newer_self_update_replaces_older_one() {
        let mut notices = Notices::default();
        notices.show_availability(Availability::SelfUpdate {
            version: "1.0.0".to_string(),
            notes: String::new(),
        });
        notices.show_availability(Availability::SelfUpdate {
            version: "1.1.0".to_string(),
            notes: "fixes".to_string(),
        });
        assert_eq!(notices.persistent().len(), 1);
        let notice = notices.self_update().expect("self update notice");
        assert_eq!(notice.title(), "New version available: 1.1.0");
        assert_eq!(notice.detail(), "Release notes: fixes");
    }
}
