use crate::{
    backend::{CatalogItem, ItemActionRequest},
    error::{ClientError, ClientResult},
    game::Mode,
    notice::Notices,
};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Install,
    Uninstall,
}

impl ItemAction {
    pub fn verb(self) -> &'static str {
        match self {
            ItemAction::Install => "Install",
            ItemAction::Uninstall => "Uninstall",
        }
    }

    pub fn is_destructive(self) -> bool {
        matches!(self, ItemAction::Uninstall)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub action: ItemAction,
    pub item_name: String,
    pub request: ItemActionRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Backend applied the change; install state must be refreshed.
    Completed,
    Failed,
    /// Backend needs elevated rights; the user decides whether to relaunch.
    NeedsElevation { reason: String },
}

/// Tracks which item controls are disabled while their request is in flight.
#[derive(Debug, Clone, Default)]
pub struct ActionTracker {
    busy: HashSet<String>,
}

impl ActionTracker {
    pub fn is_busy(&self, slug: &str) -> bool {
        self.busy.contains(slug)
    }

    pub fn needs_confirmation(action: ItemAction, confirm_install: bool) -> bool {
        action.is_destructive() || confirm_install
    }

    pub fn confirmation_text(pending: &PendingAction) -> String {
        format!(
            "{} \"{}\"?",
            pending.action.verb(),
            pending.item_name
        )
    }

    /// Builds the request for `item`. Nothing is marked busy until [`Self::start`].
    pub fn prepare(
        &self,
        action: ItemAction,
        item: &CatalogItem,
        mode: Mode,
        category: &str,
        custom_path: Option<String>,
    ) -> Option<PendingAction> {
        if self.is_busy(&item.slug) {
            return None;
        }
        Some(PendingAction {
            action,
            item_name: item.name.clone(),
            request: ItemActionRequest {
                slug: item.slug.clone(),
                mode,
                category: category.to_string(),
                custom_path,
            },
        })
    }

    /// Disables the control. Returns false if it was already disabled.
    pub fn start(&mut self, pending: &PendingAction) -> bool {
        self.busy.insert(pending.request.slug.clone())
    }

    /// Re-enables the control and reports the outcome. Runs for every result.
    pub fn finish(
        &mut self,
        pending: &PendingAction,
        result: ClientResult<()>,
        notices: &mut Notices,
    ) -> ActionOutcome {
        self.busy.remove(&pending.request.slug);
        let verb = pending.action.verb();
        match result {
            Ok(()) => {
                notices.success(format!("{verb} succeeded: {}", pending.item_name));
                ActionOutcome::Completed
            }
            Err(ClientError::Permission(reason)) => ActionOutcome::NeedsElevation { reason },
            Err(err @ ClientError::Transient(_)) => {
                notices.error(err.notice_text());
                ActionOutcome::Failed
            }
            Err(err) => {
                notices.error(format!("{verb} failed: {err}"));
                ActionOutcome::Failed
            }
        }
    }
}

/// Prompt text for the privileged relaunch offer.
pub fn elevation_prompt(reason: &str) -> String {
    format!("{reason}\n\nRestart the tool with administrator rights?")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> CatalogItem {
        CatalogItem {
            slug: "clean-room".to_string(),
            name: "Clean Room".to_string(),
            image_url: String::new(),
            target_file: "room/clean.bin".to_string(),
        }
    }

    #[test]
    fn control_is_disabled_until_finish() {
        let mut tracker = ActionTracker::default();
        let mut notices = Notices::default();
        let pending = tracker
            .prepare(ItemAction::Install, &item(), Mode::Plus, "room", None)
            .expect("pending");
        assert!(tracker.start(&pending));
        assert!(tracker.is_busy("clean-room"));
        assert!(tracker
            .prepare(ItemAction::Uninstall, &item(), Mode::Plus, "room", None)
            .is_none());

        let outcome = tracker.finish(
            &pending,
            Err(ClientError::Transient("refused".to_string())),
            &mut notices,
        );
        assert_eq!(outcome, ActionOutcome::Failed);
        assert!(!tracker.is_busy("clean-room"));
    }

    #[test]
    fn outcomes_follow_error_class() {
        let mut tracker = ActionTracker::default();
        let mut notices = Notices::default();
        let pending = tracker
            .prepare(ItemAction::Uninstall, &item(), Mode::PlusUp, "room", None)
            .expect("pending");

        tracker.start(&pending);
        let outcome = tracker.finish(&pending, Ok(()), &mut notices);
        assert_eq!(outcome, ActionOutcome::Completed);
        assert_eq!(
            notices.latest().map(|toast| toast.message.as_str()),
            Some("Uninstall succeeded: Clean Room")
        );

        tracker.start(&pending);
        let outcome = tracker.finish(
            &pending,
            Err(ClientError::Domain("file in use".to_string())),
            &mut notices,
        );
        assert_eq!(outcome, ActionOutcome::Failed);
        assert_eq!(
            notices.latest().map(|toast| toast.message.as_str()),
            Some("Uninstall failed: file in use")
        );

        tracker.start(&pending);
        let outcome = tracker.finish(
            &pending,
            Err(ClientError::Permission("access denied".to_string())),
            &mut notices,
        );
        assert_eq!(
            outcome,
            ActionOutcome::NeedsElevation {
                reason: "access denied".to_string()
            }
        );
        assert!(!tracker.is_busy("clean-room"));
    }

    #[test]
    fn uninstall_always_confirms() {
        assert!(ActionTracker::needs_confirmation(ItemAction::Uninstall, false));
        assert!(!ActionTracker::needs_confirmation(ItemAction::Install, false));
        assert!(ActionTracker::needs_confirmation(ItemAction::Install, true));
    }
}
