use crate::{
    backend::{
        ApplyUpdatesRequest, ApplyUpdatesResponse, AppUpdateStatus, GameUpdateStatus, ReleaseInfo,
        UpdateCheckRequest, UpdateCheckResponse,
    },
    error::{ClientError, ClientResult},
    game::{Mode, PathConfig},
    log::Log,
    notice::{Availability, Notices, ToastLevel},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    Idle,
    Checking,
    Applying { count: usize },
    UpToDate,
    Applied,
    PartiallyFailed { paths: Vec<String> },
    Failed { error: String },
}

/// Apply request for a check that reported changes.
///
/// Only [`UpdateOrchestrator::finish_check`] builds one, and never with an
/// empty item list, so `apply-updates` cannot be reached any other way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyPlan {
    request: ApplyUpdatesRequest,
}

impl ApplyPlan {
    pub fn request(&self) -> &ApplyUpdatesRequest {
        &self.request
    }

    pub fn mode(&self) -> Mode {
        self.request.mode
    }

    pub fn len(&self) -> usize {
        self.request.items.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Completed,
    PartialFailure(Vec<String>),
    Failed,
    NeedsElevation { reason: String },
}

/// Check-then-apply content updates, tracked per mode.
#[derive(Debug, Clone)]
pub struct UpdateOrchestrator {
    plus: UpdateStatus,
    plus_up: UpdateStatus,
}

impl Default for UpdateOrchestrator {
    fn default() -> Self {
        Self {
            plus: UpdateStatus::Idle,
            plus_up: UpdateStatus::Idle,
        }
    }
}

impl UpdateOrchestrator {
    /// Modes to check automatically once the initial state is known.
    pub fn startup_modes(paths: &PathConfig) -> Vec<Mode> {
        if !paths.has_usable_path() {
            return Vec::new();
        }
        Mode::ALL
            .into_iter()
            .filter(|mode| paths.mode_installed(*mode))
            .collect()
    }

    pub fn status(&self, mode: Mode) -> &UpdateStatus {
        match mode {
            Mode::Plus => &self.plus,
            Mode::PlusUp => &self.plus_up,
        }
    }

    fn set_status(&mut self, mode: Mode, status: UpdateStatus) {
        match mode {
            Mode::Plus => self.plus = status,
            Mode::PlusUp => self.plus_up = status,
        }
    }

    pub fn begin_check(
        &mut self,
        mode: Mode,
        paths: &PathConfig,
        notices: &mut Notices,
    ) -> UpdateCheckRequest {
        self.set_status(mode, UpdateStatus::Checking);
        notices.info(format!("Checking {} for updates...", mode.display_name()));
        UpdateCheckRequest {
            mode,
            custom_path: paths.custom_path.clone(),
        }
    }

    /// Consumes a check response. Returns the apply continuation when there is
    /// something to download.
    pub fn finish_check(
        &mut self,
        request: &UpdateCheckRequest,
        result: ClientResult<UpdateCheckResponse>,
        notices: &mut Notices,
        log: &Log,
    ) -> Option<ApplyPlan> {
        let mode = request.mode;
        let label = mode.display_name();
        let response = match result {
            Ok(response) if response.ok => response,
            Ok(response) => {
                let error = response
                    .error
                    .unwrap_or_else(|| "update check failed".to_string());
                return self.check_failed(mode, error, notices, log);
            }
            Err(err) => return self.check_failed(mode, err.to_string(), notices, log),
        };

        if !response.update_needed {
            self.set_status(mode, UpdateStatus::UpToDate);
            notices.success(format!("{label} is up to date"));
            return None;
        }
        if response.items.is_empty() {
            log.warn(format!("{label} reported an update without items"));
            self.set_status(mode, UpdateStatus::UpToDate);
            notices.success(format!("{label} is up to date"));
            return None;
        }

        let count = response.items.len();
        self.set_status(mode, UpdateStatus::Applying { count });
        notices.info(format!("Found {count} update item(s) for {label}, downloading..."));
        log.info(format!("{label}: applying {count} update item(s)"));
        Some(ApplyPlan {
            request: ApplyUpdatesRequest {
                mode,
                custom_path: request.custom_path.clone(),
                items: response.items,
            },
        })
    }

    fn check_failed(
        &mut self,
        mode: Mode,
        error: String,
        notices: &mut Notices,
        log: &Log,
    ) -> Option<ApplyPlan> {
        log.warn(format!("{} update check failed: {error}", mode.display_name()));
        notices.error(format!(
            "Error while checking {} for updates: {error}",
            mode.display_name()
        ));
        self.set_status(mode, UpdateStatus::Failed { error });
        None
    }

    pub fn finish_apply(
        &mut self,
        plan: &ApplyPlan,
        result: ClientResult<ApplyUpdatesResponse>,
        notices: &mut Notices,
        log: &Log,
    ) -> ApplyOutcome {
        let mode = plan.mode();
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                notices.error(format!("Error while applying updates: {err}"));
                log.error(format!("{} update apply failed: {err}", mode.display_name()));
                self.set_status(
                    mode,
                    UpdateStatus::Failed {
                        error: err.to_string(),
                    },
                );
                return ApplyOutcome::Failed;
            }
        };

        if response.need_admin {
            let reason = response
                .error
                .unwrap_or_else(|| "Administrator rights are required".to_string());
            self.set_status(
                mode,
                UpdateStatus::Failed {
                    error: reason.clone(),
                },
            );
            return ApplyOutcome::NeedsElevation { reason };
        }

        if !response.failed.is_empty() {
            let paths: Vec<String> = response
                .failed
                .iter()
                .map(|failed| failed.path.clone())
                .collect();
            for failed in &response.failed {
                log.warn(format!("Update failed for {}: {}", failed.path, failed.reason));
            }
            notices.error(format!("Some files failed to update: {}", paths.join(", ")));
            self.set_status(
                mode,
                UpdateStatus::PartiallyFailed {
                    paths: paths.clone(),
                },
            );
            return ApplyOutcome::PartialFailure(paths);
        }

        if !response.ok {
            let error = response.error.unwrap_or_else(|| "update failed".to_string());
            notices.error(format!("Error while applying updates: {error}"));
            self.set_status(mode, UpdateStatus::Failed { error });
            return ApplyOutcome::Failed;
        }

        let message = response
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "Update complete".to_string());
        log.info(format!("{}: {message}", mode.display_name()));
        notices.success(message);
        self.set_status(mode, UpdateStatus::Applied);
        ApplyOutcome::Completed
    }
}

/// Game client poll. Failures only reach the log.
pub fn finish_game_poll(result: ClientResult<GameUpdateStatus>, notices: &mut Notices, log: &Log) {
    match result {
        Ok(status) if status.update_needed => {
            log.info("Game client update required");
            notices.show_availability(Availability::GamePatch);
        }
        Ok(_) => {}
        Err(err) => log.warn(format!("Game update status check failed: {err}")),
    }
}

/// Self-update poll. Failures only reach the log.
pub fn finish_app_poll(result: ClientResult<AppUpdateStatus>, notices: &mut Notices, log: &Log) {
    match result {
        Ok(status) if status.update_available => match status.latest_version {
            Some(ReleaseInfo { version, notes }) => {
                log.info(format!("New version available: {version}"));
                notices.show_availability(Availability::SelfUpdate { version, notes });
            }
            None => log.warn("Update reported without version details"),
        },
        Ok(_) => {}
        Err(err) => log.warn(format!("App update check failed: {err}")),
    }
}

pub fn begin_patcher_launch(notices: &mut Notices) {
    notices.set_busy(&Availability::GamePatch, true);
    notices.info("Starting the game patcher...");
}

pub fn finish_patcher_launch(result: ClientResult<()>, notices: &mut Notices) {
    match result {
        Ok(()) => {
            notices.success("Game patcher started");
            notices.dismiss(&Availability::GamePatch);
        }
        Err(err) => {
            notices.set_busy(&Availability::GamePatch, false);
            notices.error(format!("Failed to start the patcher: {}", failure_text(&err)));
        }
    }
}

/// Returns the release to request, or `None` while a request is already pending.
pub fn begin_self_update(notices: &mut Notices) -> Option<ReleaseInfo> {
    let notice = notices.self_update()?;
    if notice.busy {
        return None;
    }
    let availability = notice.availability.clone();
    let Availability::SelfUpdate { version, notes } = availability.clone() else {
        return None;
    };
    notices.set_busy(&availability, true);
    notices.sticky("Preparing the update, please wait...", ToastLevel::Info);
    Some(ReleaseInfo { version, notes })
}

/// Returns true when the updater took over and the app is about to close.
pub fn finish_self_update(release: &ReleaseInfo, result: ClientResult<()>, notices: &mut Notices) -> bool {
    let availability = Availability::SelfUpdate {
        version: release.version.clone(),
        notes: release.notes.clone(),
    };
    notices.clear_sticky();
    match result {
        Ok(()) => {
            notices.dismiss(&availability);
            notices.success("Updater started, this tool will now close");
            true
        }
        Err(err) => {
            notices.set_busy(&availability, false);
            notices.error(format!("Update failed: {}", failure_text(&err)));
            false
        }
    }
}

fn failure_text(err: &ClientError) -> String {
    match err {
        ClientError::Transient(_) => err.notice_text(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FailedUpdate, UpdateItem};

    fn paths() -> PathConfig {
        PathConfig {
            custom_path: Some("D:\\TW".to_string()),
            default_path_exists: false,
            plus_exists: true,
            plus_up_exists: false,
        }
    }

    fn update_item(path: &str) -> UpdateItem {
        UpdateItem {
            path: path.to_string(),
            size_expected: 10,
            url: format!("https://cdn/{path}"),
            backup_url: String::new(),
        }
    }

    fn check_response(update_needed: bool, items: Vec<UpdateItem>) -> UpdateCheckResponse {
        UpdateCheckResponse {
            ok: true,
            update_needed,
            items,
            error: None,
        }
    }

    #[test]
    fn startup_checks_only_installed_modes_with_a_path() {
        assert_eq!(UpdateOrchestrator::startup_modes(&paths()), vec![Mode::Plus]);
        let mut both = paths();
        both.plus_up_exists = true;
        assert_eq!(
            UpdateOrchestrator::startup_modes(&both),
            vec![Mode::Plus, Mode::PlusUp]
        );
        let mut none = both.clone();
        none.custom_path = None;
        assert!(UpdateOrchestrator::startup_modes(&none).is_empty());
    }

    #[test]
    fn apply_plan_only_for_non_empty_update() {
        let log = Log::default();
        let mut notices = Notices::default();
        let mut orchestrator = UpdateOrchestrator::default();

        let request = orchestrator.begin_check(Mode::Plus, &paths(), &mut notices);
        assert_eq!(orchestrator.status(Mode::Plus), &UpdateStatus::Checking);
        let plan = orchestrator.finish_check(
            &request,
            Ok(check_response(false, vec![update_item("a.pak")])),
            &mut notices,
            &log,
        );
        assert!(plan.is_none());
        assert_eq!(orchestrator.status(Mode::Plus), &UpdateStatus::UpToDate);

        let plan = orchestrator.finish_check(&request, Ok(check_response(true, Vec::new())), &mut notices, &log);
        assert!(plan.is_none());

        let plan = orchestrator
            .finish_check(
                &request,
                Ok(check_response(true, vec![update_item("a.pak"), update_item("b.pak")])),
                &mut notices,
                &log,
            )
            .expect("plan");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.request().custom_path.as_deref(), Some("D:\\TW"));
        assert_eq!(orchestrator.status(Mode::Plus), &UpdateStatus::Applying { count: 2 });
    }

    #[test]
    fn failed_check_reports_once_without_plan() {
        let log = Log::default();
        let mut notices = Notices::default();
        let mut orchestrator = UpdateOrchestrator::default();
        let request = orchestrator.begin_check(Mode::PlusUp, &paths(), &mut notices);
        let response = UpdateCheckResponse {
            ok: false,
            error: Some("manifest unavailable".to_string()),
            ..UpdateCheckResponse::default()
        };
        let before = notices.toasts().len();
        assert!(orchestrator
            .finish_check(&request, Ok(response), &mut notices, &log)
            .is_none());
        assert_eq!(notices.toasts().len(), before + 1);
        assert_eq!(
            orchestrator.status(Mode::PlusUp),
            &UpdateStatus::Failed {
                error: "manifest unavailable".to_string()
            }
        );
    }

    fn plan(orchestrator: &mut UpdateOrchestrator, notices: &mut Notices, log: &Log) -> ApplyPlan {
        let request = orchestrator.begin_check(Mode::Plus, &paths(), notices);
        orchestrator
            .finish_check(
                &request,
                Ok(check_response(true, vec![update_item("a.pak")])),
                notices,
                log,
            )
            .expect("plan")
    }

    #[test]
    fn apply_results_are_classified() {
        let log = Log::default();
        let mut notices = Notices::default();
        let mut orchestrator = UpdateOrchestrator::default();
        let plan = plan(&mut orchestrator, &mut notices, &log);

        let outcome = orchestrator.finish_apply(
            &plan,
            Ok(ApplyUpdatesResponse {
                ok: true,
                message: Some("Updated to the latest version".to_string()),
                ..ApplyUpdatesResponse::default()
            }),
            &mut notices,
            &log,
        );
        assert_eq!(outcome, ApplyOutcome::Completed);
        assert_eq!(
            notices.latest().map(|toast| toast.message.as_str()),
            Some("Updated to the latest version")
        );

        let outcome = orchestrator.finish_apply(
            &plan,
            Ok(ApplyUpdatesResponse {
                ok: false,
                failed: vec![FailedUpdate {
                    path: "edata/a.pak".to_string(),
                    reason: "locked".to_string(),
                }],
                ..ApplyUpdatesResponse::default()
            }),
            &mut notices,
            &log,
        );
        assert_eq!(outcome, ApplyOutcome::PartialFailure(vec!["edata/a.pak".to_string()]));

        let outcome = orchestrator.finish_apply(
            &plan,
            Ok(ApplyUpdatesResponse {
                ok: false,
                need_admin: true,
                error: Some("access denied".to_string()),
                failed: vec![FailedUpdate {
                    path: "edata/a.pak".to_string(),
                    reason: "denied".to_string(),
                }],
                ..ApplyUpdatesResponse::default()
            }),
            &mut notices,
            &log,
        );
        assert_eq!(
            outcome,
            ApplyOutcome::NeedsElevation {
                reason: "access denied".to_string()
            }
        );

        let outcome = orchestrator.finish_apply(
            &plan,
            Err(ClientError::Transient("timeout".to_string())),
            &mut notices,
            &log,
        );
        assert_eq!(outcome, ApplyOutcome::Failed);
    }

    #[test]
    fn startup_polls_surface_persistent_notices_and_log_failures() {
        let log = Log::default();
        let mut notices = Notices::default();
        finish_game_poll(Ok(GameUpdateStatus { update_needed: true }), &mut notices, &log);
        finish_app_poll(
            Ok(AppUpdateStatus {
                update_available: true,
                latest_version: Some(ReleaseInfo {
                    version: "2.1.0".to_string(),
                    notes: "faster installs".to_string(),
                }),
            }),
            &mut notices,
            &log,
        );
        assert!(notices.game_patch().is_some());
        assert!(notices.self_update().is_some());

        let mut quiet = Notices::default();
        finish_app_poll(
            Err(ClientError::Transient("offline".to_string())),
            &mut quiet,
            &log,
        );
        assert!(quiet.toasts().is_empty());
        assert!(quiet.persistent().is_empty());
        assert_eq!(log.tail(1)[0].message, "App update check failed: network error: offline");
    }

    #[test]
    fn self_update_disables_action_until_result() {
        let log = Log::default();
        let mut notices = Notices::default();
        finish_app_poll(
            Ok(AppUpdateStatus {
                update_available: true,
                latest_version: Some(ReleaseInfo {
                    version: "2.1.0".to_string(),
                    notes: String::new(),
                }),
            }),
            &mut notices,
            &log,
        );
        let release = begin_self_update(&mut notices).expect("release");
        assert!(begin_self_update(&mut notices).is_none());

        let closing = finish_self_update(
            &release,
            Err(ClientError::Domain("download failed".to_string())),
            &mut notices,
        );
        assert!(!closing);
        assert_eq!(notices.self_update().map(|notice| notice.busy), Some(false));

        let release = begin_self_update(&mut notices).expect("release");
        assert!(finish_self_update(&release, Ok(()), &mut notices));
        assert!(notices.self_update().is_none());
    }

    #[test]
    fn patcher_launch_dismisses_notice_on_success() {
        let mut notices = Notices::default();
        notices.show_availability(Availability::GamePatch);
        begin_patcher_launch(&mut notices);
        finish_patcher_launch(Err(ClientError::Domain("patcher missing".to_string())), &mut notices);
        assert_eq!(notices.game_patch().map(|notice| notice.busy), Some(false));
        finish_patcher_launch(Ok(()), &mut notices);
        assert!(notices.game_patch().is_none());
    }
}
