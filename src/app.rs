use crate::{
    actions::{elevation_prompt, ActionOutcome, ActionTracker, ItemAction, PendingAction},
    backend::{
        AppUpdateStatus, ApplyUpdatesResponse, Backend, CatalogItem, GameUpdateStatus,
        HttpBackend, InitialState, ReleaseInfo, ResolutionConfig, SelectPathResponse,
        UpdateCheckRequest, UpdateCheckResponse,
    },
    chat::{
        ChatInput, ChatProfile, ChatReply, ChatSession, PartyInvite, Transport,
        TransportMessage,
    },
    config::{base_data_dir, AppConfig, LocalStore},
    error::{ClientError, ClientResult},
    game::{normalize_custom_path, Mode, PathConfig},
    launch::LaunchGuard,
    log::Log,
    notice::{Availability, Notices},
    rate_limit::Delay,
    reconcile::{StatusQuery, StatusReconciler},
    resolution::ResolutionForm,
    transport::WsTransport,
    update::{self, ApplyOutcome, ApplyPlan, UpdateOrchestrator},
    view::{Overlay, Page, Surface, ViewChange, ViewEvent, ViewState},
};
use anyhow::Result;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread,
    time::Duration,
};

const CLOSE_AFTER_SELF_UPDATE: Duration = Duration::from_secs(3);

/// Backend request queued by the app. Each one resolves to exactly one [`JobMessage`].
#[derive(Debug, Clone)]
pub enum Job {
    InitialState,
    Items { category: String },
    Status(StatusQuery),
    ItemAction(PendingAction),
    CheckUpdates(UpdateCheckRequest),
    ApplyUpdates(ApplyPlan),
    GameUpdatePoll,
    AppUpdatePoll,
    RunPatcher,
    ApplySelfUpdate(ReleaseInfo),
    SelectPath,
    ResetPath,
    LoadResolution,
    SaveResolution(ResolutionConfig),
    RelaunchAdmin,
    Launch(Mode),
}

enum JobMessage {
    InitialState(ClientResult<InitialState>),
    Items {
        category: String,
        result: ClientResult<Vec<CatalogItem>>,
    },
    Status {
        ticket: u64,
        result: ClientResult<HashMap<String, bool>>,
    },
    ItemAction {
        pending: PendingAction,
        result: ClientResult<()>,
    },
    CheckUpdates {
        request: UpdateCheckRequest,
        result: ClientResult<UpdateCheckResponse>,
    },
    ApplyUpdates {
        plan: ApplyPlan,
        result: ClientResult<ApplyUpdatesResponse>,
    },
    GameUpdatePoll(ClientResult<GameUpdateStatus>),
    AppUpdatePoll(ClientResult<AppUpdateStatus>),
    RunPatcher(ClientResult<()>),
    SelfUpdate {
        release: ReleaseInfo,
        result: ClientResult<()>,
    },
    SelectPath(ClientResult<SelectPathResponse>),
    ResetPath(ClientResult<()>),
    Resolution(ClientResult<ResolutionConfig>),
    ResolutionSaved(ClientResult<()>),
    Relaunch(ClientResult<()>),
    Launch {
        mode: Mode,
        result: ClientResult<()>,
    },
}

fn run_job(backend: &dyn Backend, job: Job) -> JobMessage {
    match job {
        Job::InitialState => JobMessage::InitialState(backend.initial_state()),
        Job::Items { category } => {
            let result = backend.items(&category);
            JobMessage::Items { category, result }
        }
        Job::Status(query) => JobMessage::Status {
            ticket: query.ticket,
            result: backend.status(&query.request),
        },
        Job::ItemAction(pending) => {
            let result = match pending.action {
                ItemAction::Install => backend.install(&pending.request),
                ItemAction::Uninstall => backend.uninstall(&pending.request),
            };
            JobMessage::ItemAction { pending, result }
        }
        Job::CheckUpdates(request) => {
            let result = backend.check_updates(&request);
            JobMessage::CheckUpdates { request, result }
        }
        Job::ApplyUpdates(plan) => {
            let result = backend.apply_updates(&plan);
            JobMessage::ApplyUpdates { plan, result }
        }
        Job::GameUpdatePoll => JobMessage::GameUpdatePoll(backend.game_update_status()),
        Job::AppUpdatePoll => JobMessage::AppUpdatePoll(backend.check_app_update()),
        Job::RunPatcher => JobMessage::RunPatcher(backend.run_game_patcher()),
        Job::ApplySelfUpdate(release) => {
            let result = backend.apply_app_update(&release);
            JobMessage::SelfUpdate { release, result }
        }
        Job::SelectPath => JobMessage::SelectPath(backend.select_path()),
        Job::ResetPath => JobMessage::ResetPath(backend.reset_path()),
        Job::LoadResolution => JobMessage::Resolution(backend.resolution_config()),
        Job::SaveResolution(config) => {
            JobMessage::ResolutionSaved(backend.save_resolution_config(&config))
        }
        Job::RelaunchAdmin => JobMessage::Relaunch(backend.relaunch_admin()),
        Job::Launch(mode) => JobMessage::Launch {
            mode,
            result: backend.launch(mode),
        },
    }
}

/// Where backend jobs run. Both deliver results through the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executor {
    Threaded,
    /// Runs the job during `spawn`. Used by headless commands and tests.
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Yes,
    No,
}

#[derive(Debug, Clone)]
pub enum DialogKind {
    ConfirmAction(PendingAction),
    Elevate,
    ResetPath,
}

#[derive(Debug, Clone)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub yes_label: String,
    pub no_label: String,
    pub choice: DialogChoice,
    pub kind: DialogKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatField {
    Nickname,
    Avatar,
    Gender,
    HideAvatar,
    MainChannel,
    SubChannel,
    Room,
    GameMode,
}

impl ChatField {
    const ORDER: [ChatField; 8] = [
        ChatField::Nickname,
        ChatField::Avatar,
        ChatField::Gender,
        ChatField::HideAvatar,
        ChatField::MainChannel,
        ChatField::SubChannel,
        ChatField::Room,
        ChatField::GameMode,
    ];

    pub fn next(self) -> Self {
        let index = Self::ORDER.iter().position(|field| *field == self).unwrap_or(0);
        Self::ORDER[(index + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let index = Self::ORDER.iter().position(|field| *field == self).unwrap_or(0);
        Self::ORDER[(index + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn is_text(self) -> bool {
        matches!(self, ChatField::Nickname | ChatField::Avatar | ChatField::Room)
    }
}

/// Editable state of the chat overlay: the profile draft and the invite picker.
#[derive(Debug, Clone)]
pub struct ChatForm {
    pub draft: ChatProfile,
    pub focus: ChatField,
    pub main_channel: usize,
    pub sub_channel: usize,
    pub game_mode: usize,
    pub room: String,
}

impl ChatForm {
    fn new(profile: ChatProfile) -> Self {
        Self {
            draft: profile,
            focus: ChatField::Room,
            main_channel: 0,
            sub_channel: 0,
            game_mode: 0,
            room: String::new(),
        }
    }
}

/// What a (re)initialization does after the initial state arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupFlow {
    /// Checks installed modes for content updates and applies what they report.
    #[default]
    Full,
    /// Loads paths, polls and the catalog only. Nothing on disk is touched.
    ReadOnly,
}

pub struct StartupOptions {
    pub backend_url: Option<String>,
    pub chat_url: Option<String>,
    pub executor: Executor,
}

pub struct App {
    pub config: AppConfig,
    pub log: Log,
    pub notices: Notices,
    pub view: ViewState,
    pub mode: Mode,
    pub paths: PathConfig,
    pub category_index: usize,
    pub selected_item: usize,
    pub catalog_loading: bool,
    pub reconciler: StatusReconciler,
    pub actions: ActionTracker,
    pub updates: UpdateOrchestrator,
    pub launch: LaunchGuard,
    pub chat: ChatSession<Box<dyn Transport>>,
    pub chat_form: ChatForm,
    pub resolution: Option<ResolutionForm>,
    pub dialog: Option<Dialog>,
    pub status: String,
    pub should_quit: bool,
    backend: Arc<dyn Backend>,
    executor: Executor,
    job_tx: Sender<JobMessage>,
    job_rx: Receiver<JobMessage>,
    jobs_in_flight: usize,
    chat_rx: Receiver<TransportMessage>,
    store: LocalStore,
    queued_dialogs: VecDeque<Dialog>,
    close_timer: Delay,
    startup_flow: StartupFlow,
}

impl App {
    pub fn initialize(options: StartupOptions) -> Result<Self> {
        let data_dir = base_data_dir()?;
        let mut config = AppConfig::load_or_create_in(&data_dir)?;
        if let Some(url) = options.backend_url {
            config.backend_url = url;
        }
        if let Some(url) = options.chat_url {
            config.chat_url = url;
        }
        let log = Log::with_file(data_dir.join("twcompanion.log"));
        let store = LocalStore::open_in(&data_dir)?;
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.backend_url));
        let (chat_tx, chat_rx) = mpsc::channel();
        let transport: Box<dyn Transport> = Box::new(WsTransport::new(chat_tx));
        log.info(format!("Backend: {}", config.backend_url));
        Ok(Self::with_parts(
            config,
            backend,
            transport,
            chat_rx,
            store,
            log,
            options.executor,
        ))
    }

    pub fn with_parts(
        config: AppConfig,
        backend: Arc<dyn Backend>,
        transport: Box<dyn Transport>,
        chat_rx: Receiver<TransportMessage>,
        store: LocalStore,
        log: Log,
        executor: Executor,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel();
        let profile = store.chat_profile();
        let first_category = config.categories.first().cloned().unwrap_or_default();
        let chat = ChatSession::new(config.chat_settings(), transport, profile.clone(), log.clone());
        Self {
            reconciler: StatusReconciler::new(&first_category, config.status_policy),
            launch: LaunchGuard::new(config.launch_guard_secs),
            log,
            notices: Notices::default(),
            view: ViewState::default(),
            mode: Mode::default(),
            paths: PathConfig::default(),
            category_index: 0,
            selected_item: 0,
            catalog_loading: false,
            actions: ActionTracker::default(),
            updates: UpdateOrchestrator::default(),
            chat,
            chat_form: ChatForm::new(profile),
            resolution: None,
            dialog: None,
            status: "Starting...".to_string(),
            should_quit: false,
            backend,
            executor,
            job_tx,
            job_rx,
            jobs_in_flight: 0,
            chat_rx,
            store,
            queued_dialogs: VecDeque::new(),
            close_timer: Delay::new(CLOSE_AFTER_SELF_UPDATE),
            startup_flow: StartupFlow::Full,
            config,
        }
    }

    fn spawn(&mut self, job: Job) {
        self.jobs_in_flight += 1;
        let tx = self.job_tx.clone();
        match self.executor {
            Executor::Threaded => {
                let backend = Arc::clone(&self.backend);
                thread::spawn(move || {
                    let _ = tx.send(run_job(backend.as_ref(), job));
                });
            }
            Executor::Inline => {
                let _ = tx.send(run_job(self.backend.as_ref(), job));
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.jobs_in_flight == 0
    }

    /// True between a successful self-update launch and the automatic exit.
    pub fn is_closing(&self) -> bool {
        self.close_timer.is_armed()
    }

    /// Initialization: initial state first, everything else follows from it.
    /// Later re-initializations (path changes) reuse the same flow.
    pub fn start(&mut self, flow: StartupFlow) {
        self.startup_flow = flow;
        self.restart();
    }

    fn restart(&mut self) {
        self.status = "Connecting to backend...".to_string();
        self.spawn(Job::InitialState);
    }

    pub fn tick(&mut self, elapsed: Duration) {
        self.notices.tick(elapsed);
        self.launch.tick(elapsed);
        self.chat.handle(ChatInput::Tick(elapsed), &mut self.notices);
        if self.close_timer.advance(elapsed) {
            self.should_quit = true;
        }
    }

    pub fn poll_jobs(&mut self) {
        loop {
            match self.job_rx.try_recv() {
                Ok(message) => {
                    self.jobs_in_flight = self.jobs_in_flight.saturating_sub(1);
                    self.apply_job(message);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.jobs_in_flight = 0;
                    break;
                }
            }
        }
    }

    pub fn poll_chat(&mut self) {
        loop {
            match self.chat_rx.try_recv() {
                Ok(message) => {
                    self.chat
                        .handle(ChatInput::Transport(message), &mut self.notices);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn apply_job(&mut self, message: JobMessage) {
        match message {
            JobMessage::InitialState(result) => self.finish_initial_state(result),
            JobMessage::Items { category, result } => self.finish_items(category, result),
            JobMessage::Status { ticket, result } => {
                self.reconciler.finish(ticket, result, &self.log);
            }
            JobMessage::ItemAction { pending, result } => {
                match self.actions.finish(&pending, result, &mut self.notices) {
                    ActionOutcome::Completed => {
                        self.log.info(format!(
                            "{} {}",
                            pending.action.verb(),
                            pending.request.slug
                        ));
                        self.refresh_status();
                    }
                    ActionOutcome::Failed => {}
                    ActionOutcome::NeedsElevation { reason } => self.offer_elevation(&reason),
                }
            }
            JobMessage::CheckUpdates { request, result } => {
                if let Some(plan) =
                    self.updates
                        .finish_check(&request, result, &mut self.notices, &self.log)
                {
                    self.spawn(Job::ApplyUpdates(plan));
                }
            }
            JobMessage::ApplyUpdates { plan, result } => {
                match self
                    .updates
                    .finish_apply(&plan, result, &mut self.notices, &self.log)
                {
                    ApplyOutcome::Completed | ApplyOutcome::PartialFailure(_) => {
                        self.refresh_status();
                    }
                    ApplyOutcome::Failed => {}
                    ApplyOutcome::NeedsElevation { reason } => self.offer_elevation(&reason),
                }
            }
            JobMessage::GameUpdatePoll(result) => {
                update::finish_game_poll(result, &mut self.notices, &self.log);
            }
            JobMessage::AppUpdatePoll(result) => {
                update::finish_app_poll(result, &mut self.notices, &self.log);
            }
            JobMessage::RunPatcher(result) => {
                update::finish_patcher_launch(result, &mut self.notices);
            }
            JobMessage::SelfUpdate { release, result } => {
                if update::finish_self_update(&release, result, &mut self.notices) {
                    self.log.info(format!("Updating to {}", release.version));
                    self.close_timer.arm();
                }
            }
            JobMessage::SelectPath(result) => match result {
                Ok(SelectPathResponse { path: Some(path) }) if !path.trim().is_empty() => {
                    self.notices.success(format!("Base path updated: {path}"));
                    self.log.info(format!("Custom path set: {path}"));
                    self.restart();
                }
                Ok(_) => self.log.info("Path selection cancelled"),
                Err(err) => self
                    .notices
                    .error(format!("Path selection failed: {}", err.notice_text())),
            },
            JobMessage::ResetPath(result) => match result {
                Ok(()) => {
                    self.notices.success("Custom path reset");
                    self.log.info("Custom path reset");
                    self.restart();
                }
                Err(err) => self
                    .notices
                    .error(format!("Path reset failed: {}", err.notice_text())),
            },
            JobMessage::Resolution(result) => match result {
                Ok(config) => {
                    self.resolution = Some(ResolutionForm::from_config(config));
                    let change = self.view.handle(ViewEvent::Open(Overlay::ResolutionConfig));
                    self.after_view_change(change);
                }
                Err(err) => self.notices.error(format!(
                    "Could not read display settings: {}",
                    err.notice_text()
                )),
            },
            JobMessage::ResolutionSaved(result) => match result {
                Ok(()) => {
                    self.notices.success("Display settings saved");
                    self.close_overlay(Overlay::ResolutionConfig);
                }
                Err(ClientError::Permission(reason)) => self.offer_elevation(&reason),
                Err(err) => self
                    .notices
                    .error(format!("Save failed: {}", err.notice_text())),
            },
            JobMessage::Relaunch(result) => match result {
                Ok(()) => {
                    self.notices.info("Restarting with administrator rights...");
                    self.log.info("Privileged relaunch requested");
                }
                Err(err) => self
                    .notices
                    .error(format!("Could not restart: {}", err.notice_text())),
            },
            JobMessage::Launch { mode, result } => {
                if let Err(err) = &result {
                    self.log
                        .warn(format!("{} launch failed: {err}", mode.display_name()));
                }
                self.launch.finish(mode, result, &mut self.notices);
            }
        }
    }

    fn finish_initial_state(&mut self, result: ClientResult<InitialState>) {
        let state = match result {
            Ok(state) => state,
            Err(err) => {
                self.status = "Backend unavailable".to_string();
                self.log.error(format!("Initial state failed: {err}"));
                self.notices.error(format!(
                    "Could not load initial state: {}",
                    err.notice_text()
                ));
                return;
            }
        };

        self.paths = PathConfig {
            custom_path: normalize_custom_path(state.custom_path),
            default_path_exists: state.default_path_exists,
            plus_exists: state.plus_exists,
            plus_up_exists: state.plus_up_exists,
        };
        if !self.paths.mode_installed(self.mode) && self.paths.mode_installed(self.mode.other()) {
            self.mode = self.mode.other();
        }
        self.status = if self.paths.has_usable_path() {
            "Ready".to_string()
        } else {
            "Game path not set".to_string()
        };
        self.log.info(self.paths.target_display(self.mode));

        if self.startup_flow == StartupFlow::Full {
            for mode in UpdateOrchestrator::startup_modes(&self.paths) {
                self.check_updates(mode);
            }
        }
        self.spawn(Job::GameUpdatePoll);
        self.spawn(Job::AppUpdatePoll);
        self.load_catalog();
    }

    fn finish_items(&mut self, category: String, result: ClientResult<Vec<CatalogItem>>) {
        if category != self.current_category() {
            self.log.info(format!("Dropped catalog for {category}"));
            return;
        }
        self.catalog_loading = false;
        match result {
            Ok(items) => {
                self.reconciler.replace_catalog(&category, items);
                self.selected_item = 0;
                self.refresh_status();
            }
            Err(err) => {
                self.log.warn(format!("Catalog {category} failed: {err}"));
                self.notices.error(format!("Could not load the {category} list"));
            }
        }
    }

    pub fn current_category(&self) -> &str {
        self.config
            .categories
            .get(self.category_index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn load_catalog(&mut self) {
        let category = self.current_category().to_string();
        if category.is_empty() {
            return;
        }
        self.catalog_loading = true;
        self.spawn(Job::Items { category });
    }

    pub fn refresh_status(&mut self) {
        if let Some(query) = self.reconciler.begin(self.mode, &self.paths) {
            self.spawn(Job::Status(query));
        }
    }

    pub fn select_category(&mut self, index: usize) {
        if index >= self.config.categories.len() || index == self.category_index {
            return;
        }
        self.category_index = index;
        self.load_catalog();
    }

    pub fn next_category(&mut self) {
        let count = self.config.categories.len();
        if count > 1 {
            self.select_category((self.category_index + 1) % count);
        }
    }

    pub fn prev_category(&mut self) {
        let count = self.config.categories.len();
        if count > 1 {
            self.select_category((self.category_index + count - 1) % count);
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.log.info(format!("Mode: {}", mode.display_name()));
        self.refresh_status();
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.mode.other());
    }

    pub fn navigate(&mut self, page: Page) {
        let change = self.view.handle(ViewEvent::Navigate(page));
        self.after_view_change(change);
    }

    pub fn close_overlay(&mut self, overlay: Overlay) {
        let change = self.view.handle(ViewEvent::Close(overlay));
        self.after_view_change(change);
    }

    pub fn backdrop_click(&mut self, overlay: Overlay, inside_content: bool) {
        let change = self.view.handle(ViewEvent::Backdrop {
            overlay,
            inside_content,
        });
        self.after_view_change(change);
    }

    fn after_view_change(&mut self, change: ViewChange) {
        if change.entered == Some(Surface::Optimize) && self.paths.has_usable_path() {
            self.load_catalog();
        }
        match change.closed {
            Some(Overlay::Chat) if self.config.disconnect_chat_on_close => {
                self.chat.handle(ChatInput::Shutdown, &mut self.notices);
            }
            Some(Overlay::ResolutionConfig) => self.resolution = None,
            _ => {}
        }
    }

    pub fn select_next_item(&mut self) {
        let count = self.reconciler.items().len();
        if count > 0 {
            self.selected_item = (self.selected_item + 1).min(count - 1);
        }
    }

    pub fn select_prev_item(&mut self) {
        self.selected_item = self.selected_item.saturating_sub(1);
    }

    pub fn selected_catalog_item(&self) -> Option<&CatalogItem> {
        self.reconciler.items().get(self.selected_item)
    }

    /// Install or uninstall depending on the item's current state.
    pub fn toggle_selected_item(&mut self) {
        let Some(item) = self.selected_catalog_item() else {
            return;
        };
        let action = if self.reconciler.is_installed(&item.slug) {
            ItemAction::Uninstall
        } else {
            ItemAction::Install
        };
        let slug = item.slug.clone();
        self.request_item_action(action, &slug);
    }

    pub fn request_item_action(&mut self, action: ItemAction, slug: &str) {
        if !self.paths.has_usable_path() {
            self.notices.warn("Set the game path first");
            return;
        }
        let Some(item) = self.reconciler.item(slug).cloned() else {
            return;
        };
        let category = self.reconciler.category().to_string();
        let Some(pending) = self.actions.prepare(
            action,
            &item,
            self.mode,
            &category,
            self.paths.custom_path.clone(),
        ) else {
            return;
        };

        if ActionTracker::needs_confirmation(action, self.config.confirm_install) {
            self.open_dialog(Dialog {
                title: format!("{} item", action.verb()),
                message: ActionTracker::confirmation_text(&pending),
                yes_label: action.verb().to_string(),
                no_label: "Cancel".to_string(),
                choice: DialogChoice::No,
                kind: DialogKind::ConfirmAction(pending),
            });
        } else {
            self.start_item_action(pending);
        }
    }

    fn start_item_action(&mut self, pending: PendingAction) {
        if self.actions.start(&pending) {
            self.spawn(Job::ItemAction(pending));
        }
    }

    pub fn check_updates(&mut self, mode: Mode) {
        if !self.paths.has_usable_path() {
            self.notices.warn("Set the game path first");
            return;
        }
        let request = self
            .updates
            .begin_check(mode, &self.paths, &mut self.notices);
        self.spawn(Job::CheckUpdates(request));
    }

    pub fn run_game_patcher(&mut self) {
        match self.notices.game_patch() {
            Some(notice) if !notice.busy => {}
            _ => return,
        }
        update::begin_patcher_launch(&mut self.notices);
        self.spawn(Job::RunPatcher);
    }

    pub fn apply_self_update(&mut self) {
        if let Some(release) = update::begin_self_update(&mut self.notices) {
            self.spawn(Job::ApplySelfUpdate(release));
        }
    }

    pub fn dismiss_notice(&mut self, availability: &Availability) {
        self.notices.dismiss(availability);
    }

    pub fn select_path(&mut self) {
        self.spawn(Job::SelectPath);
    }

    pub fn request_reset_path(&mut self) {
        self.open_dialog(Dialog {
            title: "Reset path".to_string(),
            message: "Reset the custom game path?".to_string(),
            yes_label: "Reset".to_string(),
            no_label: "Cancel".to_string(),
            choice: DialogChoice::No,
            kind: DialogKind::ResetPath,
        });
    }

    pub fn open_resolution(&mut self) {
        self.spawn(Job::LoadResolution);
    }

    pub fn save_resolution(&mut self) {
        if let Some(form) = &self.resolution {
            let config = form.to_config();
            self.spawn(Job::SaveResolution(config));
        }
    }

    pub fn launch_game(&mut self, mode: Mode) {
        if !self.paths.mode_installed(mode) {
            self.notices
                .warn(format!("{} is not installed", mode.display_name()));
            return;
        }
        if self.launch.begin(mode, &mut self.notices) {
            self.spawn(Job::Launch(mode));
        }
    }

    pub fn open_chat(&mut self) {
        let change = self.view.handle(ViewEvent::Open(Overlay::Chat));
        self.after_view_change(change);
        self.reset_chat_draft();
        self.chat.handle(ChatInput::Open, &mut self.notices);
    }

    pub fn save_chat_profile(&mut self) {
        let draft = self.chat_form.draft.clone();
        match self.store.save_chat_profile(draft) {
            Ok(saved) => {
                self.chat_form.draft = saved.clone();
                self.chat
                    .handle(ChatInput::ProfileSaved(saved), &mut self.notices);
                self.notices.success("Profile saved");
            }
            Err(err) => {
                self.log.error(format!("Profile save failed: {err:#}"));
                self.notices.error("Could not save the profile");
            }
        }
    }

    pub fn current_invite(&self) -> PartyInvite {
        let pick = |options: &[String], index: usize| options.get(index).cloned().unwrap_or_default();
        PartyInvite {
            main_channel: pick(&self.config.main_channels, self.chat_form.main_channel),
            sub_channel: pick(&self.config.sub_channels, self.chat_form.sub_channel),
            room: self.chat_form.room.clone(),
            game_mode: pick(&self.config.game_modes, self.chat_form.game_mode),
        }
    }

    pub fn send_invite(&mut self) -> ChatReply {
        let invite = self.current_invite();
        self.chat
            .handle(ChatInput::SendInvite(invite), &mut self.notices)
    }

    pub fn chat_input_char(&mut self, ch: char) {
        let form = &mut self.chat_form;
        match form.focus {
            ChatField::Nickname => form.draft.nickname.push(ch),
            ChatField::Avatar => form.draft.avatar_url.push(ch),
            ChatField::Room => form.room.push(ch),
            _ => {}
        }
    }

    pub fn chat_backspace(&mut self) {
        let form = &mut self.chat_form;
        match form.focus {
            ChatField::Nickname => {
                form.draft.nickname.pop();
            }
            ChatField::Avatar => {
                form.draft.avatar_url.pop();
            }
            ChatField::Room => {
                form.room.pop();
            }
            _ => {}
        }
    }

    /// Cycles the focused choice field.
    pub fn chat_cycle(&mut self, forward: bool) {
        let step = |index: usize, len: usize| match (len, forward) {
            (0, _) => 0,
            (len, true) => (index + 1) % len,
            (len, false) => (index + len - 1) % len,
        };
        let form = &mut self.chat_form;
        match form.focus {
            ChatField::Gender => form.draft.gender = form.draft.gender.toggled(),
            ChatField::HideAvatar => form.draft.hide_avatar = !form.draft.hide_avatar,
            ChatField::MainChannel => {
                form.main_channel = step(form.main_channel, self.config.main_channels.len());
            }
            ChatField::SubChannel => {
                form.sub_channel = step(form.sub_channel, self.config.sub_channels.len());
            }
            ChatField::GameMode => {
                form.game_mode = step(form.game_mode, self.config.game_modes.len());
            }
            _ => {}
        }
    }

    pub fn chat_scroll(&mut self, lines: isize) {
        self.chat.handle(ChatInput::Scroll(lines), &mut self.notices);
    }

    /// Drops unsaved profile edits.
    pub fn reset_chat_draft(&mut self) {
        self.chat_form.draft = self.chat.context().profile.clone();
    }

    fn offer_elevation(&mut self, reason: &str) {
        self.log.warn(format!("Permission denied: {reason}"));
        self.open_dialog(Dialog {
            title: "Administrator rights required".to_string(),
            message: elevation_prompt(reason),
            yes_label: "Restart as admin".to_string(),
            no_label: "Not now".to_string(),
            choice: DialogChoice::No,
            kind: DialogKind::Elevate,
        });
    }

    fn open_dialog(&mut self, dialog: Dialog) {
        if self.dialog.is_some() {
            self.queued_dialogs.push_back(dialog);
        } else {
            self.dialog = Some(dialog);
        }
    }

    pub fn dialog_toggle_choice(&mut self) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = match dialog.choice {
                DialogChoice::Yes => DialogChoice::No,
                DialogChoice::No => DialogChoice::Yes,
            };
        }
    }

    pub fn dialog_choose(&mut self, choice: DialogChoice) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = choice;
        }
        self.dialog_confirm();
    }

    pub fn dialog_confirm(&mut self) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        self.dialog = self.queued_dialogs.pop_front();

        let accepted = dialog.choice == DialogChoice::Yes;
        match dialog.kind {
            DialogKind::ConfirmAction(pending) => {
                if accepted {
                    self.start_item_action(pending);
                }
            }
            DialogKind::Elevate => {
                if accepted {
                    self.spawn(Job::RelaunchAdmin);
                } else {
                    self.log.info("Privileged relaunch declined");
                }
            }
            DialogKind::ResetPath => {
                if accepted {
                    self.spawn(Job::ResetPath);
                }
            }
        }
    }

    pub fn quit(&mut self) {
        self.chat.handle(ChatInput::Shutdown, &mut self.notices);
        self.should_quit = true;
    }
}
