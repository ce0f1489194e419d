use crate::{
    app::{App, ChatField, DialogChoice, StartupFlow},
    chat::SessionState,
    game::{Mode, GAME_NAME},
    log::LogLevel,
    notice::{Availability, ToastLevel},
    resolution::win_mode_label,
    update::UpdateStatus,
    view::{Overlay, Page, Surface},
};
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{
    io,
    time::{Duration, Instant},
};

const LOG_PANEL_HEIGHT: u16 = 8;
const NOTICE_PANEL_WIDTH: u16 = 40;
const CHAT_SCROLL_STEP: isize = 5;

#[derive(Clone)]
struct Theme {
    accent: Color,
    accent_soft: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    header_bg: Color,
    log_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(120, 190, 255),
            accent_soft: Color::Rgb(70, 110, 160),
            border: Color::Rgb(65, 75, 90),
            text: Color::Rgb(220, 230, 240),
            muted: Color::Rgb(135, 145, 155),
            success: Color::Rgb(120, 220, 140),
            warning: Color::Rgb(230, 200, 120),
            error: Color::Rgb(235, 100, 95),
            header_bg: Color::Rgb(22, 28, 36),
            log_bg: Color::Rgb(16, 20, 26),
        }
    }

    fn block(&self, title: String) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: impl Into<String>) -> Block<'static> {
        self.block(title.into()).padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
    }

    fn toast_color(&self, level: ToastLevel) -> Color {
        match level {
            ToastLevel::Info => self.accent,
            ToastLevel::Success => self.success,
            ToastLevel::Warn => self.warning,
            ToastLevel::Error => self.error,
        }
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    app.start(StartupFlow::Full);
    let mut last_tick = Instant::now();
    loop {
        let now = Instant::now();
        app.tick(now.duration_since(last_tick));
        last_tick = now;
        app.poll_jobs();
        app.poll_chat();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(200))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    handle_mouse(app, mouse, size);
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }
    if app.dialog.is_some() {
        handle_dialog_mode(app, key);
        return;
    }
    match app.view.overlay() {
        Some(Overlay::Chat) => handle_chat_mode(app, key),
        Some(Overlay::ResolutionConfig) => handle_resolution_mode(app, key),
        None => match app.view.page() {
            Page::Home => handle_home_mode(app, key),
            Page::Optimize => handle_optimize_mode(app, key),
        },
    }
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
            app.dialog_toggle_choice();
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => app.dialog_choose(DialogChoice::Yes),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.dialog_choose(DialogChoice::No)
        }
        KeyCode::Enter | KeyCode::Char(' ') => app.dialog_confirm(),
        _ => {}
    }
}

/// Keys shared by both pages.
fn handle_common(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
        KeyCode::Char('c') => app.open_chat(),
        KeyCode::Char('r') => app.open_resolution(),
        KeyCode::Char('m') => app.toggle_mode(),
        KeyCode::Char('g') => app.run_game_patcher(),
        KeyCode::Char('a') => app.apply_self_update(),
        KeyCode::Char('d') => app.dismiss_notice(&Availability::GamePatch),
        _ => return false,
    }
    true
}

fn handle_home_mode(app: &mut App, key: KeyEvent) {
    if handle_common(app, key) {
        return;
    }
    match key.code {
        KeyCode::Char('1') => app.launch_game(Mode::Plus),
        KeyCode::Char('2') => app.launch_game(Mode::PlusUp),
        KeyCode::Char('u') => app.check_updates(Mode::Plus),
        KeyCode::Char('U') => app.check_updates(Mode::PlusUp),
        KeyCode::Char('o') | KeyCode::Enter => app.navigate(Page::Optimize),
        KeyCode::Char('p') => app.select_path(),
        KeyCode::Char('x') => app.request_reset_path(),
        _ => {}
    }
}

fn handle_optimize_mode(app: &mut App, key: KeyEvent) {
    if handle_common(app, key) {
        return;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => app.navigate(Page::Home),
        KeyCode::Left | KeyCode::BackTab => app.prev_category(),
        KeyCode::Right | KeyCode::Tab => app.next_category(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev_item(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next_item(),
        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected_item(),
        _ => {}
    }
}

fn handle_chat_mode(app: &mut App, key: KeyEvent) {
    let focus = app.chat_form.focus;
    match key.code {
        KeyCode::Esc => app.close_overlay(Overlay::Chat),
        KeyCode::PageUp => app.chat_scroll(CHAT_SCROLL_STEP),
        KeyCode::PageDown => app.chat_scroll(-CHAT_SCROLL_STEP),
        KeyCode::Tab | KeyCode::Down => app.chat_form.focus = focus.next(),
        KeyCode::BackTab | KeyCode::Up => app.chat_form.focus = focus.prev(),
        KeyCode::Left => app.chat_cycle(false),
        KeyCode::Right => app.chat_cycle(true),
        KeyCode::Backspace => app.chat_backspace(),
        KeyCode::Enter => match focus {
            ChatField::Nickname | ChatField::Avatar | ChatField::Gender | ChatField::HideAvatar => {
                app.save_chat_profile();
            }
            _ => {
                app.send_invite();
            }
        },
        KeyCode::Char(' ') if !focus.is_text() => app.chat_cycle(true),
        KeyCode::Char(ch) if focus.is_text() => app.chat_input_char(ch),
        _ => {}
    }
}

fn handle_resolution_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_overlay(Overlay::ResolutionConfig),
        KeyCode::Enter => app.save_resolution(),
        _ => {
            let Some(form) = app.resolution.as_mut() else {
                return;
            };
            match key.code {
                KeyCode::Tab | KeyCode::Char('w') => form.cycle_win_mode(),
                KeyCode::Char('0') => form.set_win_mode(0),
                KeyCode::Char('1') => form.set_win_mode(1),
                KeyCode::Char('2') => form.set_win_mode(2),
                KeyCode::Left | KeyCode::Up => form.step_size(false),
                KeyCode::Right | KeyCode::Down => form.step_size(true),
                _ => {}
            }
        }
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, size: Rect) {
    if app.dialog.is_some() {
        return;
    }
    let Some(overlay) = app.view.overlay() else {
        return;
    };
    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
        let content = overlay_area(overlay, size);
        let inside = mouse.column >= content.x
            && mouse.column < content.x + content.width
            && mouse.row >= content.y
            && mouse.row < content.y + content.height;
        app.backdrop_click(overlay, inside);
    }
}

fn overlay_area(overlay: Overlay, area: Rect) -> Rect {
    match overlay {
        Overlay::Chat => centered_rect(area, area.width.saturating_mul(4) / 5, area.height.saturating_mul(4) / 5),
        Overlay::ResolutionConfig => centered_rect(area, 48, 12),
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let theme = Theme::new();
    let area = frame.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(LOG_PANEL_HEIGHT),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(frame, app, &theme, rows[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(NOTICE_PANEL_WIDTH)])
        .split(rows[1]);
    match app.view.page() {
        Page::Home => draw_home(frame, app, &theme, body[0]),
        Page::Optimize => draw_optimize(frame, app, &theme, body[0]),
    }
    draw_notices(frame, app, &theme, body[1]);

    let log_lines = build_log_lines(app, &theme, LOG_PANEL_HEIGHT.saturating_sub(2) as usize);
    let log = Paragraph::new(log_lines)
        .block(theme.panel(format!("Log ({})", app.log.len())))
        .style(Style::default().bg(theme.log_bg));
    frame.render_widget(log, rows[2]);

    let footer = Paragraph::new(footer_hint(app)).style(Style::default().fg(theme.muted));
    frame.render_widget(footer, rows[3]);

    match app.view.overlay() {
        Some(Overlay::Chat) => draw_chat(frame, app, &theme, overlay_area(Overlay::Chat, area)),
        Some(Overlay::ResolutionConfig) => draw_resolution(
            frame,
            app,
            &theme,
            overlay_area(Overlay::ResolutionConfig, area),
        ),
        None => {}
    }

    draw_toast(frame, app, &theme, rows[1]);
    draw_dialog(frame, app, &theme);
}

fn draw_header(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let page = match app.view.page() {
        Page::Home => "Home",
        Page::Optimize => "Optimize",
    };
    let page_style = if app.view.is_visible(app.view.page().into()) {
        Style::default().fg(theme.text)
    } else {
        Style::default().fg(theme.muted)
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {GAME_NAME} companion "),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {page} "), page_style),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(
            format!("Mode: {}", app.mode.display_name()),
            Style::default().fg(theme.warning),
        ),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(app.paths.target_display(app.mode), Style::default().fg(theme.muted)),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(app.status.clone(), Style::default().fg(theme.text)),
    ]);
    let header = Paragraph::new(line)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border)),
        )
        .style(Style::default().bg(theme.header_bg));
    frame.render_widget(header, area);
}

fn draw_home(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let mut lines = Vec::new();
    for (key, mode) in [('1', Mode::Plus), ('2', Mode::PlusUp)] {
        if !app.paths.mode_installed(mode) {
            continue;
        }
        let style = if app.launch.is_blocked(mode) {
            Style::default().fg(theme.muted)
        } else {
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("[{key}] "), Style::default().fg(theme.accent)),
            Span::styled(app.launch.label(mode), style),
            Span::styled(
                format!("  updates: {}", update_label(app.updates.status(mode))),
                Style::default().fg(theme.muted),
            ),
        ]));
    }
    if !app.paths.any_mode_installed() {
        lines.push(Line::from(Span::styled(
            "No game installation found. Press p to choose the game folder.",
            Style::default().fg(theme.warning),
        )));
    }
    lines.push(Line::from(""));
    for (key, label) in [
        ("u / U", "Check PLUS / PLUSUP for updates"),
        ("o", "Install optimizations"),
        ("c", "Party chat"),
        ("r", "Display settings"),
        ("p", "Choose game folder"),
        ("x", "Reset game folder"),
    ] {
        lines.push(Line::from(vec![
            Span::styled(format!("[{key}] "), Style::default().fg(theme.accent)),
            Span::styled(label, Style::default().fg(theme.text)),
        ]));
    }
    let home = Paragraph::new(lines)
        .block(theme.panel("Home"))
        .wrap(Wrap { trim: true });
    frame.render_widget(home, area);
}

fn update_label(status: &UpdateStatus) -> String {
    match status {
        UpdateStatus::Idle => "not checked".to_string(),
        UpdateStatus::Checking => "checking...".to_string(),
        UpdateStatus::Applying { count } => format!("applying {count} item(s)..."),
        UpdateStatus::UpToDate => "up to date".to_string(),
        UpdateStatus::Applied => "updated".to_string(),
        UpdateStatus::PartiallyFailed { paths } => format!("{} file(s) failed", paths.len()),
        UpdateStatus::Failed { error } => format!("failed: {error}"),
    }
}

fn draw_optimize(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let mut tabs = Vec::new();
    for (index, category) in app.config.categories.iter().enumerate() {
        let style = if index == app.category_index {
            Style::default()
                .fg(Color::Black)
                .bg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };
        tabs.push(Span::styled(format!(" {category} "), style));
        tabs.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(tabs)), rows[0]);

    let items: Vec<ListItem> = app
        .reconciler
        .items()
        .iter()
        .map(|item| {
            let busy = app.actions.is_busy(&item.slug);
            let (badge, color) = if busy {
                ("working", theme.warning)
            } else if app.reconciler.is_installed(&item.slug) {
                ("installed", theme.success)
            } else {
                ("available", theme.muted)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<10}", badge), Style::default().fg(color)),
                Span::styled(item.name.clone(), Style::default().fg(theme.text)),
                Span::styled(
                    format!("  {}", item.target_file),
                    Style::default().fg(theme.border),
                ),
            ]))
        })
        .collect();

    let title = if app.catalog_loading {
        format!("{} (loading)", app.current_category())
    } else {
        format!("{} ({})", app.current_category(), app.reconciler.items().len())
    };
    let list = List::new(items)
        .block(theme.panel(title))
        .highlight_style(Style::default().bg(theme.accent_soft))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !app.reconciler.items().is_empty() {
        state.select(Some(app.selected_item));
    }
    frame.render_stateful_widget(list, rows[1], &mut state);
}

fn draw_notices(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let mut lines = Vec::new();
    for notice in app.notices.persistent() {
        let action = match notice.availability {
            Availability::GamePatch => "[g] run patcher  [d] dismiss",
            Availability::SelfUpdate { .. } => "[a] update now",
        };
        lines.push(Line::from(Span::styled(
            notice.title(),
            Style::default().fg(theme.warning).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            notice.detail(),
            Style::default().fg(theme.text),
        )));
        let action_style = if notice.busy {
            Style::default().fg(theme.muted)
        } else {
            Style::default().fg(theme.accent)
        };
        let action = if notice.busy { "working..." } else { action };
        lines.push(Line::from(Span::styled(action, action_style)));
        lines.push(Line::from(""));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "No pending updates.",
            Style::default().fg(theme.muted),
        )));
    }
    let panel = Paragraph::new(lines)
        .block(theme.panel("Notices"))
        .wrap(Wrap { trim: true });
    frame.render_widget(panel, area);
}

fn draw_chat(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    frame.render_widget(Clear, area);
    let context = app.chat.context();
    let title = format!(
        "Party chat ({}, {} online)",
        app.chat.state().label(),
        context.roster.len()
    );
    let block = theme.block(title).style(Style::default().bg(theme.header_bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(34)])
        .split(inner);

    let height = columns[0].height.saturating_sub(2) as usize;
    let end = context.transcript.len().saturating_sub(context.scroll_back);
    let start = end.saturating_sub(height);
    let transcript: Vec<Line> = context.transcript[start..end]
        .iter()
        .map(|message| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", message.time_label()),
                    Style::default().fg(theme.muted),
                ),
                Span::styled(
                    format!("{}: ", message.profile.nickname),
                    Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
                ),
                Span::styled(message.content.clone(), Style::default().fg(theme.text)),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(transcript)
            .block(theme.panel("Messages"))
            .wrap(Wrap { trim: false }),
        columns[0],
    );

    let form = &app.chat_form;
    let pick = |options: &[String], index: usize| options.get(index).cloned().unwrap_or_default();
    let fields = [
        (ChatField::Nickname, "Nickname", form.draft.nickname.clone()),
        (ChatField::Avatar, "Avatar URL", form.draft.avatar_url.clone()),
        (ChatField::Gender, "Gender", form.draft.gender.label().to_string()),
        (
            ChatField::HideAvatar,
            "Hide avatar",
            if form.draft.hide_avatar { "yes" } else { "no" }.to_string(),
        ),
        (
            ChatField::MainChannel,
            "Channel",
            pick(&app.config.main_channels, form.main_channel),
        ),
        (
            ChatField::SubChannel,
            "Sub channel",
            pick(&app.config.sub_channels, form.sub_channel),
        ),
        (ChatField::Room, "Room", form.room.clone()),
        (
            ChatField::GameMode,
            "Game mode",
            pick(&app.config.game_modes, form.game_mode),
        ),
    ];
    let mut lines = Vec::new();
    for (field, label, value) in fields {
        let focused = field == form.focus;
        let marker = if focused { "> " } else { "  " };
        let value_style = if focused {
            Style::default().fg(theme.text).add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().fg(theme.text)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(theme.accent)),
            Span::styled(format!("{label:<12}"), Style::default().fg(theme.muted)),
            Span::styled(value, value_style),
        ]));
        if field == ChatField::HideAvatar {
            lines.push(Line::from(Span::styled(
                "  Enter saves the profile",
                Style::default().fg(theme.border),
            )));
            lines.push(Line::from(""));
        }
    }
    lines.push(Line::from(""));
    let send_style = if app.chat.cooldown().is_active() || app.chat.state() != SessionState::Open {
        Style::default().fg(theme.muted)
    } else {
        Style::default()
            .fg(Color::Black)
            .bg(theme.accent)
            .add_modifier(Modifier::BOLD)
    };
    lines.push(Line::from(Span::styled(
        format!(" {} ", app.chat.send_label()),
        send_style,
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Online",
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )));
    for user in &context.roster {
        let marker = if user.visible_avatar().is_some() { "*" } else { " " };
        lines.push(Line::from(Span::styled(
            format!(" {marker}{} ({})", user.nickname, user.gender.label()),
            Style::default().fg(theme.text),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).block(theme.panel("Profile & invite")),
        columns[1],
    );
}

fn draw_resolution(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let Some(form) = &app.resolution else {
        return;
    };
    frame.render_widget(Clear, area);
    let (width, height) = form.size();
    let size_style = if form.is_locked() {
        Style::default().fg(theme.muted)
    } else {
        Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
    };
    let lines = vec![
        Line::from(vec![
            Span::styled("Window mode  ", Style::default().fg(theme.muted)),
            Span::styled(
                win_mode_label(form.win_mode()),
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Resolution   ", Style::default().fg(theme.muted)),
            Span::styled(format!("{width} x {height}"), size_style),
            Span::styled(
                format!("  [{}/{}]", form.selected() + 1, form.presets().len()),
                Style::default().fg(theme.muted),
            ),
            Span::styled(
                if form.is_locked() { "  (locked)" } else { "" },
                Style::default().fg(theme.warning),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "0/1/2 or w: window mode   arrows: size",
            Style::default().fg(theme.border),
        )),
        Line::from(Span::styled(
            "Enter: save   Esc: close",
            Style::default().fg(theme.border),
        )),
    ];
    let panel = Paragraph::new(lines)
        .block(theme.panel("Display settings").style(Style::default().bg(theme.header_bg)));
    frame.render_widget(panel, area);
}

fn footer_hint(app: &App) -> String {
    if app.is_closing() {
        return " Updater running, closing shortly...".to_string();
    }
    if app.dialog.is_some() {
        return " y/n or arrows + Enter".to_string();
    }
    match app.view.active() {
        Surface::Chat => {
            " Tab: next field  Left/Right: change  Enter: save profile / send  PgUp/PgDn: scroll  Esc: close"
                .to_string()
        }
        Surface::ResolutionConfig => " Enter: save  Esc: close".to_string(),
        Surface::Home => " 1/2: launch  o: optimize  c: chat  r: display  m: mode  q: quit".to_string(),
        Surface::Optimize => {
            " Left/Right: category  Up/Down: item  Enter: install/uninstall  m: mode  Esc: back"
                .to_string()
        }
    }
}

fn build_log_lines(app: &App, theme: &Theme, height: usize) -> Vec<Line<'static>> {
    if height == 0 {
        return Vec::new();
    }
    let entries = app.log.tail(height);
    if entries.is_empty() {
        return vec![Line::from(Span::styled(
            "No recent events.",
            Style::default().fg(theme.muted),
        ))];
    }

    entries
        .into_iter()
        .map(|entry| {
            let (label, color) = match entry.level {
                LogLevel::Info => ("[i]", theme.accent),
                LogLevel::Warn => ("[!]", theme.warning),
                LogLevel::Error => ("[x]", theme.error),
            };
            Line::from(vec![
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(entry.message, Style::default().fg(theme.text)),
            ])
        })
        .collect()
}

fn draw_dialog(frame: &mut Frame<'_>, app: &App, theme: &Theme) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    let area = frame.size();
    let message_lines: Vec<Line> = dialog
        .message
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    let content_height = message_lines.len().max(1) as u16;
    let height = (content_height + 6).max(7).min(area.height.saturating_sub(2));
    let width = area.width.saturating_mul(2) / 3;
    let width = width.clamp(34, area.width.saturating_sub(2).max(34));
    let dialog_area = centered_rect(area, width, height);

    let yes_selected = matches!(dialog.choice, DialogChoice::Yes);
    let yes_style = if yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };
    let no_style = if !yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.warning)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };

    let buttons = Line::from(vec![
        Span::raw(" "),
        Span::styled(format!(" {} ", dialog.yes_label), yes_style),
        Span::raw("   "),
        Span::styled(format!(" {} ", dialog.no_label), no_style),
    ]);

    let mut lines = Vec::new();
    lines.push(Line::from(Span::styled(
        dialog.title.clone(),
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    lines.extend(message_lines);
    lines.push(Line::from(""));
    lines.push(buttons);

    frame.render_widget(Clear, dialog_area);
    let dialog_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent_soft))
        .style(Style::default().bg(theme.header_bg));
    let dialog_widget = Paragraph::new(lines)
        .block(dialog_block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(dialog_widget, dialog_area);
}

fn render_toast(frame: &mut Frame<'_>, theme: &Theme, body_area: Rect, message: &str, level: ToastLevel) {
    let mut message = message.to_string();
    let max_width = body_area.width.saturating_sub(4).max(24);
    let max_text = max_width.saturating_sub(4) as usize;
    if message.chars().count() > max_text {
        message = message.chars().take(max_text.saturating_sub(3)).collect();
        message.push_str("...");
    }
    let width = (message.chars().count() as u16 + 4).clamp(24, max_width);
    let x = body_area.x + (body_area.width.saturating_sub(width)) / 2;
    let toast_area = Rect::new(x, body_area.y + 1, width, 3);

    frame.render_widget(Clear, toast_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.toast_color(level)))
        .style(Style::default().bg(theme.header_bg));
    let content = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(content, toast_area);
}

fn draw_toast(frame: &mut Frame<'_>, app: &App, theme: &Theme, body_area: Rect) {
    if let Some(toast) = app.notices.latest() {
        render_toast(frame, theme, body_area, &toast.message, toast.level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 40, 10);
        let rect = centered_rect(area, 60, 4);
        assert_eq!(rect.width, 40);
        assert_eq!(rect.y, 3);
        assert_eq!(overlay_area(Overlay::ResolutionConfig, area).height, 10);
    }
}
