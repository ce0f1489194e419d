use crate::{
    app::{App, Executor, StartupFlow, StartupOptions},
    game::Mode,
    notice::ToastLevel,
    ui,
    update::UpdateStatus,
};
use anyhow::{bail, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct GlobalOptions {
    backend_url: Option<String>,
    chat_url: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Ui(GlobalOptions),
    Command {
        command: CliCommand,
        format: OutputFormat,
        global: GlobalOptions,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    CheckUpdates,
    Paths,
    Items(Option<String>),
    Help,
    Version,
}

#[derive(Serialize)]
struct PathsOutput {
    custom_path: Option<String>,
    default_path_exists: bool,
    plus: String,
    plus_up: String,
}

#[derive(Serialize)]
struct ItemOutput {
    slug: String,
    name: String,
    target_file: String,
    installed: bool,
}

#[derive(Serialize)]
struct UpdateOutput {
    mode: Mode,
    status: String,
}

#[derive(Serialize)]
struct NoticeOutput {
    level: &'static str,
    message: String,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        CliAction::Ui(global) => {
            let mut app = App::initialize(startup(global, Executor::Threaded))?;
            ui::run(&mut app)
        }
        CliAction::Command {
            command,
            format,
            global,
        } => match command {
            CliCommand::Help => {
                print_help();
                Ok(())
            }
            CliCommand::Version => {
                println!("twcompanion v{}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            command => {
                let mut app = App::initialize(startup(global, Executor::Inline))?;
                run_command(&mut app, command, format)
            }
        },
    }
}

fn startup(global: GlobalOptions, executor: Executor) -> StartupOptions {
    StartupOptions {
        backend_url: global.backend_url,
        chat_url: global.chat_url,
        executor,
    }
}

fn parse_args(args: &[String]) -> Result<CliAction> {
    if matches!(args.first().map(|s| s.as_str()), Some("--help" | "-h" | "help")) {
        return Ok(command(CliCommand::Help));
    }
    if matches!(args.first().map(|s| s.as_str()), Some("--version" | "-V" | "version")) {
        return Ok(command(CliCommand::Version));
    }

    let (global, format, tokens) = parse_global_options(args)?;
    let Some(head) = tokens.first() else {
        return Ok(CliAction::Ui(global));
    };
    let command = match head.as_str() {
        "check-updates" | "--check-updates" => CliCommand::CheckUpdates,
        "paths" => CliCommand::Paths,
        "items" => CliCommand::Items(tokens.get(1).cloned()),
        other => bail!("Unknown command: {other} (see --help)"),
    };
    Ok(CliAction::Command {
        command,
        format,
        global,
    })
}

fn command(command: CliCommand) -> CliAction {
    CliAction::Command {
        command,
        format: OutputFormat::Text,
        global: GlobalOptions::default(),
    }
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, OutputFormat, Vec<String>)> {
    let mut global = GlobalOptions::default();
    let mut format = OutputFormat::Text;
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let slot = match flag {
            "--backend" => &mut global.backend_url,
            "--chat" => &mut global.chat_url,
            "--format" => {
                let value = inline.or_else(|| iter.next().cloned());
                let Some(parsed) = value.as_deref().and_then(OutputFormat::parse) else {
                    bail!("--format requires json or text");
                };
                format = parsed;
                continue;
            }
            _ => {
                tokens.push(arg.to_string());
                continue;
            }
        };
        let Some(value) = inline.or_else(|| iter.next().cloned()) else {
            bail!("{flag} requires a URL");
        };
        *slot = Some(value);
    }
    Ok((global, format, tokens))
}

/// Runs a startup pass without the terminal surface and drains every job.
fn settle(app: &mut App, flow: StartupFlow) {
    app.start(flow);
    while !app.is_idle() {
        app.poll_jobs();
    }
}

fn run_command(app: &mut App, command: CliCommand, format: OutputFormat) -> Result<()> {
    settle(app, startup_flow(&command));
    match command {
        CliCommand::CheckUpdates => print_updates(app, format)?,
        CliCommand::Paths => print_paths(app, format)?,
        CliCommand::Items(category) => {
            if let Some(category) = category {
                let Some(index) = app.config.categories.iter().position(|name| *name == category)
                else {
                    bail!("Unknown category: {category}");
                };
                app.select_category(index);
                while !app.is_idle() {
                    app.poll_jobs();
                }
            }
            print_items(app, format)?;
        }
        CliCommand::Help | CliCommand::Version => {}
    }
    print_notices(app, format)
}

/// Only `check-updates` may go on to apply what the check reports.
fn startup_flow(command: &CliCommand) -> StartupFlow {
    match command {
        CliCommand::CheckUpdates => StartupFlow::Full,
        _ => StartupFlow::ReadOnly,
    }
}

fn print_updates(app: &App, format: OutputFormat) -> Result<()> {
    let output: Vec<UpdateOutput> = Mode::ALL
        .into_iter()
        .map(|mode| UpdateOutput {
            mode,
            status: status_text(app.updates.status(mode)),
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => {
            for entry in output {
                println!("{}: {}", entry.mode.display_name(), entry.status);
            }
        }
    }
    Ok(())
}

fn status_text(status: &UpdateStatus) -> String {
    match status {
        UpdateStatus::Idle => "not checked".to_string(),
        UpdateStatus::Checking => "checking".to_string(),
        UpdateStatus::Applying { count } => format!("applying {count} item(s)"),
        UpdateStatus::UpToDate => "up to date".to_string(),
        UpdateStatus::Applied => "updated".to_string(),
        UpdateStatus::PartiallyFailed { paths } => format!("failed: {}", paths.join(", ")),
        UpdateStatus::Failed { error } => format!("error: {error}"),
    }
}

fn print_paths(app: &App, format: OutputFormat) -> Result<()> {
    let output = PathsOutput {
        custom_path: app.paths.custom_path.clone(),
        default_path_exists: app.paths.default_path_exists,
        plus: app.paths.target_display(Mode::Plus),
        plus_up: app.paths.target_display(Mode::PlusUp),
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => {
            println!(
                "Custom path: {}",
                output.custom_path.as_deref().unwrap_or("(none)")
            );
            println!("Default path found: {}", output.default_path_exists);
            println!("PLUS   {}", output.plus);
            println!("PLUSUP {}", output.plus_up);
        }
    }
    Ok(())
}

fn print_items(app: &App, format: OutputFormat) -> Result<()> {
    let output: Vec<ItemOutput> = app
        .reconciler
        .items()
        .iter()
        .map(|item| ItemOutput {
            slug: item.slug.clone(),
            name: item.name.clone(),
            target_file: item.target_file.clone(),
            installed: app.reconciler.is_installed(&item.slug),
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => {
            println!("Category: {}", app.current_category());
            for item in output {
                let mark = if item.installed { "x" } else { " " };
                println!("  [{mark}] {:<24} {}", item.name, item.target_file);
            }
        }
    }
    Ok(())
}

fn print_notices(app: &mut App, format: OutputFormat) -> Result<()> {
    let mut output: Vec<NoticeOutput> = app
        .notices
        .take_toasts()
        .into_iter()
        .map(|toast| NoticeOutput {
            level: level_label(toast.level),
            message: toast.message,
        })
        .collect();
    output.extend(app.notices.persistent().iter().map(|notice| NoticeOutput {
        level: "notice",
        message: format!("{}. {}", notice.title(), notice.detail()),
    }));
    match format {
        OutputFormat::Json => eprintln!("{}", serde_json::to_string(&output)?),
        OutputFormat::Text => {
            for notice in output {
                eprintln!("[{}] {}", notice.level, notice.message);
            }
        }
    }
    Ok(())
}

fn level_label(level: ToastLevel) -> &'static str {
    match level {
        ToastLevel::Info => "info",
        ToastLevel::Success => "ok",
        ToastLevel::Warn => "warn",
        ToastLevel::Error => "error",
    }
}

fn print_help() {
    println!("twcompanion v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  twcompanion                      Launch the terminal UI");
    println!("  twcompanion check-updates        Check installed modes for content updates");
    println!("  twcompanion paths                Show the detected game paths");
    println!("  twcompanion items [category]     List a catalog with install state");
    println!();
    println!("Global options:");
    println!("  --backend <url>                  Backend base URL for this run");
    println!("  --chat <url>                     Chat server URL for this run");
    println!("  --format <json|text>             Output format for commands");
    println!("  -h, --help                       Show help");
    println!("  -V, --version                    Show version");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_arguments_launch_the_ui() {
        assert_eq!(
            parse_args(&[]).expect("parse"),
            CliAction::Ui(GlobalOptions::default())
        );
    }

    #[test]
    fn url_overrides_accept_both_spellings() {
        let action = parse_args(&args(&[
            "--backend",
            "http://10.0.0.5:8787",
            "--chat=ws://10.0.0.5:8787/ws/chat",
            "--check-updates",
            "--format",
            "json",
        ]))
        .expect("parse");
        assert_eq!(
            action,
            CliAction::Command {
                command: CliCommand::CheckUpdates,
                format: OutputFormat::Json,
                global: GlobalOptions {
                    backend_url: Some("http://10.0.0.5:8787".to_string()),
                    chat_url: Some("ws://10.0.0.5:8787/ws/chat".to_string()),
                },
            }
        );
    }

    #[test]
    fn only_check_updates_runs_the_update_flow() {
        assert_eq!(startup_flow(&CliCommand::CheckUpdates), StartupFlow::Full);
        assert_eq!(startup_flow(&CliCommand::Paths), StartupFlow::ReadOnly);
        assert_eq!(
            startup_flow(&CliCommand::Items(Some("room".to_string()))),
            StartupFlow::ReadOnly
        );
    }

    #[test]
    fn missing_flag_value_is_an_error() {
        assert!(parse_args(&args(&["paths", "--backend"])).is_err());
        assert!(parse_args(&args(&["frobnicate"])).is_err());
    }
}
