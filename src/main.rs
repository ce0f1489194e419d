mod actions;
mod app;
mod backend;
mod chat;
mod cli;
mod config;
mod error;
mod game;
mod launch;
mod log;
mod notice;
mod rate_limit;
mod reconcile;
mod resolution;
mod transport;
mod ui;
mod update;
mod view;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
