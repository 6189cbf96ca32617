mod action;
mod api;
mod app;
mod auth;
mod cli;
mod config;
mod error;
mod event;
mod github;
mod logging;
mod paginator;
mod sources;
mod tui;
mod types;
mod ui;

use std::panic;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::api::GitHubApi;
use crate::app::App;
use crate::cli::Cli;
use crate::config::Config;
use crate::event::Event;
use crate::github::GitHub;
use crate::logging::LogMode;
use crate::tui::EventHandler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init(if cli.command.is_some() {
        LogMode::Headless
    } else {
        LogMode::Tui
    });

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    // Anonymous access works, just with a lower rate limit
    let token = auth::load_token(&config.github);
    let api: Arc<dyn GitHubApi> = Arc::new(GitHub::new(&config.github.api_url, token)?);

    if let Some(command) = cli.command {
        let mut stdout = std::io::stdout().lock();
        cli::run(command, api, &config, &mut stdout).await?;
        return Ok(());
    }

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let result = run(api, &config, cli.query).await;

    // Restore terminal
    tui::restore()?;

    result
}

async fn run(
    api: Arc<dyn GitHubApi>,
    config: &Config,
    query: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = tui::init()?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut app = App::new(api, config, action_tx.clone(), query);

    let tick_rate = Duration::from_millis(250);
    let render_rate = Duration::from_millis(16); // ~60fps
    let mut events = EventHandler::new(tick_rate, render_rate);

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                if event.is_quit() {
                    break;
                }

                match event {
                    Event::Render => {
                        terminal.draw(|frame| ui::render(frame, &app))?;
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
