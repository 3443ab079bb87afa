use std::sync::Arc;

use anyhow::Result;
use samurai_core::{Alerts, Config, SamuraiClient, SessionCredentials};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init()?;

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load config, using defaults");
        Config::new()
    });
    let settings = config.resolve();

    let credentials = Arc::new(SessionCredentials::new());
    if let Some(token) = config.token() {
        credentials.set_token(token);
    }

    let (alerts, alert_rx) = Alerts::channel();
    let client = SamuraiClient::connect(&settings, credentials, alerts.clone())?;
    let mut app = App::new(client, alerts, config.token_source());

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(alert_rx);

    handler::mount(&app);
    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
