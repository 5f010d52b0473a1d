pub mod app;
pub mod components;
pub mod event;
pub mod list_state;
pub mod location;
pub mod screens;
pub mod theme;
pub mod ui;

pub use app::App;
pub use location::Location;

use crate::{
    config::Config,
    error::Result,
    reclamation::{ReclamationApi, ReclamationService},
};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use event::{Event, EventHandler};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use tracing::{info, warn};

type Tui = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the interactive list until the user quits. Returns the location the
/// session ended on.
pub async fn run_tui<A: ReclamationApi>(
    config: &Config,
    service: ReclamationService<A>,
    location: Location,
) -> Result<Location> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(service, config.list.page_size, location, config.api.base_url.clone());
    app.activity.push(app::LogLevel::Info, format!("Connected to {}", config.api.base_url));

    let result = event_loop(&mut terminal, &mut app, config).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        warn!("failed to restore terminal: {}", e);
    }
    result?;

    let location = app.history.current().clone();
    info!(%location, "tui closed");
    Ok(location)
}

async fn event_loop<A: ReclamationApi>(terminal: &mut Tui, app: &mut App<A>, config: &Config) -> Result<()> {
    let mut events = EventHandler::new(config.tick_rate());

    while !app.should_quit {
        app.refresh();
        terminal.draw(|frame| ui::render_ui(frame, app))?;

        match events.next().await {
            Some(Event::Key(key)) => {
                let task = app.handle_key(key).and_then(|action| app.start(action));
                if let (Some(task), Some(sender)) = (task, events.sender()) {
                    tokio::spawn(async move {
                        let outcome = task.await;
                        let _ = sender.send(Event::ActionDone(outcome)).await;
                    });
                }
            }
            Some(Event::ActionDone(outcome)) => app.finish(outcome),
            Some(Event::Tick) | Some(Event::Resize(_, _)) => {}
            None => break,
        }
    }
    Ok(())
}
