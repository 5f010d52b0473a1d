use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

use crate::tui::app::Outcome;

pub enum Event {
    /// Terminal tick
    Tick,
    /// Key press
    Key(KeyEvent),
    /// Terminal resize
    Resize(u16, u16),
    /// A spawned action finished
    ActionDone(Outcome),
}

pub struct EventHandler {
    receiver: mpsc::Receiver<Event>,
    // Weak, so the channel still closes when the polling thread stops.
    sender: mpsc::WeakSender<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(100);
        let weak = sender.downgrade();

        // crossterm polling blocks, so it gets its own thread
        tokio::task::spawn_blocking(move || {
            let mut last_tick = Instant::now();

            loop {
                let timeout = tick_rate.saturating_sub(last_tick.elapsed());

                let polled = match event::poll(timeout) {
                    Ok(ready) => ready,
                    Err(e) => {
                        warn!("terminal poll failed: {}", e);
                        return;
                    }
                };

                if polled {
                    let event = match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
                        Ok(CrosstermEvent::Resize(width, height)) => Some(Event::Resize(width, height)),
                        Ok(_) => None,
                        Err(e) => {
                            warn!("terminal read failed: {}", e);
                            return;
                        }
                    };
                    if let Some(event) = event {
                        if sender.blocking_send(event).is_err() {
                            return;
                        }
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if sender.blocking_send(Event::Tick).is_err() {
                        return;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { receiver, sender: weak }
    }

    /// A sender for reporting back into the loop, if it is still open.
    pub fn sender(&self) -> Option<mpsc::Sender<Event>> {
        self.sender.upgrade()
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}
