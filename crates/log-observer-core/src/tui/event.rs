//! Event handling for the TUI

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::models::{ConnectionStatus, StreamKind};
use crate::viewer::TabOutcome;

/// TUI events
#[derive(Debug)]
pub enum Event {
    /// Terminal tick, drives debounce and auto-refresh timers
    Tick,
    /// Keyboard event
    Key(KeyEvent),
    /// Mouse event
    Mouse(crossterm::event::MouseEvent),
    /// Terminal resize
    Resize(u16, u16),
    /// A background record fetch finished
    Fetched(TabOutcome),
    /// A filter bar changed its valid conditions
    FiltersChanged(StreamKind, Vec<String>),
    /// Connection status was checked or reconfigured
    Connection {
        status: ConnectionStatus,
        configured: bool,
    },
    /// Error occurred
    Error(String),
}

/// Handles events from terminal and other sources
pub struct EventHandler {
    /// Sender for events
    tx: mpsc::UnboundedSender<Event>,
    /// Receiver for events
    rx: mpsc::UnboundedReceiver<Event>,
    /// Tick rate
    tick_rate: Duration,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, tick_rate }
    }

    /// Get a sender to inject events
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Start polling the terminal
    pub fn start(&self) {
        let tick_rate = self.tick_rate;
        let tx = self.tx.clone();

        tokio::task::spawn_blocking(move || {
            let mut last_tick = std::time::Instant::now();

            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::ZERO);

                if event::poll(timeout).unwrap_or(false) {
                    let forwarded = match event::read() {
                        Ok(CrosstermEvent::Key(key)) => Some(Event::Key(key)),
                        Ok(CrosstermEvent::Mouse(mouse)) => Some(Event::Mouse(mouse)),
                        Ok(CrosstermEvent::Resize(w, h)) => Some(Event::Resize(w, h)),
                        Ok(_) => None,
                        Err(e) => Some(Event::Error(e.to_string())),
                    };
                    if let Some(event) = forwarded {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = std::time::Instant::now();
                }
            }
        });
    }

    /// Get the next event
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Check if a key event matches a key binding
pub fn key_match(key: KeyEvent, code: KeyCode, modifiers: KeyModifiers) -> bool {
    key.code == code && key.modifiers == modifiers
}

/// Check if key is quit command (q or Ctrl+C)
pub fn is_quit(key: KeyEvent) -> bool {
    key_match(key, KeyCode::Char('q'), KeyModifiers::NONE)
        || key_match(key, KeyCode::Char('c'), KeyModifiers::CONTROL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_quit() {
        assert!(is_quit(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
    }

    #[tokio::test]
    async fn test_injected_events_are_delivered() {
        let mut events = EventHandler::new(Duration::from_millis(250));
        events
            .sender()
            .send(Event::Error("boom".to_string()))
            .unwrap();
        assert!(matches!(events.next().await, Some(Event::Error(msg)) if msg == "boom"));
    }
}
