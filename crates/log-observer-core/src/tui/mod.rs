//! Terminal User Interface for Log Observer
//!
//! Shows the log and query history lists with search, filters, stats and the
//! time-distribution chart. Fetches run on background tasks and report back
//! through the event channel.

mod app;
mod components;
mod event;
mod ui;

use std::sync::Arc;

pub use app::{App, InputMode};
pub use event::{Event, EventHandler};

use crate::client::{Backend, ConnectionHandle};
use crate::config::Config;
use crate::error::Result;

/// Run the viewer against `backend` until the user quits
pub async fn run(config: &Config, backend: Arc<dyn Backend>) -> Result<()> {
    let events = EventHandler::new(config.tui.tick_rate);
    let mut app = App::new(backend, ConnectionHandle::default(), config, events.sender());
    app.run(events).await
}
