//! # Log Observer
//!
//! Terminal viewer for the log history and query history of a database
//! cluster.
//!
//! Log Observer reads paginated, filtered, time-bounded records from an HTTP
//! backend and renders them with search highlighting, level counters and a
//! time-distribution chart.
//!
//! ## Architecture
//!
//! - **Viewer**: record list controllers, tab switching and render-ready views
//! - **Filter**: WHERE-condition recognizer, field catalog and the filter bar
//! - **Client**: the backend trait and its reqwest implementation
//! - **API**: a demo backend serving generated history over axum
//! - **TUI**: ratatui front-end
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve generated data
//! log-observer demo-server
//!
//! # Open the viewer
//! log-observer tui
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod timer;
pub mod tui;
pub mod viewer;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::client::{ApiClient, Backend, ConnectionHandle};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::filter::SmartFilter;
    pub use crate::models::*;
    pub use crate::viewer::{Logs, Queries, RecordList, RecordListController, TabCoordinator};
}
