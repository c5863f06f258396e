//! Record list state, fetch orchestration and view models
//!
//! - `stream`: per-stream configuration (endpoints, keys, levels, chart colors)
//! - `controller`: the generic list controller
//! - `tabs`: the coordinator owning both lists
//! - `render` / `format`: render-ready view models and text formatting

pub mod controller;
pub mod format;
pub mod render;
pub mod stream;
pub mod tabs;

pub use controller::{
    looks_like_query_id, ControllerState, FetchOutcome, ListOptions, ListView, PendingFetch, RecordList,
    RecordListController, RowView,
};
pub use render::{
    highlight, ChartBar, ChartSegment, ChartView, PaginationView, RecordView, Segment, StatCounter,
};
pub use stream::{Logs, Queries, QueryIdLink, RecordKind, StreamConfig, LOGS, QUERIES};
pub use tabs::{TabCoordinator, TabFetch, TabOutcome};
