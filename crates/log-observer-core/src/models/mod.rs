//! Data models for Log Observer

mod connection;
mod page;
mod record;
mod request;

pub use connection::*;
pub use page::*;
pub use record::*;
pub use request::*;
