//! Projection of TokenBank events into queryable entities.
//!
//! Every bank event becomes exactly one immutable entity keyed by the
//! emitting transaction hash and log index. The [`EventScanner`] plays the
//! indexing host: it pulls the bank's logs in block order and hands each one
//! to [`project_log`].

pub mod dispatch;
pub mod entity;
pub mod handler;
pub mod scanner;
pub mod store;

pub use dispatch::project_log;
pub use entity::{Entity, EntityId, EntityKind, EventMeta};
pub use scanner::{EventScanner, ScanSummary};
pub use store::{MemoryStore, Store};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The host delivered a log without a required metadata field.
    #[error("log is missing {0}")]
    MissingField(&'static str),

    #[error("log index {0} does not fit in i32")]
    LogIndexOverflow(u64),

    #[error("failed to decode log: {0}")]
    Decode(String),
}
