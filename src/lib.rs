pub mod cli;
mod config;
mod error;
mod session;
mod store;

pub use config::Config;
pub use error::{Result, SessionError};
pub use session::{
    IssueType, Metadata, MetadataSlot, NewSession, ReferrerUpdate, Session, SessionTiming,
    METADATA_SLOTS,
};
pub use store::{Pool, SessionStore, SqlitePool, MAX_TEXT_CHARS, SCHEMA};
