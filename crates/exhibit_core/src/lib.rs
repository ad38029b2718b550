//! Exhibit Core - background assembly of exhibit packages
//!
//! This crate turns a set of supporting documents into one numbered,
//! optionally compressed exhibit package with a table of contents and
//! ancillary documents. It has no UI dependencies and is driven through
//! [`session::AssemblySession`] or directly through
//! [`processor::BackgroundProcessor`].

pub mod collaborators;
pub mod config;
pub mod logging;
pub mod models;
pub mod numbering;
pub mod orchestrator;
pub mod processor;
pub mod session;
pub mod state;

pub use processor::{BackgroundProcessor, ProgressHandle};
pub use session::{AssemblySession, SessionView};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
