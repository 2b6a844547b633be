//! Code intelligence core: resolves which uploaded LSIF dumps can answer a
//! query at a commit, manages the upload lifecycle, pages through uploads with
//! opaque cursors, and ranks repositories by code intelligence usage.
//!
//! Everything is backed by a single SQLite database (see [`store`]). Version
//! control and bundle reading are collaborator traits supplied by the host
//! ([`vcs::VersionControl`], [`query::locations::BundleReader`]).
//! [`resolver::CodeIntelResolver`] ties the pieces together for a transport
//! layer.

pub mod config;
pub mod errors;
pub mod models;
pub mod query;
pub mod resolver;
pub mod store;
pub mod telemetry;
pub mod vcs;

pub use config::Config;
pub use errors::{CodeIntelError, CodeIntelResult};
pub use resolver::CodeIntelResolver;
