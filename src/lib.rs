//! Meta-command interpreter and driver capability layer for a multi-backend SQL client.
//!
//! - [`db`]: driver descriptors, the process-wide registry, connections and transactions
//! - [`metadata`]: catalog readers and the default report writer
//! - [`metacmd`]: backslash command catalog, parsing and dispatch
//! - [`session`]: the [`metacmd::Handler`] backing an interactive client

pub mod config;
pub mod db;
pub mod logging;
pub mod metacmd;
pub mod metadata;
pub mod session;

pub use config::Config;
pub use db::{DatabaseError, DriverDescriptor, DriverRegistry};
pub use metacmd::{dispatch, MetaError};
pub use session::Session;
