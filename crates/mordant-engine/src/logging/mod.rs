//! Logger setup.
//!
//! Everything in the engine logs through the `log` facade; this module only
//! decides which backend receives the records.

mod init;

pub use init::{init_logging, LoggingConfig};
