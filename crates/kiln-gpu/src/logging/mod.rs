//! Logging utilities.
//!
//! Centralizes logger initialization; everything else in the crate only uses
//! the `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig};
