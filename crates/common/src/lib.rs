//! Common utilities and types shared across watchdog components.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
