pub mod batch;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod io;
pub mod link;
pub mod registry;
pub mod types;

pub use error::{RelayError, Result};
