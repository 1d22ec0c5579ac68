pub mod batch;
pub mod classify;
pub mod config;
pub mod credentials;
pub mod dry_run;
pub mod extract;
