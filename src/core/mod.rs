// SLogViz - core/mod.rs
//
// Core business logic layer.
// Dependencies: util only, plus pure crates (chrono, regex, serde, toml).
// Must NOT depend on: platform, app, or touch the filesystem.

pub mod analysis;
pub mod correlation;
pub mod dispatch;
pub mod eventlog;
pub mod filter;
pub mod history;
pub mod model;
pub mod rules;
pub mod snapshot;
pub mod syslog;
pub mod timestamp;
