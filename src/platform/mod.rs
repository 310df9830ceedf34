// SLogViz - platform/mod.rs
//
// Platform abstraction layer: file reads and config.toml.
// Dependencies: util, the pure timestamp helpers in core, directories, toml.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
