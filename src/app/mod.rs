// SLogViz - app/mod.rs
//
// Application layer: import and export orchestration, rule loading.
// Dependencies: core, platform, rusqlite, evtx, rayon.

pub mod import;
pub mod rule_mgr;
