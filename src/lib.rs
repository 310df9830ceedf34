// SLogViz - lib.rs
//
// Library entry point. The batch driver in `main.rs` and the integration
// tests use the same public surface.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;

pub use crate::app::import::{
    export_collection, import_batch, import_collection, BatchImport, ImportOptions,
};
pub use crate::core::analysis::{
    analyze_buckets, analyze_collapse, analyze_order, analyze_series, merge_timeline,
};
pub use crate::core::correlation::{CorrelationRule, RuleRegistry};
pub use crate::core::dispatch::{dispatch, SourceFormat};
pub use crate::core::model::{FormatKind, ImportReport, LogCollection, LogEntry};
