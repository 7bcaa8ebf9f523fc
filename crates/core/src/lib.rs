// crates/core/src/lib.rs
pub mod error;
pub mod types;
pub mod parser;
pub mod cache;
pub mod indexer;
pub mod sessions;
pub mod ranks;
pub mod modifiers;
pub mod analyzer;
pub mod stats;
pub mod activity;
pub mod settings;
pub mod metrics;
pub mod paths;

pub use error::*;
pub use types::*;
pub use parser::*;
pub use cache::{CacheSnapshot, CacheStore, FileInfoMap};
pub use indexer::{scan, scan_with, ScanOptions};
pub use sessions::*;
pub use ranks::enrich;
pub use modifiers::{parse_modifiers, scenario_family, ModifierKind, ScenarioFamily};
pub use analyzer::{analyze_session, SessionSummary, DEFAULT_FLOW_WINDOW};
pub use settings::SettingsStore;
