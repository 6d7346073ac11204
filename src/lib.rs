// Library interface for pacewise
// This allows integration tests and benches to access internal modules

pub mod config;
pub mod errors;
pub mod pace;
pub mod timing;
pub mod writer;

// Re-export commonly used types
pub use config::AnalyzerConfig;
pub use errors::PaceError;
pub use pace::{DeviationRule, FilterParameters, GroupingMode, ResultRow, SessionWindow, analyze};
pub use timing::{LapRecord, Session, load_session, read_session};
