pub mod analytics;
pub mod config;
pub mod event;
pub mod track;

// Re-export everything for convenience
pub use analytics::*;
pub use config::*;
pub use event::*;
pub use track::*;
