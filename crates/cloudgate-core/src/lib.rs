// Intent model consumed by every evaluator
pub mod intent;

// Configuration types shared across all cloudgate crates
pub mod config;

// Re-export commonly used types for convenience
pub use config::{ConfigError, GateConfig, RegionRequirement};
pub use intent::{Confidence, ExtractedIntent, IntentKind, Operation};
