//! Cloudgate intent gate
//!
//! Decides whether an extracted intent may run: PROCEED, CLARIFY, CONFIRM or
//! REJECT. The gate layers completeness, confidence, policy, safety and
//! resource-limit checks and is pure: the same intent, configuration and
//! policies always produce the same result.

pub mod confirmation;
pub mod decision;
pub mod gate;
pub mod settings;

pub use confirmation::process_confirmation;
pub use decision::{GateDecision, GateResult};
pub use gate::{IntentGate, evaluate};
pub use settings::{GateSettings, PolicySource, SettingsError};
