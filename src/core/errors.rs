/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::EntityId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export domain errors defined next to their types
pub use crate::admission::BreakerState;
pub use crate::lifecycle::LifecycleError;

/// Admission-path errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum AdmissionError {
    #[error("Admission denied: host under critical resource pressure")]
    #[diagnostic(
        code(admission::pressure_critical),
        help("The host is saturated. Wait for pressure to drop below critical.")
    )]
    PressureCritical,

    #[error("Admission throttled: spawn rate multiplier at {multiplier_pct}%")]
    #[diagnostic(
        code(admission::throttled),
        help("Elevated host pressure is rate-limiting admissions. Retry later.")
    )]
    Throttled { multiplier_pct: u8 },

    #[error("Admission denied: circuit breaker is {state}")]
    #[diagnostic(
        code(admission::breaker_denied),
        help("Recent admissions are failing. The breaker will probe recovery on its own.")
    )]
    BreakerDenied { state: BreakerState },

    #[error("Entity {0} not found")]
    #[diagnostic(
        code(admission::entity_not_found),
        help("The entity may already be removed or was never admitted.")
    )]
    EntityNotFound(EntityId),

    #[error(transparent)]
    #[diagnostic(code(admission::lifecycle))]
    Lifecycle(#[from] LifecycleError),
}

/// Admission operation result
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Configuration loading errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    #[diagnostic(
        code(config::unreadable),
        help("Check that the path in SWARM_CONFIG_PATH exists and is readable.")
    )]
    Unreadable { path: String, reason: String },

    #[error("Failed to parse config: {0}")]
    #[diagnostic(
        code(config::parse),
        help("The config file must be valid JSON matching the documented schema.")
    )]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(config::invalid),
        help("One or more values violate a documented constraint.")
    )]
    Invalid(String),
}
