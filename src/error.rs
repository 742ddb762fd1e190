use thiserror::Error;

use crate::models::ComplianceStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComplianceError {
    /// Ship type outside the basis fixed at encoder construction.
    #[error("unknown ship type {ship_type:?} for vessel {vessel_id}")]
    Encoding {
        vessel_id: String,
        ship_type: String,
    },

    #[error("model has not been fitted")]
    UnfittedModel,

    #[error("regression needs at least 2 distinct samples, got {0}")]
    InsufficientSamples(usize),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("least-squares solve failed: {0}")]
    Numerical(String),

    /// No voyage has a defined intensity, so no benchmark can be set.
    #[error("no voyages with a defined GHG intensity")]
    EmptyFleet,

    #[error("invalid pairing: deficit side is {deficit}, surplus side is {surplus}")]
    InvalidPairing { deficit: String, surplus: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("row {row} (vessel {vessel_id}): {reason}")]
    InvalidRecord {
        row: usize,
        vessel_id: String,
        reason: String,
    },
}

impl ComplianceError {
    pub(crate) fn invalid_pairing(
        deficit: Option<ComplianceStatus>,
        surplus: Option<ComplianceStatus>,
    ) -> Self {
        let label = |status: Option<ComplianceStatus>| match status {
            Some(status) => status.to_string(),
            None => "undefined".to_string(),
        };
        ComplianceError::InvalidPairing {
            deficit: label(deficit),
            surplus: label(surplus),
        }
    }
}
