use crate::config::validate_reduction;
use crate::error::ComplianceError;
use crate::models::ComplianceStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkEngine {
    reduction_fraction: f64,
}

impl BenchmarkEngine {
    pub fn new(reduction_fraction: f64) -> Result<Self, ComplianceError> {
        validate_reduction(reduction_fraction)?;
        Ok(Self { reduction_fraction })
    }

    pub fn target(&self, fleet_average: f64) -> f64 {
        fleet_average * (1.0 - self.reduction_fraction)
    }

    pub fn balance(&self, intensity: f64, target: f64) -> f64 {
        target - intensity
    }

    /// Zero counts as surplus.
    pub fn classify(&self, balance: f64) -> ComplianceStatus {
        if balance >= 0.0 {
            ComplianceStatus::Surplus
        } else {
            ComplianceStatus::Deficit
        }
    }

    /// Balance and status for a voyage, both `None` when its intensity is undefined.
    pub fn position(
        &self,
        intensity: Option<f64>,
        target: f64,
    ) -> (Option<f64>, Option<ComplianceStatus>) {
        match intensity {
            Some(intensity) => {
                let balance = self.balance(intensity, target);
                (Some(balance), Some(self.classify(balance)))
            }
            None => (None, None),
        }
    }
}
