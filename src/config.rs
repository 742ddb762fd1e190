use crate::error::ComplianceError;

pub const DEFAULT_TARGET_YEAR: i32 = 2026;
pub const DEFAULT_REDUCTION_FRACTION: f64 = 0.05;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Compliance year the benchmark applies to.
    pub target_year: i32,
    /// Fraction the fleet average is reduced by to obtain the target, in [0, 1).
    pub reduction_fraction: f64,
    /// Share of records held out for model evaluation, in (0, 1).
    pub test_fraction: f64,
    /// Seed for the train/test shuffle.
    pub split_seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_year: DEFAULT_TARGET_YEAR,
            reduction_fraction: DEFAULT_REDUCTION_FRACTION,
            test_fraction: DEFAULT_TEST_FRACTION,
            split_seed: DEFAULT_SPLIT_SEED,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ComplianceError> {
        validate_reduction(self.reduction_fraction)?;
        if !self.test_fraction.is_finite() || self.test_fraction <= 0.0 || self.test_fraction >= 1.0
        {
            return Err(ComplianceError::InvalidConfig(format!(
                "test fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }

    pub fn reduction_percentage(&self) -> f64 {
        self.reduction_fraction * 100.0
    }
}

pub fn validate_reduction(fraction: f64) -> Result<(), ComplianceError> {
    if !fraction.is_finite() || !(0.0..1.0).contains(&fraction) {
        return Err(ComplianceError::InvalidConfig(format!(
            "reduction fraction must be in [0, 1), got {fraction}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.reduction_percentage() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_out_of_range_fractions() {
        for reduction in [1.0, -0.1, f64::NAN] {
            let config = PipelineConfig {
                reduction_fraction: reduction,
                ..PipelineConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ComplianceError::InvalidConfig(_))
            ));
        }

        let config = PipelineConfig {
            test_fraction: 0.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_reduction_is_allowed() {
        assert!(validate_reduction(0.0).is_ok());
    }
}
