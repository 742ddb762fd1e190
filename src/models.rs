use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One voyage as loaded from the operating records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyageRecord {
    #[serde(alias = "ship_id")]
    pub vessel_id: String,
    pub ship_type: String,
    pub route_id: String,
    pub month: String,
    pub distance: f64,
    pub fuel_type: String,
    pub fuel_consumption: f64,
    #[serde(alias = "CO2_emissions")]
    pub co2_emission: f64,
    #[serde(default)]
    pub weather_conditions: Option<String>,
    #[serde(default)]
    pub engine_efficiency: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Surplus,
    Deficit,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceStatus::Surplus => write!(f, "Surplus"),
            ComplianceStatus::Deficit => write!(f, "Deficit"),
        }
    }
}

/// A voyage with its prediction and compliance position.
///
/// `ghg_intensity`, `compliance_balance` and `status` are `None` for
/// zero-distance voyages and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedVoyageRecord {
    pub vessel_id: String,
    pub ship_type: String,
    pub route_id: String,
    pub month: String,
    pub distance: f64,
    pub fuel_type: String,
    pub fuel_consumption: f64,
    pub co2_emission: f64,
    pub co2_predicted: f64,
    pub ghg_intensity: Option<f64>,
    pub target_intensity: f64,
    pub compliance_balance: Option<f64>,
    pub status: Option<ComplianceStatus>,
    pub weather_conditions: Option<String>,
    pub engine_efficiency: Option<f64>,
}

impl EnrichedVoyageRecord {
    pub fn is_surplus(&self) -> bool {
        self.status == Some(ComplianceStatus::Surplus)
    }

    pub fn is_deficit(&self) -> bool {
        self.status == Some(ComplianceStatus::Deficit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionScores {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub test_rmse: f64,
    pub test_mae: f64,
    pub test_r2: f64,
    pub train_rmse: f64,
    pub train_mae: f64,
    pub train_r2: f64,
    pub train_samples: usize,
    pub test_samples: usize,
}

impl ModelMetrics {
    pub fn new(
        train: RegressionScores,
        test: RegressionScores,
        train_samples: usize,
        test_samples: usize,
    ) -> Self {
        Self {
            test_rmse: test.rmse,
            test_mae: test.mae,
            test_r2: test.r2,
            train_rmse: train.rmse,
            train_mae: train.mae,
            train_r2: train.r2,
            train_samples,
            test_samples,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub target_year: i32,
    pub fleet_average_intensity: f64,
    pub target_intensity: f64,
    pub reduction_percentage: f64,
    pub total_vessels: usize,
    pub surplus_count: usize,
    pub deficit_count: usize,
    pub undefined_intensity_count: usize,
    pub total_surplus: f64,
    pub total_deficit: f64,
    pub net_position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub model_performance: ModelMetrics,
    pub compliance_summary: FleetSummary,
}

/// Snapshot produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceDataset {
    pub metadata: DatasetMetadata,
    pub vessels: Vec<EnrichedVoyageRecord>,
}

/// Result of offsetting one deficit voyage against one surplus voyage.
#[derive(Debug, Clone, Serialize)]
pub struct PoolingOutcome<'a> {
    pub deficit: &'a EnrichedVoyageRecord,
    pub surplus: &'a EnrichedVoyageRecord,
    pub deficit_balance: f64,
    pub surplus_balance: f64,
    pub net_balance: f64,
    pub success: bool,
    pub remaining_deficit: f64,
    pub remaining_surplus: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShipTypeSummary {
    pub ship_type: String,
    pub count: usize,
    pub surplus_count: usize,
    pub deficit_count: usize,
    pub avg_intensity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuelAnomaly {
    pub index: usize,
    pub vessel_id: String,
    pub ship_type: String,
    pub route_id: String,
    pub month: String,
    pub fuel_efficiency: f64,
    pub z_score: f64,
    pub ship_type_deviation_pct: f64,
    pub fleet_deviation_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherEfficiency {
    pub ship_type: String,
    pub weather_conditions: String,
    pub count: usize,
    pub mean: f64,
}

/// A voyage burning more fuel per km than its ship type's mean under a given condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyFlag {
    pub index: usize,
    pub vessel_id: String,
    pub ship_type: String,
    pub route_id: String,
    pub month: String,
    pub weather_conditions: Option<String>,
    pub engine_efficiency: Option<f64>,
    pub fuel_efficiency: f64,
    pub ship_type_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyStats {
    pub ship_type: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}
