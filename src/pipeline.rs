use chrono::{DateTime, Utc};

use crate::benchmark::BenchmarkEngine;
use crate::config::PipelineConfig;
use crate::encoder::{FeatureEncoder, ShipTypeBasis};
use crate::error::ComplianceError;
use crate::intensity::{fleet_average, ghg_intensity};
use crate::models::{
    ComplianceDataset, DatasetMetadata, EnrichedVoyageRecord, FleetSummary, ModelMetrics,
    VoyageRecord,
};
use crate::regression::{train_test_split, LinearRegression};

pub fn run_pipeline(
    records: &[VoyageRecord],
    config: &PipelineConfig,
    generated_at: DateTime<Utc>,
) -> Result<ComplianceDataset, ComplianceError> {
    config.validate()?;
    let engine = BenchmarkEngine::new(config.reduction_fraction)?;

    let encoder = FeatureEncoder::new(ShipTypeBasis::from_records(records));
    let features = encoder.encode_all(records)?;
    let targets: Vec<f64> = records.iter().map(|r| r.co2_emission).collect();
    tracing::info!(
        records = records.len(),
        ship_types = encoder.basis().len(),
        dimension = encoder.dimension(),
        "encoded voyage features"
    );

    let split = train_test_split(records.len(), config.test_fraction, config.split_seed)?;
    let (train_x, train_y) = select(&features, &targets, &split.train);
    let (test_x, test_y) = select(&features, &targets, &split.test);

    let mut model = LinearRegression::new();
    model.fit(&train_x, &train_y)?;
    let train_scores = model.evaluate(&train_x, &train_y)?;
    let test_scores = model.evaluate(&test_x, &test_y)?;
    let metrics = ModelMetrics::new(train_scores, test_scores, train_x.len(), test_x.len());
    tracing::info!(
        train = split.train.len(),
        test = split.test.len(),
        test_rmse = metrics.test_rmse,
        test_mae = metrics.test_mae,
        test_r2 = metrics.test_r2,
        "trained emission model"
    );

    tracing::debug!(
        ship_types = ?encoder.basis().ship_types(),
        coefficients = ?model.coefficients(),
        intercept = ?model.intercept(),
        "emission model parameters"
    );

    // every voyage, training rows included; metrics stay test-only
    let predictions = model.predict(&features)?;

    let intensities: Vec<Option<f64>> = records
        .iter()
        .map(|r| ghg_intensity(r.co2_emission, r.distance))
        .collect();
    let undefined = intensities.iter().filter(|i| i.is_none()).count();
    if undefined > 0 {
        tracing::warn!(
            undefined,
            "voyages with zero distance have no GHG intensity and are excluded from the benchmark"
        );
    }

    let average = fleet_average(intensities.iter().copied())?;
    let target = engine.target(average);
    tracing::info!(
        fleet_average_intensity = average,
        target_intensity = target,
        target_year = config.target_year,
        "computed regulatory benchmark"
    );

    let vessels: Vec<EnrichedVoyageRecord> = records
        .iter()
        .zip(predictions)
        .zip(intensities)
        .map(|((record, co2_predicted), intensity)| {
            let (compliance_balance, status) = engine.position(intensity, target);
            EnrichedVoyageRecord {
                vessel_id: record.vessel_id.clone(),
                ship_type: record.ship_type.clone(),
                route_id: record.route_id.clone(),
                month: record.month.clone(),
                distance: record.distance,
                fuel_type: record.fuel_type.clone(),
                fuel_consumption: record.fuel_consumption,
                co2_emission: record.co2_emission,
                co2_predicted,
                ghg_intensity: intensity,
                target_intensity: target,
                compliance_balance,
                status,
                weather_conditions: record.weather_conditions.clone(),
                engine_efficiency: record.engine_efficiency,
            }
        })
        .collect();

    let summary = summarize_fleet(&vessels, config, average, target);
    tracing::info!(
        total = summary.total_vessels,
        surplus = summary.surplus_count,
        deficit = summary.deficit_count,
        net_position = summary.net_position,
        "classified fleet"
    );

    Ok(ComplianceDataset {
        metadata: DatasetMetadata {
            generated_at,
            total_records: vessels.len(),
            model_performance: metrics,
            compliance_summary: summary,
        },
        vessels,
    })
}

fn select(features: &[Vec<f64>], targets: &[f64], indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    indices
        .iter()
        .map(|&i| (features[i].clone(), targets[i]))
        .unzip()
}

pub fn summarize_fleet(
    vessels: &[EnrichedVoyageRecord],
    config: &PipelineConfig,
    fleet_average_intensity: f64,
    target_intensity: f64,
) -> FleetSummary {
    let mut summary = FleetSummary {
        target_year: config.target_year,
        fleet_average_intensity,
        target_intensity,
        reduction_percentage: config.reduction_percentage(),
        total_vessels: vessels.len(),
        surplus_count: 0,
        deficit_count: 0,
        undefined_intensity_count: 0,
        total_surplus: 0.0,
        total_deficit: 0.0,
        net_position: 0.0,
    };

    for vessel in vessels {
        match vessel.compliance_balance {
            Some(balance) if vessel.is_surplus() => {
                summary.surplus_count += 1;
                summary.total_surplus += balance;
            }
            Some(balance) => {
                summary.deficit_count += 1;
                summary.total_deficit += balance;
            }
            None => summary.undefined_intensity_count += 1,
        }
    }

    summary.net_position = summary.total_surplus + summary.total_deficit;
    summary
}
