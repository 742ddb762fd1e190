use std::collections::HashMap;
use std::fmt::Write;

use crate::anomaly::{
    calm_weather_overconsumption, detect_fuel_anomalies, efficiency_by_weather,
    low_engine_overconsumption, DEFAULT_Z_THRESHOLD,
};
use crate::models::EfficiencyFlag;
use crate::models::{ComplianceDataset, EnrichedVoyageRecord, ShipTypeSummary};

pub fn summarize_by_type(vessels: &[EnrichedVoyageRecord]) -> Vec<ShipTypeSummary> {
    // (count, surplus, deficit, intensity sum, defined intensities)
    let mut map: HashMap<String, (usize, usize, usize, f64, usize)> = HashMap::new();

    for vessel in vessels {
        let entry = map
            .entry(vessel.ship_type.clone())
            .or_insert((0, 0, 0, 0.0, 0));
        entry.0 += 1;
        if vessel.is_surplus() {
            entry.1 += 1;
        } else if vessel.is_deficit() {
            entry.2 += 1;
        }
        if let Some(intensity) = vessel.ghg_intensity {
            entry.3 += intensity;
            entry.4 += 1;
        }
    }

    let mut summaries: Vec<ShipTypeSummary> = map
        .into_iter()
        .map(
            |(ship_type, (count, surplus_count, deficit_count, intensity_sum, defined))| {
                ShipTypeSummary {
                    ship_type,
                    count,
                    surplus_count,
                    deficit_count,
                    avg_intensity: if defined == 0 {
                        None
                    } else {
                        Some(intensity_sum / defined as f64)
                    },
                }
            },
        )
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ship_type.cmp(&b.ship_type)));
    summaries
}

/// Indices of deficit voyages ordered from the largest shortfall.
pub fn largest_deficits(vessels: &[EnrichedVoyageRecord]) -> Vec<usize> {
    let mut deficits: Vec<(usize, f64)> = vessels
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_deficit())
        .filter_map(|(i, v)| v.compliance_balance.map(|b| (i, b)))
        .collect();
    deficits.sort_by(|a, b| a.1.total_cmp(&b.1));
    deficits.into_iter().map(|(i, _)| i).collect()
}

pub fn build_report(dataset: &ComplianceDataset, limit: usize) -> String {
    let metadata = &dataset.metadata;
    let summary = &metadata.compliance_summary;
    let performance = &metadata.model_performance;
    let vessels = &dataset.vessels;

    let mut output = String::new();

    let _ = writeln!(output, "# Fleet Compliance Report");
    let _ = writeln!(
        output,
        "Target year {} (generated {})",
        summary.target_year,
        metadata.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Fleet Position");
    let _ = writeln!(
        output,
        "- Fleet average intensity: {:.4} kg/km",
        summary.fleet_average_intensity
    );
    let _ = writeln!(
        output,
        "- Target intensity: {:.4} kg/km ({:.1}% reduction)",
        summary.target_intensity, summary.reduction_percentage
    );
    let _ = writeln!(
        output,
        "- Voyages: {} ({} surplus, {} deficit, {} without intensity)",
        summary.total_vessels,
        summary.surplus_count,
        summary.deficit_count,
        summary.undefined_intensity_count
    );
    let _ = writeln!(
        output,
        "- Total surplus {:.2}, total deficit {:.2}, net position {:.2}",
        summary.total_surplus, summary.total_deficit, summary.net_position
    );
    let _ = writeln!(
        output,
        "- Emission model (test): RMSE {:.2}, MAE {:.2}, R² {:.4}",
        performance.test_rmse, performance.test_mae, performance.test_r2
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status by Ship Type");

    let summaries = summarize_by_type(vessels);
    if summaries.is_empty() {
        let _ = writeln!(output, "No voyages recorded.");
    } else {
        for entry in summaries.iter() {
            let intensity = entry
                .avg_intensity
                .map(|v| format!("{v:.2} kg/km"))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                output,
                "- {}: {} voyages, {} surplus, {} deficit (avg intensity {})",
                entry.ship_type, entry.count, entry.surplus_count, entry.deficit_count, intensity
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Largest Deficits");

    let deficits = largest_deficits(vessels);
    if deficits.is_empty() {
        let _ = writeln!(output, "No voyages in deficit.");
    } else {
        for &index in deficits.iter().take(limit) {
            let vessel = &vessels[index];
            let _ = writeln!(
                output,
                "- #{} {} ({}, {}, {}) balance {:.2}",
                index,
                vessel.vessel_id,
                vessel.ship_type,
                vessel.route_id,
                vessel.month,
                vessel.compliance_balance.unwrap_or_default()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Fuel Efficiency Anomalies");

    let anomalies = detect_fuel_anomalies(vessels, DEFAULT_Z_THRESHOLD);
    if anomalies.is_empty() {
        let _ = writeln!(output, "No voyages beyond {DEFAULT_Z_THRESHOLD} standard deviations.");
    } else {
        for anomaly in anomalies.iter().take(5) {
            let _ = writeln!(
                output,
                "- #{} {} ({}) on {} in {}: {:.3} L/km (z {:.2}, {:+.1}% vs type, {:+.1}% vs fleet)",
                anomaly.index,
                anomaly.vessel_id,
                anomaly.ship_type,
                anomaly.route_id,
                anomaly.month,
                anomaly.fuel_efficiency,
                anomaly.z_score,
                anomaly.ship_type_deviation_pct,
                anomaly.fleet_deviation_pct
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Efficiency by Weather");

    let weather = efficiency_by_weather(vessels);
    if weather.is_empty() {
        let _ = writeln!(output, "No weather conditions recorded.");
    } else {
        for entry in &weather {
            let _ = writeln!(
                output,
                "- {} / {}: {} voyages, mean {:.3} L/km",
                entry.ship_type, entry.weather_conditions, entry.count, entry.mean
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Operational Patterns");
    write_flags(
        &mut output,
        "High consumption in calm weather",
        &calm_weather_overconsumption(vessels),
    );
    write_flags(
        &mut output,
        "Low engine efficiency with above-average consumption",
        &low_engine_overconsumption(vessels),
    );

    output
}

fn write_flags(output: &mut String, title: &str, flags: &[EfficiencyFlag]) {
    let _ = writeln!(output, "{title}: {}", flags.len());
    for flag in flags.iter().take(5) {
        let engine = flag
            .engine_efficiency
            .map(|e| format!("{e:.1}%"))
            .unwrap_or_else(|| "n/a".to_string());
        let _ = writeln!(
            output,
            "- #{} {} ({}) on {}: {:.3} L/km vs type mean {:.3}, engine {}",
            flag.index,
            flag.vessel_id,
            flag.ship_type,
            flag.route_id,
            flag.fuel_efficiency,
            flag.ship_type_mean,
            engine
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::models::VoyageRecord;
    use crate::pipeline::run_pipeline;
    use chrono::{TimeZone, Utc};

    fn dataset() -> ComplianceDataset {
        let records: Vec<VoyageRecord> = (0..12)
            .map(|i| {
                let distance = 80.0 + (i * 17 % 11) as f64 * 9.0;
                let fuel = distance * (20.0 + (i % 4) as f64 * 3.0);
                VoyageRecord {
                    vessel_id: format!("NG{:03}", i + 1),
                    ship_type: (if i % 3 == 0 { "Tanker Ship" } else { "Surfer Boat" }).to_string(),
                    route_id: "Lagos-Apapa".to_string(),
                    month: "May".to_string(),
                    distance,
                    fuel_type: "Diesel".to_string(),
                    fuel_consumption: fuel,
                    co2_emission: fuel * 2.68,
                    weather_conditions: Some((if i % 2 == 0 { "Calm" } else { "Moderate" }).to_string()),
                    engine_efficiency: Some(70.0 + (i % 5) as f64 * 5.0),
                }
            })
            .collect();
        let generated_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        run_pipeline(&records, &PipelineConfig::default(), generated_at).unwrap()
    }

    #[test]
    fn summaries_partition_the_fleet() {
        let dataset = dataset();
        let summaries = summarize_by_type(&dataset.vessels);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].ship_type, "Surfer Boat");
        assert_eq!(summaries[0].count, 8);
        assert_eq!(summaries[1].count, 4);
        for entry in &summaries {
            assert_eq!(entry.surplus_count + entry.deficit_count, entry.count);
        }
    }

    #[test]
    fn deficits_are_ordered_by_shortfall() {
        let dataset = dataset();
        let order = largest_deficits(&dataset.vessels);
        assert_eq!(order.len(), dataset.metadata.compliance_summary.deficit_count);
        let balances: Vec<f64> = order
            .iter()
            .map(|&i| dataset.vessels[i].compliance_balance.unwrap())
            .collect();
        assert!(balances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn report_has_all_sections() {
        let report = build_report(&dataset(), 3);
        assert!(report.starts_with("# Fleet Compliance Report"));
        assert!(report.contains("Target year 2026 (generated 2026-03-01 12:00 UTC)"));
        assert!(report.contains("## Fleet Position"));
        assert!(report.contains("(5.0% reduction)"));
        assert!(report.contains("## Status by Ship Type"));
        assert!(report.contains("## Largest Deficits"));
        assert!(report.contains("## Fuel Efficiency Anomalies"));
        assert!(report.contains("## Efficiency by Weather"));
        assert!(report.contains("- Surfer Boat / Calm: "));
        assert!(report.contains("## Operational Patterns"));
        assert!(report.contains("High consumption in calm weather: "));
        assert!(report.contains("Low engine efficiency with above-average consumption: "));
    }

    #[test]
    fn pattern_counts_match_flagged_voyages() {
        let dataset = dataset();
        let report = build_report(&dataset, 3);
        let low_engine = low_engine_overconsumption(&dataset.vessels);
        assert!(report.contains(&format!(
            "Low engine efficiency with above-average consumption: {}",
            low_engine.len()
        )));
        // only voyage #10 pairs an engine below 75% with above-mean consumption
        assert_eq!(low_engine.len(), 1);
        assert!(report.contains("- #10 NG011 (Surfer Boat) on Lagos-Apapa"));
    }
}
