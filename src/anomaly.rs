use std::collections::BTreeMap;

use crate::models::{
    EfficiencyFlag, EfficiencyStats, EnrichedVoyageRecord, FuelAnomaly, WeatherEfficiency,
};

pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;
/// Multiple of the ship-type mean that counts as overconsumption in calm water.
pub const CALM_OVERCONSUMPTION_FACTOR: f64 = 1.3;
/// Engine efficiency (%) below which a voyage counts as mechanically degraded.
pub const LOW_ENGINE_EFFICIENCY: f64 = 75.0;

pub fn fuel_efficiency(fuel_consumption: f64, distance: f64) -> Option<f64> {
    if distance == 0.0 {
        None
    } else {
        Some(fuel_consumption / distance)
    }
}

fn efficiencies(vessels: &[EnrichedVoyageRecord]) -> Vec<(usize, f64)> {
    vessels
        .iter()
        .enumerate()
        .filter_map(|(i, v)| fuel_efficiency(v.fuel_consumption, v.distance).map(|e| (i, e)))
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Signed percentage by which `value` exceeds `reference`; zero when the
/// reference itself is zero.
pub fn deviation_pct(value: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        0.0
    } else {
        (value - reference) / reference * 100.0
    }
}

fn ship_type_means(vessels: &[EnrichedVoyageRecord]) -> BTreeMap<String, f64> {
    efficiency_by_ship_type(vessels)
        .into_iter()
        .map(|stats| (stats.ship_type, stats.mean))
        .collect()
}

/// Voyages whose efficiency lies more than `threshold` population standard
/// deviations from the fleet mean, most fuel-hungry first.
pub fn detect_fuel_anomalies(vessels: &[EnrichedVoyageRecord], threshold: f64) -> Vec<FuelAnomaly> {
    let efficiencies = efficiencies(vessels);
    let Some(fleet_mean) = mean(efficiencies.iter().map(|(_, e)| *e)) else {
        return Vec::new();
    };

    let n = efficiencies.len() as f64;
    let std = (efficiencies
        .iter()
        .map(|(_, e)| (e - fleet_mean) * (e - fleet_mean))
        .sum::<f64>()
        / n)
        .sqrt();
    if std == 0.0 {
        return Vec::new();
    }

    let type_means = ship_type_means(vessels);
    let mut anomalies: Vec<FuelAnomaly> = efficiencies
        .into_iter()
        .filter_map(|(index, efficiency)| {
            let z_score = (efficiency - fleet_mean) / std;
            if z_score.abs() <= threshold {
                return None;
            }
            let vessel = &vessels[index];
            let type_mean = type_means
                .get(&vessel.ship_type)
                .copied()
                .unwrap_or(efficiency);
            Some(FuelAnomaly {
                index,
                vessel_id: vessel.vessel_id.clone(),
                ship_type: vessel.ship_type.clone(),
                route_id: vessel.route_id.clone(),
                month: vessel.month.clone(),
                fuel_efficiency: efficiency,
                z_score,
                ship_type_deviation_pct: deviation_pct(efficiency, type_mean),
                fleet_deviation_pct: deviation_pct(efficiency, fleet_mean),
            })
        })
        .collect();

    anomalies.sort_by(|a, b| b.fuel_efficiency.total_cmp(&a.fuel_efficiency));
    anomalies
}

pub fn efficiency_by_ship_type(vessels: &[EnrichedVoyageRecord]) -> Vec<EfficiencyStats> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for vessel in vessels {
        if let Some(efficiency) = fuel_efficiency(vessel.fuel_consumption, vessel.distance) {
            groups.entry(vessel.ship_type.as_str()).or_default().push(efficiency);
        }
    }

    groups
        .into_iter()
        .map(|(ship_type, values)| {
            let count = values.len();
            let mean = values.iter().sum::<f64>() / count as f64;
            // sample standard deviation
            let std = if count > 1 {
                (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
                    / (count - 1) as f64)
                    .sqrt()
            } else {
                0.0
            };
            EfficiencyStats {
                ship_type: ship_type.to_string(),
                count,
                mean,
                std,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}

/// Mean efficiency per (ship type, weather) pair. Voyages without a weather
/// record are left out.
pub fn efficiency_by_weather(vessels: &[EnrichedVoyageRecord]) -> Vec<WeatherEfficiency> {
    let mut groups: BTreeMap<(&str, &str), (f64, usize)> = BTreeMap::new();
    for vessel in vessels {
        let Some(weather) = vessel.weather_conditions.as_deref() else {
            continue;
        };
        if let Some(efficiency) = fuel_efficiency(vessel.fuel_consumption, vessel.distance) {
            let entry = groups
                .entry((vessel.ship_type.as_str(), weather))
                .or_insert((0.0, 0));
            entry.0 += efficiency;
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|((ship_type, weather), (sum, count))| WeatherEfficiency {
            ship_type: ship_type.to_string(),
            weather_conditions: weather.to_string(),
            count,
            mean: sum / count as f64,
        })
        .collect()
}

fn flag_voyages<F>(vessels: &[EnrichedVoyageRecord], mut predicate: F) -> Vec<EfficiencyFlag>
where
    F: FnMut(&EnrichedVoyageRecord, f64, f64) -> bool,
{
    let type_means = ship_type_means(vessels);
    let mut flags: Vec<EfficiencyFlag> = efficiencies(vessels)
        .into_iter()
        .filter_map(|(index, efficiency)| {
            let vessel = &vessels[index];
            let type_mean = *type_means.get(&vessel.ship_type)?;
            if !predicate(vessel, efficiency, type_mean) {
                return None;
            }
            Some(EfficiencyFlag {
                index,
                vessel_id: vessel.vessel_id.clone(),
                ship_type: vessel.ship_type.clone(),
                route_id: vessel.route_id.clone(),
                month: vessel.month.clone(),
                weather_conditions: vessel.weather_conditions.clone(),
                engine_efficiency: vessel.engine_efficiency,
                fuel_efficiency: efficiency,
                ship_type_mean: type_mean,
            })
        })
        .collect();

    flags.sort_by(|a, b| b.fuel_efficiency.total_cmp(&a.fuel_efficiency));
    flags
}

/// Calm-weather voyages burning more than [`CALM_OVERCONSUMPTION_FACTOR`]
/// times their ship type's mean.
pub fn calm_weather_overconsumption(vessels: &[EnrichedVoyageRecord]) -> Vec<EfficiencyFlag> {
    flag_voyages(vessels, |vessel, efficiency, type_mean| {
        vessel.weather_conditions.as_deref() == Some("Calm")
            && efficiency > type_mean * CALM_OVERCONSUMPTION_FACTOR
    })
}

/// Voyages with a degraded engine that also burn more than their ship type's mean.
pub fn low_engine_overconsumption(vessels: &[EnrichedVoyageRecord]) -> Vec<EfficiencyFlag> {
    flag_voyages(vessels, |vessel, efficiency, type_mean| {
        vessel
            .engine_efficiency
            .is_some_and(|engine| engine < LOW_ENGINE_EFFICIENCY)
            && efficiency > type_mean
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vessel(vessel_id: &str, ship_type: &str, distance: f64, fuel: f64) -> EnrichedVoyageRecord {
        EnrichedVoyageRecord {
            vessel_id: vessel_id.to_string(),
            ship_type: ship_type.to_string(),
            route_id: "Escravos-Lagos".to_string(),
            month: "June".to_string(),
            distance,
            fuel_type: "Diesel".to_string(),
            fuel_consumption: fuel,
            co2_emission: fuel * 2.7,
            co2_predicted: fuel * 2.7,
            ghg_intensity: None,
            target_intensity: 0.0,
            compliance_balance: None,
            status: None,
            weather_conditions: None,
            engine_efficiency: None,
        }
    }

    #[test]
    fn flags_single_extreme_voyage() {
        let mut vessels: Vec<EnrichedVoyageRecord> = (0..20)
            .map(|i| vessel(&format!("NG{i:03}"), "Fishing Trawler", 100.0, 1000.0 + i as f64))
            .collect();
        vessels.push(vessel("NG999", "Tanker Ship", 100.0, 10_000.0));
        vessels.push(vessel("NG998", "Tanker Ship", 0.0, 500.0));

        let anomalies = detect_fuel_anomalies(&vessels, DEFAULT_Z_THRESHOLD);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].vessel_id, "NG999");
        assert_eq!(anomalies[0].index, 20);
        assert!(anomalies[0].z_score > 3.0);
        assert!((anomalies[0].fuel_efficiency - 100.0).abs() < 1e-12);

        // tanker mean only counts the voyage with a distance
        assert!(anomalies[0].ship_type_deviation_pct.abs() < 1e-9);
        let fleet_mean = vessels[..21]
            .iter()
            .map(|v| v.fuel_consumption / v.distance)
            .sum::<f64>()
            / 21.0;
        let expected = (100.0 - fleet_mean) / fleet_mean * 100.0;
        assert!((anomalies[0].fleet_deviation_pct - expected).abs() < 1e-9);
    }

    #[test]
    fn uniform_fleet_has_no_anomalies() {
        let vessels: Vec<EnrichedVoyageRecord> = (0..5)
            .map(|i| vessel(&format!("NG{i:03}"), "Surfer Boat", 50.0, 500.0))
            .collect();
        assert!(detect_fuel_anomalies(&vessels, DEFAULT_Z_THRESHOLD).is_empty());
        assert!(detect_fuel_anomalies(&[], DEFAULT_Z_THRESHOLD).is_empty());
    }

    #[test]
    fn groups_statistics_by_ship_type() {
        let vessels = vec![
            vessel("NG001", "Tanker Ship", 100.0, 2000.0),
            vessel("NG002", "Fishing Trawler", 100.0, 800.0),
            vessel("NG003", "Tanker Ship", 100.0, 4000.0),
        ];
        let stats = efficiency_by_ship_type(&vessels);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].ship_type, "Fishing Trawler");
        assert_eq!(stats[0].std, 0.0);

        let tanker = &stats[1];
        assert_eq!(tanker.count, 2);
        assert!((tanker.mean - 30.0).abs() < 1e-12);
        assert!((tanker.std - 200.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(tanker.min, 20.0);
        assert_eq!(tanker.max, 40.0);
    }

    fn with_conditions(
        mut voyage: EnrichedVoyageRecord,
        weather: &str,
        engine: f64,
    ) -> EnrichedVoyageRecord {
        voyage.weather_conditions = Some(weather.to_string());
        voyage.engine_efficiency = Some(engine);
        voyage
    }

    #[test]
    fn averages_by_ship_type_and_weather() {
        let vessels = vec![
            with_conditions(vessel("NG001", "Tanker Ship", 100.0, 2000.0), "Stormy", 80.0),
            with_conditions(vessel("NG002", "Tanker Ship", 100.0, 1000.0), "Calm", 90.0),
            with_conditions(vessel("NG003", "Tanker Ship", 100.0, 3000.0), "Stormy", 82.0),
            with_conditions(vessel("NG004", "Surfer Boat", 0.0, 100.0), "Calm", 90.0),
            vessel("NG005", "Surfer Boat", 50.0, 500.0),
        ];
        let groups = efficiency_by_weather(&vessels);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].ship_type, "Tanker Ship");
        assert_eq!(groups[0].weather_conditions, "Calm");
        assert_eq!(groups[0].count, 1);
        assert!((groups[0].mean - 10.0).abs() < 1e-12);
        assert_eq!(groups[1].weather_conditions, "Stormy");
        assert_eq!(groups[1].count, 2);
        assert!((groups[1].mean - 25.0).abs() < 1e-12);
    }

    #[test]
    fn flags_calm_weather_overconsumption() {
        // Tanker mean is (10 + 10 + 10 + 30) / 4 = 15, so the calm cutoff is 19.5.
        let vessels = vec![
            with_conditions(vessel("NG001", "Tanker Ship", 100.0, 1000.0), "Calm", 90.0),
            with_conditions(vessel("NG002", "Tanker Ship", 100.0, 1000.0), "Calm", 90.0),
            with_conditions(vessel("NG003", "Tanker Ship", 100.0, 1000.0), "Stormy", 90.0),
            with_conditions(vessel("NG004", "Tanker Ship", 100.0, 3000.0), "Calm", 90.0),
        ];
        let flags = calm_weather_overconsumption(&vessels);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].vessel_id, "NG004");
        assert_eq!(flags[0].index, 3);
        assert!((flags[0].ship_type_mean - 15.0).abs() < 1e-12);

        let mut stormy = vessels.clone();
        stormy[3].weather_conditions = Some("Stormy".to_string());
        assert!(calm_weather_overconsumption(&stormy).is_empty());
    }

    #[test]
    fn flags_degraded_engines_above_type_mean() {
        let vessels = vec![
            with_conditions(vessel("NG001", "Fishing Trawler", 100.0, 1000.0), "Rough", 70.0),
            with_conditions(vessel("NG002", "Fishing Trawler", 100.0, 1900.0), "Rough", 72.5),
            with_conditions(vessel("NG003", "Fishing Trawler", 100.0, 1600.0), "Calm", 91.0),
            with_conditions(vessel("NG004", "Fishing Trawler", 100.0, 2000.0), "Calm", 74.9),
            vessel("NG005", "Fishing Trawler", 100.0, 2500.0),
        ];
        // mean (10 + 19 + 16 + 20 + 25) / 5 = 18
        let flags = low_engine_overconsumption(&vessels);
        let ids: Vec<&str> = flags.iter().map(|f| f.vessel_id.as_str()).collect();
        assert_eq!(ids, vec!["NG004", "NG002"]);
        assert_eq!(flags[0].engine_efficiency, Some(74.9));
        assert!(flags.iter().all(|f| f.fuel_efficiency > f.ship_type_mean));
    }

    #[test]
    fn deviation_is_relative_to_reference() {
        assert!((deviation_pct(12.0, 10.0) - 20.0).abs() < 1e-12);
        assert!((deviation_pct(5.0, 10.0) + 50.0).abs() < 1e-12);
        assert_eq!(deviation_pct(5.0, 0.0), 0.0);
    }
}
