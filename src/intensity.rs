use crate::error::ComplianceError;

/// CO2 per km for one voyage, or `None` when the voyage covered no distance.
pub fn ghg_intensity(co2_emission: f64, distance: f64) -> Option<f64> {
    if distance == 0.0 {
        None
    } else {
        Some(co2_emission / distance)
    }
}

/// Mean of the defined intensities.
pub fn fleet_average<I>(intensities: I) -> Result<f64, ComplianceError>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = intensities
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        return Err(ComplianceError::EmptyFleet);
    }
    Ok(sum / count as f64)
}
