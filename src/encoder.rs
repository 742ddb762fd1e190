use crate::error::ComplianceError;
use crate::models::VoyageRecord;

/// Ordered set of ship types fixed from the training corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipTypeBasis {
    ship_types: Vec<String>,
}

impl ShipTypeBasis {
    /// Collects the distinct ship types of `records`, sorted lexicographically.
    pub fn from_records(records: &[VoyageRecord]) -> Self {
        let mut ship_types: Vec<String> = records.iter().map(|r| r.ship_type.clone()).collect();
        ship_types.sort();
        ship_types.dedup();
        Self { ship_types }
    }

    pub fn ship_types(&self) -> &[String] {
        &self.ship_types
    }

    pub fn len(&self) -> usize {
        self.ship_types.len()
    }

    pub fn position(&self, ship_type: &str) -> Option<usize> {
        self.ship_types
            .binary_search_by(|candidate| candidate.as_str().cmp(ship_type))
            .ok()
    }
}

pub struct FeatureEncoder {
    basis: ShipTypeBasis,
}

impl FeatureEncoder {
    pub fn new(basis: ShipTypeBasis) -> Self {
        Self { basis }
    }

    pub fn basis(&self) -> &ShipTypeBasis {
        &self.basis
    }

    /// Width of every encoded vector: one indicator per ship type, then distance and fuel.
    pub fn dimension(&self) -> usize {
        self.basis.len() + 2
    }

    pub fn encode(&self, record: &VoyageRecord) -> Result<Vec<f64>, ComplianceError> {
        let slot = self
            .basis
            .position(&record.ship_type)
            .ok_or_else(|| ComplianceError::Encoding {
                vessel_id: record.vessel_id.clone(),
                ship_type: record.ship_type.clone(),
            })?;

        let mut features = vec![0.0; self.dimension()];
        features[slot] = 1.0;
        features[self.basis.len()] = record.distance;
        features[self.basis.len() + 1] = record.fuel_consumption;
        Ok(features)
    }

    pub fn encode_all(&self, records: &[VoyageRecord]) -> Result<Vec<Vec<f64>>, ComplianceError> {
        records.iter().map(|record| self.encode(record)).collect()
    }
}
