use crate::error::ComplianceError;
use crate::models::{ComplianceStatus, EnrichedVoyageRecord, PoolingOutcome};

pub fn evaluate_pool<'a>(
    deficit: &'a EnrichedVoyageRecord,
    surplus: &'a EnrichedVoyageRecord,
) -> Result<PoolingOutcome<'a>, ComplianceError> {
    let (deficit_balance, surplus_balance) = match (
        deficit.status,
        deficit.compliance_balance,
        surplus.status,
        surplus.compliance_balance,
    ) {
        (
            Some(ComplianceStatus::Deficit),
            Some(deficit_balance),
            Some(ComplianceStatus::Surplus),
            Some(surplus_balance),
        ) => (deficit_balance, surplus_balance),
        _ => {
            return Err(ComplianceError::invalid_pairing(
                deficit.status,
                surplus.status,
            ))
        }
    };

    let net_balance = surplus_balance + deficit_balance;
    Ok(PoolingOutcome {
        deficit,
        surplus,
        deficit_balance,
        surplus_balance,
        net_balance,
        success: net_balance >= 0.0,
        remaining_deficit: if net_balance < 0.0 { -net_balance } else { 0.0 },
        remaining_surplus: if net_balance > 0.0 { net_balance } else { 0.0 },
    })
}
