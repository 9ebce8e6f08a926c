//! Professional discovery: who can serve a lead.

use super::errors::DomainError;
use super::geo::{validate_radius, within_radius};
use super::lead::Lead;
use super::professional::ProfessionalStats;

/// Professionals from `directory` who offer the lead's category, have a known
/// location, and sit within `radius_km` of the lead. Directory order is kept.
/// An empty result is a normal outcome.
pub fn find_candidates(
    lead: &Lead,
    directory: Vec<ProfessionalStats>,
    radius_km: f64,
) -> Result<Vec<ProfessionalStats>, DomainError> {
    let radius_km = validate_radius(radius_km)?;
    let offering = directory
        .into_iter()
        .filter(|p| p.offers(&lead.service_category));
    Ok(within_radius(lead.location, offering, radius_km))
}
