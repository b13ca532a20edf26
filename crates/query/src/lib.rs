//! Query intake.
//!
//! Validates an `OrganizationQuery` once, before any matching:
//! - rejects blank organization names (`QueryError::EmptyName`)
//! - normalizes the name for resolution
//! - drops blank locations
//! - classifies active certification claims into accreditation types

use quxat_features::normalize_name;
use quxat_model::{AccreditationType, CertificationClaim, Location, OrganizationQuery};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Organization name is empty")]
    EmptyName,
}

/// An active claim together with the scheme it names, if recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedClaim {
    pub claim: CertificationClaim,
    pub accreditation_type: Option<AccreditationType>,
}

/// A validated query, ready for name resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    /// Name as supplied, trimmed
    pub name: String,

    /// Normalized name used for every comparison
    pub normalized_name: String,

    /// `None` when absent or blank
    pub location: Option<Location>,

    /// Active claims only, in input order
    pub claims: Vec<ClassifiedClaim>,
}

impl PreparedQuery {
    /// Validate and normalize a query.
    pub fn prepare(query: &OrganizationQuery) -> Result<Self, QueryError> {
        let normalized_name = normalize_name(&query.name);
        if normalized_name.is_empty() {
            return Err(QueryError::EmptyName);
        }

        let claims = query
            .known_certifications
            .iter()
            .filter(|claim| claim.is_active())
            .map(|claim| ClassifiedClaim {
                claim: claim.clone(),
                accreditation_type: classify_claim(&claim.name),
            })
            .collect();

        Ok(Self {
            name: query.name.trim().to_string(),
            normalized_name,
            location: query.location.clone().filter(|l| !l.is_empty()),
            claims,
        })
    }

    pub fn has_claim(&self, accreditation_type: &AccreditationType) -> bool {
        self.claims
            .iter()
            .any(|c| c.accreditation_type.as_ref() == Some(accreditation_type))
    }
}

/// Recognise the accreditation scheme named by free certification text.
///
/// Works on whole tokens, so "Capital Hospital" is not CAP.
pub fn classify_claim(text: &str) -> Option<AccreditationType> {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    let phrase = tokens.join(" ");
    let has = |token: &str| tokens.iter().any(|t| t == token);

    if has("jci") || phrase.contains("joint commission international") {
        return Some(AccreditationType::Jci);
    }

    if phrase.contains("joint commission") {
        return Some(AccreditationType::from("JOINT-COMMISSION-US"));
    }

    if phrase.contains("accreditation canada") {
        return Some(AccreditationType::from("ACCREDITATION-CANADA"));
    }

    if let Some(standard) = iso_number(&tokens) {
        let iso = AccreditationType::from(format!("ISO-{}", standard).as_str());
        return Some(iso);
    }

    if has("dnv") {
        return Some(AccreditationType::from("DNV-HEALTHCARE"));
    }

    if has("nabh") || phrase.contains("national accreditation board for hospitals") {
        return Some(AccreditationType::Nabh);
    }

    if has("nabl") || phrase.contains("testing and calibration laboratories") {
        return Some(AccreditationType::Nabl);
    }

    if has("cap") || phrase.contains("college of american pathologists") {
        return Some(AccreditationType::Cap);
    }

    None
}

/// Standard number of the first ISO reference: `iso 9001`, `iso9001`.
fn iso_number(tokens: &[String]) -> Option<String> {
    tokens.iter().enumerate().find_map(|(i, token)| {
        if token == "iso" {
            tokens
                .get(i + 1)
                .filter(|next| next.chars().all(|c| c.is_ascii_digit()))
                .cloned()
        } else {
            token
                .strip_prefix("iso")
                .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string)
        }
    })
}
