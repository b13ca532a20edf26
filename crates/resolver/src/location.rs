//! Location disambiguation between a query and a registry record.
//!
//! City is the primary discriminator between branches of the same chain.
//! State overrides a city agreement only when it actively disagrees. Country
//! is consulted only when a city is missing.

use quxat_features::PlaceAliases;
use quxat_model::{Location, LocationConsistency, MatchBasis};

/// Outcome of a location comparison together with the fields that agreed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationCheck {
    pub consistency: LocationConsistency,
    pub agreements: Vec<MatchBasis>,
}

impl LocationCheck {
    fn unknown() -> Self {
        Self {
            consistency: LocationConsistency::Unknown,
            agreements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocationDisambiguator {
    aliases: PlaceAliases,
}

impl LocationDisambiguator {
    pub fn new(aliases: PlaceAliases) -> Self {
        Self { aliases }
    }

    pub fn is_consistent(
        &self,
        query: Option<&Location>,
        record: Option<&Location>,
    ) -> LocationConsistency {
        self.check(query, record).consistency
    }

    /// Compare two locations field by field.
    ///
    /// - either side missing or blank: UNKNOWN
    /// - cities present on both sides and different: INCONSISTENT
    /// - cities equal: CONSISTENT, unless both states are present and differ
    /// - city missing on either side: a state or country disagreement is
    ///   INCONSISTENT, anything else UNKNOWN
    ///
    /// Country is only consulted when a city is missing.
    pub fn check(&self, query: Option<&Location>, record: Option<&Location>) -> LocationCheck {
        let (query, record) = match (query, record) {
            (Some(q), Some(r)) if !q.is_empty() && !r.is_empty() => (q, r),
            _ => return LocationCheck::unknown(),
        };

        let city = self.compare(query.city.as_deref(), record.city.as_deref());
        let state = self.compare(query.state.as_deref(), record.state.as_deref());

        let (consistency, fields) = match city {
            Some(false) => (LocationConsistency::Inconsistent, vec![]),
            Some(true) if state == Some(false) => (LocationConsistency::Inconsistent, vec![]),
            Some(true) => (
                LocationConsistency::Consistent,
                vec![
                    (city, MatchBasis::CityAgreement),
                    (state, MatchBasis::StateAgreement),
                ],
            ),
            None => {
                let country = self.compare(query.country.as_deref(), record.country.as_deref());
                if state == Some(false) || country == Some(false) {
                    (LocationConsistency::Inconsistent, vec![])
                } else {
                    (
                        LocationConsistency::Unknown,
                        vec![
                            (state, MatchBasis::StateAgreement),
                            (country, MatchBasis::CountryAgreement),
                        ],
                    )
                }
            }
        };

        let agreements = fields
            .into_iter()
            .filter(|(agreed, _)| *agreed == Some(true))
            .map(|(_, basis)| basis)
            .collect();

        LocationCheck {
            consistency,
            agreements,
        }
    }

    /// `None` unless both sides carry a non-blank value.
    fn compare(&self, a: Option<&str>, b: Option<&str>) -> Option<bool> {
        let a = a.map(|v| self.aliases.canonical(v)).filter(|v| !v.is_empty())?;
        let b = b.map(|v| self.aliases.canonical(v)).filter(|v| !v.is_empty())?;
        Some(a == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn check(query: Option<Location>, record: Option<Location>) -> LocationCheck {
        LocationDisambiguator::default().check(query.as_ref(), record.as_ref())
    }

    #[test]
    fn test_city_disagreement() {
        let result = check(
            Some(Location::city("Secunderabad")),
            Some(Location::city("Chennai")),
        );
        assert_eq!(result.consistency, LocationConsistency::Inconsistent);
    }

    #[test]
    fn test_city_agreement_with_aliases() {
        let result = check(
            Some(Location::city("Bangalore").with_state("Karnataka")),
            Some(Location::city("BENGALURU").with_state("karnataka").with_country("India")),
        );
        assert_eq!(result.consistency, LocationConsistency::Consistent);
        assert_eq!(
            result.agreements,
            vec![MatchBasis::CityAgreement, MatchBasis::StateAgreement]
        );
    }

    #[test]
    fn test_missing_side_is_unknown() {
        assert_eq!(
            check(None, Some(Location::city("Chennai"))).consistency,
            LocationConsistency::Unknown
        );
        assert_eq!(
            check(Some(Location::city("Chennai")), None).consistency,
            LocationConsistency::Unknown
        );
        assert_eq!(
            check(Some(Location::city("Chennai")), Some(Location::default())).consistency,
            LocationConsistency::Unknown
        );
    }

    #[test]
    fn test_state_only() {
        let same = check(
            Some(Location::default().with_state("Tamil Nadu")),
            Some(Location::city("Chennai").with_state("Tamil Nadu")),
        );
        assert_eq!(same.consistency, LocationConsistency::Unknown);
        assert_eq!(same.agreements, vec![MatchBasis::StateAgreement]);

        let different = check(
            Some(Location::default().with_state("Telangana")),
            Some(Location::city("Chennai").with_state("Tamil Nadu")),
        );
        assert_eq!(different.consistency, LocationConsistency::Inconsistent);
    }

    #[test]
    fn test_same_city_ignores_country() {
        let result = check(
            Some(Location::city("Chennai").with_country("India")),
            Some(Location::city("Chennai").with_country("IN")),
        );
        assert_eq!(result.consistency, LocationConsistency::Consistent);
        assert_eq!(result.agreements, vec![MatchBasis::CityAgreement]);

        let spelled = check(
            Some(Location::city("Houston").with_country("USA")),
            Some(Location::city("Houston").with_country("United States")),
        );
        assert_eq!(spelled.consistency, LocationConsistency::Consistent);

        let elsewhere = check(
            Some(Location::city("Hyderabad").with_country("India")),
            Some(Location::city("Hyderabad").with_country("Pakistan")),
        );
        assert_eq!(elsewhere.consistency, LocationConsistency::Consistent);
    }

    #[test]
    fn test_same_city_different_state() {
        let result = check(
            Some(Location::city("Aurangabad").with_state("Maharashtra")),
            Some(Location::city("Aurangabad").with_state("Bihar")),
        );
        assert_eq!(result.consistency, LocationConsistency::Inconsistent);

        let abbreviated = check(
            Some(Location::city("Chennai").with_state("TN")),
            Some(Location::city("Chennai").with_state("Tamil Nadu")),
        );
        assert_eq!(abbreviated.consistency, LocationConsistency::Consistent);
        assert_eq!(
            abbreviated.agreements,
            vec![MatchBasis::CityAgreement, MatchBasis::StateAgreement]
        );
    }

    #[test]
    fn test_country_decides_without_city() {
        let different = check(
            Some(Location::default().with_country("India")),
            Some(Location::city("Dubai").with_country("UAE")),
        );
        assert_eq!(different.consistency, LocationConsistency::Inconsistent);

        let same = check(
            Some(Location::default().with_country("IN")),
            Some(Location::city("Chennai").with_country("India")),
        );
        assert_eq!(same.consistency, LocationConsistency::Unknown);
        assert_eq!(same.agreements, vec![MatchBasis::CountryAgreement]);
    }

    #[test]
    fn test_is_consistent_shortcut() {
        let disambiguator = LocationDisambiguator::new(PlaceAliases::empty());
        let query = Location::city("Bombay");
        let record = Location::city("Mumbai");
        assert_eq!(
            disambiguator.is_consistent(Some(&query), Some(&record)),
            LocationConsistency::Inconsistent
        );
    }
}
