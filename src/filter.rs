/*!
 * Filter cascade over canonical service records
 *
 * Region, then size, then remoteness code narrow the full dataset to the
 * sector view; the provider choice narrows the sector view to the provider
 * view. Both views borrow from the dataset and never copy records.
 */

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data_types::ServiceRecord;

/// Multi-select membership filter.
///
/// `Only` with an empty set matches nothing; it is never read as "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    /// Select exactly the given values
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Only(values.into_iter().map(Into::into).collect())
    }

    /// A selection with nothing chosen
    pub fn none() -> Self {
        Selection::Only(BTreeSet::new())
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(values) => values.contains(value),
        }
    }

    /// True when every one of `options` is selected
    pub fn covers<'a, I: IntoIterator<Item = &'a String>>(&self, options: I) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(values) => options.into_iter().all(|o| values.contains(o)),
        }
    }
}

/// Single-select filter: everything, or one exact value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    #[default]
    All,
    Exactly(String),
}

impl Choice {
    pub fn exactly<S: Into<String>>(value: S) -> Self {
        Choice::Exactly(value.into())
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Choice::All => true,
            Choice::Exactly(expected) => expected == value,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        match self {
            Choice::All => None,
            Choice::Exactly(value) => Some(value),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::All => write!(f, "All"),
            Choice::Exactly(value) => write!(f, "{}", value),
        }
    }
}

/// Current filter selections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub region: Choice,
    pub sizes: Selection,
    pub mmm_codes: Selection,
    pub provider: Choice,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Choice) -> Self {
        self.region = region;
        self
    }

    pub fn with_sizes(mut self, sizes: Selection) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn with_mmm_codes(mut self, mmm_codes: Selection) -> Self {
        self.mmm_codes = mmm_codes;
        self
    }

    pub fn with_provider(mut self, provider: Choice) -> Self {
        self.provider = provider;
        self
    }

    /// Apply the cascade to `records`
    pub fn apply<'a>(&self, records: &'a [ServiceRecord]) -> FilteredViews<'a> {
        let sector = ServiceQuery::new(records)
            .region(self.region.clone())
            .sizes(self.sizes.clone())
            .mmm_codes(self.mmm_codes.clone())
            .execute();

        let provider_options = distinct_sorted(sector.iter().map(|r| r.provider_name.as_str()));

        let provider = sector
            .iter()
            .copied()
            .filter(|r| self.provider.matches(&r.provider_name))
            .collect();

        FilteredViews {
            sector,
            provider,
            provider_options,
        }
    }

    /// Short heading describing the sector filters, e.g. `NSW / Sizes: Small`.
    /// Multi-selects are only listed when they narrow the available options.
    pub fn describe(&self, options: &FilterOptions) -> String {
        let mut parts = vec![self.region.to_string()];
        if let Selection::Only(sizes) = &self.sizes {
            if !self.sizes.covers(&options.sizes) {
                parts.push(format!("Sizes: {}", join(sizes)));
            }
        }
        if let Selection::Only(codes) = &self.mmm_codes {
            if !self.mmm_codes.covers(&options.mmm_codes) {
                parts.push(format!("MMMs: {}", join(codes)));
            }
        }
        parts.join(" / ")
    }
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Query builder over service records
pub struct ServiceQuery<'a> {
    records: &'a [ServiceRecord],
    filters: Vec<Box<dyn Fn(&ServiceRecord) -> bool + Send + Sync + 'a>>,
}

impl<'a> ServiceQuery<'a> {
    pub fn new(records: &'a [ServiceRecord]) -> Self {
        Self {
            records,
            filters: Vec::new(),
        }
    }

    /// Filter by state/territory
    pub fn region(mut self, region: Choice) -> Self {
        self.filters.push(Box::new(move |r| region.matches(&r.state)));
        self
    }

    /// Filter by size category membership
    pub fn sizes(mut self, sizes: Selection) -> Self {
        self.filters.push(Box::new(move |r| sizes.matches(&r.size)));
        self
    }

    /// Filter by remoteness code membership
    pub fn mmm_codes(mut self, codes: Selection) -> Self {
        self.filters.push(Box::new(move |r| codes.matches(&r.mmm_code)));
        self
    }

    /// Filter by provider
    pub fn provider(mut self, provider: Choice) -> Self {
        self.filters.push(Box::new(move |r| provider.matches(&r.provider_name)));
        self
    }

    /// Arbitrary predicate
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ServiceRecord) -> bool + Send + Sync + 'a,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Execute the query and return matching records in source order
    pub fn execute(self) -> Vec<&'a ServiceRecord> {
        self.records
            .iter()
            .filter(|record| self.filters.iter().all(|filter| filter(record)))
            .collect()
    }

    pub fn count(self) -> usize {
        self.execute().len()
    }
}

/// Sector and provider views for one filter state
#[derive(Debug, Clone, Default)]
pub struct FilteredViews<'a> {
    /// Records matching region, size and remoteness filters
    pub sector: Vec<&'a ServiceRecord>,
    /// Sector records further restricted to the chosen provider
    pub provider: Vec<&'a ServiceRecord>,
    /// Providers present in the sector view, sorted
    pub provider_options: Vec<String>,
}

/// Values offered by each filter, drawn from the full dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    pub sizes: Vec<String>,
    pub mmm_codes: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[ServiceRecord]) -> Self {
        let mut mmm_codes = distinct_sorted(records.iter().map(|r| r.mmm_code.as_str()));
        sort_codes(&mut mmm_codes);

        Self {
            regions: distinct_sorted(records.iter().map(|r| r.state.as_str())),
            sizes: distinct_sorted(records.iter().map(|r| r.size.as_str())),
            mmm_codes,
        }
    }
}

fn distinct_sorted<'a, I: Iterator<Item = &'a str>>(values: I) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Sort remoteness codes numerically, or lexically if any code is not a number
pub fn sort_codes(codes: &mut [String]) {
    let numeric: Option<Vec<i64>> = codes.iter().map(|c| c.trim().parse::<i64>().ok()).collect();
    match numeric {
        Some(keys) => {
            let mut keyed: Vec<(i64, String)> = keys.into_iter().zip(codes.iter().cloned()).collect();
            keyed.sort_by_key(|(key, _)| *key);
            for (slot, (_, code)) in codes.iter_mut().zip(keyed) {
                *slot = code;
            }
        }
        None => codes.sort(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::*;
    use std::collections::BTreeMap;

    fn record(provider: &str, service: &str, state: &str, size: &str, mmm: &str) -> ServiceRecord {
        ServiceRecord {
            provider_name: provider.to_string(),
            service_name: service.to_string(),
            state: state.to_string(),
            mmm_code: mmm.to_string(),
            size: size.to_string(),
            ratings: StarRatings::default(),
            care_minutes: CareMinutes::default(),
            rn_care_compliance: None,
            total_care_compliance: None,
            indicators: BTreeMap::new(),
            resident_experience: Vec::new(),
            compliance_decision: None,
        }
    }

    fn sample() -> Vec<ServiceRecord> {
        vec![
            record("Acme", "A1", "NSW", "Small", "1"),
            record("Acme", "A2", "VIC", "Large", "10"),
            record("Birch", "B1", "NSW", "Large", "2"),
            record("Cedar", "C1", "NSW", "Medium", "1"),
        ]
    }

    #[test]
    fn test_default_state_is_unfiltered() {
        let records = sample();
        let views = FilterState::new().apply(&records);
        assert_eq!(views.sector.len(), records.len());
        assert_eq!(views.provider.len(), records.len());
        assert_eq!(views.provider_options, vec!["Acme", "Birch", "Cedar"]);
    }

    #[test]
    fn test_cascade_order_and_provider_options() {
        let records = sample();
        let state = FilterState::new()
            .with_region(Choice::exactly("NSW"))
            .with_sizes(Selection::only(["Large", "Medium"]))
            .with_provider(Choice::exactly("Birch"));

        let views = state.apply(&records);
        let sector: Vec<_> = views.sector.iter().map(|r| r.service_name.as_str()).collect();
        assert_eq!(sector, vec!["B1", "C1"]);
        assert_eq!(views.provider_options, vec!["Birch", "Cedar"]);
        assert_eq!(views.provider.len(), 1);
    }

    #[test]
    fn test_empty_selection_matches_nothing() {
        let records = sample();
        let views = FilterState::new().with_sizes(Selection::none()).apply(&records);
        assert!(views.sector.is_empty());
        assert!(views.provider.is_empty());
        assert!(views.provider_options.is_empty());

        let views = FilterState::new().with_mmm_codes(Selection::none()).apply(&records);
        assert!(views.sector.is_empty());
    }

    #[test]
    fn test_unknown_provider_gives_empty_provider_view() {
        let records = sample();
        let views = FilterState::new()
            .with_region(Choice::exactly("VIC"))
            .with_provider(Choice::exactly("Cedar"))
            .apply(&records);
        assert_eq!(views.sector.len(), 1);
        assert!(views.provider.is_empty());
    }

    #[test]
    fn test_remoteness_codes_sort_numerically() {
        let options = FilterOptions::from_records(&sample());
        assert_eq!(options.mmm_codes, vec!["1", "2", "10"]);
        assert_eq!(options.regions, vec!["NSW", "VIC"]);

        let mut mixed = vec!["10".to_string(), "2".to_string(), "Unknown".to_string()];
        sort_codes(&mut mixed);
        assert_eq!(mixed, vec!["10", "2", "Unknown"]);
    }

    #[test]
    fn test_only_integer_codes_sort_numerically() {
        let mut fractional = vec!["2".to_string(), "10".to_string(), "1.5".to_string()];
        sort_codes(&mut fractional);
        assert_eq!(fractional, vec!["1.5", "10", "2"]);

        let mut special = vec!["3".to_string(), "NaN".to_string(), "inf".to_string()];
        sort_codes(&mut special);
        assert_eq!(special, vec!["3", "NaN", "inf"]);

        let mut padded = vec![" 7".to_string(), "11".to_string(), "3".to_string()];
        sort_codes(&mut padded);
        assert_eq!(padded, vec!["3", " 7", "11"]);
    }

    #[test]
    fn test_describe() {
        let records = sample();
        let options = FilterOptions::from_records(&records);

        let state = FilterState::new()
            .with_region(Choice::exactly("NSW"))
            .with_sizes(Selection::only(["Small"]))
            .with_mmm_codes(Selection::only(["1", "2", "10"]));
        assert_eq!(state.describe(&options), "NSW / Sizes: Small");
        assert_eq!(FilterState::new().describe(&options), "All");
    }

    #[test]
    fn test_query_builder() {
        let records = sample();
        let count = ServiceQuery::new(&records)
            .provider(Choice::exactly("Acme"))
            .filter(|r| r.size == "Large")
            .count();
        assert_eq!(count, 1);
    }
}
