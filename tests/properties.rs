use proptest::prelude::*;
use proptest::test_runner::Config;
use star_ratings::data_types::{compliance_ratio, CareMinutes, ServiceRecord, StarRatings};
use star_ratings::filter::{Choice, FilterState, Selection};
use star_ratings::stats;
use std::collections::{BTreeMap, BTreeSet};

const STATES: [&str; 3] = ["NSW", "VIC", "QLD"];
const SIZES: [&str; 3] = ["Small", "Medium", "Large"];
const PROVIDERS: [&str; 4] = ["Acacia", "Banksia", "Callistemon", "Dianella"];

fn record(i: usize, state: usize, size: usize, provider: usize) -> ServiceRecord {
    ServiceRecord {
        provider_name: PROVIDERS[provider].to_string(),
        service_name: format!("Service {i}"),
        state: STATES[state].to_string(),
        mmm_code: ((i % 3) + 1).to_string(),
        size: SIZES[size].to_string(),
        ratings: StarRatings::default(),
        care_minutes: CareMinutes::default(),
        rn_care_compliance: None,
        total_care_compliance: None,
        indicators: BTreeMap::new(),
        resident_experience: Vec::new(),
        compliance_decision: None,
    }
}

fn values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e6_f64..1.0e6_f64, 1..60)
}

proptest! {
    #![proptest_config(Config::with_cases(128))]

    #[test]
    fn quantiles_are_ordered_and_bounded(values in values()) {
        let median = stats::quantile(&values, 0.5).unwrap();
        let p75 = stats::quantile(&values, 0.75).unwrap();
        let p90 = stats::quantile(&values, 0.9).unwrap();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        prop_assert!(min <= median);
        prop_assert!(median <= p75);
        prop_assert!(p75 <= p90);
        prop_assert!(p90 <= max);
    }

    #[test]
    fn weak_rank_counts_values_at_or_below(values in values(), score in -1.0e6_f64..1.0e6_f64) {
        let rank = stats::percentile_rank_weak(&values, score).unwrap();
        let at_or_below = values.iter().filter(|v| **v <= score).count();

        prop_assert_eq!(rank, 100.0 * at_or_below as f64 / values.len() as f64);
        prop_assert!((0.0..=100.0).contains(&rank));
    }

    #[test]
    fn compliance_ratio_is_finite_or_missing(actual in 0.0_f64..500.0, target in prop::option::of(0.0_f64..500.0)) {
        match compliance_ratio(Some(actual), target) {
            Some(ratio) => {
                let target = target.unwrap();
                prop_assert!(target != 0.0);
                prop_assert!(ratio.is_finite());
                prop_assert!((ratio - actual / target * 100.0).abs() < 1e-9);
            }
            None => prop_assert!(target.map_or(true, |t| t == 0.0)),
        }
    }

    #[test]
    fn provider_view_within_sector_within_all(
        rows in prop::collection::vec((0..STATES.len(), 0..SIZES.len(), 0..PROVIDERS.len()), 0..40),
        state in prop::option::of(0..STATES.len()),
        sizes in prop::option::of(prop::collection::btree_set(0..SIZES.len(), 0..SIZES.len())),
        provider in prop::option::of(0..PROVIDERS.len()),
    ) {
        let records: Vec<ServiceRecord> = rows
            .iter()
            .enumerate()
            .map(|(i, (state, size, provider))| record(i, *state, *size, *provider))
            .collect();

        let filters = FilterState::new()
            .with_region(state.map(|s| Choice::exactly(STATES[s])).unwrap_or_default())
            .with_sizes(sizes.map(|s| Selection::only(s.into_iter().map(|i| SIZES[i]))).unwrap_or_default())
            .with_provider(provider.map(|p| Choice::exactly(PROVIDERS[p])).unwrap_or_default());
        let views = filters.apply(&records);

        let sector: BTreeSet<&str> = views.sector.iter().map(|r| r.service_name.as_str()).collect();
        prop_assert!(views.sector.len() <= records.len());
        prop_assert!(views.provider.iter().all(|r| sector.contains(r.service_name.as_str())));
        prop_assert!(views.sector.iter().all(|r| filters.region.matches(&r.state) && filters.sizes.matches(&r.size)));

        if filters.provider == Choice::All {
            prop_assert_eq!(views.provider.len(), views.sector.len());
        }

        let unfiltered = FilterState::new().apply(&records);
        prop_assert_eq!(unfiltered.sector.len(), records.len());
    }
}
