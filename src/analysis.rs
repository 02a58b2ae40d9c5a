/*!
 * Outcome type for peer-based analyses
 *
 * Radar scoring, outlier detection and the provider comparison all need a
 * minimum number of peer services. Falling short is a normal outcome and is
 * reported as `Analysis::InsufficientData`, distinct from a computed result
 * that happens to be empty.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which population fell short of the minimum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Population {
    /// Services in the sector view
    SectorServices,
    /// Services in the provider view
    ProviderServices,
    /// Services in the sector view other than the focal provider's
    PeerServices,
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Population::SectorServices => write!(f, "sector services"),
            Population::ProviderServices => write!(f, "provider services"),
            Population::PeerServices => write!(f, "peer services"),
        }
    }
}

/// Not enough data to run an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientData {
    pub population: Population,
    pub required: usize,
    pub found: usize,
}

impl InsufficientData {
    pub fn new(population: Population, required: usize, found: usize) -> Self {
        Self { population, required, found }
    }

    /// `Some(shortfall)` when `found < required`
    pub fn check(population: Population, required: usize, found: usize) -> Option<Self> {
        (found < required).then(|| Self::new(population, required, found))
    }
}

impl fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Insufficient data: {} {} (at least {} required)",
            self.found, self.population, self.required
        )
    }
}

/// Result of an analysis that may lack enough data to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum Analysis<T> {
    Computed(T),
    InsufficientData(InsufficientData),
}

impl<T> Analysis<T> {
    pub fn computed(&self) -> Option<&T> {
        match self {
            Analysis::Computed(value) => Some(value),
            Analysis::InsufficientData(_) => None,
        }
    }

    pub fn into_computed(self) -> Option<T> {
        match self {
            Analysis::Computed(value) => Some(value),
            Analysis::InsufficientData(_) => None,
        }
    }

    pub fn insufficient(&self) -> Option<&InsufficientData> {
        match self {
            Analysis::Computed(_) => None,
            Analysis::InsufficientData(shortfall) => Some(shortfall),
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Analysis::Computed(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Analysis<U> {
        match self {
            Analysis::Computed(value) => Analysis::Computed(f(value)),
            Analysis::InsufficientData(shortfall) => Analysis::InsufficientData(shortfall),
        }
    }
}

impl<T> From<InsufficientData> for Analysis<T> {
    fn from(shortfall: InsufficientData) -> Self {
        Analysis::InsufficientData(shortfall)
    }
}
