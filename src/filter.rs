use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The provider/year pair a dashboard is restricted to
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    pub provider: String,
    pub year: i32,
}

impl FilterSpec {
    pub fn new(provider: impl Into<String>, year: i32) -> Self {
        FilterSpec {
            provider: provider.into(),
            year,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.provider == self.provider && record.year == self.year
    }
}

/// Records matching `spec` exactly, in source order
///
/// An empty result is a valid outcome.
pub fn filter<'a>(records: &'a [Record], spec: &FilterSpec) -> Vec<&'a Record> {
    records.iter().filter(|r| spec.matches(r)).collect()
}

/// Distinct providers in order of first appearance
pub fn distinct_providers(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.provider.as_str()))
        .map(|r| r.provider.clone())
        .collect()
}

/// Distinct years in order of first appearance
pub fn distinct_years(records: &[Record]) -> Vec<i32> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.year))
        .map(|r| r.year)
        .collect()
}
