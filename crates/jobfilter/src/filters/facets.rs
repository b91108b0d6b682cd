// crates/jobfilter/src/filters/facets.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::filters::predicate::{Column, Expr};
use crate::store::{Dataset, JobStore};

/// Label for the null / empty group.
pub const EMPTY: &str = "[none]";

/// Facet counts keyed by label, sorted lexicographically by label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CountMapping(BTreeMap<String, i64>);

impl CountMapping {
    /// Builds a mapping from raw groups. Null and empty keys are relabelled
    /// `EMPTY` before ordering, and merged if both occur.
    pub fn from_groups(groups: impl IntoIterator<Item = (Option<String>, i64)>) -> Self {
        let mut map = BTreeMap::new();
        for (key, count) in groups {
            let label = match key {
                Some(k) if !k.is_empty() => k,
                _ => EMPTY.to_string(),
            };
            *map.entry(label).or_insert(0) += count;
        }
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for CountMapping {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self::from_groups(iter.into_iter().map(|(k, v)| (Some(k), v)))
    }
}

/// Jobs per queue over `base`, which callers pass unfiltered.
pub async fn queues(store: &dyn JobStore, base: &Dataset) -> Result<CountMapping> {
    let groups = store
        .group_count(base, &Expr::Column(Column::QueueName))
        .await?;
    Ok(CountMapping::from_groups(groups))
}

/// Jobs per job class over `scoped`. Any column selection is dropped first.
pub async fn job_classes(
    store: &dyn JobStore,
    scoped: Dataset,
    job_class: &Expr,
) -> Result<CountMapping> {
    let groups = store
        .group_count(&scoped.unscope_projection(), job_class)
        .await?;
    Ok(CountMapping::from_groups(groups))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_substituted_before_sorting() {
        let counts = CountMapping::from_groups([
            (Some("mailers".to_string()), 1),
            (None, 1),
            (Some("default".to_string()), 1),
        ]);
        assert_eq!(counts.keys(), vec!["[none]", "default", "mailers"]);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn null_and_empty_keys_share_the_sentinel() {
        let counts = CountMapping::from_groups([(None, 2), (Some(String::new()), 3)]);
        assert_eq!(counts.get(EMPTY), Some(5));
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn ordering_is_bytewise() {
        let counts: CountMapping = ["beta", "Alpha", "alpha"]
            .into_iter()
            .map(|k| (k.to_string(), 1))
            .collect();
        assert_eq!(counts.keys(), vec!["Alpha", "alpha", "beta"]);
    }
}
