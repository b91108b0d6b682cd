// crates/jobfilter/src/filters/lifecycle.rs

use chrono::{DateTime, Utc};

use crate::error::{FilterError, Result};
use crate::filters::predicate::Predicate;

/// What a classifier does with a state name it does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownStatePolicy {
    /// Fail the request with `FilterError::UnsupportedState`.
    Reject,
    /// Filter to an empty result.
    MatchNothing,
}

/// Maps lifecycle state names to predicates for one record family.
///
/// The per-state counts (`states`) are computed by the engine from
/// `state_names` and `state_predicate`.
pub trait LifecycleClassifier: Send + Sync {
    /// Canonical, finite set of states, in display order.
    fn state_names(&self) -> &'static [&'static str];

    /// Predicate selecting rows in `state` as of `now`.
    fn state_predicate(&self, state: &str, now: DateTime<Utc>) -> Result<Predicate>;
}

/// Shared handling of names outside `state_names`.
pub fn unknown_state(
    policy: UnknownStatePolicy,
    state: &str,
    allowed: &'static [&'static str],
) -> Result<Predicate> {
    match policy {
        UnknownStatePolicy::Reject => Err(FilterError::UnsupportedState {
            state: state.to_string(),
            allowed: allowed.to_vec(),
        }),
        UnknownStatePolicy::MatchNothing => {
            tracing::debug!(state, "unknown lifecycle state; matching nothing");
            Ok(Predicate::nothing())
        }
    }
}
