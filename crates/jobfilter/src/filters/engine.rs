// crates/jobfilter/src/filters/engine.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use crate::error::{FilterError, Result};
use crate::filters::facets::{self, CountMapping};
use crate::filters::keyset::{self, Cursor, SortDirection};
use crate::filters::lifecycle::LifecycleClassifier;
use crate::filters::params::{
    clamp_limits, FilterParameters, ParamScope, RawParams, DEFAULT_LIMIT,
};
use crate::filters::predicate::{Expr, Predicate};
use crate::jobs::model::JobRecord;
use crate::store::{Dataset, JobStore};

/// Upper bound applied to any requested `limit`.
pub const MAX_LIMIT: i64 = 500;

/// A concrete view over job rows: which rows exist, how they are listed and
/// how their lifecycle states are defined.
pub trait RecordFamily: Send + Sync {
    fn name(&self) -> &'static str;

    /// Unfiltered dataset the facets and counts start from.
    fn default_base_query(&self) -> Dataset;

    /// Refinement applied on top of the filtered base when listing records.
    fn records_query(&self) -> Dataset;

    /// Expression yielding a row's job class.
    fn job_class_expr(&self) -> Expr;

    /// Fields searched by the free-text `query` parameter.
    fn search_fields(&self) -> Vec<Expr>;

    fn classifier(&self) -> &dyn LifecycleClassifier;

    fn sort_direction(&self) -> SortDirection;

    fn filtered_query(&self, params: &FilterParameters, now: DateTime<Utc>) -> Result<Predicate>;
}

/// Runtime binding of an engine to a record family.
#[derive(Clone)]
pub enum FamilyBinding {
    Bound(Arc<dyn RecordFamily>),
    /// No family. Every family-dependent call fails with
    /// `FilterError::NotImplemented`.
    Unbound,
}

impl FamilyBinding {
    pub fn bound(family: impl RecordFamily + 'static) -> Self {
        FamilyBinding::Bound(Arc::new(family))
    }
}

/// Request-scoped facade answering one dashboard page.
pub struct FilterEngine {
    params: FilterParameters,
    base_query: Option<Dataset>,
    binding: FamilyBinding,
    store: Arc<dyn JobStore>,
    now: DateTime<Utc>,
    default_limit: i64,
    max_limit: i64,
    window: OnceCell<Vec<JobRecord>>,
}

impl FilterEngine {
    pub fn new(params: FilterParameters, store: Arc<dyn JobStore>, binding: FamilyBinding) -> Self {
        Self {
            params,
            base_query: None,
            binding,
            store,
            now: Utc::now(),
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            window: OnceCell::new(),
        }
    }

    /// Normalizes `raw` first; invalid parameters reject the request.
    pub fn from_raw(raw: &RawParams, store: Arc<dyn JobStore>, binding: FamilyBinding) -> Result<Self> {
        let params = FilterParameters::normalize(raw).map_err(|e| {
            tracing::warn!(error = %e, "rejecting dashboard filter parameters");
            e
        })?;
        Ok(Self::new(params, store, binding))
    }

    /// Replaces the family's default base dataset.
    pub fn with_base_query(mut self, base_query: Dataset) -> Self {
        self.base_query = Some(base_query);
        self
    }

    /// Pins the instant lifecycle predicates are evaluated against.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Page size used when `limit` is absent, and the cap on any request.
    pub fn with_limits(mut self, default_limit: i64, max_limit: i64) -> Self {
        (self.default_limit, self.max_limit) = clamp_limits(default_limit, max_limit);
        self
    }

    fn family(&self, operation: &'static str) -> Result<&dyn RecordFamily> {
        match &self.binding {
            FamilyBinding::Bound(family) => Ok(family.as_ref()),
            FamilyBinding::Unbound => Err(FilterError::NotImplemented { operation }),
        }
    }

    pub fn family_name(&self) -> Result<&'static str> {
        Ok(self.family("name")?.name())
    }

    pub fn base_query(&self) -> Result<Dataset> {
        match &self.base_query {
            Some(base) => Ok(base.clone()),
            None => Ok(self.family("default_base_query")?.default_base_query()),
        }
    }

    /// Predicate for `params`, or for the engine's own parameters.
    pub fn filtered_query(&self, params: Option<&FilterParameters>) -> Result<Predicate> {
        self.family("filtered_query")?
            .filtered_query(params.unwrap_or(&self.params), self.now)
    }

    fn filtered_dataset(&self, scope: ParamScope) -> Result<Dataset> {
        let params = self.params.slice(scope);
        let predicate = self.filtered_query(Some(&params))?;
        Ok(self.base_query()?.filter(predicate))
    }

    pub async fn filtered_count(&self) -> Result<i64> {
        let dataset = self.filtered_dataset(ParamScope::All)?;
        self.store.count(&dataset).await
    }

    /// Current page: filtered rows strictly after the cursor, in the
    /// family's canonical order. Read once per engine.
    pub async fn records(&self) -> Result<Vec<JobRecord>> {
        Ok(self.current_window().await?.to_vec())
    }

    /// Final record of `records()`, from the same read.
    pub async fn last(&self) -> Result<Option<&JobRecord>> {
        Ok(self.current_window().await?.last())
    }

    async fn current_window(&self) -> Result<&[JobRecord]> {
        let window = self.window.get_or_try_init(|| self.read_window()).await?;
        Ok(window.as_slice())
    }

    async fn read_window(&self) -> Result<Vec<JobRecord>> {
        let family = self.family("records_query")?;
        let filtered = self.filtered_dataset(ParamScope::All)?;
        let view = family.records_query().filter(filtered.filter);

        let limit = self
            .params
            .limit
            .unwrap_or(self.default_limit)
            .min(self.max_limit);
        keyset::fetch_window(
            self.store.as_ref(),
            &view,
            Cursor::from_params(&self.params),
            family.sort_direction(),
            limit,
            family.job_class_expr(),
        )
        .await
    }

    /// Link parameters for the page after this one, `None` when this page
    /// is empty. The next page itself may turn out empty.
    pub async fn next_page_params(&self) -> Result<Option<BTreeMap<String, String>>> {
        let Some(last) = self.last().await? else {
            return Ok(None);
        };
        let overrides = Cursor::after(last).to_overrides();
        Ok(Some(self.params.to_params(&overrides)))
    }

    /// Jobs per queue, ignoring every filter and any column selection.
    pub async fn queues(&self) -> Result<CountMapping> {
        let base = self.base_query()?.unscope_projection();
        facets::queues(self.store.as_ref(), &base).await
    }

    /// Jobs per job class, filtered by `queue_name` only.
    pub async fn job_classes(&self) -> Result<CountMapping> {
        let family = self.family("job_classes")?;
        let scoped = self.filtered_dataset(ParamScope::QueueOnly)?;
        facets::job_classes(self.store.as_ref(), scoped, &family.job_class_expr()).await
    }

    /// Jobs per lifecycle state under every filter except `state`.
    /// Every state name is present, zero counts included.
    pub async fn states(&self) -> Result<CountMapping> {
        let classifier = self.family("states")?.classifier();
        let scoped = self.filtered_dataset(ParamScope::AllExceptState)?;

        let mut groups = Vec::with_capacity(classifier.state_names().len());
        for state in classifier.state_names() {
            let dataset = scoped
                .clone()
                .filter(classifier.state_predicate(state, self.now)?);
            let count = self.store.count(&dataset).await?;
            groups.push((Some(state.to_string()), count));
        }

        Ok(CountMapping::from_groups(groups))
    }

    pub fn state_names(&self) -> Result<&'static [&'static str]> {
        Ok(self.family("state_names")?.classifier().state_names())
    }

    pub fn to_params(&self, overrides: &[(&str, Option<String>)]) -> BTreeMap<String, String> {
        self.params.to_params(overrides)
    }
}
