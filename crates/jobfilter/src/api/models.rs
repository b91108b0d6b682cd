// crates/jobfilter/src/api/models.rs
use serde::Serialize;
use std::collections::BTreeMap;

use crate::filters::CountMapping;
use crate::jobs::model::JobRecord;

#[derive(Debug, Clone, Serialize)]
pub struct JobsPageResponse {
    pub family: &'static str,
    pub items: Vec<JobRecord>,
    /// Query parameters for the following page; absent on an empty page.
    pub next_page: Option<BTreeMap<String, String>>,
    pub filtered_count: i64,

    pub queues: CountMapping,
    pub job_classes: CountMapping,
    pub states: CountMapping,
    pub state_names: Vec<&'static str>,

    /// Active filter, blank values removed.
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
