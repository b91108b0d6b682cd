// crates/jobfilter/src/filters/compose.rs

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::filters::engine::RecordFamily;
use crate::filters::params::FilterParameters;
use crate::filters::predicate::{CmpOp, Column, Predicate};

/// ANDs the predicate of every present parameter. Cursor keys and `limit`
/// are paging concerns and are left to the pager.
pub fn compose(
    params: &FilterParameters,
    family: &dyn RecordFamily,
    now: DateTime<Utc>,
) -> Result<Predicate> {
    let mut parts = Vec::new();

    if let Some(queue_name) = &params.queue_name {
        parts.push(Predicate::column_eq(Column::QueueName, queue_name.as_str()));
    }

    if let Some(job_class) = &params.job_class {
        parts.push(Predicate::eq(family.job_class_expr(), job_class.as_str()));
    }

    if let Some(cron_key) = &params.cron_key {
        parts.push(Predicate::column_eq(Column::CronKey, cron_key.as_str()));
    }

    if let Some(finished_since) = params.finished_since {
        parts.push(Predicate::cmp(Column::FinishedAt, CmpOp::Gte, finished_since));
    }

    if let Some(query) = &params.query {
        parts.push(Predicate::TextMatch {
            fields: family.search_fields(),
            needle: query.clone(),
        });
    }

    if let Some(state) = &params.state {
        parts.push(family.classifier().state_predicate(state, now)?);
    }

    Ok(Predicate::and(parts))
}
