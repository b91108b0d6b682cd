// crates/jobfilter/src/filters/keyset.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::filters::params::{format_timestamp, FilterParameters};
use crate::filters::predicate::{CmpOp, Column, Expr, Predicate};
use crate::jobs::model::JobRecord;
use crate::store::{Dataset, JobStore, PageRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Operator meaning "comes after" in this direction.
    fn after_op(&self) -> CmpOp {
        match self {
            SortDirection::Asc => CmpOp::Gt,
            SortDirection::Desc => CmpOp::Lt,
        }
    }
}

/// Position of the last row of the previous page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub scheduled_at: DateTime<Utc>,
    /// Tie-break; without it only the timestamp bounds the page.
    pub id: Option<Uuid>,
}

impl Cursor {
    /// `None` on the first page (no `after_scheduled_at`).
    pub fn from_params(params: &FilterParameters) -> Option<Self> {
        params.after_scheduled_at.map(|scheduled_at| Self {
            scheduled_at,
            id: params.after_id,
        })
    }

    pub fn after(record: &JobRecord) -> Self {
        Self {
            scheduled_at: record.scheduled_at,
            id: Some(record.id),
        }
    }

    /// Rows strictly after this cursor in `(scheduled_at, id)` order.
    pub fn predicate(&self, direction: SortDirection) -> Predicate {
        let op = direction.after_op();
        let past_timestamp = Predicate::cmp(Column::ScheduledAt, op, self.scheduled_at);

        match self.id {
            None => past_timestamp,
            Some(id) => Predicate::or([
                past_timestamp,
                Predicate::and([
                    Predicate::column_eq(Column::ScheduledAt, self.scheduled_at),
                    Predicate::cmp(Column::Id, op, id),
                ]),
            ]),
        }
    }

    /// Link parameters that resume paging after this cursor.
    pub fn to_overrides(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("after_scheduled_at", Some(format_timestamp(self.scheduled_at))),
            ("after_id", self.id.map(|id| id.to_string())),
        ]
    }
}

/// One window of `dataset` following `cursor`, at most `limit` rows.
pub async fn fetch_window(
    store: &dyn JobStore,
    dataset: &Dataset,
    cursor: Option<Cursor>,
    direction: SortDirection,
    limit: i64,
    job_class: Expr,
) -> Result<Vec<JobRecord>> {
    let dataset = match cursor {
        Some(cursor) => dataset.clone().filter(cursor.predicate(direction)),
        None => dataset.clone(),
    };

    let page = PageRequest {
        direction,
        limit,
        job_class,
    };

    tracing::debug!(?direction, limit, has_cursor = cursor.is_some(), "fetching job window");
    store.fetch_page(&dataset, &page).await
}
