// crates/jobfilter/src/store/mod.rs

use async_trait::async_trait;

use crate::error::Result;
use crate::filters::keyset::SortDirection;
use crate::filters::predicate::{Column, Expr, Predicate};
use crate::jobs::model::JobRecord;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Columns of the list view. The payload stays out of it.
pub const RECORD_COLUMNS: [Column; 12] = [
    Column::Id,
    Column::QueueName,
    Column::JobType,
    Column::Status,
    Column::ScheduledAt,
    Column::CronKey,
    Column::FinishedAt,
    Column::LastErrorCode,
    Column::LastErrorMessage,
    Column::DlqReasonCode,
    Column::CreatedAt,
    Column::UpdatedAt,
];

/// A filtered view over the `jobs` relation, optionally narrowed to a set of
/// selected columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub filter: Predicate,
    pub projection: Option<Vec<Column>>,
}

impl Dataset {
    /// Every job, all columns.
    pub fn all() -> Self {
        Self {
            filter: Predicate::True,
            projection: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = std::mem::replace(&mut self.filter, Predicate::True).and_also(predicate);
        self
    }

    pub fn select(mut self, columns: &[Column]) -> Self {
        self.projection = Some(columns.to_vec());
        self
    }

    /// Drops any column selection so the dataset can be grouped by an
    /// arbitrary expression.
    pub fn unscope_projection(mut self) -> Self {
        self.projection = None;
        self
    }
}

/// Ordered, bounded read over a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub direction: SortDirection,
    pub limit: i64,
    /// Projection that fills `JobRecord::job_class`.
    pub job_class: Expr,
}

/// The queryable dataset the filter engine reads from.
///
/// Implementations must be read-only and must answer each call from a single
/// consistent read; calls are never retried by the engine.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Rows of `dataset` ordered by `(scheduled_at, id)` in
    /// `page.direction`, at most `page.limit` of them.
    async fn fetch_page(&self, dataset: &Dataset, page: &PageRequest) -> Result<Vec<JobRecord>>;

    async fn count(&self, dataset: &Dataset) -> Result<i64>;

    /// Row counts per distinct text value of `key`. `None` is the null group.
    /// Fails with `FilterError::ProjectedGrouping` on a projected dataset.
    async fn group_count(&self, dataset: &Dataset, key: &Expr) -> Result<Vec<(Option<String>, i64)>>;
}
