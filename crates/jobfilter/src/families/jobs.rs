// crates/jobfilter/src/families/jobs.rs

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::filters::compose::compose;
use crate::filters::engine::RecordFamily;
use crate::filters::keyset::SortDirection;
use crate::filters::lifecycle::{unknown_state, LifecycleClassifier, UnknownStatePolicy};
use crate::filters::params::FilterParameters;
use crate::filters::predicate::{CmpOp, Column, Expr, Predicate};
use crate::jobs::model::JobStatus;
use crate::store::{Dataset, RECORD_COLUMNS};

/// Class name recorded by the enqueuing adapter, falling back to the job type.
pub fn job_class_expr() -> Expr {
    Expr::Coalesce(vec![
        Expr::JsonText(Column::PayloadJson, "job_class"),
        Expr::col(Column::JobType),
    ])
}

/// Every job in the `jobs` relation, newest first by default.
#[derive(Debug, Clone)]
pub struct JobsFamily {
    direction: SortDirection,
    classifier: JobsClassifier,
}

impl Default for JobsFamily {
    fn default() -> Self {
        Self::new(SortDirection::Desc)
    }
}

impl JobsFamily {
    pub fn new(direction: SortDirection) -> Self {
        Self {
            direction,
            classifier: JobsClassifier::new(UnknownStatePolicy::Reject),
        }
    }

    /// Oldest first.
    pub fn ascending() -> Self {
        Self::new(SortDirection::Asc)
    }

    pub fn with_unknown_state_policy(mut self, policy: UnknownStatePolicy) -> Self {
        self.classifier = JobsClassifier::new(policy);
        self
    }
}

impl RecordFamily for JobsFamily {
    fn name(&self) -> &'static str {
        "jobs"
    }

    fn default_base_query(&self) -> Dataset {
        Dataset::all()
    }

    fn records_query(&self) -> Dataset {
        Dataset::all().select(&RECORD_COLUMNS)
    }

    fn job_class_expr(&self) -> Expr {
        job_class_expr()
    }

    fn search_fields(&self) -> Vec<Expr> {
        vec![
            job_class_expr(),
            Expr::col(Column::QueueName),
            Expr::col(Column::JobType),
            Expr::col(Column::CronKey),
            Expr::col(Column::LastErrorMessage),
            Expr::col(Column::Id).as_text(),
        ]
    }

    fn classifier(&self) -> &dyn LifecycleClassifier {
        &self.classifier
    }

    fn sort_direction(&self) -> SortDirection {
        self.direction
    }

    fn filtered_query(&self, params: &FilterParameters, now: DateTime<Utc>) -> Result<Predicate> {
        compose(params, self, now)
    }
}

const JOB_STATES: &[&str] = &[
    "scheduled",
    "retried",
    "queued",
    "running",
    "succeeded",
    "failed",
    "dlq",
    "canceled",
];

/// Lifecycle of a job row.
///
/// Queued rows split three ways: `retried` when a previous attempt left an
/// error, otherwise `scheduled` or `queued` depending on whether they are due.
#[derive(Debug, Clone)]
pub struct JobsClassifier {
    policy: UnknownStatePolicy,
}

impl JobsClassifier {
    pub fn new(policy: UnknownStatePolicy) -> Self {
        Self { policy }
    }
}

fn status_is(status: JobStatus) -> Predicate {
    Predicate::column_eq(Column::Status, status.as_str())
}

impl LifecycleClassifier for JobsClassifier {
    fn state_names(&self) -> &'static [&'static str] {
        JOB_STATES
    }

    fn state_predicate(&self, state: &str, now: DateTime<Utc>) -> Result<Predicate> {
        let predicate = match state {
            "scheduled" => Predicate::and([
                status_is(JobStatus::Queued),
                Predicate::is_null(Column::LastErrorCode),
                Predicate::cmp(Column::ScheduledAt, CmpOp::Gt, now),
            ]),
            "retried" => Predicate::and([
                status_is(JobStatus::Queued),
                Predicate::not_null(Column::LastErrorCode),
            ]),
            "queued" => Predicate::and([
                status_is(JobStatus::Queued),
                Predicate::is_null(Column::LastErrorCode),
                Predicate::cmp(Column::ScheduledAt, CmpOp::Lte, now),
            ]),
            "running" => status_is(JobStatus::Running),
            "succeeded" => status_is(JobStatus::Succeeded),
            "failed" => status_is(JobStatus::Failed),
            "dlq" => status_is(JobStatus::Dlq),
            "canceled" => status_is(JobStatus::Canceled),
            other => return unknown_state(self.policy, other, JOB_STATES),
        };
        Ok(predicate)
    }
}
