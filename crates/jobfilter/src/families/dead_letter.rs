// crates/jobfilter/src/families/dead_letter.rs

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::families::jobs::job_class_expr;
use crate::filters::compose::compose;
use crate::filters::engine::RecordFamily;
use crate::filters::keyset::SortDirection;
use crate::filters::lifecycle::{unknown_state, LifecycleClassifier, UnknownStatePolicy};
use crate::filters::params::FilterParameters;
use crate::filters::predicate::{Column, Expr, Predicate};
use crate::jobs::model::JobStatus;
use crate::store::{Dataset, RECORD_COLUMNS};

const DLQ_STATES: &[&str] = &["max_attempts_exceeded", "non_retryable"];

/// Jobs parked in the dead letter queue. States are the reasons they got
/// there; an unknown reason filters to nothing.
#[derive(Debug, Clone)]
pub struct DeadLetterFamily {
    classifier: DeadLetterClassifier,
}

impl Default for DeadLetterFamily {
    fn default() -> Self {
        Self {
            classifier: DeadLetterClassifier {
                policy: UnknownStatePolicy::MatchNothing,
            },
        }
    }
}

impl RecordFamily for DeadLetterFamily {
    fn name(&self) -> &'static str {
        "dead_letter"
    }

    fn default_base_query(&self) -> Dataset {
        Dataset::all().filter(Predicate::column_eq(Column::Status, JobStatus::Dlq.as_str()))
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
            Expr::col(Column::LastErrorCode),
            Expr::col(Column::LastErrorMessage),
            Expr::col(Column::Id).as_text(),
        ]
    }

    fn classifier(&self) -> &dyn LifecycleClassifier {
        &self.classifier
    }

    fn sort_direction(&self) -> SortDirection {
        SortDirection::Desc
    }

    fn filtered_query(&self, params: &FilterParameters, now: DateTime<Utc>) -> Result<Predicate> {
        compose(params, self, now)
    }
}

#[derive(Debug, Clone)]
pub struct DeadLetterClassifier {
    policy: UnknownStatePolicy,
}

impl LifecycleClassifier for DeadLetterClassifier {
    fn state_names(&self) -> &'static [&'static str] {
        DLQ_STATES
    }

    fn state_predicate(&self, state: &str, _now: DateTime<Utc>) -> Result<Predicate> {
        let reason = match state {
            "max_attempts_exceeded" => "MAX_ATTEMPTS_EXCEEDED",
            "non_retryable" => "NON_RETRYABLE",
            other => return unknown_state(self.policy, other, DLQ_STATES),
        };
        Ok(Predicate::column_eq(Column::DlqReasonCode, reason))
    }
}
