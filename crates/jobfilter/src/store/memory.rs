// crates/jobfilter/src/store/memory.rs

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{FilterError, Result};
use crate::filters::keyset::SortDirection;
use crate::filters::predicate::{CmpOp, Column, Expr, Predicate, Value};
use crate::jobs::model::{JobRecord, JobRow, NewJob};
use crate::store::{Dataset, JobStore, PageRequest};

/// `JobStore` over rows held in process. Each call reads under one lock
/// acquisition, so a page never observes a half-applied write.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<JobRow>>,
    queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: NewJob) -> Uuid {
        let id = Uuid::now_v7();
        let row = job.into_row(id, Utc::now());
        self.rows.write().await.push(row);
        id
    }

    /// Applies `change` to the row with `id`; false if there is none.
    pub async fn update(&self, id: Uuid, change: impl FnOnce(&mut JobRow)) -> bool {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                change(row);
                row.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Read calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn fetch_page(&self, dataset: &Dataset, page: &PageRequest) -> Result<Vec<JobRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read().await;

        let mut matching: Vec<&JobRow> = rows.iter().filter(|r| matches(&dataset.filter, r)).collect();
        matching.sort_by(|a, b| {
            let ord = (a.scheduled_at, a.id).cmp(&(b.scheduled_at, b.id));
            match page.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        let limit = usize::try_from(page.limit.max(0)).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|row| to_record(row, &page.job_class))
            .collect())
    }

    async fn count(&self, dataset: &Dataset) -> Result<i64> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| matches(&dataset.filter, r)).count() as i64)
    }

    async fn group_count(&self, dataset: &Dataset, key: &Expr) -> Result<Vec<(Option<String>, i64)>> {
        if dataset.projection.is_some() {
            return Err(FilterError::ProjectedGrouping);
        }

        self.queries.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read().await;

        let mut groups: Vec<(Option<String>, i64)> = Vec::new();
        for row in rows.iter().filter(|r| matches(&dataset.filter, r)) {
            let label = eval(key, row).map(Scalar::into_text);
            match groups.iter_mut().find(|(k, _)| *k == label) {
                Some((_, n)) => *n += 1,
                None => groups.push((label, 1)),
            }
        }
        Ok(groups)
    }
}

fn to_record(row: &JobRow, job_class: &Expr) -> JobRecord {
    JobRecord {
        id: row.id,
        queue_name: row.queue_name.clone(),
        job_type: row.job_type.clone(),
        job_class: eval(job_class, row).map(Scalar::into_text).unwrap_or_default(),
        status: row.status.clone(),
        scheduled_at: row.scheduled_at,
        cron_key: row.cron_key.clone(),
        finished_at: row.finished_at,
        last_error_code: row.last_error_code.clone(),
        last_error_message: row.last_error_message.clone(),
        dlq_reason_code: row.dlq_reason_code.clone(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(Json),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Timestamp(t) => t.to_rfc3339(),
            Scalar::Uuid(u) => u.to_string(),
            Scalar::Json(j) => j.to_string(),
        }
    }
}

fn column(row: &JobRow, column: Column) -> Option<Scalar> {
    let text = |v: &Option<String>| v.clone().map(Scalar::Text);
    match column {
        Column::Id => Some(Scalar::Uuid(row.id)),
        Column::QueueName => text(&row.queue_name),
        Column::JobType => Some(Scalar::Text(row.job_type.clone())),
        Column::PayloadJson => Some(Scalar::Json(row.payload_json.clone())),
        Column::Status => Some(Scalar::Text(row.status.clone())),
        Column::ScheduledAt => Some(Scalar::Timestamp(row.scheduled_at)),
        Column::CronKey => text(&row.cron_key),
        Column::FinishedAt => row.finished_at.map(Scalar::Timestamp),
        Column::LastErrorCode => text(&row.last_error_code),
        Column::LastErrorMessage => text(&row.last_error_message),
        Column::DlqReasonCode => text(&row.dlq_reason_code),
        Column::CreatedAt => Some(Scalar::Timestamp(row.created_at)),
        Column::UpdatedAt => Some(Scalar::Timestamp(row.updated_at)),
    }
}

fn eval(expr: &Expr, row: &JobRow) -> Option<Scalar> {
    match expr {
        Expr::Column(c) => column(row, *c),
        Expr::JsonText(c, key) => match column(row, *c)? {
            // `->>` semantics: strings unquoted, JSON null is SQL NULL.
            Scalar::Json(doc) => match doc.get(*key)? {
                Json::Null => None,
                Json::String(s) => Some(Scalar::Text(s.clone())),
                other => Some(Scalar::Text(other.to_string())),
            },
            _ => None,
        },
        Expr::Coalesce(exprs) => exprs.iter().find_map(|e| eval(e, row)),
        Expr::AsText(inner) => eval(inner, row).map(|s| Scalar::Text(s.into_text())),
    }
}

fn compare(lhs: &Scalar, rhs: &Value) -> Option<std::cmp::Ordering> {
    match (lhs, rhs) {
        (Scalar::Text(a), Value::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (Scalar::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Scalar::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// SQL three-valued logic: `None` is UNKNOWN.
fn eval_predicate(predicate: &Predicate, row: &JobRow) -> Option<bool> {
    match predicate {
        Predicate::True => Some(true),
        Predicate::And(parts) => {
            // a AND b == NOT (NOT a OR NOT b)
            any_true(parts.iter().map(|p| eval_predicate(p, row).map(|b| !b))).map(|b| !b)
        }
        Predicate::Or(parts) => any_true(parts.iter().map(|p| eval_predicate(p, row))),
        Predicate::Not(inner) => eval_predicate(inner, row).map(|b| !b),
        Predicate::Eq(expr, value) => {
            let lhs = eval(expr, row)?;
            compare(&lhs, value).map(|o| o.is_eq())
        }
        Predicate::Cmp(expr, op, value) => {
            let lhs = eval(expr, row)?;
            let ord = compare(&lhs, value)?;
            Some(match op {
                CmpOp::Lt => ord.is_lt(),
                CmpOp::Lte => ord.is_le(),
                CmpOp::Gt => ord.is_gt(),
                CmpOp::Gte => ord.is_ge(),
            })
        }
        Predicate::IsNull(expr) => Some(eval(expr, row).is_none()),
        Predicate::TextMatch { fields, needle } => {
            let needle = needle.to_lowercase();
            let hits = fields
                .iter()
                .map(|f| eval(f, row).map(|s| s.into_text().to_lowercase().contains(&needle)));
            any_true(hits)
        }
    }
}

fn any_true(results: impl Iterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for result in results {
        match result {
            Some(true) => return Some(true),
            None => unknown = true,
            Some(false) => {}
        }
    }
    if unknown {
        None
    } else {
        Some(false)
    }
}

fn matches(predicate: &Predicate, row: &JobRow) -> bool {
    eval_predicate(predicate, row) == Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::model::NewJob;
    use serde_json::json;

    fn row(queue: Option<&str>) -> JobRow {
        NewJob::queued(queue, "SendMail", Utc::now()).into_row(Uuid::now_v7(), Utc::now())
    }

    #[test]
    fn comparisons_with_null_are_unknown() {
        let r = row(None);
        let eq = Predicate::column_eq(Column::QueueName, "default");
        assert_eq!(eval_predicate(&eq, &r), None);
        assert!(!matches(&Predicate::Not(Box::new(eq)), &r));
        assert!(matches(&Predicate::is_null(Column::QueueName), &r));
    }

    #[test]
    fn json_text_falls_back_through_coalesce() {
        let expr = crate::families::jobs::job_class_expr();
        let mut r = row(Some("default"));
        assert_eq!(eval(&expr, &r), Some(Scalar::Text("SendMail".into())));

        r.payload_json = json!({ "job_class": "WelcomeMailer" });
        assert_eq!(eval(&expr, &r), Some(Scalar::Text("WelcomeMailer".into())));

        r.payload_json = json!({ "job_class": null });
        assert_eq!(eval(&expr, &r), Some(Scalar::Text("SendMail".into())));
    }

    #[test]
    fn text_match_is_case_insensitive_across_fields() {
        let r = row(Some("Mailers"));
        let p = Predicate::TextMatch {
            fields: vec![Expr::col(Column::CronKey), Expr::col(Column::QueueName)],
            needle: "MAIL".into(),
        };
        assert!(matches(&p, &r));
    }
}
