// crates/jobfilter/src/filters/predicate.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Columns of the `jobs` relation a predicate may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    QueueName,
    JobType,
    PayloadJson,
    Status,
    ScheduledAt,
    CronKey,
    FinishedAt,
    LastErrorCode,
    LastErrorMessage,
    DlqReasonCode,
    CreatedAt,
    UpdatedAt,
}

impl Column {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::QueueName => "queue_name",
            Column::JobType => "job_type",
            Column::PayloadJson => "payload_json",
            Column::Status => "status",
            Column::ScheduledAt => "scheduled_at",
            Column::CronKey => "cron_key",
            Column::FinishedAt => "finished_at",
            Column::LastErrorCode => "last_error_code",
            Column::LastErrorMessage => "last_error_message",
            Column::DlqReasonCode => "dlq_reason_code",
            Column::CreatedAt => "created_at",
            Column::UpdatedAt => "updated_at",
        }
    }
}

/// Scalar expression over one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(Column),
    /// `column ->> key` on a JSON column.
    JsonText(Column, &'static str),
    /// First non-null value.
    Coalesce(Vec<Expr>),
    /// Text rendering of any expression (`::text` in SQL).
    AsText(Box<Expr>),
}

impl Expr {
    pub fn col(column: Column) -> Self {
        Expr::Column(column)
    }

    pub fn as_text(self) -> Self {
        Expr::AsText(Box::new(self))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CmpOp::Lt => " < ",
            CmpOp::Lte => " <= ",
            CmpOp::Gt => " > ",
            CmpOp::Gte => " >= ",
        }
    }
}

/// Boolean condition over the `jobs` relation.
///
/// Stores translate this tree into their own query language; nothing in the
/// filter layer knows whether it ends up as SQL or as an in-memory scan.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Eq(Expr, Value),
    Cmp(Expr, CmpOp, Value),
    IsNull(Expr),
    /// Case-insensitive substring match on any of `fields`.
    TextMatch { fields: Vec<Expr>, needle: String },
}

impl Predicate {
    pub fn eq(expr: Expr, value: impl Into<Value>) -> Self {
        Predicate::Eq(expr, value.into())
    }

    pub fn column_eq(column: Column, value: impl Into<Value>) -> Self {
        Predicate::Eq(Expr::Column(column), value.into())
    }

    pub fn cmp(column: Column, op: CmpOp, value: impl Into<Value>) -> Self {
        Predicate::Cmp(Expr::Column(column), op, value.into())
    }

    pub fn is_null(column: Column) -> Self {
        Predicate::IsNull(Expr::Column(column))
    }

    pub fn not_null(column: Column) -> Self {
        Predicate::Not(Box::new(Predicate::is_null(column)))
    }

    /// Matches no row.
    pub fn nothing() -> Self {
        Predicate::Not(Box::new(Predicate::True))
    }

    /// Conjunction of `parts`. Nested conjunctions are flattened and `True`
    /// operands dropped, so an empty filter stays `True`.
    pub fn and(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::True => {}
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => Predicate::True,
            1 => flat.remove(0),
            _ => Predicate::And(flat),
        }
    }

    pub fn or(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let parts: Vec<Predicate> = parts.into_iter().collect();
        if parts.iter().any(|p| *p == Predicate::True) {
            return Predicate::True;
        }
        match parts.len() {
            0 => Predicate::nothing(),
            1 => parts.into_iter().next().unwrap_or(Predicate::True),
            _ => Predicate::Or(parts),
        }
    }

    pub fn and_also(self, other: Predicate) -> Self {
        Predicate::and([self, other])
    }
}
