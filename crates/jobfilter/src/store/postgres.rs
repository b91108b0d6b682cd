// crates/jobfilter/src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::{FilterError, Result};
use crate::filters::predicate::{Expr, Predicate, Value};
use crate::jobs::model::JobRecord;
use crate::store::{Dataset, JobStore, PageRequest, RECORD_COLUMNS};

/// `JobStore` backed by the `jobs` table.
///
/// Every method issues exactly one statement, so each page or count is a
/// single snapshot under READ COMMITTED.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn fetch_page(&self, dataset: &Dataset, page: &PageRequest) -> Result<Vec<JobRecord>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        for column in RECORD_COLUMNS {
            qb.push(column.as_sql()).push(", ");
        }
        qb.push("COALESCE(");
        push_expr(&mut qb, &page.job_class);
        qb.push(", '') AS job_class FROM jobs WHERE ");
        push_predicate(&mut qb, &dataset.filter);

        let dir = page.direction.as_sql();
        qb.push(format!(" ORDER BY scheduled_at {dir}, id {dir} LIMIT "));
        qb.push_bind(page.limit);

        let rows = qb
            .build_query_as::<JobRecord>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(rows = rows.len(), limit = page.limit, "fetched job page");
        Ok(rows)
    }

    async fn count(&self, dataset: &Dataset) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs WHERE ");
        push_predicate(&mut qb, &dataset.filter);

        let n = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(n)
    }

    async fn group_count(&self, dataset: &Dataset, key: &Expr) -> Result<Vec<(Option<String>, i64)>> {
        if dataset.projection.is_some() {
            return Err(FilterError::ProjectedGrouping);
        }

        let mut qb = QueryBuilder::<Postgres>::new("SELECT (");
        push_expr(&mut qb, key);
        qb.push(")::text AS key, COUNT(*) AS count FROM jobs WHERE ");
        push_predicate(&mut qb, &dataset.filter);
        qb.push(" GROUP BY 1");

        let rows = qb
            .build_query_as::<(Option<String>, i64)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// Appends `predicate` as a parenthesized boolean SQL expression.
pub fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::True => {
            qb.push("TRUE");
        }
        Predicate::And(parts) => push_joined(qb, parts, " AND "),
        Predicate::Or(parts) => push_joined(qb, parts, " OR "),
        Predicate::Not(inner) => {
            qb.push("NOT (");
            push_predicate(qb, inner);
            qb.push(")");
        }
        Predicate::Eq(expr, value) => {
            qb.push("(");
            push_expr(qb, expr);
            qb.push(" = ");
            push_value(qb, value);
            qb.push(")");
        }
        Predicate::Cmp(expr, op, value) => {
            qb.push("(");
            push_expr(qb, expr);
            qb.push(op.as_sql());
            push_value(qb, value);
            qb.push(")");
        }
        Predicate::IsNull(expr) => {
            qb.push("(");
            push_expr(qb, expr);
            qb.push(" IS NULL)");
        }
        Predicate::TextMatch { fields, needle } => {
            let pattern = format!("%{}%", escape_like(needle));
            qb.push("(");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("(");
                push_expr(qb, field);
                qb.push(")::text ILIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" ESCAPE '\\'");
            }
            if fields.is_empty() {
                qb.push("FALSE");
            }
            qb.push(")");
        }
    }
}

fn push_joined(qb: &mut QueryBuilder<'_, Postgres>, parts: &[Predicate], sep: &str) {
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(sep);
        }
        push_predicate(qb, part);
    }
    qb.push(")");
}

pub fn push_expr(qb: &mut QueryBuilder<'_, Postgres>, expr: &Expr) {
    match expr {
        Expr::Column(column) => {
            qb.push(column.as_sql());
        }
        Expr::JsonText(column, key) => {
            // Keys are compile-time constants; inline them so GROUP BY and
            // SELECT see the same expression.
            qb.push(format!("({} ->> '{}')", column.as_sql(), key.replace('\'', "''")));
        }
        Expr::Coalesce(exprs) => {
            qb.push("COALESCE(");
            for (i, e) in exprs.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_expr(qb, e);
            }
            qb.push(")");
        }
        Expr::AsText(inner) => {
            qb.push("(");
            push_expr(qb, inner);
            qb.push(")::text");
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Text(s) => {
            qb.push_bind(s.clone());
        }
        Value::Timestamp(t) => {
            qb.push_bind(*t);
        }
        Value::Uuid(u) => {
            qb.push_bind(*u);
        }
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::keyset::{Cursor, SortDirection};
    use crate::filters::predicate::Column;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn render(predicate: &Predicate) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_predicate(&mut qb, predicate);
        qb.into_sql()
    }

    #[test]
    fn renders_conjunction_with_binds() {
        let p = Predicate::and([
            Predicate::column_eq(Column::QueueName, "default"),
            Predicate::not_null(Column::LastErrorCode),
        ]);
        assert_eq!(
            render(&p),
            "((queue_name = $1) AND NOT ((last_error_code IS NULL)))"
        );
    }

    #[test]
    fn renders_keyset_cursor() {
        let cursor = Cursor {
            scheduled_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            id: Some(Uuid::from_u128(1)),
        };
        assert_eq!(
            render(&cursor.predicate(SortDirection::Desc)),
            "((scheduled_at < $1) OR ((scheduled_at = $2) AND (id < $3)))"
        );
    }

    #[test]
    fn renders_job_class_projection_inline() {
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_expr(&mut qb, &crate::families::jobs::job_class_expr());
        assert_eq!(
            qb.into_sql(),
            "COALESCE((payload_json ->> 'job_class'), job_type)"
        );
    }

    #[test]
    fn renders_text_match_with_escaped_pattern() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        let p = Predicate::TextMatch {
            fields: vec![Expr::col(Column::QueueName), Expr::col(Column::Id).as_text()],
            needle: "mail".into(),
        };
        assert_eq!(
            render(&p),
            "((queue_name)::text ILIKE $1 ESCAPE '\\' OR ((id)::text)::text ILIKE $2 ESCAPE '\\')"
        );
    }
}
