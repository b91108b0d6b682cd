use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A job row as the dashboard lists it. Read-only; the job engine owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRecord {
    pub id: Uuid,
    pub queue_name: Option<String>,
    pub job_type: String,
    /// Derived by the record family's job class projection.
    pub job_class: String,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub cron_key: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,

    pub last_error_code: Option<String>,
    pub last_error_message: Option<String>,
    pub dlq_reason_code: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every column of a stored job, payload included.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub id: Uuid,
    pub queue_name: Option<String>,
    pub job_type: String,
    pub payload_json: Value,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub cron_key: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,

    pub last_error_code: Option<String>,
    pub last_error_message: Option<String>,
    pub dlq_reason_code: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub queue_name: Option<String>,
    pub job_type: String,
    pub payload_json: Value,
    pub status: JobStatus,
    pub scheduled_at: DateTime<Utc>,
    pub cron_key: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error_code: Option<String>,
    pub last_error_message: Option<String>,
    pub dlq_reason_code: Option<String>,
}

impl NewJob {
    /// A queued job of `job_type` due at `scheduled_at`.
    pub fn queued(queue_name: Option<&str>, job_type: &str, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            queue_name: queue_name.map(str::to_string),
            job_type: job_type.to_string(),
            payload_json: Value::Object(Default::default()),
            status: JobStatus::Queued,
            scheduled_at,
            cron_key: None,
            finished_at: None,
            last_error_code: None,
            last_error_message: None,
            dlq_reason_code: None,
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_payload(mut self, payload_json: Value) -> Self {
        self.payload_json = payload_json;
        self
    }

    pub fn with_cron_key(mut self, cron_key: &str) -> Self {
        self.cron_key = Some(cron_key.to_string());
        self
    }

    pub fn finished(mut self, finished_at: DateTime<Utc>) -> Self {
        self.finished_at = Some(finished_at);
        self
    }

    pub fn with_error(mut self, code: &str, message: &str) -> Self {
        self.last_error_code = Some(code.to_string());
        self.last_error_message = Some(message.to_string());
        self
    }

    pub fn dead_lettered(mut self, reason_code: &str) -> Self {
        self.status = JobStatus::Dlq;
        self.dlq_reason_code = Some(reason_code.to_string());
        self
    }

    pub(crate) fn into_row(self, id: Uuid, now: DateTime<Utc>) -> JobRow {
        JobRow {
            id,
            queue_name: self.queue_name,
            job_type: self.job_type,
            payload_json: self.payload_json,
            status: self.status.as_str().to_string(),
            scheduled_at: self.scheduled_at,
            cron_key: self.cron_key,
            finished_at: self.finished_at,
            last_error_code: self.last_error_code,
            last_error_message: self.last_error_message,
            dlq_reason_code: self.dlq_reason_code,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Dlq,
    Canceled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Dlq => "dlq",
            JobStatus::Canceled => "canceled",
        }
    }
}
