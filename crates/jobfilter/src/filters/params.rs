// crates/jobfilter/src/filters/params.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::{FilterError, Result};

pub const DEFAULT_LIMIT: i64 = 25;

/// Normalizes a `(default, max)` page size pair: the cap is at least 1 and
/// the default lies within `1..=max`.
pub fn clamp_limits(default_limit: i64, max_limit: i64) -> (i64, i64) {
    let max_limit = max_limit.max(1);
    (default_limit.clamp(1, max_limit), max_limit)
}

/// Flat string map as it arrives from a query string.
pub type RawParams = HashMap<String, String>;

/// Keys emitted by `to_params` before overrides, in this order.
const LINK_KEYS: [&str; 7] = [
    "job_class",
    "limit",
    "queue_name",
    "query",
    "state",
    "cron_key",
    "finished_since",
];

/// Which subset of the parameters a query should see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamScope {
    All,
    /// Only `queue_name`; used by the job class facet.
    QueueOnly,
    /// Everything but `state`; used by the per-state counts.
    AllExceptState,
}

/// Typed, validated dashboard filter parameters.
///
/// Blank values are normalized to `None`, so every `Some` here participates
/// in filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParameters {
    pub queue_name: Option<String>,
    pub job_class: Option<String>,
    pub query: Option<String>,
    pub state: Option<String>,
    pub cron_key: Option<String>,
    pub finished_since: Option<DateTime<Utc>>,
    pub after_scheduled_at: Option<DateTime<Utc>>,
    pub after_id: Option<Uuid>,
    /// `None` when the caller did not ask for a limit.
    pub limit: Option<i64>,
}

impl FilterParameters {
    pub fn normalize(raw: &RawParams) -> Result<Self> {
        let text = |key: &str| raw.get(key).and_then(|v| present(v)).map(str::to_string);

        let finished_since = raw
            .get("finished_since")
            .and_then(|v| present(v))
            .map(|v| parse_timestamp("finished_since", v))
            .transpose()?;

        let after_scheduled_at = raw
            .get("after_scheduled_at")
            .and_then(|v| present(v))
            .map(|v| parse_timestamp("after_scheduled_at", v))
            .transpose()?;

        let after_id = raw
            .get("after_id")
            .and_then(|v| present(v))
            .map(|v| Uuid::parse_str(v).map_err(|_| FilterError::invalid("after_id", v)))
            .transpose()?;

        let limit = raw
            .get("limit")
            .and_then(|v| present(v))
            .map(|v| match v.parse::<i64>() {
                Ok(n) if n >= 1 => Ok(n),
                _ => Err(FilterError::invalid("limit", v)),
            })
            .transpose()?;

        Ok(Self {
            queue_name: text("queue_name"),
            job_class: text("job_class"),
            query: text("query"),
            state: text("state"),
            cron_key: text("cron_key"),
            finished_since,
            after_scheduled_at,
            after_id,
            limit,
        })
    }

    /// Requested page size, or `DEFAULT_LIMIT`.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Copy of these parameters restricted to `scope`.
    pub fn slice(&self, scope: ParamScope) -> Self {
        match scope {
            ParamScope::All => self.clone(),
            ParamScope::QueueOnly => Self {
                queue_name: self.queue_name.clone(),
                ..Self::default()
            },
            ParamScope::AllExceptState => Self {
                state: None,
                ..self.clone()
            },
        }
    }

    /// Link parameters preserving the active filter.
    ///
    /// Overrides are applied on top of the base projection and may add keys
    /// outside of it (cursor keys, for instance). Blank values, including
    /// `None` overrides, are removed.
    pub fn to_params(&self, overrides: &[(&str, Option<String>)]) -> BTreeMap<String, String> {
        let mut out: BTreeMap<String, Option<String>> = LINK_KEYS
            .iter()
            .map(|key| (key.to_string(), self.link_value(key)))
            .collect();

        for (key, value) in overrides {
            out.insert(key.to_string(), value.clone());
        }

        out.into_iter()
            .filter_map(|(k, v)| match v {
                Some(v) if !is_blank(&v) => Some((k, v)),
                _ => None,
            })
            .collect()
    }

    fn link_value(&self, key: &str) -> Option<String> {
        match key {
            "job_class" => self.job_class.clone(),
            "limit" => self.limit.map(|n| n.to_string()),
            "queue_name" => self.queue_name.clone(),
            "query" => self.query.clone(),
            "state" => self.state.clone(),
            "cron_key" => self.cron_key.clone(),
            "finished_since" => self.finished_since.map(format_timestamp),
            _ => None,
        }
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn present(value: &str) -> Option<&str> {
    let v = value.trim();
    (!v.is_empty()).then_some(v)
}

/// Parses the timestamp forms a dashboard link or a human may produce.
/// Zone-less values are taken as UTC.
pub fn parse_timestamp(key: &'static str, value: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| FilterError::invalid(key, value))
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
