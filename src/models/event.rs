//! Execution log records
//!
//! Mirrors one row of the append-only runbook log table. Field names follow
//! the storage columns so records round-trip through the query API untouched.

use super::status::ExecStatus;
use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::{Europe::Rome, Tz};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One immutable record of the execution log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    #[serde(rename = "PartitionKey", default, deserialize_with = "null_as_empty")]
    pub partition_key: String,

    #[serde(rename = "RowKey", default, deserialize_with = "null_as_empty")]
    pub row_key: String,

    /// Stable id of the logical execution; not unique per record
    #[serde(rename = "ExecId", default, deserialize_with = "null_as_empty")]
    pub exec_id: String,

    #[serde(rename = "Status", default, deserialize_with = "null_as_empty")]
    pub status: String,

    #[serde(rename = "RequestedAt", default, deserialize_with = "lenient_string")]
    pub requested_at: Option<String>,

    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    /// Schema (runbook definition) id
    #[serde(rename = "Id", default)]
    pub schema_id: Option<String>,

    #[serde(rename = "Url", default)]
    pub url: Option<String>,

    #[serde(rename = "Runbook", default)]
    pub runbook: Option<String>,

    #[serde(rename = "Run_Args", default)]
    pub run_args: Option<String>,

    #[serde(rename = "Worker", default)]
    pub worker: Option<String>,

    /// Opaque blob: either a JSON string or an inline object
    #[serde(rename = "Log", default)]
    pub log: Option<Value>,

    #[serde(rename = "OnCall", default, deserialize_with = "bool_ish")]
    pub on_call: bool,

    #[serde(rename = "MonitorCondition", default)]
    pub monitor_condition: Option<String>,

    #[serde(rename = "Severity", default)]
    pub severity: Option<String>,

    #[serde(rename = "ApprovalRequired", default, deserialize_with = "bool_ish")]
    pub approval_required: bool,

    #[serde(rename = "ApprovalExpiresAt", default)]
    pub approval_expires_at: Option<String>,

    #[serde(rename = "ApprovalDecisionBy", default)]
    pub approval_decision_by: Option<String>,

    /// Separately stored resource info; wins over the Log-embedded one when non-empty
    #[serde(rename = "ResourceInfo", default)]
    pub resource_info: Option<Value>,
}

impl ExecutionEvent {
    /// Parsed status of this record
    pub fn exec_status(&self) -> ExecStatus {
        ExecStatus::parse(&self.status)
    }

    /// `RequestedAt` as UTC; malformed or missing values sort as epoch zero
    pub fn requested_at_utc(&self) -> DateTime<Utc> {
        self.requested_at
            .as_deref()
            .and_then(parse_requested_at)
            .unwrap_or_else(epoch)
    }

    /// The `Log` blob as text, whichever way it was stored
    pub fn log_text(&self) -> Option<String> {
        match self.log.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// `ResourceInfo` column as an object, if present and non-empty
    pub fn resource_info_column(&self) -> Option<Map<String, Value>> {
        let map = match self.resource_info.as_ref()? {
            Value::Object(map) => map.clone(),
            Value::String(s) if !s.trim().is_empty() => match serde_json::from_str(s) {
                Ok(Value::Object(map)) => map,
                _ => return None,
            },
            _ => return None,
        };
        (!map.is_empty()).then_some(map)
    }
}

/// Wall clock the orchestrator writes `RequestedAt` and `PartitionKey` in
pub const ORCHESTRATOR_TZ: Tz = Rome;

/// Day partition format (`20250915`)
pub const PARTITION_FORMAT: &str = "%Y%m%d";

/// Orchestrator-local day for an instant
pub fn partition_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&ORCHESTRATOR_TZ).date_naive()
}

/// Day partition key an instant falls into
pub fn partition_key_at(now: DateTime<Utc>) -> String {
    partition_date(now).format(PARTITION_FORMAT).to_string()
}

/// `RequestedAt` the way the orchestrator writes it: local wall clock, no offset
pub fn format_requested_at(now: DateTime<Utc>) -> String {
    now.with_timezone(&ORCHESTRATOR_TZ)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Unix epoch, the sort key for unparseable timestamps
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Parse the timestamp formats the log writers produce.
///
/// Naive values carry no offset and are read as orchestrator-local time.
pub fn parse_requested_at(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(orchestrator_local_to_utc)
}

fn orchestrator_local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match ORCHESTRATOR_TZ.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        // Autumn fallback repeats an hour; take the first occurrence
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Spring-forward gap; the clock jumps one hour ahead
        LocalResult::None => match ORCHESTRATOR_TZ.from_local_datetime(&(naive + chrono::Duration::hours(1))) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => naive.and_utc(),
        },
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts `true`/`false` as booleans or strings; everything else is `false`
fn bool_ish<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}
