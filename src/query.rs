//! Flow query request construction
//!
//! A query body is a time window, a record limit, and up to three opaque
//! filter objects (`subject`, `peer`, `flow`) that are passed to the service
//! verbatim. Bodies can start from a saved template; values supplied for this
//! run always replace the template's values field by field, never merging
//! into them.

use crate::error::{Error, Result};
use crate::utils::write_atomic;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Timestamp layout expected by the flow query API (UTC, zero-padded)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Default number of flow records requested
pub const DEFAULT_RECORD_LIMIT: u64 = 2000;

/// Default lookback window in hours
pub const DEFAULT_LOOKBACK_HOURS: u32 = 1;

/// Format a timestamp the way the flow query API expects it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// The `[start, end]` window a query searches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    /// Window start (inclusive)
    pub start: DateTime<Utc>,
    /// Window end, normally "now"
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window ending at `now` and reaching back `hours` hours
    pub fn lookback(now: DateTime<Utc>, hours: u32) -> Result<Self> {
        if hours == 0 {
            return Err(Error::config("lookback hours must be positive", "hours"));
        }
        let start = now
            .checked_sub_signed(TimeDelta::hours(i64::from(hours)))
            .ok_or_else(|| Error::config(format!("{hours} hours is out of range"), "hours"))?;
        Ok(Self { start, end: now })
    }
}

/// The JSON body submitted to the flow query endpoint
///
/// Also the on-disk shape of a saved template. Keys this type does not know
/// about are kept in `extra` and written back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameters {
    /// Window start, `YYYY-MM-DDTHH:MM:SSZ`
    #[serde(default)]
    pub start_date_time: String,

    /// Window end, `YYYY-MM-DDTHH:MM:SSZ`
    #[serde(default)]
    pub end_date_time: String,

    /// Maximum number of flow records to return
    #[serde(default)]
    pub record_limit: u64,

    /// Subject (host) filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Value>,

    /// Peer filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<Value>,

    /// Flow filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<Value>,

    /// Template keys without a typed field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryParameters {
    /// Set the time window fields
    pub fn set_window(&mut self, window: &TimeWindow) {
        self.start_date_time = format_timestamp(&window.start);
        self.end_date_time = format_timestamp(&window.end);
    }

    /// Serialize to the JSON request body
    pub fn to_json_body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Everything the request builder needs for one run
#[derive(Clone, Debug)]
pub struct QueryRequestOptions {
    /// Maximum number of records to request
    pub record_limit: u64,
    /// How many hours back from now the window starts
    pub hours: u32,
    /// Start from the template at this path
    pub load: Option<PathBuf>,
    /// Write the finished body to this path
    pub save: Option<PathBuf>,
    /// Subject filter override
    pub subject: Option<Value>,
    /// Peer filter override
    pub peer: Option<Value>,
    /// Flow filter override
    pub flow: Option<Value>,
}

impl Default for QueryRequestOptions {
    fn default() -> Self {
        Self {
            record_limit: DEFAULT_RECORD_LIMIT,
            hours: DEFAULT_LOOKBACK_HOURS,
            load: None,
            save: None,
            subject: None,
            peer: None,
            flow: None,
        }
    }
}

/// Build the query body for this run
///
/// With `options.load` set, the template is read first; the window and record
/// limit are then always replaced, and each filter is replaced only when a
/// non-empty override was supplied. With `options.save` set, the result is
/// also written to that path.
pub fn build_query(options: &QueryRequestOptions, now: DateTime<Utc>) -> Result<QueryParameters> {
    if options.record_limit == 0 {
        return Err(Error::config(
            "record limit must be greater than zero",
            "record_limit",
        ));
    }
    let window = TimeWindow::lookback(now, options.hours)?;

    let mut params = match &options.load {
        Some(path) => load_template(path)?,
        None => QueryParameters::default(),
    };

    params.set_window(&window);
    params.record_limit = options.record_limit;
    overlay_filter(&mut params.subject, options.subject.as_ref());
    overlay_filter(&mut params.peer, options.peer.as_ref());
    overlay_filter(&mut params.flow, options.flow.as_ref());

    tracing::debug!(
        start = %params.start_date_time,
        end = %params.end_date_time,
        record_limit = params.record_limit,
        has_subject = params.subject.is_some(),
        has_peer = params.peer.is_some(),
        has_flow = params.flow.is_some(),
        "built flow query"
    );

    if let Some(path) = &options.save {
        save_template(path, &params)?;
    }

    Ok(params)
}

fn overlay_filter(slot: &mut Option<Value>, supplied: Option<&Value>) {
    if let Some(value) = supplied
        && is_non_empty(value)
    {
        *slot = Some(value.clone());
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Read a saved template
pub fn load_template(path: &Path) -> Result<QueryParameters> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Template {
        path: path.to_path_buf(),
        reason: match e.kind() {
            std::io::ErrorKind::NotFound => "file not found".to_string(),
            _ => format!("cannot read: {e}"),
        },
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|e| Error::Template {
        path: path.to_path_buf(),
        reason: format!("invalid JSON: {e}"),
    })?;
    let Value::Object(mut map) = value else {
        return Err(Error::Template {
            path: path.to_path_buf(),
            reason: "expected a JSON object".to_string(),
        });
    };
    drop_mistyped_run_fields(&mut map);

    let params = serde_json::from_value(Value::Object(map)).map_err(|e| Error::Template {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    tracing::info!(path = %path.display(), "loaded query template");
    Ok(params)
}

// The window and record limit are overwritten on every run, so a template may
// carry them with any type.
fn drop_mistyped_run_fields(map: &mut Map<String, Value>) {
    map.retain(|key, value| match key.as_str() {
        "startDateTime" | "endDateTime" => value.is_string(),
        "recordLimit" => value.is_u64(),
        _ => true,
    });
}

/// Write a template, replacing any existing file
pub fn save_template(path: &Path, params: &QueryParameters) -> Result<()> {
    let body = serde_json::to_vec_pretty(params)?;
    write_atomic(path, &body)?;
    tracing::info!(path = %path.display(), "saved query template");
    Ok(())
}
