use indexmap::IndexMap;
use serde::Serialize;

/// Tenant placeholder stamped on every decoded record.
pub const DEFAULT_CUSTOMER: &str = "dummy";

/// Tag name -> tag value, in order of first appearance on the line.
pub type Annotations = IndexMap<String, String>;

/// One decoded data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub customer: String,
    pub metric: String,
    /// Unix epoch milliseconds.
    pub timestamp_millis: i64,
    pub value: f64,
    pub host: String,
    /// Never contains a host-tag key.
    pub annotations: Annotations,
}

impl MetricRecord {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}
