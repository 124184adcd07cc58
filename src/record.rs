use serde::{Deserialize, Serialize};

/// Canonical exchange value between the fuzzer and external consumers.
/// Field order `method, inputs, trace` is load-bearing for the driver
/// protocol's wire format and is guaranteed by declaration order —
/// `serde_json` serializes struct fields in the order they're declared,
/// independent of any `preserve_order` feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub method: String,
    pub inputs: Vec<i64>,
    pub trace: Vec<i64>,
}

impl ExecutionRecord {
    pub fn new(method: impl Into<String>, inputs: Vec<i64>, trace: Vec<i64>) -> Self {
        Self { method: method.into(), inputs, trace }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
