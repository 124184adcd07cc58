use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::ExecutionDriver;
use crate::error::is_target_exception_message;
use crate::record::ExecutionRecord;

#[derive(Debug, Clone, Deserialize)]
pub struct DriverRequest {
    pub run_id: String,
    #[serde(default)]
    pub method: Option<String>,
    pub inputs: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// Single-shot driver response. Field order `run_id, status, error, data,
/// time_ms` is load-bearing and is guaranteed here by declaration order,
/// never by building a `serde_json::Value` map.
#[derive(Debug, Clone, Serialize)]
pub struct DriverResponse {
    pub run_id: String,
    pub status: &'static str,
    pub error: Option<ErrorMessage>,
    pub data: ExecutionRecord,
    pub time_ms: u128,
}

/// Scalar-to-list promotion for the `inputs` field. Anything that isn't a
/// number or an array of numbers is treated as empty, matching the
/// driver's "never panics on malformed input" contract.
fn normalize_inputs(value: &Value) -> Vec<i64> {
    match value {
        Value::Number(n) => n.as_i64().into_iter().collect(),
        Value::Array(items) => items.iter().filter_map(Value::as_i64).collect(),
        _ => Vec::new(),
    }
}

/// Single-shot request/response adapter over an [`ExecutionDriver`], for the
/// `--driver` CLI mode.
pub struct DriverProtocol<D: ExecutionDriver> {
    driver: D,
    default_method: String,
}

impl<D: ExecutionDriver> DriverProtocol<D> {
    pub fn new(driver: D, default_method: impl Into<String>) -> Self {
        Self { driver, default_method: default_method.into() }
    }

    /// Parses `request_json`, executes it, and serializes the response.
    /// Malformed JSON never panics or propagates — it maps to an error
    /// response instead.
    pub fn handle_request(&mut self, request_json: &str) -> String {
        let response = match serde_json::from_str::<DriverRequest>(request_json) {
            Ok(request) => self.handle(request),
            Err(_) => DriverResponse {
                run_id: String::new(),
                status: "error",
                error: Some(ErrorMessage { message: "invalid input json".to_string() }),
                data: ExecutionRecord::new(self.default_method.clone(), Vec::new(), Vec::new()),
                time_ms: 0,
            },
        };
        // Infallible: every field of `DriverResponse` serializes cleanly.
        serde_json::to_string(&response).expect("DriverResponse always serializes")
    }

    pub fn handle(&mut self, request: DriverRequest) -> DriverResponse {
        let method = request.method.unwrap_or_else(|| self.default_method.clone());
        let inputs = normalize_inputs(&request.inputs);

        let start = std::time::Instant::now();
        let (trace, error_message) = self.driver.run(&inputs);
        let time_ms = start.elapsed().as_millis();

        let status = if error_message.is_none() { "ok" } else { "error" };
        let error = error_message.clone().map(|message| ErrorMessage { message });

        DriverResponse {
            run_id: request.run_id,
            status,
            error,
            data: ExecutionRecord::new(method, inputs, trace.unwrap_or_default()),
            time_ms,
        }
    }
}

/// Whether a driver response's error, if any, should also be treated as a
/// recordable crash by a caller composing this with [`crate::crash::ErrorDetector`]
/// — timeouts and driver/spawn failures are not crashes.
pub fn is_crash_response(response: &DriverResponse) -> bool {
    response.error.as_ref().is_some_and(|e| is_target_exception_message(&e.message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::FakeDriver;

    #[test]
    fn driver_json_round_trip_literal_scenario() {
        let driver = FakeDriver::new(|_: &[i64]| (Some(vec![0, 12, 17]), None));
        let mut protocol = DriverProtocol::new(driver, "pkg.C.default:(I)I");
        let request = r#"{"run_id":"r1","method":"pkg.C.m:(I)I","inputs":[3]}"#;
        let response_json = protocol.handle_request(request);
        let response: Value = serde_json::from_str(&response_json).unwrap();

        assert_eq!(response["run_id"], "r1");
        assert_eq!(response["status"], "ok");
        assert!(response["error"].is_null());
        assert_eq!(response["data"]["method"], "pkg.C.m:(I)I");
        assert_eq!(response["data"]["inputs"], serde_json::json!([3]));
        assert_eq!(response["data"]["trace"], serde_json::json!([0, 12, 17]));
    }

    #[test]
    fn scalar_input_is_promoted_to_a_one_element_list() {
        let driver = FakeDriver::new(|input: &[i64]| (Some(input.to_vec()), None));
        let mut protocol = DriverProtocol::new(driver, "pkg.C.default:(I)I");
        let request = r#"{"run_id":"r2","method":null,"inputs":5}"#;
        let response_json = protocol.handle_request(request);
        let response: Value = serde_json::from_str(&response_json).unwrap();
        assert_eq!(response["data"]["inputs"], serde_json::json!([5]));
        assert_eq!(response["data"]["method"], "pkg.C.default:(I)I");
    }

    #[test]
    fn malformed_json_yields_error_response_with_empty_trace() {
        let driver = FakeDriver::new(|_: &[i64]| (Some(vec![]), None));
        let mut protocol = DriverProtocol::new(driver, "pkg.C.default:(I)I");
        let response_json = protocol.handle_request("not json at all");
        let response: Value = serde_json::from_str(&response_json).unwrap();
        assert_eq!(response["status"], "error");
        assert_eq!(response["error"]["message"], "invalid input json");
        assert_eq!(response["data"]["trace"], serde_json::json!([]));
    }

    #[test]
    fn field_order_is_run_id_status_error_data_time_ms() {
        let driver = FakeDriver::new(|_: &[i64]| (Some(vec![]), None));
        let mut protocol = DriverProtocol::new(driver, "m");
        let response_json = protocol.handle_request(r#"{"run_id":"x","inputs":[1]}"#);
        let idx = |needle: &str| response_json.find(needle).unwrap();
        assert!(idx("\"run_id\"") < idx("\"status\""));
        assert!(idx("\"status\"") < idx("\"error\""));
        assert!(idx("\"error\"") < idx("\"data\""));
        assert!(idx("\"data\"") < idx("\"time_ms\""));
    }

    #[test]
    fn timeout_error_is_surfaced_but_not_a_crash() {
        let driver = FakeDriver::new(|_: &[i64]| (None, Some("timeout after 1s".to_string())));
        let mut protocol = DriverProtocol::new(driver, "m");
        let response = protocol.handle(DriverRequest {
            run_id: "r3".to_string(),
            method: None,
            inputs: serde_json::json!([1]),
        });
        assert_eq!(response.status, "error");
        assert!(!is_crash_response(&response));
    }

    #[test]
    fn target_exception_is_a_crash() {
        let driver = FakeDriver::new(|_: &[i64]| {
            (None, Some("execution failed (code=1): java.lang.AssertionError: boom".to_string()))
        });
        let mut protocol = DriverProtocol::new(driver, "m");
        let response = protocol.handle(DriverRequest {
            run_id: "r4".to_string(),
            method: None,
            inputs: serde_json::json!([1]),
        });
        assert!(is_crash_response(&response));
    }
}
