//! Simulation DTOs exchanged with the remote API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::job::Job;

/// Simulation settings accepted by the remote API
///
/// The defaults are the settings every job starts from; per-job overrides are
/// merged on top in [`SimulationRequest::for_job`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
    pub instrument_type: String,
    pub region: String,
    pub universe: String,
    pub delay: i64,
    pub decay: i64,
    pub neutralization: String,
    pub truncation: f64,
    pub pasteurization: String,
    pub unit_handling: String,
    pub nan_handling: String,
    pub language: String,
    pub visualization: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            instrument_type: "EQUITY".to_string(),
            region: "USA".to_string(),
            universe: "TOP3000".to_string(),
            delay: 1,
            decay: 6,
            neutralization: "SUBINDUSTRY".to_string(),
            truncation: 0.08,
            pasteurization: "ON".to_string(),
            unit_handling: "VERIFY".to_string(),
            nan_handling: "ON".to_string(),
            language: "FASTEXPR".to_string(),
            visualization: false,
        }
    }
}

/// Body of `POST /simulations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    #[serde(rename = "type")]
    pub simulation_type: String,
    pub settings: Value,
    pub regular: String,
}

impl SimulationRequest {
    /// Builds the request for a queued job
    ///
    /// Override keys may be given in either `snake_case` or the API's
    /// `camelCase`. Non-object overrides are ignored.
    pub fn for_job(job: &Job) -> Self {
        let mut settings = match serde_json::to_value(SimulationSettings::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        if let Value::Object(overrides) = &job.settings {
            for (key, value) in overrides {
                settings.insert(camel_case(key), value.clone());
            }
        }

        Self {
            simulation_type: job.job_type.clone(),
            settings: Value::Object(settings),
            regular: job.expression.clone(),
        }
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Body of `GET <progress location>` once the server stops sending `Retry-After`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub alpha: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SimulationStatus {
    /// Whether the server gave up on the simulation
    pub fn is_failed(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some("ERROR") | Some("FAIL") | Some("FAILED") | Some("CANCELLED")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::JobState;
    use chrono::Utc;
    use serde_json::json;

    fn job(settings: Value) -> Job {
        Job {
            id: 7,
            expression: "vwap/close".to_string(),
            job_type: "REGULAR".to_string(),
            settings,
            state: JobState::Pending,
            remote_handle: None,
            artifact_id: None,
            failure_reason: None,
            created_at: Utc::now(),
            submitted_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_defaults_serialize_in_camel_case() {
        let value = serde_json::to_value(SimulationSettings::default()).unwrap();
        assert_eq!(value["instrumentType"], json!("EQUITY"));
        assert_eq!(value["nanHandling"], json!("ON"));
        assert_eq!(value["truncation"], json!(0.08));
    }

    #[test]
    fn test_request_merges_overrides() {
        let request = SimulationRequest::for_job(&job(json!({
            "decay": 4,
            "instrument_type": "CRYPTO",
            "unitHandling": "OFF"
        })));

        assert_eq!(request.simulation_type, "REGULAR");
        assert_eq!(request.regular, "vwap/close");
        assert_eq!(request.settings["decay"], json!(4));
        assert_eq!(request.settings["instrumentType"], json!("CRYPTO"));
        assert_eq!(request.settings["unitHandling"], json!("OFF"));
        assert_eq!(request.settings["region"], json!("USA"));
        assert!(request.settings.get("instrument_type").is_none());
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(SimulationRequest::for_job(&job(Value::Null))).unwrap();
        assert_eq!(body["type"], json!("REGULAR"));
        assert_eq!(body["regular"], json!("vwap/close"));
        assert_eq!(body["settings"]["universe"], json!("TOP3000"));
    }

    #[test]
    fn test_status_failure_detection() {
        let status: SimulationStatus =
            serde_json::from_value(json!({ "status": "ERROR", "message": "bad expr" })).unwrap();
        assert!(status.is_failed());

        let status: SimulationStatus =
            serde_json::from_value(json!({ "status": "COMPLETE", "alpha": "w2zl935" })).unwrap();
        assert!(!status.is_failed());
    }
}
