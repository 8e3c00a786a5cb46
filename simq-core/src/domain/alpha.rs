//! Alpha artifact produced by a completed simulation

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Alpha detail as returned by the remote API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alpha {
    pub id: String,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    /// In-sample summary, including the submission checks
    #[serde(rename = "is", default)]
    pub in_sample: Value,
    #[serde(default)]
    pub train: Value,
    #[serde(default)]
    pub test: Value,
}

/// Aggregate result of the in-sample checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckVerdict {
    Pass,
    Fail,
}

impl CheckVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckVerdict::Pass => "PASS",
            CheckVerdict::Fail => "FAIL",
        }
    }
}

impl Alpha {
    /// `FAIL` if any in-sample check failed, `PASS` otherwise
    pub fn check_verdict(&self) -> CheckVerdict {
        let failed = self
            .in_sample
            .get("checks")
            .and_then(Value::as_array)
            .map(|checks| {
                checks
                    .iter()
                    .any(|c| c.get("result").and_then(Value::as_str) == Some("FAIL"))
            })
            .unwrap_or(false);

        if failed {
            CheckVerdict::Fail
        } else {
            CheckVerdict::Pass
        }
    }
}
