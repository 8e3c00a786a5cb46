//! Data field catalog entries

use serde::{Deserialize, Serialize};

/// A data field usable in expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub dataset_id: String,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub universe: String,
    pub region: Option<String>,
    pub delay: Option<i64>,
    pub description: Option<String>,
}
