//! Data field catalog DTOs

use serde::{Deserialize, Serialize};

use crate::domain::field::DataField;

/// Reference to a named catalog entity (`{ "id": ..., "name": ... }`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A data field as returned by `GET /data-fields`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFieldRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub dataset: CatalogRef,
    #[serde(default)]
    pub category: Option<CatalogRef>,
    #[serde(default)]
    pub subcategory: Option<CatalogRef>,
    pub universe: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub delay: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<DataFieldRecord> for DataField {
    fn from(record: DataFieldRecord) -> Self {
        Self {
            id: record.id,
            field_type: record.field_type,
            dataset_id: record.dataset.id,
            category_id: record.category.map(|c| c.id),
            subcategory_id: record.subcategory.map(|c| c.id),
            universe: record.universe,
            region: record.region,
            delay: record.delay,
            description: record.description,
        }
    }
}

/// One page of `GET /data-fields`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFieldPage {
    pub count: u64,
    pub results: Vec<DataFieldRecord>,
}

/// Filter for crawling the field catalog
#[derive(Debug, Clone, PartialEq)]
pub struct DataFieldQuery {
    pub region: String,
    pub delay: i64,
    pub universe: String,
    pub instrument_type: String,
    pub data_type: Option<String>,
    pub dataset_id: Option<String>,
    pub search: Option<String>,
    /// Fields requested per page
    pub chunk_size: u32,
    /// Maximum number of fields to fetch overall
    pub limit: u64,
}

impl Default for DataFieldQuery {
    fn default() -> Self {
        Self {
            region: "USA".to_string(),
            delay: 1,
            universe: "TOP3000".to_string(),
            instrument_type: "EQUITY".to_string(),
            data_type: None,
            dataset_id: None,
            search: None,
            chunk_size: 50,
            limit: 200,
        }
    }
}

impl DataFieldQuery {
    /// Query-string pairs for the page starting at `offset`
    pub fn to_params(&self, offset: u64) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("region", self.region.clone()),
            ("delay", self.delay.to_string()),
            ("universe", self.universe.clone()),
            ("instrumentType", self.instrument_type.clone()),
            ("limit", self.chunk_size.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(data_type) = &self.data_type {
            params.push(("type", data_type.clone()));
        }
        if let Some(dataset_id) = &self.dataset_id {
            params.push(("dataset.id", dataset_id.clone()));
        }
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_flattens_into_field() {
        let record: DataFieldRecord = serde_json::from_value(json!({
            "id": "assets",
            "description": "Assets - Total",
            "dataset": { "id": "fundamental6", "name": "Company Fundamental Data for Equity" },
            "category": { "id": "fundamental", "name": "Fundamental" },
            "subcategory": { "id": "fundamental-data", "name": "Fundamental Data" },
            "region": "USA",
            "delay": 1,
            "universe": "TOP3000",
            "type": "MATRIX",
            "coverage": 0.9524,
            "themes": []
        }))
        .unwrap();

        let field = DataField::from(record);
        assert_eq!(field.id, "assets");
        assert_eq!(field.field_type, "MATRIX");
        assert_eq!(field.dataset_id, "fundamental6");
        assert_eq!(field.category_id.as_deref(), Some("fundamental"));
        assert_eq!(field.subcategory_id.as_deref(), Some("fundamental-data"));
        assert_eq!(field.delay, Some(1));
    }

    #[test]
    fn test_params_include_optional_filters() {
        let query = DataFieldQuery {
            data_type: Some("VECTOR".to_string()),
            dataset_id: Some("news12".to_string()),
            ..Default::default()
        };
        let params = query.to_params(100);
        assert!(params.contains(&("offset", "100".to_string())));
        assert!(params.contains(&("limit", "50".to_string())));
        assert!(params.contains(&("type", "VECTOR".to_string())));
        assert!(params.contains(&("dataset.id", "news12".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "search"));
    }
}
