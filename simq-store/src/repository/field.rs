//! Field Repository
//!
//! Stores the crawled data field catalog.

use simq_core::domain::field::DataField;
use sqlx::SqlitePool;

use crate::error::Result;

/// Insert or refresh a batch of fields in one transaction
pub async fn insert_many(pool: &SqlitePool, fields: &[DataField]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut written = 0;

    for field in fields {
        let result = sqlx::query(
            r#"
            INSERT OR REPLACE INTO fields
                (id, type, dataset_id, category_id, subcategory_id, universe, region, delay, description)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&field.id)
        .bind(&field.field_type)
        .bind(&field.dataset_id)
        .bind(&field.category_id)
        .bind(&field.subcategory_id)
        .bind(&field.universe)
        .bind(&field.region)
        .bind(field.delay)
        .bind(&field.description)
        .execute(&mut *tx)
        .await?;

        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// List fields, optionally only those of one type
pub async fn find_by_type(pool: &SqlitePool, field_type: Option<&str>) -> Result<Vec<DataField>> {
    let rows = sqlx::query_as::<_, FieldRow>(
        r#"
        SELECT id, type, dataset_id, category_id, subcategory_id, universe, region, delay, description
        FROM fields
        WHERE ?1 IS NULL OR type = ?1
        ORDER BY id ASC
        "#,
    )
    .bind(field_type)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct FieldRow {
    id: String,
    #[sqlx(rename = "type")]
    field_type: String,
    dataset_id: String,
    category_id: Option<String>,
    subcategory_id: Option<String>,
    universe: String,
    region: Option<String>,
    delay: Option<i64>,
    description: Option<String>,
}

impl From<FieldRow> for DataField {
    fn from(row: FieldRow) -> Self {
        DataField {
            id: row.id,
            field_type: row.field_type,
            dataset_id: row.dataset_id,
            category_id: row.category_id,
            subcategory_id: row.subcategory_id,
            universe: row.universe,
            region: row.region,
            delay: row.delay,
            description: row.description,
        }
    }
}
