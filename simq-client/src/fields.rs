//! Data field catalog endpoints

use simq_core::domain::field::DataField;
use simq_core::dto::field::{DataFieldPage, DataFieldQuery};
use tracing::debug;

use crate::BrainClient;
use crate::error::{ClientError, Result};

impl BrainClient {
    /// Fetch data fields matching a query, following pagination
    ///
    /// Stops once the catalog reports no more results or `query.limit` fields
    /// have been collected.
    pub async fn data_fields(&self, query: &DataFieldQuery) -> Result<Vec<DataField>> {
        if query.chunk_size == 0 {
            return Err(ClientError::InvalidRequest(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        let url = self.url("data-fields");
        let mut fields = Vec::new();

        while (fields.len() as u64) < query.limit {
            let offset = fields.len() as u64;
            let request = self.client.get(&url).query(&query.to_params(offset));
            let response = self.send(request).await?;
            let page: DataFieldPage = self.handle_response(response).await?;

            debug!(
                "Fetched {} field(s) at offset {} of {}",
                page.results.len(),
                offset,
                page.count
            );

            let received = page.results.len();
            let remaining = (query.limit - offset) as usize;
            fields.extend(page.results.into_iter().take(remaining).map(DataField::from));

            if !has_more_pages(received, fields.len() as u64, page.count, query.limit) {
                break;
            }
        }

        Ok(fields)
    }
}

/// Whether another page should be requested
///
/// # Arguments
/// * `received` - Results on the page just fetched
/// * `collected` - Fields kept so far
/// * `total` - Catalog size reported by the server
/// * `limit` - Most fields the caller wants
fn has_more_pages(received: usize, collected: u64, total: u64, limit: u64) -> bool {
    received > 0 && collected < total && collected < limit
}
