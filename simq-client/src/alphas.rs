//! Alpha endpoints

use simq_core::domain::alpha::Alpha;

use crate::BrainClient;
use crate::error::Result;

impl BrainClient {
    /// Get the detail of an alpha produced by a simulation
    ///
    /// # Arguments
    /// * `alpha_id` - The alpha ID reported by a completed simulation
    pub async fn get_alpha(&self, alpha_id: &str) -> Result<Alpha> {
        let url = self.url(&format!("alphas/{}", alpha_id));
        let response = self.send(self.client.get(&url)).await?;

        self.handle_response(response).await
    }
}
