//! Application state.

use gigboard_store::{AcceptedTaskStore, JobStore, StoreClient};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub jobs: JobStore,
    pub tasks: AcceptedTaskStore,
}

impl AppState {
    /// Create new application state.
    ///
    /// Probes the store before returning so the service never comes up
    /// without data access.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let client = StoreClient::from_env().await?;
        client.ping().await?;

        Ok(Self::with_client(config, client))
    }

    /// Build state around an existing store client. Used by tests to point
    /// the API at an emulator.
    pub fn with_client(config: ApiConfig, client: StoreClient) -> Self {
        Self {
            config,
            jobs: JobStore::new(client.clone()),
            tasks: AcceptedTaskStore::new(client),
        }
    }
}
