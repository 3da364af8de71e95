use std::sync::Arc;

use shared_client::{BackendClient, BackendError};
use shared_config::AppConfig;

use crate::in_flight::InFlightActions;

/// Router state shared by every cell.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: BackendClient,
    pub in_flight: InFlightActions,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            backend,
            in_flight: InFlightActions::default(),
        })
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
