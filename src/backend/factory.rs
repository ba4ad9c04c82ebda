use anyhow::{Context, Result};
use std::sync::Arc;

use super::http::HttpGateway;
use super::traits::Gateway;
use crate::app::Config;

/// Factory for creating backend clients from configuration
pub struct GatewayFactory;

impl GatewayFactory {
    /// Create the HTTP gateway described by `config.api`
    pub fn create(config: &Config) -> Result<Arc<dyn Gateway>> {
        let gateway = HttpGateway::new(&config.api).with_context(|| {
            format!("Failed to build HTTP client for {}", config.api.base_url)
        })?;
        Ok(Arc::new(gateway))
    }

    /// Check whether the configured backend answers its health probe
    pub async fn validate(config: &Config) -> bool {
        match Self::create(config) {
            Ok(gateway) => gateway
                .health_check()
                .await
                .map(|status| status.is_healthy())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}
