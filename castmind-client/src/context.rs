//! The shared handles every controller is built from.

use crate::api_client::{ApiClientError, ClientConfig, RestClient};
use crate::mutation::MutationCoordinator;
use crate::query::{CacheConfig, QueryCache};

/// API client, query cache and mutation coordinator, created once at start-up
/// and cloned into each controller.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub api: RestClient,
    pub cache: QueryCache,
    pub mutations: MutationCoordinator,
}

impl ClientContext {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        Self::with_cache_config(config, CacheConfig::default())
    }

    pub fn with_cache_config(
        config: &ClientConfig,
        cache_config: CacheConfig,
    ) -> Result<Self, ApiClientError> {
        let api = RestClient::new(config)?;
        Ok(Self::from_parts(api, QueryCache::new(cache_config)))
    }

    pub fn from_parts(api: RestClient, cache: QueryCache) -> Self {
        let mutations = MutationCoordinator::new(cache.clone());
        Self {
            api,
            cache,
            mutations,
        }
    }
}
