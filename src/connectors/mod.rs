//! External collaborators
//!
//! Every outside service the pipeline talks to (language model, instance
//! catalog, price list, object storage) sits behind a trait defined here.
//! Implementations are constructed once per process from `Settings` and
//! injected as `Arc<dyn …>`; services and routes never see HTTP details,
//! and tests swap in static or in-memory implementations.

pub mod ai;
pub mod catalog;
pub mod errors;
pub mod object_store;
pub mod pricing;

pub use ai::{create_provider, AiProvider, AnthropicProvider, OllamaProvider, OpenAiProvider};
pub use catalog::{HttpInstanceCatalog, InstanceCatalog, StaticInstanceCatalog};
pub use errors::ConnectorError;
pub use object_store::{LocalObjectStore, ObjectStore};
pub use pricing::{HttpPriceCatalog, PriceCatalog, StaticPriceCatalog};

use crate::configuration::{
    AiSettings, CatalogSettings, PricingSettings, SourceKind, StorageSettings,
};
use std::sync::Arc;

pub fn init_ai(settings: &AiSettings) -> Result<Arc<dyn AiProvider>, ConnectorError> {
    let provider = create_provider(settings)?;
    tracing::info!(provider = provider.name(), "AI provider configured");
    Ok(Arc::from(provider))
}

pub fn init_catalog(settings: &CatalogSettings) -> Result<Arc<dyn InstanceCatalog>, ConnectorError> {
    match settings.source {
        SourceKind::File => {
            tracing::info!(path = %settings.path.display(), "Using file instance catalog");
            Ok(Arc::new(StaticInstanceCatalog::from_file(&settings.path)?))
        }
        SourceKind::Http => {
            let endpoint = settings.endpoint.clone().ok_or_else(|| {
                ConnectorError::Internal("catalog.endpoint is required for http source".to_string())
            })?;
            tracing::info!(endpoint = %endpoint, "Using HTTP instance catalog");
            Ok(Arc::new(HttpInstanceCatalog::new(endpoint, settings.timeout_secs)?))
        }
    }
}

pub fn init_prices(settings: &PricingSettings) -> Result<Arc<dyn PriceCatalog>, ConnectorError> {
    match settings.source {
        SourceKind::File => {
            tracing::info!(path = %settings.path.display(), "Using file price list");
            Ok(Arc::new(StaticPriceCatalog::from_file(&settings.path)?))
        }
        SourceKind::Http => {
            let endpoint = settings.endpoint.clone().ok_or_else(|| {
                ConnectorError::Internal("pricing.endpoint is required for http source".to_string())
            })?;
            tracing::info!(endpoint = %endpoint, region = %settings.region, "Using HTTP price list");
            Ok(Arc::new(HttpPriceCatalog::new(
                endpoint,
                settings.region.clone(),
                settings.timeout_secs,
            )?))
        }
    }
}

pub fn init_object_store(settings: &StorageSettings) -> Arc<dyn ObjectStore> {
    tracing::info!(root = %settings.root.display(), "Using local object store");
    Arc::new(LocalObjectStore::new(settings.root.clone()))
}
