use crate::domain::model::Provider;
use crate::domain::ports::ProviderCatalog;
use crate::utils::error::{ReservationError, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Provider profiles held in memory.
///
/// The profile collaborator replaces whole providers through [`upsert`];
/// readers keep the `Arc` snapshot they were handed.
///
/// [`upsert`]: InMemoryCatalog::upsert
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    providers: RwLock<HashMap<String, Arc<Provider>>>,
}

impl InMemoryCatalog {
    pub fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
        let catalog = Self::default();
        for provider in providers {
            catalog.upsert(provider);
        }
        catalog
    }

    pub fn upsert(&self, provider: Provider) {
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider.id.clone(), Arc::new(provider));
    }

    pub fn remove(&self, provider_id: &str) -> Option<Arc<Provider>> {
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(provider_id)
    }

    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl ProviderCatalog for InMemoryCatalog {
    fn provider(&self, provider_id: &str) -> Result<Arc<Provider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider_id)
            .cloned()
            .ok_or_else(|| ReservationError::not_found("provider", provider_id))
    }
}

impl<C: ProviderCatalog> ProviderCatalog for Arc<C> {
    fn provider(&self, provider_id: &str) -> Result<Arc<Provider>> {
        (**self).provider(provider_id)
    }
}
