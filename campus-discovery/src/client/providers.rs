//! Client-side provider cache.

use std::collections::HashMap;

use rand::Rng;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::registration::{Patch, ServiceName};

/// Eventually-consistent mirror of which addresses serve each dependency.
///
/// Updated only by patches received from the registry, so it can lag behind
/// a server-side removal until the corresponding patch arrives. Entries form
/// a multiset: repeated `added` entries accumulate, and each `removed` entry
/// deletes a single matching URL.
#[derive(Debug, Default)]
pub struct ProviderCache {
    providers: RwLock<HashMap<ServiceName, Vec<String>>>,
}

impl ProviderCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a received patch under the exclusive lock.
    pub async fn apply_patch(&self, patch: &Patch) {
        let mut providers = self.providers.write().await;

        for entry in &patch.added {
            providers.entry(entry.name).or_default().push(entry.url.clone());
        }

        for entry in &patch.removed {
            if let Some(urls) = providers.get_mut(&entry.name) {
                if let Some(index) = urls.iter().position(|url| url == &entry.url) {
                    urls.remove(index);
                }
            }
        }
    }

    /// Pick one provider URL for `name`, uniformly at random.
    ///
    /// Stateless load balancing: no preference for recency, health, or
    /// prior selection.
    pub async fn get_provider(&self, name: ServiceName) -> Result<String> {
        let providers = self.providers.read().await;
        let urls = providers
            .get(&name)
            .filter(|urls| !urls.is_empty())
            .ok_or(Error::NoProvider(name))?;

        // The index is drawn while the read lock is held, so the length
        // cannot change between the size read and the access.
        let index = rand::rng().random_range(0..urls.len());
        Ok(urls[index].clone())
    }
}
