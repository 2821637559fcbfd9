// Copyright 2021 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Internal service information cache.

use std::collections::HashMap;
use std::future::Future;

use log::debug;
use reqwest::Url;
use tokio::sync::{OnceCell, RwLock};

use crate::client::AuthenticatedClient;
use crate::services::ServiceType;
use crate::url;
use crate::{EndpointFilters, Error, ErrorKind};

/// Endpoint cache.
#[derive(Debug)]
pub struct EndpointCache {
    roots: RwLock<HashMap<&'static str, Url>>,
    pub filters: EndpointFilters,
    pub overrides: HashMap<String, Url>,
}

impl Clone for EndpointCache {
    /// Clone the cache removing the cached information but keeping filters and overrides.
    fn clone(&self) -> EndpointCache {
        EndpointCache {
            roots: RwLock::new(HashMap::new()),
            filters: self.filters.clone(),
            overrides: self.overrides.clone(),
        }
    }
}

impl EndpointCache {
    /// Create a new empty cache.
    #[inline]
    pub fn new() -> Self {
        EndpointCache {
            roots: RwLock::new(HashMap::new()),
            filters: EndpointFilters::default(),
            overrides: HashMap::new(),
        }
    }

    /// Clear the cache.
    #[inline]
    pub fn clear(&mut self) -> &mut Self {
        self.roots = RwLock::new(HashMap::new());
        self
    }

    fn find_override<Srv: ServiceType>(&self, service: &Srv) -> Option<Url> {
        self.overrides
            .get(service.catalog_type())
            .or_else(|| self.overrides.get(service.override_key()))
            .cloned()
    }

    /// Ensure the root URL of the service and return it.
    ///
    /// The result always ends with a slash.
    pub async fn get_root<Srv>(
        &self,
        client: &AuthenticatedClient,
        service: Srv,
    ) -> Result<Url, Error>
    where
        Srv: ServiceType + Send,
    {
        let catalog_type = service.catalog_type();
        if let Some(root) = self.roots.read().await.get(catalog_type) {
            return Ok(root.clone());
        }

        debug!(
            "No cached endpoint for service {} ({}), fetching",
            service.service_name(),
            catalog_type
        );

        let mut lock = self.roots.write().await;
        // Additonal check in case another task has updated the cache while we were waiting for
        // the write lock.
        if let Some(root) = lock.get(catalog_type) {
            return Ok(root.clone());
        }

        let ep = match self.find_override(&service) {
            Some(found) => found,
            None => client.get_endpoint(catalog_type, &self.filters).await?,
        };
        if ep.cannot_be_a_base() || !ep.has_host() {
            return Err(Error::new(
                ErrorKind::InvalidResponse,
                format!("Invalid URL {} received for service {}", ep, catalog_type),
            ));
        }

        let root = url::with_trailing_slash(ep);
        debug!("Using {} for service {}", root, service.service_name());
        let _ = lock.insert(catalog_type, root.clone());
        Ok(root)
    }
}

impl Default for EndpointCache {
    fn default() -> EndpointCache {
        EndpointCache::new()
    }
}

/// A value that is computed at most once and then reused.
///
/// Failed attempts are not cached: the next caller tries again.
#[derive(Debug)]
pub struct ValueCache<T> {
    cell: OnceCell<T>,
}

impl<T> Default for ValueCache<T> {
    fn default() -> ValueCache<T> {
        ValueCache {
            cell: OnceCell::new(),
        }
    }
}

impl<T> ValueCache<T> {
    /// Get the cached value, computing it with `init` if needed.
    ///
    /// Concurrent callers wait for a single in-flight computation.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<&T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        self.cell.get_or_try_init(init).await
    }

    /// Get the value if it has already been computed.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }
}
