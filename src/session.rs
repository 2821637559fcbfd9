// Copyright 2019 Dmitry Tantsur <divius.inside@gmail.com>
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

//! Session structure definition.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use reqwest::{Client, Method, Url};

use super::cache::EndpointCache;
use super::client::{AuthenticatedClient, RequestBuilder};
use super::loading;
use super::services::ServiceType;
use super::url;
use super::{AuthType, EndpointFilters, Error, InterfaceType};

/// An OpenStack API session.
///
/// The session object serves as a wrapper around an [authentication type](trait.AuthType.html),
/// providing convenient methods to make HTTP requests to services.
///
/// # Note
///
/// All clones of one session share the same authentication and endpoint cache. Use
/// [with_auth_type](#method.with_auth_type) to detach a session.
#[derive(Debug, Clone)]
pub struct Session {
    client: AuthenticatedClient,
    endpoint_cache: Arc<EndpointCache>,
}

impl Session {
    /// Create a new session with a given authentication plugin.
    ///
    /// The resulting session will use the default endpoint interface (usually,
    /// public).
    pub fn new<Auth: AuthType + 'static>(auth_method: Auth) -> Session {
        Session::new_with_client(Client::new(), auth_method)
    }

    /// Create a new session with a given authentication plugin and an HTTP client.
    pub fn new_with_client<Auth: AuthType + 'static>(client: Client, auth_method: Auth) -> Session {
        Session {
            client: AuthenticatedClient::new_internal(client, Arc::new(auth_method)),
            endpoint_cache: Arc::new(EndpointCache::new()),
        }
    }

    /// Create a `Session` from a `clouds.yaml` configuration file.
    ///
    /// See [from_config](fn.from_config.html) for details.
    #[inline]
    pub fn from_config<S: AsRef<str>>(cloud_name: S) -> Result<Session, Error> {
        loading::from_config(cloud_name)
    }

    /// Create a `Session` from environment variables.
    ///
    /// See [from_env](fn.from_env.html) for details.
    #[inline]
    pub fn from_env() -> Result<Session, Error> {
        loading::from_env()
    }

    /// Get a reference to the authentication type in use.
    #[inline]
    pub fn auth_type(&self) -> &dyn AuthType {
        self.client.auth_type()
    }

    /// Get a reference to the authenticated client.
    #[inline]
    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// Endpoint filters in use.
    #[inline]
    pub fn endpoint_filters(&self) -> &EndpointFilters {
        &self.endpoint_cache.filters
    }

    /// Modify endpoint filters.
    ///
    /// This call clears the cached service information for this `Session`.
    /// It does not, however, affect clones of this `Session`.
    pub fn endpoint_filters_mut(&mut self) -> &mut EndpointFilters {
        &mut self.reset_cache().filters
    }

    /// Endpoint overrides in use.
    #[inline]
    pub fn endpoint_overrides(&self) -> &HashMap<String, Url> {
        &self.endpoint_cache.overrides
    }

    /// Modify endpoint overrides.
    ///
    /// Keys are either catalog types (`rax:queues`) or short service keys (`queues`).
    ///
    /// This call clears the cached service information for this `Session`.
    /// It does not, however, affect clones of this `Session`.
    pub fn endpoint_overrides_mut(&mut self) -> &mut HashMap<String, Url> {
        &mut self.reset_cache().overrides
    }

    /// Update the authentication and purges cached endpoint information.
    ///
    /// # Warning
    ///
    /// Authentication will also be updated for clones of this `Session`, since they share the same
    /// authentication object.
    #[inline]
    pub async fn refresh(&mut self) -> Result<(), Error> {
        let _ = self.reset_cache();
        self.client.refresh().await
    }

    /// Set a new authentication for this `Session`.
    ///
    /// This call clears the cached service information for this `Session`.
    /// It does not, however, affect clones of this `Session`.
    #[inline]
    pub fn set_auth_type<Auth: AuthType + 'static>(&mut self, auth_method: Auth) {
        let _ = self.reset_cache();
        self.client.set_auth_type(auth_method);
    }

    /// Set endpoint filters to use.
    #[inline]
    pub fn set_endpoint_filters(&mut self, filters: EndpointFilters) {
        *self.endpoint_filters_mut() = filters;
    }

    /// Set the endpoint interface to use.
    #[inline]
    pub fn set_endpoint_interface(&mut self, interface: InterfaceType) {
        self.endpoint_filters_mut().set_interface(interface);
    }

    /// Set the region to use.
    #[inline]
    pub fn set_region<S: Into<String>>(&mut self, region: S) {
        self.endpoint_filters_mut().region = Some(region.into());
    }

    /// Convert this session into one using the given authentication.
    #[inline]
    pub fn with_auth_type<Auth: AuthType + 'static>(mut self, auth_method: Auth) -> Session {
        self.set_auth_type(auth_method);
        self
    }

    /// Convert this session into one using the given endpoint filters.
    #[inline]
    pub fn with_endpoint_filters(mut self, filters: EndpointFilters) -> Session {
        self.set_endpoint_filters(filters);
        self
    }

    /// Convert this session into one using the given endpoint interface.
    #[inline]
    pub fn with_endpoint_interface(mut self, interface: InterfaceType) -> Session {
        self.set_endpoint_interface(interface);
        self
    }

    /// Add an endpoint override for the given service.
    #[inline]
    pub fn with_endpoint_override<S: Into<String>>(mut self, service: S, url: Url) -> Session {
        let _ = self.endpoint_overrides_mut().insert(service.into(), url);
        self
    }

    /// Convert this session into one using the given region.
    #[inline]
    pub fn with_region<S: Into<String>>(mut self, region: S) -> Session {
        self.set_region(region);
        self
    }

    /// Root URL of the given service, always ending with a slash.
    ///
    /// Relative references returned by the service are resolved against this URL.
    pub async fn get_root<Srv>(&self, service: Srv) -> Result<Url, Error>
    where
        Srv: ServiceType + Send,
    {
        self.endpoint_cache.get_root(&self.client, service).await
    }

    /// Construct an endpoint for the given service from the path.
    ///
    /// You won't need to use this call most of the time, since all request calls can fetch the
    /// endpoint automatically.
    pub async fn get_endpoint<Srv, I>(&self, service: Srv, path: I) -> Result<Url, Error>
    where
        Srv: ServiceType + Send,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let root = self.get_root(service).await?;
        Ok(url::extend(root, path))
    }

    /// Make an HTTP request to the given service.
    ///
    /// The `path` argument is a list of URL path segments relative to the service endpoint
    /// (e.g. `&["queues", "demo"]`). Segments are percent-encoded.
    ///
    /// The result is a [RequestBuilder](client/struct.RequestBuilder.html) that can be
    /// customized further.
    ///
    /// ```rust,no_run
    /// # async fn example() -> Result<(), oscloud::Error> {
    /// let session = oscloud::Session::from_env()?;
    /// let response = session
    ///     .request(oscloud::services::QUEUES, reqwest::Method::HEAD, &["health"])
    ///     .await?
    ///     .send()
    ///     .await?;
    /// println!("Response: {:?}", response);
    /// # Ok(()) }
    /// # #[tokio::main]
    /// # async fn main() { example().await.unwrap(); }
    /// ```
    pub async fn request<Srv, I>(
        &self,
        service: Srv,
        method: Method,
        path: I,
    ) -> Result<RequestBuilder, Error>
    where
        Srv: ServiceType + Send,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let url = self.get_endpoint(service, path).await?;
        trace!("Preparing HTTP {} request to {}", method, url);
        Ok(self.client.request(method, url))
    }

    #[inline]
    fn reset_cache(&mut self) -> &mut EndpointCache {
        let cache = Arc::make_mut(&mut self.endpoint_cache);
        let _ = cache.clear();
        cache
    }
}

#[cfg(test)]
pub(crate) mod test {
    use reqwest::{Method, Url};

    use super::Session;
    use crate::services::{IMAGE, QUEUES};
    use crate::{ErrorKind, InterfaceType, NoAuth};

    pub const URL: &str = "http://127.0.0.1:5000/v1/1234";

    pub fn new_session(url: &str) -> Session {
        let auth = NoAuth::new(url).unwrap();
        Session::new(auth)
    }

    #[tokio::test]
    async fn test_get_endpoint() {
        let s = new_session(URL);
        let ep = s
            .get_endpoint(QUEUES, &["queues", "demo", "messages"])
            .await
            .unwrap();
        assert_eq!(
            ep.as_str(),
            "http://127.0.0.1:5000/v1/1234/queues/demo/messages"
        );
    }

    #[tokio::test]
    async fn test_get_endpoint_escapes() {
        let s = new_session(URL);
        let ep = s.get_endpoint(QUEUES, &["queues", "a b"]).await.unwrap();
        assert_eq!(ep.as_str(), "http://127.0.0.1:5000/v1/1234/queues/a%20b");
    }

    #[tokio::test]
    async fn test_endpoint_override() {
        let s = Session::new(NoAuth::new_without_endpoint()).with_endpoint_override(
            "image",
            Url::parse("http://127.0.0.1:9292/v2").unwrap(),
        );
        let ep = s.get_endpoint(IMAGE, &["tasks"]).await.unwrap();
        assert_eq!(ep.as_str(), "http://127.0.0.1:9292/v2/tasks");

        let err = s.get_root(QUEUES).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::EndpointNotFound);
    }

    #[tokio::test]
    async fn test_filters_do_not_leak_to_clones() {
        let s = new_session(URL);
        let s2 = s.clone().with_endpoint_interface(InterfaceType::Internal);
        assert_eq!(s.endpoint_filters().interface, InterfaceType::Public);
        assert_eq!(s2.endpoint_filters().interface, InterfaceType::Internal);

        let s3 = s2.with_region("ORD");
        assert_eq!(s3.endpoint_filters().region.as_deref(), Some("ORD"));
    }

    #[tokio::test]
    async fn test_request() {
        let s = new_session(URL);
        let rb = s.request(QUEUES, Method::HEAD, &["health"]).await.unwrap();
        let _ = rb.try_clone().unwrap();
    }
}
