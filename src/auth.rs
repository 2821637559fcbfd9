// Copyright 2019 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Base code for authentication.

use std::fmt::{self, Debug};

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, RequestBuilder, Url};
use static_assertions::{assert_impl_all, assert_obj_safe};

use super::{EndpointFilters, Error, ErrorKind};

/// Trait for an authentication type.
///
/// An OpenStack authentication type is expected to be able to:
///
/// 1. get an authentication token to use when accessing services,
/// 2. get an endpoint URL for the given service type.
///
/// An authentication type should cache the token as long as it's valid.
#[async_trait]
pub trait AuthType: Debug + Sync + Send {
    /// Authenticate a request.
    async fn authenticate(
        &self,
        client: &Client,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, Error>;

    /// Get a URL for the requested service.
    async fn get_endpoint(
        &self,
        client: &Client,
        service_type: &str,
        filters: &EndpointFilters,
    ) -> Result<Url, Error>;

    /// Refresh the authentication (renew the token, etc).
    async fn refresh(&self, client: &Client) -> Result<(), Error>;
}

assert_obj_safe!(AuthType);

#[inline]
fn parse_endpoint(endpoint: &str) -> Result<Url, Error> {
    Url::parse(endpoint).map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))
}

#[inline]
fn no_endpoint(auth: &str, service_type: &str) -> Error {
    Error::new(
        ErrorKind::EndpointNotFound,
        format!(
            "{} authentication without an endpoint, use an override for {}",
            auth, service_type
        ),
    )
}

/// Authentication type that provides no authentication.
///
/// This type always uses a pre-defined endpoint and sends no authenticaiton information:
/// ```rust,no_run
/// let auth = oscloud::NoAuth::new("http://127.0.0.1:8888/v1/")
///     .expect("Invalid auth URL");
/// let session = oscloud::Session::new(auth);
/// ```
#[derive(Clone, Debug)]
pub struct NoAuth {
    endpoint: Option<Url>,
}

assert_impl_all!(NoAuth: Send, Sync);

impl NoAuth {
    /// Create a new fake authentication method using a fixed endpoint.
    ///
    /// This endpoint will be returned in response to all `get_endpoint` calls
    /// of the [AuthType](trait.AuthType.html) trait.
    #[inline]
    pub fn new<U>(endpoint: U) -> Result<NoAuth, Error>
    where
        U: AsRef<str>,
    {
        Ok(NoAuth {
            endpoint: Some(parse_endpoint(endpoint.as_ref())?),
        })
    }

    /// Create a new fake authentication method without an endpoint.
    ///
    /// All calls to `get_endpoint` will fail. This option is only useful with endpoint overrides.
    #[inline]
    pub fn new_without_endpoint() -> NoAuth {
        NoAuth { endpoint: None }
    }
}

#[async_trait]
impl AuthType for NoAuth {
    /// Authenticate a request.
    async fn authenticate(
        &self,
        _client: &Client,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, Error> {
        Ok(request)
    }

    /// Get a predefined endpoint for all service types
    async fn get_endpoint(
        &self,
        _client: &Client,
        service_type: &str,
        _filters: &EndpointFilters,
    ) -> Result<Url, Error> {
        self.endpoint
            .clone()
            .ok_or_else(|| no_endpoint("None", service_type))
    }

    /// This call does nothing for `NoAuth`.
    async fn refresh(&self, _client: &Client) -> Result<(), Error> {
        Ok(())
    }
}

/// Authentication with a pre-issued token.
///
/// The token is sent in the `X-Auth-Token` header with every request. Obtaining and renewing
/// tokens is left to the caller.
///
/// ```rust,no_run
/// let auth = oscloud::Token::new("gAAAAABf3x")
///     .with_endpoint("https://dfw.queues.api.rackspacecloud.com/v1/123456/")
///     .expect("Invalid endpoint");
/// let session = oscloud::Session::new(auth);
/// ```
#[derive(Clone)]
pub struct Token {
    token: HeaderValue,
    endpoint: Option<Url>,
}

assert_impl_all!(Token: Send, Sync);

impl Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("token", &"***")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Token {
    /// Create a token authentication without an endpoint.
    ///
    /// Endpoint overrides must be used for every service in this case. A token that is not a
    /// valid header value is rejected on the first request.
    pub fn new<S: Into<String>>(token: S) -> Token {
        let mut token = HeaderValue::from_str(&token.into())
            .unwrap_or_else(|_| HeaderValue::from_static(""));
        token.set_sensitive(true);
        Token {
            token,
            endpoint: None,
        }
    }

    /// Use a fixed endpoint for all services.
    pub fn with_endpoint<U: AsRef<str>>(mut self, endpoint: U) -> Result<Token, Error> {
        self.endpoint = Some(parse_endpoint(endpoint.as_ref())?);
        Ok(self)
    }
}

#[async_trait]
impl AuthType for Token {
    async fn authenticate(
        &self,
        _client: &Client,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, Error> {
        if self.token.is_empty() {
            return Err(Error::new(
                ErrorKind::AuthenticationFailed,
                "The authentication token is empty or contains invalid characters",
            ));
        }
        Ok(request.header("X-Auth-Token", self.token.clone()))
    }

    async fn get_endpoint(
        &self,
        _client: &Client,
        service_type: &str,
        _filters: &EndpointFilters,
    ) -> Result<Url, Error> {
        self.endpoint
            .clone()
            .ok_or_else(|| no_endpoint("Token", service_type))
    }

    /// Tokens are pre-issued, nothing to refresh.
    async fn refresh(&self, _client: &Client) -> Result<(), Error> {
        Ok(())
    }
}
