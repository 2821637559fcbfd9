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

//! HTTP client shared by the service clients.
//!
//! Every request to Cloud Queues or Images goes through [RequestBuilder](struct.RequestBuilder.html),
//! which signs it with the session authentication and turns error statuses into
//! [Error](../struct.Error.html) values.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use http::Error as HttpError;
use log::trace;
use reqwest::{Client, Method, Request, RequestBuilder as HttpRequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

use super::{AuthType, EndpointFilters, Error};

/// HTTP client bound to an authentication method.
///
/// Clones share the authentication, so a token refreshed through one clone is seen by all
/// queues and images clients created from the same session.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    client: Client,
    auth: Arc<dyn AuthType>,
}

assert_eq_size!(AuthenticatedClient, Option<AuthenticatedClient>);

impl AuthenticatedClient {
    /// Create a client, refreshing the authentication first.
    pub async fn new<Auth: AuthType + 'static>(
        client: Client,
        auth_type: Auth,
    ) -> Result<AuthenticatedClient, Error> {
        auth_type.refresh(&client).await?;
        Ok(AuthenticatedClient::new_internal(
            client,
            Arc::new(auth_type),
        ))
    }

    #[inline]
    pub(crate) fn new_internal(client: Client, auth: Arc<dyn AuthType>) -> AuthenticatedClient {
        AuthenticatedClient { client, auth }
    }

    /// Authentication method in use.
    #[inline]
    pub fn auth_type(&self) -> &dyn AuthType {
        self.auth.as_ref()
    }

    #[inline]
    async fn authenticate(&self, request: HttpRequestBuilder) -> Result<Request, Error> {
        self.auth
            .authenticate(&self.client, request)
            .await?
            .build()
            .map_err(Error::from)
    }

    /// Endpoint of a service (for example, `queuing`) from the authentication method.
    #[inline]
    pub async fn get_endpoint(
        &self,
        service_type: &str,
        filters: &EndpointFilters,
    ) -> Result<Url, Error> {
        self.auth
            .get_endpoint(&self.client, service_type, filters)
            .await
    }

    /// Refresh the authentication (a no-op for fixed tokens).
    ///
    /// Affects all clones of this client.
    #[inline]
    pub async fn refresh(&mut self) -> Result<(), Error> {
        self.auth.refresh(&self.client).await
    }

    /// Replace the authentication method.
    #[inline]
    pub fn set_auth_type<Auth: AuthType + 'static>(&mut self, auth_type: Auth) {
        self.auth = Arc::new(auth_type);
    }

    /// Start a request to an absolute URL, e.g. a claim or a task.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        RequestBuilder {
            inner: self.client.request(method, url),
            client: self.clone(),
        }
    }
}

/// A pending request to a service.
///
/// Authentication is added when the request is sent.
#[derive(Debug)]
#[must_use = "preparing a request is not enough to run it"]
pub struct RequestBuilder {
    inner: HttpRequestBuilder,
    client: AuthenticatedClient,
}

#[derive(Debug, Deserialize)]
struct Message {
    message: Option<String>,
    faultstring: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

impl From<Message> for Option<String> {
    fn from(value: Message) -> Option<String> {
        // Marconi: {"title": "Bad request", "description": "Queue name is invalid"}
        match (value.title, value.description) {
            (Some(title), Some(description)) => Some(format!("{}: {}", title, description)),
            (title, description) => value
                .message
                .or(value.faultstring)
                .or(description)
                .or(title),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Map(HashMap<String, Message>),
    Message(Message),
}

fn extract_message(text: String) -> String {
    serde_json::from_str::<ErrorResponse>(&text)
        .ok()
        .and_then(|body| match body {
            ErrorResponse::Map(map) => map.into_iter().next().and_then(|(_k, v)| v.into()),
            ErrorResponse::Message(msg) => msg.into(),
        })
        .unwrap_or(text)
}

/// Convert 4xx and 5xx responses into errors.
///
/// The message is taken from the JSON body when possible: Marconi reports errors as
/// `title` and `description`, Glance as `message`.
pub async fn check(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let message = extract_message(response.text().await?);
        trace!("HTTP request returned {}; error: {}", status, message);
        Err(Error::new(status.into(), message).with_status(status))
    } else {
        trace!(
            "HTTP request to {} returned {}",
            response.url(),
            response.status()
        );
        Ok(response)
    }
}

impl RequestBuilder {
    /// Add a header, such as `Client-Id`.
    pub fn header<K, V>(self, key: K, value: V) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<HttpError>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<HttpError>,
    {
        RequestBuilder {
            inner: self.inner.header(key, value),
            ..self
        }
    }

    /// Use a value as the JSON body (messages, claims, task inputs).
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.json(json),
            ..self
        }
    }

    /// Append query parameters, e.g. `limit` or `claim_id`.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.query(query),
            ..self
        }
    }

    /// Send the request and parse the JSON response.
    pub async fn fetch_json<T>(self) -> Result<T, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.send().await?.json::<T>().await.map_err(Error::from)
    }

    /// Send the request, failing on error statuses.
    pub async fn send(self) -> Result<Response, Error> {
        check(self.send_unchecked().await?).await
    }

    /// Send the request and return the response whatever its status.
    ///
    /// Used where an error status is an answer, like a missing queue.
    pub async fn send_unchecked(self) -> Result<Response, Error> {
        let req = self.client.authenticate(self.inner).await?;
        trace!("Sending HTTP {} request to {}", req.method(), req.url());
        self.client.client.execute(req).await.map_err(Error::from)
    }

    /// Clone the request if its body allows it.
    pub fn try_clone(&self) -> Option<RequestBuilder> {
        self.inner.try_clone().map(|inner| RequestBuilder {
            inner,
            client: self.client.clone(),
        })
    }
}

#[cfg(test)]
mod test_request_builder {
    use http::Method;
    use reqwest::{Client, Url};

    use crate::NoAuth;

    use super::AuthenticatedClient;

    #[tokio::test]
    async fn test_headers_and_query() {
        let client = AuthenticatedClient::new(Client::new(), NoAuth::new_without_endpoint())
            .await
            .unwrap();
        let rb = client
            .request(
                Method::GET,
                Url::parse("http://127.0.0.1/v1/queues").unwrap(),
            )
            .header("Client-Id", "3381af92-2b9e-11e3-b191-71861300734c")
            .query(&[("limit", "10")]);
        let clone = rb.try_clone().unwrap();
        let req = clone.inner.build().unwrap();
        assert_eq!(
            req.headers().get("client-id").unwrap().to_str().unwrap(),
            "3381af92-2b9e-11e3-b191-71861300734c"
        );
        assert_eq!(req.url().query(), Some("limit=10"));
    }
}

#[cfg(test)]
mod test_extract_message {
    use super::extract_message;

    #[test]
    fn test_plain() {
        let msg = "<html><body>I failed</body></html>";
        let result = extract_message(msg.to_string());
        assert_eq!(result, msg);
    }

    #[test]
    fn test_simple_message() {
        let msg = r#"{"message": "I failed"}"#;
        let result = extract_message(msg.to_string());
        assert_eq!(result, "I failed");
    }

    #[test]
    fn test_nested_message() {
        let msg = r#"{"SomethingFailed": {"message": "I failed"}}"#;
        let result = extract_message(msg.to_string());
        assert_eq!(result, "I failed");
    }

    #[test]
    fn test_title_and_description() {
        let msg = r#"{"title": "Invalid API request", "description": "Queue name is invalid"}"#;
        let result = extract_message(msg.to_string());
        assert_eq!(result, "Invalid API request: Queue name is invalid");
    }

    #[test]
    fn test_title_only() {
        let msg = r#"{"title": "Not found"}"#;
        let result = extract_message(msg.to_string());
        assert_eq!(result, "Not found");
    }
}
