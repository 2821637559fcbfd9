// Copyright 2024 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Cloud Queues client.

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::Stream;
use log::{debug, trace, warn};
use reqwest::header::{CONTENT_LOCATION, LOCATION};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::claim::Claim;
use super::list::{self, ListingParams, QueuedMessageList};
use super::protocol::*;
use crate::cache::ValueCache;
use crate::client::{check, RequestBuilder};
use crate::query::Query;
use crate::services::QUEUES;
use crate::stream::{paginated, FetchNext};
use crate::url;
use crate::{loading, Error, ErrorKind, Session};

const CLIENT_ID_HEADER: &str = "Client-Id";

/// Client for the Cloud Queues service (OpenStack Marconi/Zaqar API v1).
///
/// Every request carries the `Client-Id` header with the UUID given on creation. The service
/// uses it to tell apart messages posted by this client (see the `echo` listing parameter).
///
/// Clones share the session, the endpoint cache and the cached home document.
#[derive(Debug, Clone)]
pub struct QueuesClient {
    session: Session,
    client_id: Uuid,
    home: Arc<ValueCache<HomeDocument>>,
}

#[derive(Debug)]
struct QueueFetcher {
    client: QueuesClient,
    detailed: bool,
}

#[async_trait]
impl FetchNext<Queue> for QueueFetcher {
    async fn fetch_next(
        &self,
        limit: Option<usize>,
        marker: Option<QueueName>,
    ) -> Result<Vec<Queue>, Error> {
        self.client
            .list_queues(marker.as_ref(), limit, self.detailed)
            .await
            .map(|list| list.queues)
    }
}

fn check_claim_queue(queue_name: &QueueName, claim: &Claim) -> Result<(), Error> {
    if claim.queue_name() != queue_name {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "claim belongs to queue {}, not {}",
                claim.queue_name(),
                queue_name
            ),
        ));
    }
    Ok(())
}

fn claim_id<'c>(claim: &'c Claim, action: &str) -> Result<&'c ClaimId, Error> {
    claim.id().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot {} an empty claim", action),
        )
    })
}

fn resolve_header(response: &Response, base: &Url, name: &str) -> Result<Option<Url>, Error> {
    match response.headers().get(name) {
        Some(value) => {
            let value = value.to_str().map_err(|e| {
                Error::new(
                    ErrorKind::InvalidResponse,
                    format!("Invalid {} header: {}", name, e),
                )
            })?;
            base.join(value).map(Some).map_err(Error::from)
        }
        None => Ok(None),
    }
}

impl QueuesClient {
    /// Create a client using the given session and client ID.
    pub fn new(session: Session, client_id: Uuid) -> QueuesClient {
        QueuesClient {
            session,
            client_id,
            home: Arc::new(ValueCache::default()),
        }
    }

    /// Create a client with a random client ID.
    #[inline]
    pub fn with_random_client_id(session: Session) -> QueuesClient {
        QueuesClient::new(session, Uuid::new_v4())
    }

    /// Create a client from environment variables.
    ///
    /// The session is created with [Session::from_env](../struct.Session.html#method.from_env).
    /// The client ID is read from `OS_QUEUES_CLIENT_ID`; a random one is generated if it is
    /// not set.
    pub fn from_env() -> Result<QueuesClient, Error> {
        let session = Session::from_env()?;
        let client_id = match loading::queues_client_id()? {
            Some(client_id) => client_id,
            None => {
                let generated = Uuid::new_v4();
                debug!("Generated client ID {} for the queues service", generated);
                generated
            }
        };
        Ok(QueuesClient::new(session, client_id))
    }

    /// Client ID sent with every request.
    #[inline]
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Session in use.
    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn request<I>(&self, method: Method, path: I) -> Result<RequestBuilder, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(self
            .session
            .request(QUEUES, method, path)
            .await?
            .header(CLIENT_ID_HEADER, self.client_id.to_string()))
    }

    fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        trace!("Preparing HTTP {} request to {}", method, url);
        self.session
            .client()
            .request(method, url)
            .header(CLIENT_ID_HEADER, self.client_id.to_string())
    }

    // The Location header of a claim may omit the project part of the endpoint, so only
    // the ID is taken from it.
    async fn claim_url(&self, queue_name: &QueueName, claim_id: &ClaimId) -> Result<Url, Error> {
        self.session
            .get_endpoint(
                QUEUES,
                &["queues", queue_name.as_str(), "claims", claim_id.as_str()],
            )
            .await
    }

    async fn messages_url(&self, queue_name: &QueueName) -> Result<Url, Error> {
        self.session
            .get_endpoint(QUEUES, &["queues", queue_name.as_str(), "messages"])
            .await
    }

    /// Get the home document of the service.
    ///
    /// The document is fetched from `/v1` on the service host once and cached afterwards.
    pub async fn get_home(&self) -> Result<HomeDocument, Error> {
        if self.home.get().is_none() {
            debug!("Home document of the queues service is not cached, fetching");
        }

        let home = self
            .home
            .get_or_try_init(|| async {
                let root = self.session.get_root(QUEUES).await?;
                let url = root.join("/v1")?;
                self.request_url(Method::GET, url)
                    .fetch_json::<HomeDocument>()
                    .await
            })
            .await?;
        Ok(home.clone())
    }

    /// Check the health of the service node.
    pub async fn get_node_health(&self) -> Result<(), Error> {
        let _ = self.request(Method::HEAD, &["health"]).await?.send().await?;
        Ok(())
    }

    /// Create a queue.
    ///
    /// Returns `true` if the queue was created and `false` if it already existed.
    pub async fn create_queue(&self, queue_name: &QueueName) -> Result<bool, Error> {
        let response = self
            .request(Method::PUT, &["queues", queue_name.as_str()])
            .await?
            .send()
            .await?;
        let created = response.status() == StatusCode::CREATED;
        debug!(
            "Queue {} {}",
            queue_name,
            if created { "created" } else { "already exists" }
        );
        Ok(created)
    }

    /// List one page of queues.
    pub async fn list_queues(
        &self,
        marker: Option<&QueueName>,
        limit: Option<usize>,
        detailed: bool,
    ) -> Result<QueueList, Error> {
        check_limit(limit)?;

        let query = Query::default()
            .with_opt(marker.cloned().map(QueueQuery::Marker))
            .with_opt(limit.map(QueueQuery::Limit))
            .with(QueueQuery::Detailed(detailed));
        let response = self
            .request(Method::GET, &["queues"])
            .await?
            .query(&query)
            .send()
            .await?;

        let queues = if response.status() == StatusCode::NO_CONTENT {
            Vec::new()
        } else {
            response.json::<QueuesRoot>().await?.queues
        };
        let next_marker = match queues.last() {
            Some(last) => Some(last.name.clone()),
            None => marker.cloned(),
        };
        Ok(QueueList {
            queues,
            next_marker,
        })
    }

    /// List all queues.
    ///
    /// Pages of `limit` queues are requested until an empty page is returned.
    pub fn queues(
        &self,
        limit: Option<usize>,
        detailed: bool,
    ) -> impl Stream<Item = Result<Queue, Error>> {
        let fetcher = QueueFetcher {
            client: self.clone(),
            detailed,
        };
        paginated(fetcher, limit, None)
    }

    /// Check whether a queue exists.
    pub async fn queue_exists(&self, queue_name: &QueueName) -> Result<bool, Error> {
        let response = self
            .request(Method::HEAD, &["queues", queue_name.as_str()])
            .await?
            .send_unchecked()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let _ = check(response).await?;
        Ok(true)
    }

    /// Delete a queue.
    pub async fn delete_queue(&self, queue_name: &QueueName) -> Result<(), Error> {
        let _ = self
            .request(Method::DELETE, &["queues", queue_name.as_str()])
            .await?
            .send()
            .await?;
        debug!("Queue {} deleted", queue_name);
        Ok(())
    }

    /// Replace metadata of a queue.
    pub async fn set_queue_metadata<T>(&self, queue_name: &QueueName, metadata: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let _ = self
            .request(Method::PUT, &["queues", queue_name.as_str(), "metadata"])
            .await?
            .json(metadata)
            .send()
            .await?;
        Ok(())
    }

    /// Get metadata of a queue.
    pub async fn get_queue_metadata<T>(&self, queue_name: &QueueName) -> Result<T, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.request(Method::GET, &["queues", queue_name.as_str(), "metadata"])
            .await?
            .fetch_json()
            .await
    }

    /// Get statistics of a queue.
    pub async fn get_queue_statistics(
        &self,
        queue_name: &QueueName,
    ) -> Result<QueueStatistics, Error> {
        self.request(Method::GET, &["queues", queue_name.as_str(), "stats"])
            .await?
            .fetch_json()
            .await
    }

    /// List one page of messages.
    ///
    /// `marker` is the position to continue from (use `None` to start from the beginning).
    /// With `echo` set to `false`, messages posted with the same client ID are skipped.
    /// Claimed messages are only returned if `include_claimed` is `true`.
    pub async fn list_messages(
        &self,
        queue_name: &QueueName,
        marker: Option<&MessageListMarker>,
        limit: Option<usize>,
        echo: bool,
        include_claimed: bool,
    ) -> Result<QueuedMessageList, Error> {
        check_limit(limit)?;

        let query = Query::default()
            .with_opt(marker.cloned().map(MessageQuery::Marker))
            .with_opt(limit.map(MessageQuery::Limit))
            .with(MessageQuery::Echo(echo))
            .with(MessageQuery::IncludeClaimed(include_claimed));
        let response = self
            .request(Method::GET, &["queues", queue_name.as_str(), "messages"])
            .await?
            .query(&query)
            .send()
            .await?;

        let (messages, next) = if response.status() == StatusCode::NO_CONTENT {
            (Vec::new(), None)
        } else {
            let base = response.url().clone();
            let root = response.json::<MessagesRoot>().await?;
            let next = list::next_marker(&base, &root.links);
            (root.messages, next)
        };
        trace!(
            "Received {} message(s) from queue {}, next marker {:?}",
            messages.len(),
            queue_name,
            next
        );

        let params = ListingParams {
            queue_name: queue_name.clone(),
            limit,
            echo,
            include_claimed,
        };
        Ok(QueuedMessageList::new(
            self.clone(),
            params,
            messages,
            marker.cloned(),
            next,
        ))
    }

    /// List all messages in a queue.
    ///
    /// Unlike [QueuedMessageList::next_page](struct.QueuedMessageList.html#method.next_page),
    /// the stream ends on the first empty page.
    pub fn messages(
        &self,
        queue_name: &QueueName,
        limit: Option<usize>,
        echo: bool,
        include_claimed: bool,
    ) -> impl Stream<Item = Result<QueuedMessage, Error>> {
        let client = self.clone();
        let queue_name = queue_name.clone();
        try_stream! {
            let mut marker: Option<MessageListMarker> = None;
            loop {
                let page = client
                    .list_messages(&queue_name, marker.as_ref(), limit, echo, include_claimed)
                    .await?;
                if page.is_empty() {
                    break;
                }

                marker = page.next_marker().cloned();
                let last = marker.is_none();
                for message in page.into_messages() {
                    yield message;
                }
                if last {
                    break;
                }
            }
        }
    }

    /// Get a message by its ID.
    pub async fn get_message(
        &self,
        queue_name: &QueueName,
        message_id: &MessageId,
    ) -> Result<QueuedMessage, Error> {
        self.request(
            Method::GET,
            &["queues", queue_name.as_str(), "messages", message_id.as_str()],
        )
        .await?
        .fetch_json()
        .await
    }

    /// Get several messages by their IDs.
    ///
    /// Messages that do not exist are silently skipped by the service.
    pub async fn get_messages(
        &self,
        queue_name: &QueueName,
        message_ids: &[MessageId],
    ) -> Result<Vec<QueuedMessage>, Error> {
        if message_ids.is_empty() {
            return Err(Error::missing("message IDs"));
        }

        let url = url::append_list_query(self.messages_url(queue_name).await?, "ids", message_ids);
        let response = self.request_url(Method::GET, url).send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        response.json().await.map_err(Error::from)
    }

    /// Post messages to a queue.
    ///
    /// The identifiers assigned to the new messages are not returned. Posting an empty list
    /// only checks that the queue exists.
    pub async fn post_messages<T>(
        &self,
        queue_name: &QueueName,
        messages: &[Message<T>],
    ) -> Result<(), Error>
    where
        T: Serialize + Sync,
    {
        if messages.is_empty() {
            return if self.queue_exists(queue_name).await? {
                Ok(())
            } else {
                Err(Error::new(
                    ErrorKind::ResourceNotFound,
                    format!("Queue {} does not exist", queue_name),
                ))
            };
        }

        let response = self
            .request(Method::POST, &["queues", queue_name.as_str(), "messages"])
            .await?
            .json(messages)
            .send()
            .await?;
        let result: PostMessagesResponse = response.json().await.unwrap_or_default();
        if result.partial {
            warn!(
                "Only {} of {} message(s) were posted to queue {}",
                result.resources.len(),
                messages.len(),
                queue_name
            );
        } else {
            debug!("Posted {} message(s) to queue {}", messages.len(), queue_name);
        }
        Ok(())
    }

    /// Delete a message.
    ///
    /// When a claim is given, the service checks that the message is covered by it. An empty
    /// claim is ignored.
    pub async fn delete_message(
        &self,
        queue_name: &QueueName,
        message_id: &MessageId,
        claim: Option<&Claim>,
    ) -> Result<(), Error> {
        let mut builder = self
            .request(
                Method::DELETE,
                &["queues", queue_name.as_str(), "messages", message_id.as_str()],
            )
            .await?;
        if let Some(claim_id) = claim.and_then(Claim::id) {
            builder = builder.query(&[("claim_id", claim_id.as_str())]);
        }
        let _ = builder.send().await?;
        Ok(())
    }

    /// Delete several messages by their IDs.
    pub async fn delete_messages(
        &self,
        queue_name: &QueueName,
        message_ids: &[MessageId],
    ) -> Result<(), Error> {
        if message_ids.is_empty() {
            return Err(Error::missing("message IDs"));
        }

        let url = url::append_list_query(self.messages_url(queue_name).await?, "ids", message_ids);
        let _ = self.request_url(Method::DELETE, url).send().await?;
        Ok(())
    }

    /// Claim up to `limit` messages.
    ///
    /// The messages stay invisible to other claimants for `ttl` plus `grace`. If no messages
    /// are available, an empty claim is returned. Both durations are truncated to whole
    /// seconds and `ttl` must be at least one second.
    pub async fn claim_messages(
        &self,
        queue_name: &QueueName,
        limit: Option<usize>,
        ttl: Duration,
        grace: Duration,
    ) -> Result<Claim, Error> {
        let body = ClaimRequest {
            ttl: ttl_seconds("claim time-to-live", ttl)?,
            grace: grace.as_secs(),
        };
        check_limit(limit)?;

        let mut builder = self
            .request(Method::POST, &["queues", queue_name.as_str(), "claims"])
            .await?
            .json(&body);
        if let Some(limit) = limit {
            builder = builder.query(&[("limit", limit)]);
        }
        let response = builder.send().await?;

        let ttl = Duration::from_secs(body.ttl);
        let grace = Duration::from_secs(body.grace);
        if response.status() == StatusCode::NO_CONTENT {
            debug!("No messages to claim in queue {}", queue_name);
            return Ok(Claim::new(
                self.clone(),
                queue_name.clone(),
                None,
                ttl,
                grace,
                Duration::ZERO,
                Vec::new(),
            ));
        }

        let root = self.session.get_root(QUEUES).await?;
        let location = resolve_header(&response, &root, LOCATION.as_str())?.ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidResponse,
                "Claim was created but no Location header was returned",
            )
        })?;
        let messages: Vec<QueuedMessage> = response.json().await?;
        debug!(
            "Claimed {} message(s) from queue {} at {}",
            messages.len(),
            queue_name,
            location
        );
        Ok(Claim::new(
            self.clone(),
            queue_name.clone(),
            Some(location),
            ttl,
            grace,
            Duration::ZERO,
            messages,
        ))
    }

    /// Fetch the current state of a claim.
    ///
    /// The result is a new snapshot, the original claim is not modified. The grace period is
    /// not reported by the service and is copied from the original claim.
    pub async fn query_claim(&self, queue_name: &QueueName, claim: &Claim) -> Result<Claim, Error> {
        check_claim_queue(queue_name, claim)?;
        let url = self
            .claim_url(queue_name, claim_id(claim, "query")?)
            .await?;

        let response = self.request_url(Method::GET, url.clone()).send().await?;
        let location =
            resolve_header(&response, response.url(), CONTENT_LOCATION.as_str())?.unwrap_or(url);
        let root: ClaimRoot = response.json().await?;
        trace!(
            "Claim {} has age {} and TTL {}",
            location,
            root.age,
            root.ttl
        );
        Ok(Claim::new(
            self.clone(),
            queue_name.clone(),
            Some(location),
            Duration::from_secs(root.ttl),
            claim.grace_period(),
            Duration::from_secs(root.age),
            root.messages,
        ))
    }

    /// Update the time-to-live of a claim.
    ///
    /// The claim object itself is not changed, use [Claim::renew](struct.Claim.html#method.renew)
    /// to keep it in sync.
    pub async fn update_claim(
        &self,
        queue_name: &QueueName,
        claim: &Claim,
        ttl: Duration,
    ) -> Result<(), Error> {
        check_claim_queue(queue_name, claim)?;
        let url = self
            .claim_url(queue_name, claim_id(claim, "renew")?)
            .await?;
        let body = ClaimUpdate {
            ttl: ttl_seconds("claim time-to-live", ttl)?,
        };

        let _ = self
            .request_url(Method::PATCH, url.clone())
            .json(&body)
            .send()
            .await?;
        debug!("Claim {} renewed for {} second(s)", url, body.ttl);
        Ok(())
    }

    /// Release a claim.
    ///
    /// Same as [Claim::release](struct.Claim.html#method.release): at most one request is
    /// sent for any claim.
    pub async fn release_claim(&self, queue_name: &QueueName, claim: &Claim) -> Result<(), Error> {
        check_claim_queue(queue_name, claim)?;
        claim.release().await
    }

    pub(crate) async fn delete_claim(
        &self,
        queue_name: &QueueName,
        claim_id: &ClaimId,
    ) -> Result<(), Error> {
        let url = self.claim_url(queue_name, claim_id).await?;
        let _ = self.request_url(Method::DELETE, url.clone()).send().await?;
        debug!("Claim {} released", url);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use uuid::Uuid;

    use super::QueuesClient;
    use crate::queues::{Message, MessageId, QueueName};
    use crate::session::test::new_session;
    use crate::ErrorKind;

    // Nothing listens here, so any attempted request fails with a different error.
    const UNREACHABLE: &str = "http://127.0.0.1:9/v1/1234";

    fn client() -> (QueuesClient, QueueName) {
        (
            QueuesClient::new(new_session(UNREACHABLE), Uuid::new_v4()),
            "demo".parse().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_validation_before_io() {
        let (client, queue) = client();

        let err = client
            .list_messages(&queue, None, Some(0), true, false)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);

        let err = client.list_queues(None, Some(0), false).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);

        let err = client
            .claim_messages(&queue, Some(1), Duration::ZERO, Duration::from_secs(60))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);

        let err = client
            .claim_messages(&queue, Some(0), Duration::from_secs(60), Duration::ZERO)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);

        let err = client.get_messages(&queue, &[]).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);

        let err = client.delete_messages(&queue, &[]).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
    }

    #[tokio::test]
    async fn test_network_error() {
        let (client, queue) = client();
        let err = client
            .post_messages(
                &queue,
                &[Message::new(Duration::from_secs(60), serde_json::json!({})).unwrap()],
            )
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ProtocolError);

        let err = client
            .get_message(&queue, &MessageId::new("1"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ProtocolError);
    }

    #[test]
    fn test_clones_share_identity() {
        let (client, _) = client();
        let clone = client.clone();
        assert_eq!(client.client_id(), clone.client_id());
        let other = QueuesClient::with_random_client_id(client.session().clone());
        assert_ne!(client.client_id(), other.client_id());
    }
}
