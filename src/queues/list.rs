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

//! Message listing cursor.

use reqwest::Url;

use super::client::QueuesClient;
use super::protocol::{Link, MessageListMarker, QueueName, QueuedMessage};
use crate::url;
use crate::Error;

/// Parameters of a message listing that stay the same between pages.
#[derive(Debug, Clone)]
pub(crate) struct ListingParams {
    pub queue_name: QueueName,
    pub limit: Option<usize>,
    pub echo: bool,
    pub include_claimed: bool,
}

/// A page of messages from a queue together with a way to fetch the next page.
///
/// The cursor only moves forward: [next_page](#method.next_page) consumes the current page.
///
/// An empty page always has a continuation that repeats the marker it was requested with,
/// so polling an empty queue keeps a stable position:
///
/// ```rust,no_run
/// # async fn example(client: oscloud::queues::QueuesClient) -> Result<(), oscloud::Error> {
/// let queue = "demo".parse()?;
/// let mut page = client.list_messages(&queue, None, Some(10), false, false).await?;
/// while page.is_empty() {
///     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
///     page = match page.next_page().await? {
///         Some(next) => next,
///         None => break,
///     };
/// }
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct QueuedMessageList {
    client: QueuesClient,
    params: ListingParams,
    messages: Vec<QueuedMessage>,
    next_marker: Option<MessageListMarker>,
    has_next: bool,
}

impl QueuedMessageList {
    pub(crate) fn new(
        client: QueuesClient,
        params: ListingParams,
        messages: Vec<QueuedMessage>,
        request_marker: Option<MessageListMarker>,
        next_marker: Option<MessageListMarker>,
    ) -> QueuedMessageList {
        let (next_marker, has_next) = if messages.is_empty() {
            (request_marker, true)
        } else {
            let has_next = next_marker.is_some();
            (next_marker, has_next)
        };

        QueuedMessageList {
            client,
            params,
            messages,
            next_marker,
            has_next,
        }
    }

    /// Messages on this page.
    #[inline]
    pub fn messages(&self) -> &[QueuedMessage] {
        &self.messages
    }

    /// Consume the page and return its messages.
    #[inline]
    pub fn into_messages(self) -> Vec<QueuedMessage> {
        self.messages
    }

    /// Whether this page has no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Name of the listed queue.
    #[inline]
    pub fn queue_name(&self) -> &QueueName {
        &self.params.queue_name
    }

    /// Marker that the next page will be requested with.
    ///
    /// For an empty page this is the marker this page was requested with.
    #[inline]
    pub fn next_marker(&self) -> Option<&MessageListMarker> {
        self.next_marker.as_ref()
    }

    /// Whether [next_page](#method.next_page) will issue a request.
    #[inline]
    pub fn has_next_page(&self) -> bool {
        self.has_next
    }

    /// Fetch the next page.
    ///
    /// Returns `None` once the listing is exhausted.
    pub async fn next_page(self) -> Result<Option<QueuedMessageList>, Error> {
        if !self.has_next {
            return Ok(None);
        }

        let QueuedMessageList {
            client,
            params,
            next_marker,
            ..
        } = self;
        client
            .list_messages(
                &params.queue_name,
                next_marker.as_ref(),
                params.limit,
                params.echo,
                params.include_claimed,
            )
            .await
            .map(Some)
    }
}

/// Extract the marker from the `next` link of a listing.
pub(crate) fn next_marker(base: &Url, links: &[Link]) -> Option<MessageListMarker> {
    links
        .iter()
        .find(|link| link.rel == "next")
        .and_then(|link| url::query_value(base, &link.href, "marker"))
        .map(MessageListMarker::from)
}

#[cfg(test)]
mod test {
    use reqwest::Url;

    use super::{next_marker, ListingParams, QueuedMessageList};
    use crate::queues::protocol::{Link, MessageListMarker, QueuedMessage};
    use crate::queues::QueuesClient;
    use crate::session::test::{new_session, URL};

    fn params() -> ListingParams {
        ListingParams {
            queue_name: "demo".parse().unwrap(),
            limit: Some(10),
            echo: true,
            include_claimed: false,
        }
    }

    fn client() -> QueuesClient {
        QueuesClient::new(new_session(URL), uuid::Uuid::new_v4())
    }

    fn message(id: &str) -> QueuedMessage {
        serde_json::from_value(serde_json::json!({
            "href": format!("/v1/queues/demo/messages/{}", id),
            "ttl": 300,
            "age": 1,
            "body": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_next_marker() {
        let base = Url::parse("http://127.0.0.1:5000/v1/1234/").unwrap();
        let links = vec![
            Link {
                rel: "self".into(),
                href: "/v1/queues/demo/messages?limit=10".into(),
            },
            Link {
                rel: "next".into(),
                href: "/v1/queues/demo/messages?marker=6244-244224-783&limit=10&echo=true".into(),
            },
        ];
        assert_eq!(
            next_marker(&base, &links),
            Some(MessageListMarker::new("6244-244224-783"))
        );
        assert_eq!(next_marker(&base, &links[..1]), None);
    }

    #[test]
    fn test_page_with_next() {
        let page = QueuedMessageList::new(
            client(),
            params(),
            vec![message("1"), message("2")],
            Some(MessageListMarker::new("0")),
            Some(MessageListMarker::new("2")),
        );
        assert!(!page.is_empty());
        assert!(page.has_next_page());
        assert_eq!(page.next_marker().unwrap().as_str(), "2");
        assert_eq!(page.queue_name().as_str(), "demo");
        assert_eq!(page.into_messages().len(), 2);
    }

    #[test]
    fn test_last_page() {
        let page = QueuedMessageList::new(
            client(),
            params(),
            vec![message("1")],
            Some(MessageListMarker::new("0")),
            None,
        );
        assert!(!page.has_next_page());
        assert!(page.next_marker().is_none());
    }

    #[test]
    fn test_empty_page_keeps_marker() {
        let page = QueuedMessageList::new(
            client(),
            params(),
            Vec::new(),
            Some(MessageListMarker::new("6244-244224-783")),
            Some(MessageListMarker::new("ignored")),
        );
        assert!(page.is_empty());
        assert!(page.has_next_page());
        assert_eq!(page.next_marker().unwrap().as_str(), "6244-244224-783");
    }

    #[tokio::test]
    async fn test_exhausted() {
        let page = QueuedMessageList::new(client(), params(), vec![message("1")], None, None);
        assert!(page.next_page().await.unwrap().is_none());
    }
}
