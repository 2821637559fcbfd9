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

//! Cloud Queues (Marconi v1) JSON structures.

use std::borrow::Cow;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::QueryItem;
use crate::stream::PaginatedResource;
use crate::url::last_segment;
use crate::{opaque_id, Error, ErrorKind};

const MAX_QUEUE_NAME: usize = 64;

opaque_id! {
    #[doc = "Server-assigned identifier of a message."]
    MessageId
}

opaque_id! {
    #[doc = "Server-assigned identifier of a claim."]
    ClaimId
}

opaque_id! {
    #[doc = "Opaque position in a message listing."]
    MessageListMarker
}

/// Name of a queue.
///
/// Valid names are 1 to 64 characters long and consist of ASCII letters, digits,
/// underscores and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    /// Validate and create a queue name.
    pub fn new<S: Into<String>>(name: S) -> Result<QueueName, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::missing("queue name"));
        }

        if name.len() > MAX_QUEUE_NAME {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "queue name {} is longer than {} characters",
                    name, MAX_QUEUE_NAME
                ),
            ));
        }

        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("queue name {} contains invalid character {:?}", name, c),
            ));
        }

        Ok(QueueName(name))
    }

    /// The name as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for QueueName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for QueueName {
    type Err = Error;

    fn from_str(s: &str) -> Result<QueueName, Error> {
        QueueName::new(s)
    }
}

impl TryFrom<String> for QueueName {
    type Error = Error;

    fn try_from(value: String) -> Result<QueueName, Error> {
        QueueName::new(value)
    }
}

impl TryFrom<&str> for QueueName {
    type Error = Error;

    fn try_from(value: &str) -> Result<QueueName, Error> {
        QueueName::new(value)
    }
}

impl From<QueueName> for String {
    fn from(value: QueueName) -> String {
        value.0
    }
}

/// Seconds in a positive time-to-live, sub-second precision is dropped.
pub(crate) fn ttl_seconds(name: &str, ttl: Duration) -> Result<u64, Error> {
    match ttl.as_secs() {
        0 => Err(Error::out_of_range(name, "at least one second")),
        secs => Ok(secs),
    }
}

pub(crate) fn check_limit(limit: Option<usize>) -> Result<(), Error> {
    match limit {
        Some(0) => Err(Error::out_of_range("limit", "positive")),
        _ => Ok(()),
    }
}

/// A message to post to a queue.
///
/// The time-to-live is stored in whole seconds, as it is sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message<T = Value> {
    ttl: u64,
    body: T,
}

impl<T> Message<T> {
    /// Create a message with the given time-to-live and body.
    ///
    /// Fails with `ErrorKind::OutOfRange` if `ttl` is shorter than one second.
    pub fn new(ttl: Duration, body: T) -> Result<Message<T>, Error> {
        Ok(Message {
            ttl: ttl_seconds("message time-to-live", ttl)?,
            body,
        })
    }

    /// Time-to-live of the message.
    #[inline]
    pub fn time_to_live(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    /// Body of the message.
    #[inline]
    pub fn body(&self) -> &T {
        &self.body
    }

    /// Extract the body.
    #[inline]
    pub fn into_body(self) -> T {
        self.body
    }
}

/// A message as stored in a queue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueuedMessage {
    href: String,
    #[serde(default)]
    ttl: u64,
    #[serde(default)]
    age: u64,
    #[serde(default)]
    body: Value,
}

impl QueuedMessage {
    /// Message identifier.
    pub fn id(&self) -> MessageId {
        MessageId::new(last_segment(&self.href))
    }

    /// Relative location of the message.
    #[inline]
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Remaining time-to-live.
    #[inline]
    pub fn time_to_live(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    /// Age of the message at the time of the request.
    #[inline]
    pub fn age(&self) -> Duration {
        Duration::from_secs(self.age)
    }

    /// Raw message body.
    #[inline]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Extract the raw message body.
    #[inline]
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Deserialize the body into a specific type.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        T::deserialize(&self.body).map_err(Error::from)
    }
}

/// A queue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Queue {
    /// Queue name.
    pub name: QueueName,
    /// Relative location of the queue.
    #[serde(default)]
    pub href: Option<String>,
    /// Metadata (only for detailed listings).
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl PaginatedResource for Queue {
    type Id = QueueName;

    fn resource_id(&self) -> QueueName {
        self.name.clone()
    }
}

/// A page of queues.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueList {
    /// Queues on this page.
    pub queues: Vec<Queue>,
    /// Marker to request the following page with.
    ///
    /// The name of the last queue, or the requested marker for an empty page.
    pub next_marker: Option<QueueName>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueuesRoot {
    #[serde(default)]
    pub queues: Vec<Queue>,
}

/// Statistics of a single message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageStatistics {
    /// Relative location of the message.
    pub href: String,
    /// Age in seconds.
    #[serde(default)]
    pub age: u64,
    /// Creation time.
    pub created: DateTime<FixedOffset>,
}

impl MessageStatistics {
    /// Message identifier.
    pub fn id(&self) -> MessageId {
        MessageId::new(last_segment(&self.href))
    }
}

/// Message counts of a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueueMessagesStatistics {
    /// Messages that are not claimed.
    #[serde(default)]
    pub free: u64,
    /// Messages that are claimed.
    #[serde(default)]
    pub claimed: u64,
    /// All messages.
    #[serde(default)]
    pub total: u64,
    /// The oldest message (if any).
    #[serde(default)]
    pub oldest: Option<MessageStatistics>,
    /// The newest message (if any).
    #[serde(default)]
    pub newest: Option<MessageStatistics>,
}

/// Queue statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueueStatistics {
    /// Message statistics.
    #[serde(default)]
    pub messages: QueueMessagesStatistics,
}

/// Home document of the service (JSON Home).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HomeDocument {
    /// Resources by their relation names.
    #[serde(default)]
    pub resources: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PostMessagesResponse {
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub partial: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Link {
    pub rel: String,
    pub href: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesRoot {
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub messages: Vec<QueuedMessage>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClaimRequest {
    pub ttl: u64,
    pub grace: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClaimUpdate {
    pub ttl: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClaimRoot {
    #[serde(default)]
    pub age: u64,
    #[serde(default)]
    pub ttl: u64,
    #[serde(default)]
    pub messages: Vec<QueuedMessage>,
}

#[derive(Debug, Clone)]
pub(crate) enum QueueQuery {
    Marker(QueueName),
    Limit(usize),
    Detailed(bool),
}

impl QueryItem for QueueQuery {
    fn query_item(&self) -> Result<(&str, Cow<str>), Error> {
        Ok(match self {
            QueueQuery::Marker(m) => ("marker", Cow::Borrowed(m.as_str())),
            QueueQuery::Limit(l) => ("limit", Cow::Owned(l.to_string())),
            QueueQuery::Detailed(d) => ("detailed", Cow::Owned(d.to_string())),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) enum MessageQuery {
    Marker(MessageListMarker),
    Limit(usize),
    Echo(bool),
    IncludeClaimed(bool),
}

impl QueryItem for MessageQuery {
    fn query_item(&self) -> Result<(&str, Cow<str>), Error> {
        Ok(match self {
            MessageQuery::Marker(m) => ("marker", Cow::Borrowed(m.as_str())),
            MessageQuery::Limit(l) => ("limit", Cow::Owned(l.to_string())),
            MessageQuery::Echo(e) => ("echo", Cow::Owned(e.to_string())),
            MessageQuery::IncludeClaimed(i) => ("include_claimed", Cow::Owned(i.to_string())),
        })
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::query::Query;

    #[test]
    fn test_queue_name() {
        let name = QueueName::new("fizbit_2-a").unwrap();
        assert_eq!(name.as_str(), "fizbit_2-a");
        assert_eq!(name.to_string(), "fizbit_2-a");

        assert_eq!(
            QueueName::new("").err().unwrap().kind(),
            ErrorKind::MissingArgument
        );
        assert_eq!(
            QueueName::new("no spaces").err().unwrap().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            QueueName::new("ü").err().unwrap().kind(),
            ErrorKind::InvalidInput
        );
        assert!(QueueName::new("a".repeat(64)).is_ok());
        assert_eq!(
            QueueName::new("a".repeat(65)).err().unwrap().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_queue_name_serde() {
        let name: QueueName = serde_json::from_str("\"demo\"").unwrap();
        assert_eq!(name, "demo".parse().unwrap());
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"demo\"");
        assert!(serde_json::from_str::<QueueName>("\"bad/name\"").is_err());
    }

    #[test]
    fn test_message_ttl() {
        let msg = Message::new(Duration::from_millis(120_700), json!({"a": 1})).unwrap();
        assert_eq!(msg.time_to_live(), Duration::from_secs(120));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"ttl": 120, "body": {"a": 1}})
        );

        for ttl in [Duration::ZERO, Duration::from_millis(999)] {
            let err = Message::new(ttl, json!({})).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::OutOfRange);
        }
    }

    #[test]
    fn test_queued_message() {
        let msg: QueuedMessage = serde_json::from_value(json!({
            "href": "/v1/queues/fizbit/messages/50b68a50d6f5b8c8a7c62b01?claim_id=a28ee94e",
            "ttl": 800,
            "age": 32,
            "body": {"event": "BackupStarted", "id": 42}
        }))
        .unwrap();
        assert_eq!(msg.id().as_str(), "50b68a50d6f5b8c8a7c62b01");
        assert_eq!(msg.time_to_live(), Duration::from_secs(800));
        assert_eq!(msg.age(), Duration::from_secs(32));

        #[derive(Debug, Deserialize, PartialEq)]
        struct Event {
            event: String,
            id: u32,
        }
        assert_eq!(
            msg.body_as::<Event>().unwrap(),
            Event {
                event: "BackupStarted".into(),
                id: 42
            }
        );
        assert!(msg.body_as::<Vec<u32>>().is_err());
    }

    #[test]
    fn test_statistics() {
        let stats: QueueStatistics = serde_json::from_value(json!({
            "messages": {
                "free": 146929,
                "claimed": 2409,
                "total": 149338,
                "oldest": {
                    "href": "/v1/queues/fizbit/messages/50b68a50d6cb01",
                    "age": 63,
                    "created": "2013-08-12T20:44:55Z"
                },
                "newest": {
                    "href": "/v1/queues/fizbit/messages/50b68a50d6fb7c",
                    "age": 12,
                    "created": "2013-08-12T20:45:46Z"
                }
            }
        }))
        .unwrap();
        assert_eq!(stats.messages.claimed, 2409);
        let oldest = stats.messages.oldest.unwrap();
        assert_eq!(oldest.id().as_str(), "50b68a50d6cb01");
        assert_eq!(oldest.created.timestamp(), 1376340295);

        let empty: QueueStatistics =
            serde_json::from_value(json!({"messages": {"free": 0, "claimed": 0, "total": 0}}))
                .unwrap();
        assert_eq!(empty, QueueStatistics::default());
    }

    #[test]
    fn test_queries() {
        let query = Query::default()
            .with(MessageQuery::Marker(MessageListMarker::new("1355-237242-783")))
            .with(MessageQuery::Limit(10))
            .with(MessageQuery::Echo(true))
            .with(MessageQuery::IncludeClaimed(false));
        assert_eq!(
            serde_urlencoded::to_string(query).unwrap(),
            "marker=1355-237242-783&limit=10&echo=true&include_claimed=false"
        );

        let query = Query::default()
            .with_opt(None)
            .with(QueueQuery::Limit(5))
            .with(QueueQuery::Detailed(true));
        assert_eq!(
            serde_urlencoded::to_string(query).unwrap(),
            "limit=5&detailed=true"
        );
    }

    #[test]
    fn test_limits() {
        assert!(check_limit(None).is_ok());
        assert!(check_limit(Some(1)).is_ok());
        assert_eq!(
            check_limit(Some(0)).err().unwrap().kind(),
            ErrorKind::OutOfRange
        );
    }
}
