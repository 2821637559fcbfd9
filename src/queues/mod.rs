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

//! Cloud Queues (OpenStack Marconi API v1).
//!
//! Producers post messages to a queue, consumers either list them or claim them. A claim
//! hides messages from other consumers until it is released or expires:
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), oscloud::Error> {
//! let client = oscloud::queues::QueuesClient::from_env()?;
//! let queue = "jobs".parse()?;
//! let claim = client
//!     .claim_messages(&queue, Some(10), Duration::from_secs(300), Duration::from_secs(60))
//!     .await?;
//! for message in claim.messages() {
//!     println!("{}", message.body());
//!     client.delete_message(&queue, &message.id(), Some(&claim)).await?;
//! }
//! claim.release().await?;
//! # Ok(()) }
//! ```

mod claim;
mod client;
mod list;
mod protocol;

pub use self::claim::Claim;
pub use self::client::QueuesClient;
pub use self::list::QueuedMessageList;
pub use self::protocol::{
    ClaimId, HomeDocument, Message, MessageId, MessageListMarker, MessageStatistics, Queue,
    QueueList, QueueMessagesStatistics, QueueName, QueueStatistics, QueuedMessage,
};
