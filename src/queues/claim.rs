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

//! Claims: time-bounded leases on messages.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use log::debug;
use reqwest::Url;
use static_assertions::assert_impl_all;
use tokio::runtime::Handle;

use super::client::QueuesClient;
use super::protocol::{ClaimId, QueueName, QueuedMessage};
use crate::url::last_segment;
use crate::{Error, ErrorKind};

type Release = Shared<BoxFuture<'static, Result<(), Error>>>;

/// A claim on a batch of messages.
///
/// While the claim is active, its messages are invisible to other claimants. The set of
/// messages is fixed when the claim is acquired. The claim can be renewed or released; when
/// neither happens, it expires after its time-to-live plus the grace period.
///
/// A claim without an ID is *empty*: no messages were available when it was requested.
/// Releasing an empty claim does nothing, renewing it fails.
///
/// Age and time-to-live are snapshots taken when the claim was acquired or queried. Use
/// [refresh](#method.refresh) to get the current values.
pub struct Claim {
    client: QueuesClient,
    queue_name: QueueName,
    location: Option<Url>,
    id: Option<ClaimId>,
    time_to_live: Duration,
    grace_period: Duration,
    age: Duration,
    messages: Vec<QueuedMessage>,
    release: Mutex<Option<Release>>,
}

assert_impl_all!(Claim: Send, Sync);

impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claim")
            .field("queue_name", &self.queue_name)
            .field("id", &self.id)
            .field("time_to_live", &self.time_to_live)
            .field("grace_period", &self.grace_period)
            .field("age", &self.age)
            .field("messages", &self.messages.len())
            .field("released", &self.is_released())
            .finish()
    }
}

impl Claim {
    pub(crate) fn new(
        client: QueuesClient,
        queue_name: QueueName,
        location: Option<Url>,
        time_to_live: Duration,
        grace_period: Duration,
        age: Duration,
        messages: Vec<QueuedMessage>,
    ) -> Claim {
        let id = location
            .as_ref()
            .map(|url| ClaimId::new(last_segment(url.path())))
            .filter(|id| !id.as_str().is_empty());
        Claim {
            client,
            queue_name,
            location,
            id,
            time_to_live,
            grace_period,
            age,
            messages,
            release: Mutex::new(None),
        }
    }

    /// Claim ID (`None` for an empty claim).
    #[inline]
    pub fn id(&self) -> Option<&ClaimId> {
        self.id.as_ref()
    }

    /// Location of the claim as reported by the service (`None` for an empty claim).
    ///
    /// Informational only: requests for the claim are built from the queue endpoint and
    /// the claim ID.
    #[inline]
    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    /// Name of the queue the messages were claimed from.
    #[inline]
    pub fn queue_name(&self) -> &QueueName {
        &self.queue_name
    }

    /// Age of the claim when it was acquired or queried.
    #[inline]
    pub fn age(&self) -> Duration {
        self.age
    }

    /// Time-to-live of the claim.
    #[inline]
    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    /// Grace period requested for the claim.
    #[inline]
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Claimed messages.
    #[inline]
    pub fn messages(&self) -> &[QueuedMessage] {
        &self.messages
    }

    /// Whether the claim is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }

    /// Whether a release has been requested.
    ///
    /// The release request itself may still be in progress or may have failed.
    pub fn is_released(&self) -> bool {
        self.release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn start_release(&self) -> Release {
        match self.id.clone() {
            Some(claim_id) => {
                let client = self.client.clone();
                let queue_name = self.queue_name.clone();
                async move { client.delete_claim(&queue_name, &claim_id).await }
                    .boxed()
                    .shared()
            }
            None => future::ready(Ok(())).boxed().shared(),
        }
    }

    /// Release the claim.
    ///
    /// At most one release request is ever sent: the first call starts it, all calls
    /// (concurrent or later) wait for the same outcome. Releasing an empty claim completes
    /// immediately without any requests.
    ///
    /// Dropping the returned future only stops waiting. Once started, the release keeps
    /// going as long as another caller waits for it.
    pub async fn release(&self) -> Result<(), Error> {
        let pending = {
            let mut guard = self.release.lock().unwrap_or_else(PoisonError::into_inner);
            guard.get_or_insert_with(|| self.start_release()).clone()
        };
        pending.await
    }

    /// Release the claim, blocking the current thread.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context, see
    /// [Handle::block_on](https://docs.rs/tokio/latest/tokio/runtime/struct.Handle.html#method.block_on).
    pub fn release_blocking(&self, handle: &Handle) -> Result<(), Error> {
        handle.block_on(self.release())
    }

    /// Renew the claim, setting a new time-to-live.
    ///
    /// The age is not updated. Fails with `ErrorKind::InvalidOperation` for empty and
    /// released claims.
    pub async fn renew(&mut self, ttl: Duration) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "cannot renew an empty claim",
            ));
        }

        if self.is_released() {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "cannot renew a released claim",
            ));
        }

        if ttl.as_secs() == 0 {
            return Err(Error::out_of_range("claim time-to-live", "at least one second"));
        }

        self.client
            .update_claim(&self.queue_name, self, ttl)
            .await?;
        self.time_to_live = Duration::from_secs(ttl.as_secs());
        Ok(())
    }

    /// Fetch the current state of the claim as a new object.
    pub async fn refresh(&self) -> Result<Claim, Error> {
        self.client.query_claim(&self.queue_name, self).await
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if !self.is_empty() && !self.is_released() {
            debug!(
                "Claim {:?} on queue {} dropped without release, it will expire in {:?}",
                self.id, self.queue_name, self.time_to_live
            );
        }
    }
}
