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

//! Waiting for asynchronous server-side operations.

use std::future::Future;
use std::time::Duration;

use log::{debug, trace};

use super::{Error, ErrorKind};

const DEFAULT_POLLS: usize = 30;
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);

/// A finite schedule of delays between polls.
///
/// Each interval is waited *before* the corresponding poll; a zero interval means polling
/// immediately. Once all intervals are used up, waiting is given up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    intervals: Vec<Duration>,
}

impl BackoffPolicy {
    /// Create a policy from explicit intervals.
    #[inline]
    pub fn new(intervals: Vec<Duration>) -> BackoffPolicy {
        BackoffPolicy { intervals }
    }

    /// Create an exponential policy.
    ///
    /// The first poll happens immediately, the following ones after `initial`, `2 * initial`
    /// and so on, capped at `max`. At most `polls` polls are made.
    pub fn exponential(initial: Duration, max: Duration, polls: usize) -> BackoffPolicy {
        let mut intervals = Vec::with_capacity(polls);
        let mut next = initial;
        for index in 0..polls {
            if index == 0 {
                intervals.push(Duration::ZERO);
            } else {
                intervals.push(next.min(max));
                next = next.saturating_mul(2);
            }
        }
        BackoffPolicy { intervals }
    }

    /// Intervals of this policy.
    #[inline]
    pub fn intervals(&self) -> &[Duration] {
        &self.intervals
    }
}

impl Default for BackoffPolicy {
    /// Immediate poll, then 1, 2, 4, 8, 16 and 32 seconds, then every minute, 30 polls total.
    fn default() -> BackoffPolicy {
        BackoffPolicy::exponential(Duration::from_secs(1), DEFAULT_MAX_INTERVAL, DEFAULT_POLLS)
    }
}

/// An object describing the state of an asynchronous operation.
pub trait Pollable {
    /// Whether the operation has reached a final state (successful or not).
    fn is_finished(&self) -> bool;
}

/// Poll until the operation is finished.
///
/// `progress` is called with the result of every poll, including the final one. Errors from
/// `poll` are returned immediately. If the policy is exhausted, `ErrorKind::Cancelled` is
/// returned.
pub async fn poll_until<T, F, Fut, P>(
    policy: &BackoffPolicy,
    mut poll: F,
    mut progress: P,
) -> Result<T, Error>
where
    T: Pollable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
    P: FnMut(&T),
{
    for (attempt, interval) in policy.intervals.iter().enumerate() {
        if !interval.is_zero() {
            trace!("Waiting {:?} before poll #{}", interval, attempt + 1);
            tokio::time::sleep(*interval).await;
        }

        let current = poll().await?;
        progress(&current);
        if current.is_finished() {
            debug!("Operation finished after {} poll(s)", attempt + 1);
            return Ok(current);
        }
    }

    Err(Error::new(
        ErrorKind::Cancelled,
        format!(
            "Operation did not finish after {} poll(s)",
            policy.intervals.len()
        ),
    ))
}
