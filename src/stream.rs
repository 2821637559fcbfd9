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

//! A stream of resources.

use std::fmt::Debug;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::pin_mut;
use futures::stream::{Stream, TryStreamExt};

use super::Error;

/// A single resource.
///
/// The `resource_id` of the last item of a page serves as a marker for the next page.
pub trait PaginatedResource {
    /// Type of an ID.
    type Id: Debug + Clone + Send + 'static;

    /// Retrieve a copy of the ID.
    fn resource_id(&self) -> Self::Id;
}

/// Source of pages for a paginated listing.
#[async_trait]
pub(crate) trait FetchNext<T: PaginatedResource + Send + 'static> {
    /// Fetch a page of at most `limit` items following `marker`.
    ///
    /// An empty result terminates the listing.
    async fn fetch_next(&self, limit: Option<usize>, marker: Option<T::Id>)
        -> Result<Vec<T>, Error>;
}

fn chunks<F, T>(
    fetcher: F,
    limit: Option<usize>,
    starting_with: Option<T::Id>,
) -> impl Stream<Item = Result<Vec<T>, Error>>
where
    F: FetchNext<T>,
    T: PaginatedResource + Unpin + Send + 'static,
{
    let mut marker = starting_with;

    try_stream! {
        loop {
            let items = fetcher.fetch_next(limit, marker.take()).await?;
            if let Some(new_m) = items.last() {
                marker = Some(new_m.resource_id());
                yield items;
            } else {
                break
            }
        }
    }
}

/// Creates a paginated resource stream.
pub(crate) fn paginated<F, T>(
    fetcher: F,
    limit: Option<usize>,
    starting_with: Option<T::Id>,
) -> impl Stream<Item = Result<T, Error>>
where
    F: FetchNext<T>,
    T: PaginatedResource + Unpin + Send + 'static,
{
    try_stream! {
        let iter = chunks(fetcher, limit, starting_with);
        pin_mut!(iter);
        while let Some(chunk) = iter.try_next().await? {
            for item in chunk {
                yield item;
            }
        }
    }
}
