// Copyright 2019-2024 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Asynchronous client for OpenStack Cloud Queues and Images tasks.
//!
//! # Sessions
//!
//! A [Session](struct.Session.html) combines an HTTP client, an authentication method and
//! endpoint settings. It is usually created from `clouds.yaml` or `OS_*` environment variables:
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), oscloud::Error> {
//! let session = oscloud::Session::from_config("rackspace")?;
//! let queues = oscloud::queues::QueuesClient::with_random_client_id(session);
//! queues.get_node_health().await?;
//! # Ok(()) }
//! ```
//!
//! # Services
//!
//! * [queues](queues/index.html) implements the Cloud Queues API with claims and message
//!   listing.
//! * [images](images/index.html) implements asynchronous image tasks waited on with a
//!   [BackoffPolicy](struct.BackoffPolicy.html).

#![crate_name = "oscloud"]
#![crate_type = "lib"]
// NOTE: we do not use generic deny(warnings) to avoid breakages with new
// versions of the compiler. Add more warnings here as you discover them.
#![deny(
    improper_ctypes,
    missing_debug_implementations,
    missing_docs,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    trivial_numeric_casts,
    unconditional_recursion,
    unsafe_code,
    unused_allocation,
    unused_comparisons,
    unused_doc_comments,
    unused_import_braces,
    unused_parens,
    while_true
)]
#![warn(
    dead_code,
    missing_copy_implementations,
    trivial_casts,
    unused,
    unused_qualifications,
    unused_results
)]
#![allow(
    clippy::new_ret_no_self,
    clippy::should_implement_trait,
    clippy::wrong_self_convention
)]

mod auth;
mod backoff;
mod cache;
pub mod client;
mod endpointfilters;
mod error;
pub mod images;
mod loading;
mod macros;
mod query;
pub mod queues;
pub mod services;
mod session;
mod stream;
mod url;
mod utils;

pub use crate::auth::{AuthType, NoAuth, Token};
pub use crate::backoff::{poll_until, BackoffPolicy, Pollable};
pub use crate::endpointfilters::{EndpointFilters, InterfaceType};
pub use crate::error::{Error, ErrorKind};
pub use crate::loading::{from_config, from_env};
pub use crate::query::{Query, QueryItem};
pub use crate::session::Session;
pub use crate::stream::PaginatedResource;
