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

//! Asynchronous tasks of the Images service.
//!
//! ```rust,no_run
//! use oscloud::images::{CompletionOption, ImagesClient, ImportTaskInput};
//!
//! # async fn example() -> Result<(), oscloud::Error> {
//! let client = ImagesClient::from_env()?;
//! let input = ImportTaskInput::new("images/ubuntu.vhd", "ubuntu")?;
//! let task = client
//!     .import_image(&input, CompletionOption::RequestCompleted, |task| {
//!         println!("Task {} is {}", task.id, task.status)
//!     })
//!     .await?;
//! println!("Result: {:?}", task.result);
//! # Ok(()) }
//! ```

mod client;
mod protocol;

pub use self::client::ImagesClient;
pub use self::protocol::{
    CompletionOption, ExportTaskInput, ImageId, ImageProperties, ImageTask, ImageTaskId,
    ImageTaskStatus, ImageTaskType, ImportTaskInput,
};
