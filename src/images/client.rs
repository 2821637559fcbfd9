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

//! Images tasks client.

use log::{debug, trace};
use reqwest::Method;
use serde::Serialize;

use super::protocol::*;
use crate::backoff::{poll_until, BackoffPolicy};
use crate::services::IMAGE;
use crate::{Error, ErrorKind, Session};

/// Client for asynchronous tasks of the Images service (API v2).
#[derive(Debug, Clone)]
pub struct ImagesClient {
    session: Session,
    backoff: BackoffPolicy,
}

impl ImagesClient {
    /// Create a client with the default backoff policy.
    pub fn new(session: Session) -> ImagesClient {
        ImagesClient {
            session,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<ImagesClient, Error> {
        Session::from_env().map(ImagesClient::new)
    }

    /// Use a different backoff policy when waiting for tasks.
    #[inline]
    pub fn with_backoff_policy(mut self, policy: BackoffPolicy) -> ImagesClient {
        self.backoff = policy;
        self
    }

    /// Backoff policy used when waiting for tasks.
    #[inline]
    pub fn backoff_policy(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Session in use.
    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// List tasks.
    pub async fn list_tasks(&self) -> Result<Vec<ImageTask>, Error> {
        let root: TasksRoot = self
            .session
            .request(IMAGE, Method::GET, &["tasks"])
            .await?
            .fetch_json()
            .await?;
        trace!("Received {} image task(s)", root.tasks.len());
        Ok(root.tasks)
    }

    /// Get a task by its ID.
    pub async fn get_task(&self, id: &ImageTaskId) -> Result<ImageTask, Error> {
        if id.as_str().is_empty() {
            return Err(Error::missing("task ID"));
        }

        self.session
            .request(IMAGE, Method::GET, &["tasks", id.as_str()])
            .await?
            .fetch_json()
            .await
    }

    async fn create_task<T: Serialize>(
        &self,
        task_type: ImageTaskType,
        input: T,
    ) -> Result<ImageTask, Error> {
        let body = TaskCreate { task_type, input };
        let task: ImageTask = self
            .session
            .request(IMAGE, Method::POST, &["tasks"])
            .await?
            .json(&body)
            .fetch_json()
            .await?;
        debug!(
            "Created {} task {} with status {}",
            task.task_type, task.id, task.status
        );
        Ok(task)
    }

    /// Create a task importing an image.
    #[inline]
    pub async fn create_import_task(&self, input: &ImportTaskInput) -> Result<ImageTask, Error> {
        self.create_task(ImageTaskType::Import, input).await
    }

    /// Create a task exporting an image.
    #[inline]
    pub async fn create_export_task(&self, input: &ExportTaskInput) -> Result<ImageTask, Error> {
        self.create_task(ImageTaskType::Export, input).await
    }

    /// Wait for a task to reach `success` or `failure`.
    ///
    /// A failed task is returned as is, check its `status`. `progress` receives every polled
    /// state of the task. Fails with `ErrorKind::Cancelled` if the backoff policy runs out.
    pub async fn wait_for_task<P>(&self, id: &ImageTaskId, progress: P) -> Result<ImageTask, Error>
    where
        P: FnMut(&ImageTask),
    {
        poll_until(
            &self.backoff,
            || async move {
                let task = self.get_task(id).await?;
                if &task.id != id {
                    return Err(Error::new(
                        ErrorKind::InvalidResponse,
                        format!("Requested task {}, received {}", id, task.id),
                    ));
                }
                trace!("Task {} is {}", task.id, task.status);
                Ok(task)
            },
            progress,
        )
        .await
    }

    async fn complete<P>(
        &self,
        task: ImageTask,
        completion: CompletionOption,
        progress: P,
    ) -> Result<ImageTask, Error>
    where
        P: FnMut(&ImageTask),
    {
        match completion {
            CompletionOption::RequestSubmitted => Ok(task),
            CompletionOption::RequestCompleted => self.wait_for_task(&task.id, progress).await,
        }
    }

    /// Import an image, optionally waiting for the task to finish.
    pub async fn import_image<P>(
        &self,
        input: &ImportTaskInput,
        completion: CompletionOption,
        progress: P,
    ) -> Result<ImageTask, Error>
    where
        P: FnMut(&ImageTask),
    {
        let task = self.create_import_task(input).await?;
        self.complete(task, completion, progress).await
    }

    /// Export an image, optionally waiting for the task to finish.
    pub async fn export_image<P>(
        &self,
        input: &ExportTaskInput,
        completion: CompletionOption,
        progress: P,
    ) -> Result<ImageTask, Error>
    where
        P: FnMut(&ImageTask),
    {
        let task = self.create_export_task(input).await?;
        self.complete(task, completion, progress).await
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::ImagesClient;
    use crate::backoff::BackoffPolicy;
    use crate::images::ImageTaskId;
    use crate::session::test::new_session;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_empty_id() {
        let client = ImagesClient::new(new_session("http://127.0.0.1:9/v2"));
        let err = client.get_task(&ImageTaskId::new("")).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
    }

    #[tokio::test]
    async fn test_empty_policy() {
        let client = ImagesClient::new(new_session("http://127.0.0.1:9/v2"))
            .with_backoff_policy(BackoffPolicy::new(Vec::new()));
        assert!(client.backoff_policy().intervals().is_empty());

        let mut calls = 0;
        let err = client
            .wait_for_task(&ImageTaskId::new("abc"), |_| calls += 1)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_default_policy() {
        let client = ImagesClient::new(new_session("http://127.0.0.1:9/v2"));
        assert_eq!(client.backoff_policy().intervals()[0], Duration::ZERO);
    }
}
