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

//! JSON structures of the Images tasks API.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backoff::Pollable;
use crate::{opaque_id, protocol_enum, Error};

opaque_id! {
    #[doc = "Identifier of an image task."]
    ImageTaskId
}

opaque_id! {
    #[doc = "Identifier of an image."]
    ImageId
}

protocol_enum! {
    #[doc = "Status of an image task."]
    enum ImageTaskStatus {
        #[doc = "The task is waiting to be processed."]
        Pending = "pending",
        #[doc = "The task is in progress."]
        Processing = "processing",
        #[doc = "The task has finished successfully."]
        Success = "success",
        #[doc = "The task has failed."]
        Failure = "failure"
    }
}

protocol_enum! {
    #[doc = "Type of an image task."]
    enum ImageTaskType {
        #[doc = "Import an image from object storage."]
        Import = "import",
        #[doc = "Export an image to object storage."]
        Export = "export"
    }
}

/// Whether to wait for an asynchronous operation to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompletionOption {
    /// Return as soon as the request is accepted.
    RequestSubmitted,
    /// Wait until the operation reaches a final state.
    #[default]
    RequestCompleted,
}

/// Properties of an image created by an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageProperties {
    /// Name of the new image.
    pub name: String,
}

/// Input of an import task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportTaskInput {
    /// Location of the image in object storage (`container/object`).
    pub import_from: String,
    /// Format of the image file, e.g. `vhd`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_from_format: Option<String>,
    /// Properties of the new image.
    pub image_properties: ImageProperties,
}

impl ImportTaskInput {
    /// Create an import input.
    ///
    /// Both the location and the image name must be non-empty.
    pub fn new<S1, S2>(import_from: S1, image_name: S2) -> Result<ImportTaskInput, Error>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let import_from = import_from.into();
        if import_from.is_empty() {
            return Err(Error::missing("import location"));
        }
        let name = image_name.into();
        if name.is_empty() {
            return Err(Error::missing("image name"));
        }
        Ok(ImportTaskInput {
            import_from,
            import_from_format: None,
            image_properties: ImageProperties { name },
        })
    }

    /// Set the format of the image file.
    #[inline]
    pub fn with_format<S: Into<String>>(mut self, format: S) -> ImportTaskInput {
        self.import_from_format = Some(format.into());
        self
    }
}

/// Input of an export task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportTaskInput {
    /// Image to export.
    pub image_uuid: ImageId,
    /// Container to store the image in.
    pub receiving_swift_container: String,
}

impl ExportTaskInput {
    /// Create an export input.
    pub fn new<S: Into<String>>(image_id: ImageId, container: S) -> Result<ExportTaskInput, Error> {
        if image_id.as_str().is_empty() {
            return Err(Error::missing("image ID"));
        }
        let receiving_swift_container = container.into();
        if receiving_swift_container.is_empty() {
            return Err(Error::missing("receiving container"));
        }
        Ok(ExportTaskInput {
            image_uuid: image_id,
            receiving_swift_container,
        })
    }
}

/// An asynchronous task of the Images service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageTask {
    /// Task ID.
    pub id: ImageTaskId,
    /// Current status.
    pub status: ImageTaskStatus,
    /// Task type.
    #[serde(rename = "type")]
    pub task_type: ImageTaskType,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
    /// Time when the task record expires.
    #[serde(default)]
    pub expires_at: Option<DateTime<FixedOffset>>,
    /// Human-readable status message, usually set on failure.
    #[serde(default)]
    pub message: Option<String>,
    /// Owner of the task.
    #[serde(default)]
    pub owner: Option<String>,
    /// JSON schema reference.
    #[serde(default)]
    pub schema: Option<String>,
    /// Link to the task itself.
    #[serde(rename = "self", default)]
    pub self_link: Option<String>,
    /// Task input as submitted.
    #[serde(default)]
    pub input: Option<Value>,
    /// Task result (for example, the ID of an imported image).
    #[serde(default)]
    pub result: Option<Value>,
}

impl Pollable for ImageTask {
    fn is_finished(&self) -> bool {
        matches!(
            self.status,
            ImageTaskStatus::Success | ImageTaskStatus::Failure
        )
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TasksRoot {
    pub tasks: Vec<ImageTask>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskCreate<T> {
    #[serde(rename = "type")]
    pub task_type: ImageTaskType,
    pub input: T,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_task() {
        let task: ImageTask = serde_json::from_value(json!({
            "id": "fda1e29b-7e8f-4a4d-8a6c-d23ce0e9f3e5",
            "type": "import",
            "status": "pending",
            "created_at": "2014-02-26T17:27:39Z",
            "updated_at": "2014-02-26T17:27:39Z",
            "input": {
                "import_from": "images/ubuntu.vhd",
                "image_properties": {"name": "ubuntu"}
            },
            "self": "/v2/tasks/fda1e29b-7e8f-4a4d-8a6c-d23ce0e9f3e5",
            "schema": "/v2/schemas/task"
        }))
        .unwrap();
        assert_eq!(task.id.as_str(), "fda1e29b-7e8f-4a4d-8a6c-d23ce0e9f3e5");
        assert_eq!(task.task_type, ImageTaskType::Import);
        assert_eq!(task.status, ImageTaskStatus::Pending);
        assert_eq!(task.created_at.unwrap().timestamp(), 1393435659);
        assert!(task.expires_at.is_none());
        assert!(!task.is_finished());
    }

    #[test]
    fn test_finished() {
        for (status, finished) in [
            ("pending", false),
            ("processing", false),
            ("success", true),
            ("failure", true),
            ("archived", false),
        ] {
            let task: ImageTask = serde_json::from_value(json!({
                "id": "1",
                "type": "export",
                "status": status,
            }))
            .unwrap();
            assert_eq!(task.is_finished(), finished, "{}", status);
        }
    }

    #[test]
    fn test_import_input() {
        let input = ImportTaskInput::new("images/ubuntu.vhd", "ubuntu").unwrap();
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({
                "import_from": "images/ubuntu.vhd",
                "image_properties": {"name": "ubuntu"}
            })
        );

        let input = input.with_format("vhd");
        assert_eq!(
            serde_json::to_value(&input).unwrap()["import_from_format"],
            "vhd"
        );

        let err = ImportTaskInput::new("", "ubuntu").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
        let err = ImportTaskInput::new("images/ubuntu.vhd", "").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
    }

    #[test]
    fn test_export_input() {
        let input = ExportTaskInput::new(ImageId::new("abc"), "exports").unwrap();
        let body = TaskCreate {
            task_type: ImageTaskType::Export,
            input,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "type": "export",
                "input": {"image_uuid": "abc", "receiving_swift_container": "exports"}
            })
        );

        let err = ExportTaskInput::new(ImageId::new(""), "exports")
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
        let err = ExportTaskInput::new(ImageId::new("abc"), "").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
    }

    #[test]
    fn test_completion_default() {
        assert_eq!(
            CompletionOption::default(),
            CompletionOption::RequestCompleted
        );
    }
}
