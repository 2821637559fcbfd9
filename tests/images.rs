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

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oscloud::images::{
    CompletionOption, ExportTaskInput, ImageId, ImageTaskId, ImageTaskStatus, ImagesClient,
    ImportTaskInput,
};
use oscloud::services::{ServiceType, IMAGE};
use oscloud::{BackoffPolicy, ErrorKind, NoAuth, Session};

async fn setup(intervals: Vec<Duration>) -> (MockServer, ImagesClient) {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = MockServer::start().await;
    let endpoint = format!("{}/v2", server.uri()).parse().unwrap();
    let session = Session::new(NoAuth::new_without_endpoint()).with_endpoint_override(
        IMAGE.override_key(),
        endpoint,
    );
    let client = ImagesClient::new(session).with_backoff_policy(BackoffPolicy::new(intervals));
    (server, client)
}

fn task(id: &str, task_type: &str, status: &str) -> Value {
    json!({
        "id": id,
        "type": task_type,
        "status": status,
        "created_at": "2014-02-26T17:27:39Z",
        "updated_at": "2014-02-26T17:27:39Z",
        "owner": "1234",
        "self": format!("/v2/tasks/{}", id),
        "schema": "/v2/schemas/task"
    })
}

#[tokio::test]
async fn test_list_tasks() {
    let (server, client) = setup(Vec::new()).await;

    Mock::given(method("GET"))
        .and(path("/v2/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [task("t1", "import", "success"), task("t2", "export", "failure")]
        })))
        .mount(&server)
        .await;

    let tasks = client.list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].status, ImageTaskStatus::Success);
    assert_eq!(tasks[1].self_link.as_deref(), Some("/v2/tasks/t2"));
}

#[tokio::test]
async fn test_import_and_wait() {
    let (server, client) = setup(vec![
        Duration::ZERO,
        Duration::from_millis(10),
        Duration::from_millis(10),
        Duration::from_millis(10),
    ])
    .await;

    Mock::given(method("POST"))
        .and(path("/v2/tasks"))
        .and(body_partial_json(json!({
            "type": "import",
            "input": {
                "import_from": "images/ubuntu.vhd",
                "image_properties": {"name": "ubuntu"}
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(task("t1", "import", "pending")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/tasks/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("t1", "import", "processing")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/tasks/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("t1", "import", "success")))
        .mount(&server)
        .await;

    let input = ImportTaskInput::new("images/ubuntu.vhd", "ubuntu").unwrap();
    let mut seen = Vec::new();
    let result = client
        .import_image(&input, CompletionOption::RequestCompleted, |task| {
            seen.push(task.status.clone())
        })
        .await
        .unwrap();
    assert_eq!(result.status, ImageTaskStatus::Success);
    assert_eq!(
        seen,
        vec![
            ImageTaskStatus::Processing,
            ImageTaskStatus::Processing,
            ImageTaskStatus::Success
        ]
    );
}

#[tokio::test]
async fn test_export_submitted() {
    let (server, client) = setup(vec![Duration::ZERO]).await;

    Mock::given(method("POST"))
        .and(path("/v2/tasks"))
        .and(body_partial_json(json!({
            "type": "export",
            "input": {"image_uuid": "abc", "receiving_swift_container": "exports"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(task("t2", "export", "pending")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let input = ExportTaskInput::new(ImageId::new("abc"), "exports").unwrap();
    let mut calls = 0;
    let result = client
        .export_image(&input, CompletionOption::RequestSubmitted, |_| calls += 1)
        .await
        .unwrap();
    assert_eq!(result.status, ImageTaskStatus::Pending);
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn test_wait_exhausted() {
    let (server, client) = setup(vec![Duration::ZERO; 3]).await;

    Mock::given(method("GET"))
        .and(path("/v2/tasks/t3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("t3", "import", "pending")))
        .expect(3)
        .mount(&server)
        .await;

    let mut calls = 0;
    let err = client
        .wait_for_task(&ImageTaskId::new("t3"), |_| calls += 1)
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(calls, 3);
}

#[tokio::test]
async fn test_wait_failure_is_final() {
    let (server, client) = setup(vec![Duration::ZERO; 5]).await;

    Mock::given(method("GET"))
        .and(path("/v2/tasks/t4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t4",
            "type": "import",
            "status": "failure",
            "message": "Image file not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .wait_for_task(&ImageTaskId::new("t4"), |_| ())
        .await
        .unwrap();
    assert_eq!(result.status, ImageTaskStatus::Failure);
    assert_eq!(result.message.as_deref(), Some("Image file not found"));
}

#[tokio::test]
async fn test_wait_wrong_task() {
    let (server, client) = setup(vec![Duration::ZERO; 2]).await;

    Mock::given(method("GET"))
        .and(path("/v2/tasks/t5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("t6", "import", "success")))
        .mount(&server)
        .await;

    let err = client
        .wait_for_task(&ImageTaskId::new("t5"), |_| ())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidResponse);
}
