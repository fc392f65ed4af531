// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Batch dispatch through custom job endpoints.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pipewright_component::{
    BoxError, Component, ComponentDefinition, DefinitionLoader, ErrorReporter, InputReader, Job,
    JobError, OutputWriter, TaskBinding, TaskError, TaskFuture,
};
use serde_json::{Value, json};

const DEFINITION: &str = r#"{
    "id": "greeter",
    "uid": "0f5c1a9e-0000-4000-8000-000000000003",
    "title": "Greeter",
    "availableTasks": ["TASK_GREET"]
}"#;

const TASKS: &str = r##"{
    "TASK_GREET": {
        "input": {
            "type": "object",
            "properties": {
                "name": {"type": "string", "upstreamTypes": ["value", "reference"]},
                "options": {
                    "type": "object",
                    "properties": {
                        "greeting": {"$ref": "#/$defs/greeting"}
                    }
                }
            }
        }
    },
    "$defs": {
        "greeting": {"type": "string", "default": "Hello", "upstreamTypes": ["value"]}
    }
}"##;

static GREETER: Lazy<ComponentDefinition> =
    Lazy::new(|| DefinitionLoader::new(DEFINITION, TASKS).load().unwrap());

fn greet<'a>(_client: &'a (), input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let name = input["name"]
            .as_str()
            .ok_or_else(|| TaskError::InvalidInput("name is required".to_string()))?;
        let greeting = input["options"]["greeting"].as_str().unwrap_or_default();
        Ok(json!({ "message": format!("{greeting}, {name}!") }))
    })
}

static TASK_TABLE: &[TaskBinding<()>] = &[TaskBinding {
    task: "TASK_GREET",
    handler: greet,
}];

/// Shared log of what every endpoint saw.
#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

enum Input {
    Value(Value),
    Broken,
}

struct Reader(Option<Input>);

#[async_trait]
impl InputReader for Reader {
    async fn read(&mut self) -> Result<Value, BoxError> {
        match self.0.take() {
            Some(Input::Value(value)) => Ok(value),
            _ => Err("input stream closed".into()),
        }
    }
}

struct Writer {
    log: Log,
    fail: bool,
}

#[async_trait]
impl OutputWriter for Writer {
    async fn write(&mut self, output: Value) -> Result<(), BoxError> {
        if self.fail {
            return Err("output sink full".into());
        }
        self.log.push(format!("output {output}"));
        Ok(())
    }
}

struct Reporter(Log);

#[async_trait]
impl ErrorReporter for Reporter {
    async fn report(&mut self, error: JobError) {
        self.0.push(format!("error[{}] {error}", error.stage()));
    }
}

fn job(log: &Log, input: Input, fail_write: bool) -> Job {
    Job::new(
        Reader(Some(input)),
        Writer {
            log: log.clone(),
            fail: fail_write,
        },
        Reporter(log.clone()),
    )
}

#[tokio::test]
async fn test_batch_isolates_failures_at_every_stage() {
    let component = Component::new(&GREETER, TASK_TABLE);
    let execution = component.create_execution("TASK_GREET", ()).unwrap();
    let log = Log::default();

    let jobs = vec![
        job(&log, Input::Value(json!({"name": "Ada"})), false),
        job(&log, Input::Broken, false),
        job(&log, Input::Value(json!([1, 2])), false),
        job(&log, Input::Value(json!({})), false),
        job(&log, Input::Value(json!({"name": "Lin"})), true),
        job(
            &log,
            Input::Value(json!({"name": "Grace", "options": {"greeting": "Hi"}})),
            false,
        ),
    ];
    execution.execute(jobs).await;

    assert_eq!(
        log.entries(),
        vec![
            r#"output {"message":"Hello, Ada!"}"#.to_string(),
            "error[read] failed to read job input: input stream closed".to_string(),
            "error[defaults] failed to fill default values: expected an object input, got array"
                .to_string(),
            "error[handler] invalid task input: name is required".to_string(),
            "error[write] failed to write job output: output sink full".to_string(),
            r#"output {"message":"Hi, Grace!"}"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let component = Component::new(&GREETER, TASK_TABLE);
    let execution = component.create_execution("TASK_GREET", ()).unwrap();
    execution.execute(Vec::new()).await;
    assert_eq!(execution.task(), "TASK_GREET");
}

#[test]
fn test_unbound_task_is_rejected() {
    let component = Component::new(&GREETER, TASK_TABLE);
    let err = component.create_execution("TASK_WAVE", ()).err().unwrap();
    assert_eq!(err.error_code(), "UNSUPPORTED_TASK");
    assert_eq!(err.to_string(), "not supported task: TASK_WAVE");
}
