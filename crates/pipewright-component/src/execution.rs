// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task dispatch.
//!
//! A connector declares a static table of [`TaskBinding`]s. Creating an
//! [`Execution`] picks the binding for the requested task and pairs it with
//! a vendor client owned by that execution alone; running the execution
//! processes a batch of jobs one at a time.

use std::future::Future;
use std::pin::Pin;

use pipewright_schema::SchemaNode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::defaults::fill_defaults;
use crate::definition::ComponentDefinition;
use crate::error::{JobError, TaskError};
use crate::job::Job;

/// Boxed future returned by task handlers.
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, TaskError>> + Send + 'a>>;

/// Handler function: vendor client and defaulted input to output.
pub type TaskHandler<C> = for<'a> fn(&'a C, Value) -> TaskFuture<'a>;

/// Binding of a task identifier to its handler.
pub struct TaskBinding<C: 'static> {
    pub task: &'static str,
    pub handler: TaskHandler<C>,
}

/// A loaded definition paired with the connector's task table.
pub struct Component<C: 'static> {
    definition: &'static ComponentDefinition,
    tasks: &'static [TaskBinding<C>],
    supports_oauth: bool,
}

impl<C: Send + Sync + 'static> Component<C> {
    pub fn new(definition: &'static ComponentDefinition, tasks: &'static [TaskBinding<C>]) -> Self {
        Self {
            definition,
            tasks,
            supports_oauth: false,
        }
    }

    /// Mark the component as supporting OAuth connections.
    pub fn with_oauth(mut self) -> Self {
        self.supports_oauth = true;
        self
    }

    pub fn definition(&self) -> &'static ComponentDefinition {
        self.definition
    }

    pub fn supports_oauth(&self) -> bool {
        self.supports_oauth
    }

    /// The handler bound to `task`.
    pub fn binding(&self, task: &str) -> Result<&'static TaskBinding<C>, TaskError> {
        let tasks: &'static [TaskBinding<C>] = self.tasks;
        tasks
            .iter()
            .find(|binding| binding.task == task)
            .ok_or_else(|| TaskError::UnsupportedTask {
                task: task.to_string(),
            })
    }

    /// Bind `task` to its handler and `client`.
    ///
    /// Fails before any job runs when no handler is bound to `task`.
    pub fn create_execution(&self, task: &str, client: C) -> Result<Execution<C>, TaskError> {
        let binding = self.binding(task)?;

        Ok(Execution {
            task: binding.task,
            client,
            handler: binding.handler,
            input_schema: self.definition.task_input_schema(task),
        })
    }
}

/// A task bound to a handler and a client, ready to run jobs.
pub struct Execution<C: 'static> {
    task: &'static str,
    client: C,
    handler: TaskHandler<C>,
    input_schema: Option<&'static SchemaNode>,
}

impl<C: Send + Sync + 'static> Execution<C> {
    pub fn task(&self) -> &'static str {
        self.task
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run `jobs` strictly in order.
    ///
    /// Each job is read, defaulted, handled and written. A failure at any
    /// step is reported to that job's error sink and the batch moves on.
    pub async fn execute(&self, jobs: Vec<Job>) {
        let total = jobs.len();
        for (index, mut job) in jobs.into_iter().enumerate() {
            match self.process(&mut job).await {
                Ok(()) => debug!(task = self.task, job = index, total, "Job completed"),
                Err(err) => {
                    warn!(
                        task = self.task,
                        job = index,
                        stage = err.stage(),
                        error = %err,
                        "Job failed"
                    );
                    job.error.report(err).await;
                }
            }
        }
    }

    async fn process(&self, job: &mut Job) -> Result<(), JobError> {
        let mut input = job.input.read().await.map_err(JobError::Read)?;
        if let Some(schema) = self.input_schema {
            fill_defaults(schema, &mut input)?;
        }
        let output = (self.handler)(&self.client, input).await?;
        job.output.write(output).await.map_err(JobError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobOutcome, MemoryJob};
    use crate::loader::DefinitionLoader;
    use once_cell::sync::Lazy;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DEFINITION: &str = r#"{
        "id": "math",
        "uid": "0f5c1a9e-0000-4000-8000-000000000001",
        "title": "Math",
        "availableTasks": ["TASK_DOUBLE", "TASK_FAIL"]
    }"#;

    const TASKS: &str = r#"{
        "TASK_DOUBLE": {
            "input": {
                "type": "object",
                "properties": {
                    "n": {"type": "integer", "upstreamTypes": ["value"]},
                    "factor": {"type": "integer", "default": 2, "upstreamTypes": ["value"]}
                }
            }
        },
        "TASK_FAIL": {"input": {"type": "object"}}
    }"#;

    static DEFINITION_CELL: Lazy<ComponentDefinition> = Lazy::new(|| {
        DefinitionLoader::new(DEFINITION, TASKS).load().unwrap()
    });

    struct Counter {
        calls: AtomicUsize,
    }

    fn double<'a>(client: &'a Counter, input: Value) -> TaskFuture<'a> {
        Box::pin(async move {
            client.calls.fetch_add(1, Ordering::SeqCst);
            let n = input["n"]
                .as_i64()
                .ok_or_else(|| TaskError::InvalidInput("n must be an integer".to_string()))?;
            let factor = input["factor"].as_i64().unwrap_or(1);
            Ok(json!({"result": n * factor}))
        })
    }

    fn fail<'a>(_client: &'a Counter, _input: Value) -> TaskFuture<'a> {
        Box::pin(async move { Err(TaskError::InvalidInput("always fails".to_string())) })
    }

    static TASK_TABLE: &[TaskBinding<Counter>] = &[
        TaskBinding {
            task: "TASK_DOUBLE",
            handler: double,
        },
        TaskBinding {
            task: "TASK_FAIL",
            handler: fail,
        },
    ];

    fn component() -> Component<Counter> {
        Component::new(&DEFINITION_CELL, TASK_TABLE)
    }

    fn counter() -> Counter {
        Counter {
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_unknown_task_fails_at_creation() {
        let err = component()
            .create_execution("TASK_TRIPLE", counter())
            .err()
            .unwrap();
        assert_eq!(err.user_message(), "TASK_TRIPLE task is not supported.");

        let component = component();
        assert_eq!(component.binding("TASK_DOUBLE").unwrap().task, "TASK_DOUBLE");
        assert_eq!(
            component.binding("TASK_TRIPLE").err().unwrap().error_code(),
            "UNSUPPORTED_TASK"
        );
    }

    #[tokio::test]
    async fn test_failing_job_does_not_affect_others() {
        let execution = component().create_execution("TASK_DOUBLE", counter()).unwrap();

        let (first, first_handle) = MemoryJob::create(json!({"n": 1}));
        let (second, second_handle) = MemoryJob::create(json!({"n": "two"}));
        let (third, third_handle) = MemoryJob::create(json!({"n": 3, "factor": 10}));

        execution.execute(vec![first, second, third]).await;

        assert_eq!(first_handle.outcome(), JobOutcome::Output(json!({"result": 2})));
        assert!(matches!(
            second_handle.outcome(),
            JobOutcome::Failed { stage: "handler", .. }
        ));
        assert_eq!(third_handle.outcome(), JobOutcome::Output(json!({"result": 30})));
        assert_eq!(execution.client().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_defaults_failure_is_isolated() {
        let execution = component().create_execution("TASK_DOUBLE", counter()).unwrap();

        let (bad, bad_handle) = MemoryJob::create(json!("not an object"));
        let (good, good_handle) = MemoryJob::create(json!({"n": 4}));
        execution.execute(vec![bad, good]).await;

        assert!(matches!(
            bad_handle.outcome(),
            JobOutcome::Failed { stage: "defaults", .. }
        ));
        assert_eq!(good_handle.outcome(), JobOutcome::Output(json!({"result": 8})));
        assert_eq!(execution.client().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_every_job_fails_independently() {
        let execution = component().create_execution("TASK_FAIL", counter()).unwrap();
        assert_eq!(execution.task(), "TASK_FAIL");

        let (jobs, handles): (Vec<_>, Vec<_>) =
            (0..3).map(|_| MemoryJob::create(json!({}))).unzip();
        execution.execute(jobs).await;

        for handle in handles {
            match handle.outcome() {
                JobOutcome::Failed { stage, message } => {
                    assert_eq!(stage, "handler");
                    assert_eq!(message, "invalid task input: always fails");
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }

    #[test]
    fn test_oauth_flag() {
        assert!(!component().supports_oauth());
        assert!(component().with_oauth().supports_oauth());
    }
}
