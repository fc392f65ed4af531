// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job I/O seams.
//!
//! The orchestrator hands each job to the dispatcher as three boxed
//! endpoints: where the input comes from, where the output goes, and where
//! a failure is reported.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BoxError, JobError};

/// Source of a job's input value.
#[async_trait]
pub trait InputReader: Send {
    async fn read(&mut self) -> Result<Value, BoxError>;
}

/// Sink for a job's output value.
#[async_trait]
pub trait OutputWriter: Send {
    async fn write(&mut self, output: Value) -> Result<(), BoxError>;
}

/// Sink for a job's failure.
#[async_trait]
pub trait ErrorReporter: Send {
    async fn report(&mut self, error: JobError);
}

/// One unit of work in an execution batch.
pub struct Job {
    pub input: Box<dyn InputReader>,
    pub output: Box<dyn OutputWriter>,
    pub error: Box<dyn ErrorReporter>,
}

impl Job {
    pub fn new(
        input: impl InputReader + 'static,
        output: impl OutputWriter + 'static,
        error: impl ErrorReporter + 'static,
    ) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            error: Box::new(error),
        }
    }
}

// ============================================================================
// In-memory jobs
// ============================================================================

/// What happened to an in-memory job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The job has not finished yet.
    Pending,
    /// The handler's output was written.
    Output(Value),
    /// The job failed; holds the rendered error and its stage.
    Failed { stage: &'static str, message: String },
}

/// Shared view of an in-memory job's outcome.
#[derive(Debug, Clone)]
pub struct JobHandle(Arc<Mutex<JobOutcome>>);

impl JobHandle {
    pub fn outcome(&self) -> JobOutcome {
        self.0
            .lock()
            .map(|outcome| outcome.clone())
            .unwrap_or(JobOutcome::Pending)
    }

    fn set(&self, outcome: JobOutcome) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = outcome;
        }
    }
}

/// Job whose input is a fixed value and whose result is captured in memory.
pub struct MemoryJob;

impl MemoryJob {
    /// Build a job reading `input`, plus a handle to observe its outcome.
    pub fn create(input: Value) -> (Job, JobHandle) {
        let handle = JobHandle(Arc::new(Mutex::new(JobOutcome::Pending)));
        let job = Job::new(
            FixedInput(Some(input)),
            CapturedOutput(handle.clone()),
            CapturedError(handle.clone()),
        );
        (job, handle)
    }
}

struct FixedInput(Option<Value>);

#[async_trait]
impl InputReader for FixedInput {
    async fn read(&mut self) -> Result<Value, BoxError> {
        self.0.take().ok_or_else(|| "job input already consumed".into())
    }
}

struct CapturedOutput(JobHandle);

#[async_trait]
impl OutputWriter for CapturedOutput {
    async fn write(&mut self, output: Value) -> Result<(), BoxError> {
        self.0.set(JobOutcome::Output(output));
        Ok(())
    }
}

struct CapturedError(JobHandle);

#[async_trait]
impl ErrorReporter for CapturedError {
    async fn report(&mut self, error: JobError) {
        self.0.set(JobOutcome::Failed {
            stage: error.stage(),
            message: error.to_string(),
        });
    }
}
