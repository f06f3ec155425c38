//! Workflow steps and the contract the host drives them through.
//!
//! A host first calls [`runner::configure`] once per step to collect
//! configuration-time findings, then [`runner::run_step`] per execution. The
//! step does its blocking work on a background worker ([`dispatch`]), routes
//! any failure through its [`fault::FaultPolicy`], and hands back
//! [`PendingOutputs`] that the runner applies after the future resolves.

pub mod database;
pub mod dispatch;
pub mod fault;
pub mod file_cipher;
pub mod runner;

pub use database::{ConnectionOutputs, DatabaseConnect, DatabaseTransaction};
pub use dispatch::dispatch_blocking;
pub use fault::{settle, FaultPolicy};
pub use file_cipher::{CipherDirection, FileCipherStep, FileOutputs};
pub use runner::{configure, run_step, StepReport};

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::StepError;

// ============================================================================
// Step contract
// ============================================================================

/// A unit of work the host schedules.
#[async_trait]
pub trait Step: Send + Sync {
    /// Caller-visible outputs, reset to `Default` when a failure is suppressed.
    type Outputs: Default + Send + 'static;

    /// Stable identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Configuration-time checks. Findings never block execution.
    fn validate(&self) -> Vec<ValidationFinding> {
        Vec::new()
    }

    /// Run the step. Outputs are returned as a pending mutation rather than
    /// written in place.
    async fn execute(&self, ctx: &StepContext)
        -> Result<PendingOutputs<Self::Outputs>, StepError>;
}

/// Per-execution context handed to [`Step::execute`].
#[derive(Debug, Clone)]
pub struct StepContext {
    pub run_id: Uuid,
    pub cancellation: CancellationToken,
}

impl StepContext {
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            cancellation,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Default for StepContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Validation findings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Message surfaced to the host at configuration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFinding {
    pub message: String,
    pub severity: Severity,
    /// Name of the offending input.
    pub property: &'static str,
}

impl ValidationFinding {
    pub fn warning(property: &'static str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
            property,
        }
    }
}

// ============================================================================
// Deferred outputs
// ============================================================================

/// Output mutation produced by the asynchronous phase, applied exactly once.
pub struct PendingOutputs<O> {
    apply: Box<dyn FnOnce(&mut O) + Send>,
    error: Option<StepError>,
}

impl<O: 'static> PendingOutputs<O> {
    /// Outputs from a successful run.
    pub fn assign(apply: impl FnOnce(&mut O) + Send + 'static) -> Self {
        Self {
            apply: Box::new(apply),
            error: None,
        }
    }

    /// A suppressed failure: outputs are reset to their absent state.
    pub fn suppressed(error: StepError) -> Self
    where
        O: Default,
    {
        Self {
            apply: Box::new(|outputs: &mut O| *outputs = O::default()),
            error: Some(error),
        }
    }
}

impl<O> PendingOutputs<O> {
    /// The suppressed failure, if any.
    pub fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    /// Write outputs and hand back the suppressed failure.
    pub fn apply(self, outputs: &mut O) -> Option<StepError> {
        (self.apply)(outputs);
        self.error
    }
}

impl<O> fmt::Debug for PendingOutputs<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOutputs")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
