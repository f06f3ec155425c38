use std::time::{Duration, Instant};

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{Severity, Step, StepContext, ValidationFinding};
use crate::error::StepError;
use crate::logging;

/// Collect configuration-time findings for `step`, logging each one.
///
/// Called once per configured step, before any execution.
pub fn configure<S: Step + ?Sized>(step: &S) -> Vec<ValidationFinding> {
    let findings = step.validate();
    for finding in &findings {
        match finding.severity {
            Severity::Warning => warn!(
                step = step.name(),
                property = finding.property,
                "{}",
                finding.message
            ),
            Severity::Error => error!(
                step = step.name(),
                property = finding.property,
                "{}",
                finding.message
            ),
        }
    }
    findings
}

/// Summary of one execution.
#[derive(Debug)]
pub struct StepReport {
    pub step: &'static str,
    pub run_id: Uuid,
    pub elapsed: Duration,
    /// Failure swallowed under continue-on-error.
    pub suppressed: Option<StepError>,
}

impl StepReport {
    pub fn succeeded(&self) -> bool {
        self.suppressed.is_none()
    }
}

/// Execute `step` and apply its outputs once the asynchronous phase resolves.
///
/// Outputs are written here, on the caller's task, never from the background
/// worker.
pub async fn run_step<S: Step + ?Sized>(
    step: &S,
    ctx: &StepContext,
    outputs: &mut S::Outputs,
) -> Result<StepReport, StepError> {
    let span = info_span!("step", step = step.name(), run_id = %ctx.run_id);
    let started = Instant::now();

    let pending = step.execute(ctx).instrument(span.clone()).await?;
    let suppressed = pending.apply(outputs);

    let report = StepReport {
        step: step.name(),
        run_id: ctx.run_id,
        elapsed: started.elapsed(),
        suppressed,
    };
    span.in_scope(|| {
        info!(
            elapsed_ms = logging::millis(report.elapsed),
            succeeded = report.succeeded(),
            "step finished"
        )
    });
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{settle, FaultPolicy, PendingOutputs};
    use async_trait::async_trait;

    struct Fixed {
        result: fn() -> Result<u32, StepError>,
        policy: FaultPolicy,
    }

    #[async_trait]
    impl Step for Fixed {
        type Outputs = Option<u32>;

        fn name(&self) -> &'static str {
            "fixed"
        }

        fn validate(&self) -> Vec<ValidationFinding> {
            vec![ValidationFinding::warning("result", "always warns")]
        }

        async fn execute(&self, _ctx: &StepContext) -> Result<PendingOutputs<Option<u32>>, StepError> {
            settle(self.name(), self.policy, (self.result)(), |out: &mut Option<u32>, v| {
                *out = Some(v)
            })
        }
    }

    #[test]
    fn configure_returns_findings() {
        let step = Fixed {
            result: || Ok(1),
            policy: FaultPolicy::Propagate,
        };
        let findings = configure(&step);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].property, "result");
    }

    #[tokio::test]
    async fn outputs_applied_after_execute() {
        let step = Fixed {
            result: || Ok(9),
            policy: FaultPolicy::Propagate,
        };
        let ctx = StepContext::new();
        let mut outputs = None;

        let report = run_step(&step, &ctx, &mut outputs).await.unwrap();
        assert!(report.succeeded());
        assert_eq!(report.run_id, ctx.run_id);
        assert_eq!(outputs, Some(9));
    }

    #[tokio::test]
    async fn suppressed_failure_is_reported() {
        let step = Fixed {
            result: || Err(StepError::MissingEncoding),
            policy: FaultPolicy::ContinueOnError,
        };
        let mut outputs = Some(4);

        let report = run_step(&step, &StepContext::new(), &mut outputs).await.unwrap();
        assert!(!report.succeeded());
        assert!(matches!(report.suppressed, Some(StepError::MissingEncoding)));
        assert_eq!(outputs, None);
    }

    #[tokio::test]
    async fn propagated_failure_leaves_outputs_untouched() {
        let step = Fixed {
            result: || Err(StepError::MissingEncoding),
            policy: FaultPolicy::Propagate,
        };
        let mut outputs = Some(4);

        let err = run_step(&step, &StepContext::new(), &mut outputs).await.unwrap_err();
        assert!(matches!(err, StepError::MissingEncoding));
        assert_eq!(outputs, Some(4));
    }
}
