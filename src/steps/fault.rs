use tracing::{error, warn};

use super::PendingOutputs;
use crate::error::{error_chain, StepError};

/// What a step does with a failure once it has been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Return the failure to the host.
    #[default]
    Propagate,
    /// Complete with absent outputs and report the failure alongside them.
    ContinueOnError,
}

impl FaultPolicy {
    pub fn from_flag(continue_on_error: bool) -> Self {
        if continue_on_error {
            FaultPolicy::ContinueOnError
        } else {
            FaultPolicy::Propagate
        }
    }
}

/// Turn the result of a step's work into pending outputs.
///
/// Every failure is logged with its full source chain before the policy
/// decides whether it propagates.
pub fn settle<O, T>(
    step: &'static str,
    policy: FaultPolicy,
    result: Result<T, StepError>,
    assign: impl FnOnce(&mut O, T) + Send + 'static,
) -> Result<PendingOutputs<O>, StepError>
where
    O: Default + 'static,
    T: Send + 'static,
{
    match result {
        Ok(value) => Ok(PendingOutputs::assign(move |outputs| assign(outputs, value))),
        Err(err) => {
            error!(step, error = %error_chain(&err), "step failed");
            match policy {
                FaultPolicy::Propagate => Err(err),
                FaultPolicy::ContinueOnError => {
                    warn!(step, "continuing after failure; outputs left unset");
                    Ok(PendingOutputs::suppressed(err))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(out: &mut Option<String>, value: String) {
        *out = Some(value);
    }

    #[test]
    fn success_assigns_value() {
        let pending = settle("t", FaultPolicy::Propagate, Ok("done".to_string()), set).unwrap();
        let mut out = None;
        assert!(pending.apply(&mut out).is_none());
        assert_eq!(out.as_deref(), Some("done"));
    }

    #[test]
    fn propagate_returns_error() {
        let result: Result<String, _> = Err(StepError::MissingInput("path"));
        let err = settle("t", FaultPolicy::Propagate, result, set).unwrap_err();
        assert!(matches!(err, StepError::MissingInput("path")));
    }

    #[test]
    fn continue_on_error_suppresses() {
        let result: Result<String, _> = Err(StepError::MissingInput("path"));
        let pending = settle("t", FaultPolicy::ContinueOnError, result, set).unwrap();
        let mut out = Some("stale".to_string());
        let err = pending.apply(&mut out);
        assert!(matches!(err, Some(StepError::MissingInput("path"))));
        assert_eq!(out, None);
    }

    #[test]
    fn failures_are_logged_under_both_policies() {
        use std::sync::{Arc, Mutex};

        for policy in [FaultPolicy::Propagate, FaultPolicy::ContinueOnError] {
            let buf = Arc::new(Mutex::new(Vec::<u8>::new()));
            let sink = Arc::clone(&buf);
            let subscriber = tracing_subscriber::fmt()
                .with_ansi(false)
                .with_writer(move || SharedBuf(Arc::clone(&sink)))
                .finish();

            tracing::subscriber::with_default(subscriber, || {
                let result: Result<String, _> = Err(StepError::MissingInput("path"));
                let _ = settle("logged", policy, result, set);
            });

            let logs = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
            assert!(logs.contains("ERROR"), "{policy:?}: {logs}");
            assert!(logs.contains("required input 'path' is missing"), "{policy:?}: {logs}");
        }
    }

    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn flag_maps_to_policy() {
        assert_eq!(FaultPolicy::from_flag(false), FaultPolicy::Propagate);
        assert_eq!(FaultPolicy::from_flag(true), FaultPolicy::ContinueOnError);
    }
}
