use tracing::debug;

use super::StepContext;
use crate::error::StepError;

/// Run `work` on the blocking pool and wait for it.
///
/// Cancellation is observed once, before dispatch. Work that has started runs
/// to completion or failure.
pub async fn dispatch_blocking<T, F>(ctx: &StepContext, work: F) -> Result<T, StepError>
where
    F: FnOnce() -> Result<T, StepError> + Send + 'static,
    T: Send + 'static,
{
    if ctx.is_cancelled() {
        return Err(StepError::Cancelled);
    }

    debug!(run_id = %ctx.run_id, "dispatching blocking work");
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StepError::Background(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_work_result() {
        let ctx = StepContext::new();
        let value = dispatch_blocking(&ctx, || Ok(41 + 1)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn cancelled_context_never_dispatches() {
        let ctx = StepContext::new();
        ctx.cancellation.cancel();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let err = dispatch_blocking(&ctx, move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, StepError::Cancelled));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panicking_work_becomes_background_error() {
        let ctx = StepContext::new();
        let err = dispatch_blocking::<(), _>(&ctx, || panic!("boom"))
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Background(_)));
    }
}
