//! Per-request context: trace id and deadline.
//!
//! Every coordinator operation takes a `&RequestContext` explicitly. The
//! trace id is attached to the operation's span, and the deadline bounds
//! each cache and credential-store call made on the request's behalf.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::AuthError;
use crate::error::Fault;
use crate::token;

/// Trace id and optional deadline for one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: String,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context carrying the caller's trace id and no deadline.
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            deadline: None,
        }
    }

    /// A context with a freshly generated trace id, for callers that have
    /// none to propagate (background jobs, tests, the demo binary).
    pub fn generated() -> Self {
        Self::new(token::trace_id())
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The span every coordinator operation runs in.
    pub fn span(&self, op: &'static str) -> tracing::Span {
        tracing::info_span!("auth", op, trace_id = %self.trace_id)
    }

    /// Runs one external call under the request deadline.
    ///
    /// Without a caller deadline, `fallback` from now applies. A call that
    /// misses the deadline fails with [`Fault::DeadlineExceeded`]; any other
    /// failure is wrapped with `step`.
    pub(crate) async fn call<T, E, F>(
        &self,
        step: &'static str,
        fallback: Duration,
        fut: F,
    ) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<Fault>,
    {
        let deadline = self.deadline.unwrap_or_else(|| Instant::now() + fallback);
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AuthError::internal(step, e)),
            Err(_) => {
                tracing::warn!(step, "call missed its deadline");
                Err(AuthError::internal(step, Fault::DeadlineExceeded))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use authgate_cache::CacheError;

    const FALLBACK: Duration = Duration::from_secs(2);

    #[test]
    fn test_generated_has_hex_trace_id() {
        let ctx = RequestContext::generated();
        assert_eq!(ctx.trace_id().len(), 16);
        assert!(ctx.trace_id().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(ctx.deadline().is_none());
    }

    #[tokio::test]
    async fn test_call_passes_value_through() {
        let ctx = RequestContext::new("t-1");

        let value = ctx
            .call("noop", FALLBACK, async { Ok::<_, CacheError>(7) })
            .await
            .unwrap();

        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_call_wraps_error_with_step() {
        let ctx = RequestContext::new("t-1");

        let err = ctx
            .call("store tokens", FALLBACK, async {
                Err::<(), _>(CacheError::Unavailable("refused".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Internal { step: "store tokens", .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_past_deadline_is_unavailable() {
        let ctx = RequestContext::new("t-1").with_timeout(Duration::from_millis(50));

        let err = ctx
            .call("slow", FALLBACK, async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, CacheError>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuthError::Internal { source: Fault::DeadlineExceeded, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_without_deadline_uses_fallback() {
        let ctx = RequestContext::new("t-1");

        let result = ctx
            .call("slow", Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, CacheError>(())
            })
            .await;

        assert!(result.is_err());
    }
}
