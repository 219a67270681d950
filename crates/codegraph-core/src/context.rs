use crate::{EngineError, Result};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Carries the caller-provided cancellation signal and per-request deadline
/// through the resolver, pattern executor, and assembler (spec §5
/// "Cancellation"/"Timeouts" — "the resolver, executor, and assembler all
/// honour it").
///
/// Cheap to clone: the cancellation token is reference-counted and the
/// deadline is a plain `Instant`. `check()` is the single call site every
/// suspension point and pattern step uses; it favours `Cancelled` over
/// `Timeout` when both would apply, since cancellation is the more specific
/// signal.
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl RetrievalContext {
    /// No cancellation, no deadline. Used by call sites (and most tests)
    /// that don't exercise §5's cooperative cancellation.
    pub fn none() -> Self {
        Self { cancellation: CancellationToken::new(), deadline: None }
    }

    /// A fresh cancellation token and a deadline `budget_ms` from now.
    pub fn with_timeout(cancellation: CancellationToken, budget_ms: u64) -> Self {
        Self {
            cancellation,
            deadline: Some(Instant::now() + Duration::from_millis(budget_ms)),
        }
    }

    /// The token a caller can hold onto to cancel this retrieval from
    /// outside (spec §5 "retrieval accepts a caller-provided cancellation
    /// signal").
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Returns `Cancelled` if the token has fired, `Timeout` if the
    /// deadline has elapsed, `Ok(())` otherwise. Call at every suspension
    /// point (before an `Embedder`/store call) and before each pattern step.
    pub fn check(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(EngineError::Timeout);
            }
        }
        Ok(())
    }
}

impl Default for RetrievalContext {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_fails() {
        let ctx = RetrievalContext::none();
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn cancellation_token_firing_is_observed() {
        let ctx = RetrievalContext::none();
        let token = ctx.cancellation_token();
        token.cancel();
        assert!(matches!(ctx.check(), Err(EngineError::Cancelled)));
    }

    #[test]
    fn elapsed_deadline_yields_timeout() {
        let ctx = RetrievalContext::with_timeout(CancellationToken::new(), 0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(ctx.check(), Err(EngineError::Timeout)));
    }

    #[test]
    fn cancellation_takes_priority_over_timeout() {
        let ctx = RetrievalContext::with_timeout(CancellationToken::new(), 0);
        ctx.cancellation_token().cancel();
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(ctx.check(), Err(EngineError::Cancelled)));
    }
}
