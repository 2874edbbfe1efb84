//! Cancellation signals.
//!
//! An [`AbortController`] owns the right to cancel; the [`AbortSignal`] it
//! hands out is stored in request options and observed by the transport.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Observable side of a cancellation.
///
/// Cloning shares the same underlying signal. Two signals are equal when they
/// are the same signal.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: Arc<CancellationToken>,
}

impl AbortSignal {
    /// A fresh, not yet aborted signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that is already aborted.
    #[must_use]
    pub fn aborted() -> Self {
        let signal = Self::new();
        signal.token.cancel();
        signal
    }

    /// Whether the signal has fired.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the signal fires.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

impl PartialEq for AbortSignal {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.token, &other.token)
    }
}

impl Eq for AbortSignal {}

/// Owner of an [`AbortSignal`].
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// New controller with a fresh signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The signal to attach to requests.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Fire the signal. Pending and future requests carrying it fail.
    pub fn abort(&self) {
        tracing::debug!("abort signal fired");
        self.signal.token.cancel();
    }
}

impl From<&AbortController> for AbortSignal {
    fn from(controller: &AbortController) -> Self {
        controller.signal()
    }
}

impl From<AbortController> for AbortSignal {
    fn from(controller: AbortController) -> Self {
        controller.signal
    }
}

impl From<&AbortController> for Option<AbortSignal> {
    fn from(controller: &AbortController) -> Self {
        Some(controller.signal())
    }
}

impl From<AbortController> for Option<AbortSignal> {
    fn from(controller: AbortController) -> Self {
        Some(controller.signal)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert2::check;

    use super::*;

    #[test]
    fn controller_signal_is_shared() {
        let controller = AbortController::new();
        let signal = controller.signal();

        check!(!signal.is_aborted());
        controller.abort();
        check!(signal.is_aborted());
        check!(AbortSignal::from(&controller) == signal);
    }

    #[test]
    fn distinct_signals_are_not_equal() {
        check!(AbortSignal::new() != AbortSignal::new());
        check!(AbortSignal::aborted().is_aborted());
    }

    #[tokio::test]
    async fn cancelled_completes_after_abort() {
        let controller = AbortController::new();
        let signal = controller.signal();

        let waiter = tokio::spawn(async move { signal.cancelled().await });
        controller.abort();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        check!(result.is_ok());
    }
}
