//! Cross-task shutdown signalling for the accept loop.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// A cloneable handle that stops a running [`Server`](super::Server).
///
/// The server's running flag lives in a `watch` channel; flipping it wakes an
/// accept that is waiting for a client. A request already being served is
/// finished first.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub(crate) fn new(running: Arc<watch::Sender<bool>>) -> Self {
        Self { running }
    }

    /// Asks the server to stop. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if self.running.send_replace(false) {
            info!("shutdown requested");
        }
    }

    /// Returns `true` until shutdown has been requested.
    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_is_idempotent() {
        let (tx, _) = watch::channel(true);
        let handle = ShutdownHandle::new(Arc::new(tx));
        let other = handle.clone();

        assert!(handle.is_running());
        handle.shutdown();
        other.shutdown();
        assert!(!handle.is_running());
        assert!(!other.is_running());
    }
}
