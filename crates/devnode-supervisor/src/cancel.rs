//! Group cancellation over a watch channel.

use std::sync::Arc;

use tokio::sync::watch;

/// Owner side of a cancellation group.
///
/// Cloning shares the same group; cancelling any clone cancels every token
/// handed out by any clone. Cancellation is idempotent and never unset.
#[derive(Debug, Clone)]
pub struct CancelGroup {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelGroup {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Cancel the group, waking every pending [`CancelToken::cancelled`].
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// A token observing this group.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer side of a cancellation group, handed to workers.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the group is cancelled. If every [`CancelGroup`] handle
    /// is dropped the group can never fire, which also counts as
    /// cancellation so workers are not stranded.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
