//! Per-call cancellation
//!
//! A [`Context`] travels with every crypto call. The background context
//! never fires; [`Context::with_cancel`] hands back a [`CancelHandle`]
//! that fires the context and every clone of it.

use tokio::sync::watch;

/// Cancellation signal observed by a call while it is outstanding
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
}

/// Fires the context it was created with
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace succeeds even when no receiver is alive
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that is never canceled
    pub fn background() -> Self {
        Self::default()
    }

    /// A cancelable context, paired with the handle that fires it
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel: Some(rx) }, CancelHandle { tx })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context fires; pending forever otherwise
    pub async fn cancelled(&self) {
        let Some(rx) = self.cancel.as_ref() else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // handle dropped without firing
            std::future::pending::<()>().await;
        }
    }
}
