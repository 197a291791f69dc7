use std::{future::Future, time::Duration};

use tokio::sync::watch;

/// Cancellation seen by one loop: the caller's shutdown signal plus the
/// session's internal halt, raised once the match has ended.
#[derive(Clone)]
pub(crate) struct StopSignal {
    shutdown: watch::Receiver<bool>,
    halt: watch::Receiver<bool>,
}

impl StopSignal {
    pub(crate) fn new(shutdown: watch::Receiver<bool>, halt: watch::Receiver<bool>) -> Self {
        Self { shutdown, halt }
    }

    pub(crate) fn raised(&self) -> bool {
        *self.shutdown.borrow() || *self.halt.borrow()
    }

    /// Drives `fut` to completion unless stopped first; `None` means the
    /// future was abandoned.
    pub(crate) async fn guard<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        if self.raised() {
            return None;
        }
        tokio::select! {
            output = fut => Some(output),
            _ = wait_raised(&mut self.shutdown) => None,
            _ = wait_raised(&mut self.halt) => None,
        }
    }

    /// Sleeps for `duration` unless stopped first. Returns `false` when the
    /// loop should exit.
    pub(crate) async fn sleep(&mut self, duration: Duration) -> bool {
        self.guard(tokio::time::sleep(duration)).await.is_some() && !self.raised()
    }
}

async fn wait_raised(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        // A dropped sender can never raise the signal.
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
