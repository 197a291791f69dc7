//! The director: keeps the phase machine in step with the external clock and
//! runs the focus and panel loops against it.

use async_trait::async_trait;
use auteur_network::EventSink;
use auteur_types::{director::SessionSummary, AuteurError, Result};
use auteur_vision::{ClockReader, EndOfMatchDetector};
use tokio::sync::watch;

mod cancel;
mod clock;
mod director;

pub use clock::{ClockTracker, SampleOutcome, SampleStats};
pub use director::Director;

/// Anything that can host a spectate session until told to stop.
#[async_trait]
pub trait SessionRunner: Send + Sync {
    async fn run_session(&self, shutdown: watch::Receiver<bool>) -> Result<SessionSummary>;
}

#[async_trait]
impl<R, D, S> SessionRunner for Director<R, D, S>
where
    R: ClockReader + 'static,
    D: EndOfMatchDetector + 'static,
    S: EventSink + 'static,
{
    async fn run_session(&self, shutdown: watch::Receiver<bool>) -> Result<SessionSummary> {
        self.run(shutdown).await
    }
}

pub fn orchestrator_error(message: impl Into<String>) -> AuteurError {
    AuteurError::Director(message.into())
}
