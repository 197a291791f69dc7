//! Operational helpers: logging setup and an in-memory record of what the
//! director did.

use std::sync::Arc;

use auteur_types::{
    config::OpsConfig,
    director::SessionSummary,
    events::{DirectorEvent, EventKind, EventPayload, SubjectChange},
    AuteurError, Result,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| ops_error(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| ops_error(format!("tracing init error: {err}")))?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct TelemetryExport<'a> {
    events: &'a [DirectorEvent],
    sessions: &'a [SessionSummary],
}

/// In-memory telemetry store shared by the director loops.
#[derive(Clone, Default)]
pub struct TelemetryStore {
    events: Arc<Mutex<Vec<DirectorEvent>>>,
    sessions: Arc<Mutex<Vec<SessionSummary>>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_event(&self, event: DirectorEvent) -> Result<()> {
        self.events.lock().await.push(event);
        Ok(())
    }

    pub async fn record_session(&self, summary: SessionSummary) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        info!(
            session = sessions.len() + 1,
            phase = %summary.clock.phase,
            "telemetry recorded session"
        );
        sessions.push(summary);
        Ok(())
    }

    pub async fn snapshot_events(&self) -> Vec<DirectorEvent> {
        self.events.lock().await.clone()
    }

    pub async fn snapshot_sessions(&self) -> Vec<SessionSummary> {
        self.sessions.lock().await.clone()
    }

    pub async fn events_of(&self, kind: EventKind) -> Vec<DirectorEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|event| event.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn events_since(&self, since: DateTime<Utc>) -> Vec<DirectorEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|event| event.timestamp >= since)
            .cloned()
            .collect()
    }

    /// Subject changes in emission order.
    pub async fn subject_history(&self) -> Vec<SubjectChange> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match &event.payload {
                EventPayload::SubjectChanged(change) => Some(change.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
        self.sessions.lock().await.clear();
    }

    /// Everything recorded so far as pretty JSON.
    pub async fn export_json(&self) -> Result<String> {
        let events = self.events.lock().await;
        let sessions = self.sessions.lock().await;
        debug!(
            events = events.len(),
            sessions = sessions.len(),
            "exporting telemetry"
        );
        serde_json::to_string_pretty(&TelemetryExport {
            events: &events,
            sessions: &sessions,
        })
        .map_err(|err| ops_error(format!("failed to export telemetry: {err}")))
    }
}

pub fn ops_error(message: impl Into<String>) -> AuteurError {
    AuteurError::Ops(message.into())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use auteur_types::{
        director::{Panel, Phase, TierId},
        timeline::ParticipantId,
    };

    #[tokio::test]
    async fn records_and_filters_events() {
        let store = TelemetryStore::new();
        let before = Utc::now();
        store
            .record_event(DirectorEvent::subject_changed(
                Duration::from_secs(10),
                None,
                ParticipantId(1),
                TierId::Kill,
            ))
            .await
            .unwrap();
        store
            .record_event(DirectorEvent::panel_changed(Duration::from_secs(11), None, Panel::Kda))
            .await
            .unwrap();
        store
            .record_event(DirectorEvent::subject_changed(
                Duration::from_secs(20),
                Some(ParticipantId(1)),
                ParticipantId(4),
                TierId::Alive,
            ))
            .await
            .unwrap();

        assert_eq!(store.snapshot_events().await.len(), 3);
        assert_eq!(store.events_of(EventKind::Panel).await.len(), 1);
        assert_eq!(store.events_since(before).await.len(), 3);
        let history = store.subject_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].previous, Some(ParticipantId(1)));
        assert_eq!(history[1].current, ParticipantId(4));
    }

    #[tokio::test]
    async fn export_and_clear() {
        let store = TelemetryStore::new();
        store
            .record_event(DirectorEvent::phase_changed(
                Duration::from_secs(1),
                Phase::NotStarted,
                Phase::Running,
            ))
            .await
            .unwrap();
        store.record_session(SessionSummary::default()).await.unwrap();

        let json = store.export_json().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["events"].as_array().map(Vec::len), Some(1));
        assert_eq!(parsed["sessions"].as_array().map(Vec::len), Some(1));

        store.clear().await;
        assert!(store.snapshot_events().await.is_empty());
        assert!(store.snapshot_sessions().await.is_empty());
    }

    #[test]
    fn invalid_filter_falls_back() {
        let config = OpsConfig {
            log_level: "not a [valid filter".into(),
        };
        // A global subscriber may already be installed by another test.
        let _ = init_tracing(&config);
        assert!(ops_error("x").to_string().starts_with("operational error"));
    }
}
