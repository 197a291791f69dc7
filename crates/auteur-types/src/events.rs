use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    director::{Panel, Phase, TierId},
    timeline::ParticipantId,
};

/// Director state field an event reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Subject,
    Panel,
    Phase,
}

/// Immutable event envelope handed to the actuator and telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    /// Match clock when the change happened.
    #[serde(with = "crate::secs")]
    pub offset: Duration,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    SubjectChanged(SubjectChange),
    PanelChanged(PanelChange),
    PhaseChanged(PhaseChange),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectChange {
    pub previous: Option<ParticipantId>,
    pub current: ParticipantId,
    pub classification: TierId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelChange {
    pub previous: Option<Panel>,
    pub current: Panel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub previous: Phase,
    pub current: Phase,
}

impl DirectorEvent {
    pub fn new(offset: Duration, payload: EventPayload) -> Self {
        let kind = match &payload {
            EventPayload::SubjectChanged(_) => EventKind::Subject,
            EventPayload::PanelChanged(_) => EventKind::Panel,
            EventPayload::PhaseChanged(_) => EventKind::Phase,
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            offset,
            payload,
        }
    }

    pub fn subject_changed(
        offset: Duration,
        previous: Option<ParticipantId>,
        current: ParticipantId,
        classification: TierId,
    ) -> Self {
        Self::new(
            offset,
            EventPayload::SubjectChanged(SubjectChange {
                previous,
                current,
                classification,
            }),
        )
    }

    pub fn panel_changed(offset: Duration, previous: Option<Panel>, current: Panel) -> Self {
        Self::new(
            offset,
            EventPayload::PanelChanged(PanelChange { previous, current }),
        )
    }

    pub fn phase_changed(offset: Duration, previous: Phase, current: Phase) -> Self {
        Self::new(
            offset,
            EventPayload::PhaseChanged(PhaseChange { previous, current }),
        )
    }
}
