//! Contracts for the external match clock and end-of-match confirmation.
//!
//! The real readers sit behind screen capture and OCR; this crate only holds
//! the traits, timer text parsing and scripted stand-ins used by tests and
//! dry runs.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use auteur_types::{AuteurError, Result};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, trace};

/// Source of the running game's elapsed time. `None` means the sample is
/// unavailable right now, never that the match is over.
#[async_trait]
pub trait ClockReader: Send + Sync {
    async fn try_read_clock(&self) -> Option<Duration>;
}

/// Confirms that the score screen is up once the clock nears the match length.
#[async_trait]
pub trait EndOfMatchDetector: Send + Sync {
    async fn try_confirm_end(&self, award_tags: &[String]) -> bool;
}

#[async_trait]
impl<T: ClockReader + ?Sized> ClockReader for Arc<T> {
    async fn try_read_clock(&self) -> Option<Duration> {
        (**self).try_read_clock().await
    }
}

#[async_trait]
impl<T: EndOfMatchDetector + ?Sized> EndOfMatchDetector for Arc<T> {
    async fn try_confirm_end(&self, award_tags: &[String]) -> bool {
        (**self).try_confirm_end(award_tags).await
    }
}

/// Parses an OCR'd timer such as `"12:34"` or `"1:02:03"`.
///
/// Common OCR confusions (`O` for zero, `l`/`I` for one) are corrected and
/// whitespace is ignored.
pub fn parse_timer_text(text: &str) -> Result<Duration> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            'O' | 'o' => '0',
            'l' | 'I' | '|' => '1',
            '.' => ':',
            other => other,
        })
        .collect();
    if cleaned.is_empty() {
        return Err(vision_error("empty timer text"));
    }

    let mut fields = Vec::with_capacity(3);
    for part in cleaned.split(':') {
        let value: u64 = part
            .parse()
            .map_err(|_| vision_error(format!("unreadable timer field {part:?} in {text:?}")))?;
        fields.push(value);
    }
    let (hours, minutes, seconds) = match fields.as_slice() {
        [m, s] => (0, *m, *s),
        [h, m, s] if *m < 60 => (*h, *m, *s),
        _ => return Err(vision_error(format!("unexpected timer layout {text:?}"))),
    };
    if seconds >= 60 {
        return Err(vision_error(format!("seconds out of range in {text:?}")));
    }
    Ok(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
}

/// Replays a fixed sequence of samples; `None` entries and an exhausted
/// script read as unavailable.
#[derive(Debug, Default)]
pub struct ScriptedClock {
    samples: Mutex<VecDeque<Option<Duration>>>,
}

impl ScriptedClock {
    pub fn new(samples: impl IntoIterator<Item = Option<Duration>>) -> Self {
        Self {
            samples: Mutex::new(samples.into_iter().collect()),
        }
    }

    /// Builds a script from raw OCR strings; unreadable strings become gaps.
    pub fn from_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(texts.into_iter().map(|text| match parse_timer_text(text) {
            Ok(offset) => Some(offset),
            Err(err) => {
                debug!("treating timer text as unavailable: {err}");
                None
            }
        }))
    }

    pub async fn push(&self, sample: Option<Duration>) {
        self.samples.lock().await.push_back(sample);
    }

    pub async fn remaining(&self) -> usize {
        self.samples.lock().await.len()
    }
}

#[async_trait]
impl ClockReader for ScriptedClock {
    async fn try_read_clock(&self) -> Option<Duration> {
        let sample = self.samples.lock().await.pop_front().flatten();
        trace!(?sample, "scripted clock read");
        sample
    }
}

#[derive(Debug)]
struct Playback {
    base: Duration,
    resumed_at: Option<Instant>,
}

/// A clock that advances with tokio time and can be paused, standing in for a
/// game client playing the replay at normal speed.
#[derive(Debug)]
pub struct SimulatedClock {
    playback: Mutex<Playback>,
}

impl SimulatedClock {
    /// Starts playing from `start` immediately.
    pub fn playing_from(start: Duration) -> Self {
        Self {
            playback: Mutex::new(Playback {
                base: start,
                resumed_at: Some(Instant::now()),
            }),
        }
    }

    pub async fn pause(&self) {
        let mut playback = self.playback.lock().await;
        if let Some(resumed_at) = playback.resumed_at.take() {
            playback.base += resumed_at.elapsed();
        }
    }

    pub async fn resume(&self) {
        let mut playback = self.playback.lock().await;
        if playback.resumed_at.is_none() {
            playback.resumed_at = Some(Instant::now());
        }
    }

    /// Moves the clock to `offset`, keeping the play/pause state.
    pub async fn seek(&self, offset: Duration) {
        let mut playback = self.playback.lock().await;
        playback.base = offset;
        if playback.resumed_at.is_some() {
            playback.resumed_at = Some(Instant::now());
        }
    }

    pub async fn now(&self) -> Duration {
        let playback = self.playback.lock().await;
        playback.base + playback.resumed_at.map_or(Duration::ZERO, |at| at.elapsed())
    }
}

#[async_trait]
impl ClockReader for SimulatedClock {
    async fn try_read_clock(&self) -> Option<Duration> {
        Some(self.now().await)
    }
}

/// Confirms the end after a given number of attempts; `never()` refuses forever.
#[derive(Debug)]
pub struct ScriptedEndSignal {
    confirm_after: Option<u32>,
    attempts: AtomicU32,
}

impl ScriptedEndSignal {
    pub fn immediate() -> Self {
        Self::after_attempts(1)
    }

    pub fn after_attempts(attempts: u32) -> Self {
        Self {
            confirm_after: Some(attempts.max(1)),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn never() -> Self {
        Self {
            confirm_after: None,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndOfMatchDetector for ScriptedEndSignal {
    async fn try_confirm_end(&self, award_tags: &[String]) -> bool {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let confirmed = self.confirm_after.map_or(false, |needed| attempt >= needed);
        debug!(attempt, awards = award_tags.len(), confirmed, "end-of-match check");
        confirmed
    }
}

pub fn vision_error(message: impl Into<String>) -> AuteurError {
    AuteurError::Clock(message.into())
}
