use std::{future::Future, sync::Arc, time::Duration};

use auteur_engine::{CandidateSelector, Ladder, PanelSelector, TRIGGER_KINDS};
use auteur_heuristics::WindowAnalyzer;
use auteur_network::EventSink;
use auteur_ops::TelemetryStore;
use auteur_types::{
    config::AuteurConfig,
    director::{ClockState, DirectorSubject, PanelState, Phase, SessionSummary},
    events::DirectorEvent,
    timeline::MatchTimeline,
    Result,
};
use auteur_vision::{ClockReader, EndOfMatchDetector};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    cancel::StopSignal,
    clock::{ClockTracker, SampleOutcome, SampleStats},
    orchestrator_error,
};

enum ClockRead {
    Sample(Duration),
    Unavailable,
    Stopped,
}

/// Everything the three loops share read-only for the lifetime of a director.
struct Shared<R, D, S> {
    config: AuteurConfig,
    timeline: Arc<MatchTimeline>,
    candidates: CandidateSelector,
    panels: PanelSelector,
    analyzer: Arc<WindowAnalyzer>,
    clock: R,
    end_detector: D,
    sink: S,
    telemetry: TelemetryStore,
}

/// Drives subject and panel selection against the external match clock.
pub struct Director<R, D, S>
where
    R: ClockReader,
    D: EndOfMatchDetector,
    S: EventSink,
{
    shared: Arc<Shared<R, D, S>>,
}

impl<R, D, S> Director<R, D, S>
where
    R: ClockReader + 'static,
    D: EndOfMatchDetector + 'static,
    S: EventSink + 'static,
{
    /// Validates configuration and timeline up front; nothing runs if either
    /// is unusable.
    pub fn new(
        config: AuteurConfig,
        timeline: Arc<MatchTimeline>,
        clock: R,
        end_detector: D,
        sink: S,
        telemetry: TelemetryStore,
    ) -> Result<Self> {
        config.validate()?;
        timeline.validate()?;

        let analyzer = Arc::new(WindowAnalyzer::standard(Arc::new(config.heuristics.clone()))?);
        let ladder = Ladder::from_config(&config.heuristics, &config.ladder)?;
        let candidates = CandidateSelector::new(analyzer.clone(), ladder);
        let panels = PanelSelector::new(config.panels.clone(), &timeline.map);
        info!(
            map = %timeline.map,
            length = ?timeline.length,
            participants = timeline.participants.len(),
            "director ready"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                timeline,
                candidates,
                panels,
                analyzer,
                clock,
                end_detector,
                sink,
                telemetry,
            }),
        })
    }

    /// Runs one spectate session until `shutdown` is raised or the match ends.
    /// Every call starts from a fresh director state.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<SessionSummary> {
        let (clock_tx, clock_rx) = watch::channel(ClockState::default());
        let (subject_tx, subject_rx) = watch::channel::<Option<DirectorSubject>>(None);
        let (panel_tx, panel_rx) = watch::channel::<Option<PanelState>>(None);
        let (halt_tx, halt_rx) = watch::channel(false);
        let halt = Arc::new(halt_tx);
        let stop = StopSignal::new(shutdown, halt_rx);
        info!("director session starting");

        let state_task = supervise(
            "state",
            self.shared.clone().state_loop(clock_tx, stop.clone()),
            halt.clone(),
        );
        let focus_task = supervise(
            "focus",
            self.shared
                .clone()
                .focus_loop(clock_rx.clone(), subject_tx, stop.clone()),
            halt.clone(),
        );
        let panel_task = supervise(
            "panel",
            self.shared
                .clone()
                .panel_loop(clock_rx.clone(), panel_tx, stop),
            halt,
        );

        let (state, focus, panel) = tokio::join!(state_task, focus_task, panel_task);
        let stats = state.map_err(|err| orchestrator_error(format!("state loop panicked: {err}")))??;
        focus.map_err(|err| orchestrator_error(format!("focus loop panicked: {err}")))??;
        panel.map_err(|err| orchestrator_error(format!("panel loop panicked: {err}")))??;

        let summary = SessionSummary {
            clock: *clock_rx.borrow(),
            subject: subject_rx.borrow().clone(),
            panel: *panel_rx.borrow(),
            accepted_samples: stats.accepted,
            unavailable_samples: stats.unavailable,
            discarded_samples: stats.discarded,
        };
        info!(
            phase = %summary.clock.phase,
            clock = ?summary.clock.clock,
            accepted = stats.accepted,
            unavailable = stats.unavailable,
            discarded = stats.discarded,
            "director session finished"
        );
        self.shared.telemetry.record_session(summary.clone()).await?;
        Ok(summary)
    }
}

/// Spawns one director loop. Whenever it exits, ended, stopped or failed,
/// the session halt is raised so its siblings wind down too.
fn supervise<T, F>(
    name: &'static str,
    task: F,
    halt: Arc<watch::Sender<bool>>,
) -> JoinHandle<Result<T>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = task.await;
        if let Err(err) = &result {
            warn!(loop_name = name, "director loop failed: {err}");
        }
        halt.send_replace(true);
        result
    })
}

impl<R, D, S> Shared<R, D, S>
where
    R: ClockReader,
    D: EndOfMatchDetector,
    S: EventSink,
{
    async fn publish(&self, event: DirectorEvent) -> Result<()> {
        self.sink.publish(event.clone()).await?;
        self.telemetry.record_event(event).await?;
        Ok(())
    }

    /// One clock read with bounded retries; the pause before retry `n`
    /// grows to `n * retry_backoff`.
    async fn read_clock(&self, tracker: &mut ClockTracker, stop: &mut StopSignal) -> ClockRead {
        let retries = self.config.clock.max_retries;
        for attempt in 0..=retries {
            match stop.guard(self.clock.try_read_clock()).await {
                None => return ClockRead::Stopped,
                Some(Some(sample)) => return ClockRead::Sample(sample),
                Some(None) => tracker.record_unavailable(),
            }
            let backoff = self.config.clock.retry_backoff() * (u32::from(attempt) + 1);
            if attempt < retries && !stop.sleep(backoff).await {
                return ClockRead::Stopped;
            }
        }
        debug!(retries, "clock unavailable; keeping previous state");
        ClockRead::Unavailable
    }

    async fn state_loop(
        self: Arc<Self>,
        clock_tx: watch::Sender<ClockState>,
        mut stop: StopSignal,
    ) -> Result<SampleStats> {
        let mut tracker = ClockTracker::new(self.config.clock.sanity_threshold());
        let end_margin = self.config.clock.end_margin();

        while !stop.raised() {
            let sample = match self.read_clock(&mut tracker, &mut stop).await {
                ClockRead::Stopped => break,
                ClockRead::Unavailable => None,
                ClockRead::Sample(sample) => Some(sample),
            };
            if let Some(sample) = sample {
                if let SampleOutcome::Accepted(transition) = tracker.observe(sample) {
                    let state = tracker.state();
                    clock_tx.send_replace(state);
                    if let Some((previous, current)) = transition {
                        info!(%previous, %current, clock = ?state.clock, "phase changed");
                        self.publish(DirectorEvent::phase_changed(state.clock, previous, current))
                            .await?;
                    }

                    let started = matches!(state.phase, Phase::Running | Phase::Paused);
                    if started && state.clock + end_margin >= self.timeline.length {
                        let confirmed = stop
                            .guard(self.end_detector.try_confirm_end(&self.timeline.award_tags))
                            .await;
                        match confirmed {
                            None => break,
                            Some(false) => {}
                            Some(true) => {
                                if let Some((previous, current)) = tracker.end() {
                                    let state = tracker.state();
                                    clock_tx.send_replace(state);
                                    info!(%previous, %current, clock = ?state.clock, "match ended");
                                    self.publish(DirectorEvent::phase_changed(
                                        state.clock,
                                        previous,
                                        current,
                                    ))
                                    .await?;
                                }
                                break;
                            }
                        }
                    }
                }
            }
            if !stop.sleep(self.config.clock.poll_interval()).await {
                break;
            }
        }
        Ok(tracker.stats())
    }

    async fn focus_loop(
        self: Arc<Self>,
        clock_rx: watch::Receiver<ClockState>,
        subject_tx: watch::Sender<Option<DirectorSubject>>,
        mut stop: StopSignal,
    ) -> Result<()> {
        let idle = self.config.clock.idle_interval();
        let mut current: Option<DirectorSubject> = None;

        while !stop.raised() {
            let ClockState { clock: now, phase } = *clock_rx.borrow();
            match phase {
                Phase::Ended => break,
                Phase::NotStarted => {
                    if !stop.sleep(idle).await {
                        break;
                    }
                    continue;
                }
                Phase::Running | Phase::Paused => {}
            }

            if let Some(subject) = current.as_ref().filter(|s| !s.is_expired(now)) {
                if !stop.sleep(subject.remaining(now)).await {
                    break;
                }
                continue;
            }

            let Some(next) = self
                .candidates
                .select(current.as_ref(), &self.timeline, now)
            else {
                if !stop.sleep(idle).await {
                    break;
                }
                continue;
            };

            let previous = current.as_ref().map(|s| s.participant);
            let changed = previous != Some(next.participant);
            let hold = next.remaining(now);
            subject_tx.send_replace(Some(next.clone()));
            if changed {
                info!(
                    participant = %next.participant,
                    tier = %next.classification,
                    clock = ?now,
                    "focus changed"
                );
                self.publish(DirectorEvent::subject_changed(
                    now,
                    previous,
                    next.participant,
                    next.classification,
                ))
                .await?;
            }
            current = Some(next);

            if !stop.sleep(if hold.is_zero() { idle } else { hold }).await {
                break;
            }
        }
        Ok(())
    }

    async fn panel_loop(
        self: Arc<Self>,
        clock_rx: watch::Receiver<ClockState>,
        panel_tx: watch::Sender<Option<PanelState>>,
        mut stop: StopSignal,
    ) -> Result<()> {
        let idle = self.config.clock.idle_interval();
        let mut current: Option<PanelState> = None;

        while !stop.raised() {
            let ClockState { clock: now, phase } = *clock_rx.borrow();
            match phase {
                Phase::Ended => break,
                Phase::NotStarted => {
                    if !stop.sleep(idle).await {
                        break;
                    }
                    continue;
                }
                Phase::Running | Phase::Paused => {}
            }

            let analysis = self.analyzer.analyze_for(
                self.panels.trigger_window(now),
                &self.timeline,
                &TRIGGER_KINDS,
            );
            let decision = self.panels.select(current.as_ref(), &analysis, now);
            if decision.changed_from(current.as_ref()) {
                panel_tx.send_replace(Some(decision.state));
                info!(panel = ?decision.state.panel, clock = ?now, "panel changed");
                self.publish(DirectorEvent::panel_changed(
                    now,
                    current.map(|state| state.panel),
                    decision.state.panel,
                ))
                .await?;
            }
            current = Some(decision.state);

            let wait = decision.review_at.saturating_sub(now);
            if wait.is_zero() {
                warn!(clock = ?now, "panel review is due immediately; backing off");
            }
            if !stop.sleep(if wait.is_zero() { idle } else { wait }).await {
                break;
            }
        }
        Ok(())
    }
}
