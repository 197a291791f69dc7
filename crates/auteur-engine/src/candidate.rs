use std::{sync::Arc, time::Duration};

use auteur_heuristics::WindowAnalyzer;
use auteur_types::{
    config::AuteurConfig,
    director::{DirectorSubject, TierId},
    observation::{Observation, Window},
    timeline::MatchTimeline,
    Result,
};
use tracing::{debug, trace};

use crate::ladder::{Ladder, Tier};

/// A possible next subject together with the observation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub subject: DirectorSubject,
    pub observation: Observation,
}

/// Candidates from the first non-empty tier, already in tier order.
#[derive(Debug, Clone, PartialEq)]
pub struct TierCandidates {
    pub tier: TierId,
    pub window: Window,
    pub candidates: Vec<Candidate>,
}

/// Walks the priority ladder and picks the next camera subject.
pub struct CandidateSelector {
    analyzer: Arc<WindowAnalyzer>,
    ladder: Ladder,
}

impl CandidateSelector {
    pub fn new(analyzer: Arc<WindowAnalyzer>, ladder: Ladder) -> Self {
        Self { analyzer, ladder }
    }

    pub fn from_config(config: &AuteurConfig) -> Result<Self> {
        let analyzer = WindowAnalyzer::standard(Arc::new(config.heuristics.clone()))?;
        let ladder = Ladder::from_config(&config.heuristics, &config.ladder)?;
        Ok(Self::new(Arc::new(analyzer), ladder))
    }

    pub fn ladder(&self) -> &Ladder {
        &self.ladder
    }

    /// Evaluates tiers top to bottom and returns the first that yields anything.
    pub fn candidates(&self, timeline: &MatchTimeline, now: Duration) -> Option<TierCandidates> {
        self.ladder
            .tiers()
            .iter()
            .find_map(|tier| self.evaluate(tier, timeline, now))
    }

    fn evaluate(&self, tier: &Tier, timeline: &MatchTimeline, now: Duration) -> Option<TierCandidates> {
        let window = tier.sizer.window(now);
        let analysis = self.analyzer.analyze_for(window, timeline, &tier.sources);
        let mut observations = analysis.collect(&tier.sources);
        if tier.require_alive {
            observations.retain(|obs| timeline.is_alive(obs.participant, now));
        }
        if observations.is_empty() {
            trace!(tier = %tier.id, %window, "tier empty");
            return None;
        }
        tier.order.sort(&mut observations);

        let candidates = observations
            .into_iter()
            .map(|observation| {
                let hold_until = tier
                    .hold
                    .hold_until(&observation, &window, now)
                    .max(now + self.ladder.minimum_hold());
                Candidate {
                    subject: DirectorSubject {
                        participant: observation.participant,
                        unit: observation.unit,
                        anchor_time: now,
                        hold_until,
                        classification: tier.id,
                    },
                    observation,
                }
            })
            .collect();
        Some(TierCandidates {
            tier: tier.id,
            window,
            candidates,
        })
    }

    /// Picks the next subject, or `None` when every tier came up empty.
    pub fn select(
        &self,
        current: Option<&DirectorSubject>,
        timeline: &MatchTimeline,
        now: Duration,
    ) -> Option<DirectorSubject> {
        let Some(found) = self.candidates(timeline, now) else {
            debug!(now = ?now, "no candidate on any tier");
            return None;
        };
        let rotate = self
            .ladder
            .tiers()
            .iter()
            .any(|tier| tier.id == found.tier && tier.rotate);

        let chosen = match current {
            Some(current) if rotate => self.rotate_away(current, found, now),
            _ => found.candidates.into_iter().next().map(|c| c.subject),
        };
        if let Some(subject) = &chosen {
            debug!(
                participant = %subject.participant,
                tier = %subject.classification,
                hold_until = ?subject.hold_until,
                "subject selected"
            );
        }
        chosen
    }

    /// Prefers anyone but the current subject. When the current subject is the
    /// only candidate it is kept, with the hold trimmed by the time already spent.
    fn rotate_away(
        &self,
        current: &DirectorSubject,
        found: TierCandidates,
        now: Duration,
    ) -> Option<DirectorSubject> {
        let window_len = found.window.len();
        let mut candidates = found.candidates.into_iter();
        let first = candidates.next()?;
        if first.subject.participant != current.participant {
            return Some(first.subject);
        }
        if let Some(other) = candidates.find(|c| c.subject.participant != current.participant) {
            return Some(other.subject);
        }
        let elapsed = now.saturating_sub(current.anchor_time);
        let remaining = window_len
            .saturating_sub(elapsed)
            .max(self.ladder.minimum_hold());
        Some(DirectorSubject {
            anchor_time: current.anchor_time,
            hold_until: now + remaining,
            ..first.subject
        })
    }
}
