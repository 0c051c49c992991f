//! Risk-bounded, personality-biased move selection.
//!
//! The engine's objective scores stay the authority: a profile can only
//! reorder moves whose objective is within its risk budget of the best one.

use std::cmp::Ordering;

use chess_core::{CandidateMove, Move, Position};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use tracing::trace;

use crate::error::SelectError;
use crate::features::{FeatureSource, FeatureVector, HeuristicFeatures};
use crate::profile::PersonalityProfile;

/// The chosen move plus the numbers that explain the choice.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub candidate: CandidateMove,
    /// Index of `candidate` in the slice passed to `select`.
    pub index: usize,
    /// Objective of the chosen move, in centipawns.
    pub objective: f64,
    /// Objective plus the profile's weighted features.
    pub biased: f64,
    pub best_objective: f64,
    /// First candidate (in engine order) with the best objective.
    pub best_move: Move,
    pub features: FeatureVector,
    /// Number of candidates that were inside the risk budget.
    pub admissible: usize,
}

impl Selection {
    /// True when the profile picked something other than the engine's top move.
    pub fn bias_decided(&self) -> bool {
        self.candidate.mv != self.best_move
    }

    /// Centipawns given up relative to the best objective.
    pub fn delta(&self) -> f64 {
        self.objective - self.best_objective
    }
}

#[derive(Debug, Clone)]
struct Scored {
    index: usize,
    objective: f64,
    biased: f64,
    features: FeatureVector,
    uci: String,
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Selects moves by blending objective scores with a profile's features.
#[derive(Debug, Clone, Default)]
pub struct BiasEngine<F = HeuristicFeatures> {
    features: F,
}

impl BiasEngine<HeuristicFeatures> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: FeatureSource> BiasEngine<F> {
    pub fn with_features(features: F) -> Self {
        Self { features }
    }

    /// Pick one of `candidates` for the side to move in `pos`.
    ///
    /// The result is always within `profile.risk_budget()` centipawns of the
    /// best objective. At temperature 0 the choice is deterministic; above
    /// it, `rng` is the only source of randomness.
    pub fn select<R: Rng + ?Sized>(
        &self,
        candidates: &[CandidateMove],
        profile: &PersonalityProfile,
        pos: &Position,
        rng: &mut R,
    ) -> Result<Selection, SelectError> {
        let Some(first) = candidates.first() else {
            return Err(SelectError::NoCandidates);
        };

        let mut best_index = 0;
        let mut best_objective = first.objective();
        for (i, c) in candidates.iter().enumerate().skip(1) {
            if c.objective() > best_objective {
                best_index = i;
                best_objective = c.objective();
            }
        }
        let best_move = candidates[best_index].mv;

        if candidates.len() == 1 {
            return Ok(Selection {
                candidate: first.clone(),
                index: 0,
                objective: best_objective,
                biased: best_objective,
                best_objective,
                best_move,
                features: FeatureVector::default(),
                admissible: 1,
            });
        }

        let floor = best_objective - profile.risk_budget();
        let admissible: Vec<Scored> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.objective() >= floor)
            .map(|(index, c)| {
                let features = self.features.features(pos, c);
                let objective = c.objective();
                Scored {
                    index,
                    objective,
                    biased: objective + profile.weights().apply(&features),
                    features,
                    uci: c.mv.to_string(),
                }
            })
            .collect();

        if admissible.is_empty() {
            return Err(SelectError::NoAdmissibleCandidates {
                profile: profile.name().to_string(),
                best: best_objective,
            });
        }

        let chosen = if profile.temperature() > 0.0 {
            sample(&admissible, profile.temperature(), rng)?
        } else {
            argmax(&admissible, best_objective)
        };

        trace!(
            profile = profile.name(),
            chosen = %chosen.uci,
            objective = chosen.objective,
            biased = chosen.biased,
            best = best_objective,
            admissible = admissible.len(),
            "biased selection"
        );

        Ok(Selection {
            candidate: candidates[chosen.index].clone(),
            index: chosen.index,
            objective: chosen.objective,
            biased: chosen.biased,
            best_objective,
            best_move,
            features: chosen.features,
            admissible: admissible.len(),
        })
    }
}

/// Highest biased score; ties go to the smaller objective gap, then to the
/// lexicographically smaller UCI text.
fn argmax(admissible: &[Scored], best_objective: f64) -> &Scored {
    let gap = |s: &Scored| (s.objective - best_objective).abs();
    let mut winner = &admissible[0];
    for s in &admissible[1..] {
        let order = cmp_f64(s.biased, winner.biased)
            .then_with(|| cmp_f64(gap(winner), gap(s)))
            .then_with(|| winner.uci.cmp(&s.uci));
        if order == Ordering::Greater {
            winner = s;
        }
    }
    winner
}

/// Softmax over `biased / temperature`, shifted by the maximum.
fn sample<'a, R: Rng + ?Sized>(
    admissible: &'a [Scored],
    temperature: f64,
    rng: &mut R,
) -> Result<&'a Scored, SelectError> {
    let max = admissible
        .iter()
        .map(|s| s.biased)
        .fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = admissible
        .iter()
        .map(|s| ((s.biased - max) / temperature).exp())
        .collect();
    let dist = WeightedIndex::new(&weights).map_err(|e| SelectError::Sampling(e.to_string()))?;
    Ok(&admissible[dist.sample(rng)])
}

#[cfg(test)]
#[path = "bias_tests.rs"]
mod bias_tests;
