//! Heuristic move features.
//!
//! Every feature is a post-move minus pre-move difference, seen from the
//! side that makes the move, divided by a fixed scale and clamped to
//! `[-1, 1]` so no single feature can swamp the weighted sum.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chess_core::{
    AttackMap, CENTER, CandidateMove, Color, Move, PieceKind, Position, king_zone, mobility, sq,
    file_of, rank_of,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Material,
    Check,
    KingSafety,
    CenterControl,
    Mobility,
    Aggression,
}

impl Feature {
    pub const COUNT: usize = 6;

    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::Material,
        Feature::Check,
        Feature::KingSafety,
        Feature::CenterControl,
        Feature::Mobility,
        Feature::Aggression,
    ];

    pub fn idx(self) -> usize {
        self as usize
    }

    /// Key used in profile files.
    pub fn name(self) -> &'static str {
        match self {
            Feature::Material => "material",
            Feature::Check => "check",
            Feature::KingSafety => "king_safety",
            Feature::CenterControl => "center_control",
            Feature::Mobility => "mobility",
            Feature::Aggression => "aggression",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Comma-separated list of every feature name, for error messages.
    pub fn known_names() -> String {
        Feature::ALL.map(Feature::name).join(", ")
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::from_name(s).ok_or_else(|| format!("unknown feature '{s}'"))
    }
}

/// One value per feature, each within `[-1, 1]`. Missing features are 0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeatureVector([f64; Feature::COUNT]);

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.idx()]
    }

    /// Store a value, clamped into range. Non-finite input is stored as 0.
    pub fn set(&mut self, feature: Feature, value: f64) {
        self.0[feature.idx()] = if value.is_finite() {
            value.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.into_iter().map(|f| (f, self.get(f)))
    }

    pub fn values(&self) -> &[f64; Feature::COUNT] {
        &self.0
    }
}

/// Anything that can describe a candidate move as a feature vector.
///
/// Implementations must be pure: the same inputs give the same vector.
pub trait FeatureSource {
    fn features(&self, pos: &Position, candidate: &CandidateMove) -> FeatureVector;
}

/// The board heuristics used in real games.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFeatures;

impl FeatureSource for HeuristicFeatures {
    fn features(&self, pos: &Position, candidate: &CandidateMove) -> FeatureVector {
        extract(pos, candidate.mv)
    }
}

/// Fixed feature vectors keyed by UCI move text; unknown moves get zeros.
/// Handy for replaying recorded decisions and for tests.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    entries: HashMap<String, FeatureVector>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uci: impl Into<String>, features: FeatureVector) -> &mut Self {
        self.entries.insert(uci.into(), features);
        self
    }
}

impl FeatureSource for FeatureTable {
    fn features(&self, _pos: &Position, candidate: &CandidateMove) -> FeatureVector {
        self.entries
            .get(&candidate.mv.to_string())
            .copied()
            .unwrap_or_default()
    }
}

// Normalization scales (raw units per 1.0 of feature value).
const MATERIAL_SCALE: f64 = 900.0;
const KING_SAFETY_SCALE: f64 = 6.0;
const CENTER_SCALE: f64 = 4.0;
const MOBILITY_SCALE: f64 = 12.0;
const THREAT_SCALE: f64 = 4.0;

/// Raw per-side measurements the features are differences of.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    balance: i32,
    king_safety: i32,
    center: i32,
    mobility: i32,
    threats: i32,
}

impl Snapshot {
    fn take(pos: &Position, side: Color) -> Self {
        let them = side.other();
        let ours = AttackMap::build(pos, side);
        let theirs = AttackMap::build(pos, them);

        let king_safety = match pos.king_sq(side) {
            Some(k) => {
                let pressure: i32 = king_zone(k).map(|s| i32::from(theirs.count(s))).sum();
                pawn_shield(pos, side, k) - pressure
            }
            None => 0,
        };

        let center = CENTER
            .iter()
            .map(|&s| {
                let held = pos.piece_at(s).is_some_and(|pc| pc.color == side);
                i32::from(ours.count(s)) + i32::from(held)
            })
            .sum();

        let threats = pos
            .pieces(them)
            .filter(|(s, pc)| pc.kind != PieceKind::King && ours.attacks(*s))
            .count() as i32;

        Self {
            balance: pos.material(side) - pos.material(them),
            king_safety,
            center,
            mobility: mobility(pos, side) as i32,
            threats,
        }
    }
}

/// Friendly pawns on the three files around the king, one or two ranks
/// in front of it.
fn pawn_shield(pos: &Position, side: Color, king: u8) -> i32 {
    let fwd = side.forward();
    let (f, r) = (file_of(king), rank_of(king));
    let mut count = 0;
    for df in -1..=1 {
        for dr in [fwd, 2 * fwd] {
            if let Some(s) = sq(f + df, r + dr)
                && pos
                    .piece_at(s)
                    .is_some_and(|pc| pc.color == side && pc.kind == PieceKind::Pawn)
            {
                count += 1;
            }
        }
    }
    count
}

fn scaled(delta: i32, scale: f64) -> f64 {
    (f64::from(delta) / scale).clamp(-1.0, 1.0)
}

/// Feature vector for playing `mv` in `pos`. `mv` must be legal.
pub fn extract(pos: &Position, mv: Move) -> FeatureVector {
    let mover = pos.side_to_move;
    let capture = pos.piece_at(mv.to).is_some() || mv.is_en_passant;

    let mut after = pos.clone();
    after.make_move(mv);

    let before = Snapshot::take(pos, mover);
    let now = Snapshot::take(&after, mover);
    let gives_check = after.in_check(mover.other());

    let threat_delta = scaled(now.threats - before.threats, THREAT_SCALE);
    let aggression = 0.5 * f64::from(u8::from(capture)) + 0.5 * threat_delta;

    FeatureVector::default()
        .with(
            Feature::Material,
            scaled(now.balance - before.balance, MATERIAL_SCALE),
        )
        .with(Feature::Check, if gives_check { 1.0 } else { 0.0 })
        .with(
            Feature::KingSafety,
            scaled(now.king_safety - before.king_safety, KING_SAFETY_SCALE),
        )
        .with(
            Feature::CenterControl,
            scaled(now.center - before.center, CENTER_SCALE),
        )
        .with(
            Feature::Mobility,
            scaled(now.mobility - before.mobility, MOBILITY_SCALE),
        )
        .with(Feature::Aggression, aggression)
}

#[cfg(test)]
#[path = "features_tests.rs"]
mod features_tests;
