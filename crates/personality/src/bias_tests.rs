use super::*;
use crate::features::{Feature, FeatureTable};
use chess_core::{Score, parse_uci_move};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn cand(pos: &Position, uci: &str, cp: i32) -> CandidateMove {
    CandidateMove::new(parse_uci_move(pos, uci).unwrap(), Score::Cp(cp))
}

/// e4 30, d4 28, Nf3 25 with aggression 0.1 / 0 / -0.2.
fn opening() -> (Position, Vec<CandidateMove>, FeatureTable) {
    let pos = Position::startpos();
    let cands = vec![
        cand(&pos, "e2e4", 30),
        cand(&pos, "d2d4", 28),
        cand(&pos, "g1f3", 25),
    ];
    let mut table = FeatureTable::new();
    table
        .insert("e2e4", FeatureVector::default().with(Feature::Aggression, 0.1))
        .insert("d2d4", FeatureVector::default())
        .insert("g1f3", FeatureVector::default().with(Feature::Aggression, -0.2));
    (pos, cands, table)
}

fn aggressive(risk_budget: f64) -> PersonalityProfile {
    PersonalityProfile::builder("aggressive")
        .weight(Feature::Aggression, 1.0)
        .risk_budget(risk_budget)
        .build()
        .unwrap()
}

#[test]
fn test_aggressive_profile_with_budget_picks_e4() {
    let (pos, cands, table) = opening();
    let engine = BiasEngine::with_features(table.clone());
    let mut rng = StdRng::seed_from_u64(1);

    let sel = engine.select(&cands, &aggressive(5.0), &pos, &mut rng).unwrap();

    assert_eq!(sel.candidate.mv.to_string(), "e2e4");
    assert!((sel.biased - 30.1).abs() < 1e-9);
    assert_eq!(sel.best_objective, 30.0);
    assert_eq!(sel.objective, 30.0);
    assert_eq!(sel.delta(), 0.0);
    assert!(!sel.bias_decided());
    // Nf3 trails by exactly the budget, so it stays admissible.
    assert_eq!(sel.admissible, 3);

    let profile = aggressive(5.0);
    let biased: Vec<f64> = cands
        .iter()
        .map(|c| c.objective() + profile.weights().apply(&table.features(&pos, c)))
        .collect();
    for (got, want) in biased.iter().zip([30.1, 28.0, 24.8]) {
        assert!((got - want).abs() < 1e-9, "{biased:?}");
    }
}

#[test]
fn test_zero_budget_keeps_only_best() {
    let (pos, cands, table) = opening();
    let engine = BiasEngine::with_features(table);
    let mut rng = StdRng::seed_from_u64(1);

    let sel = engine.select(&cands, &aggressive(0.0), &pos, &mut rng).unwrap();

    assert_eq!(sel.candidate.mv.to_string(), "e2e4");
    assert_eq!(sel.admissible, 1);
}

#[test]
fn test_bias_can_overturn_engine_order_within_budget() {
    let (pos, cands, _) = opening();
    let mut table = FeatureTable::new();
    table.insert("g1f3", FeatureVector::default().with(Feature::Mobility, 1.0));
    let profile = PersonalityProfile::builder("active")
        .weight(Feature::Mobility, 10.0)
        .risk_budget(5.0)
        .build()
        .unwrap();

    let engine = BiasEngine::with_features(table);
    let sel = engine
        .select(&cands, &profile, &pos, &mut StdRng::seed_from_u64(0))
        .unwrap();

    assert_eq!(sel.candidate.mv.to_string(), "g1f3");
    assert_eq!(sel.index, 2);
    assert!(sel.bias_decided());
    assert_eq!(sel.delta(), -5.0);
    assert_eq!(sel.best_move.to_string(), "e2e4");
}

#[test]
fn test_budget_excludes_strong_bias_outside_it() {
    let (pos, cands, _) = opening();
    let mut table = FeatureTable::new();
    table.insert("g1f3", FeatureVector::default().with(Feature::Mobility, 1.0));
    let profile = PersonalityProfile::builder("active")
        .weight(Feature::Mobility, 1000.0)
        .risk_budget(4.0)
        .build()
        .unwrap();

    let sel = BiasEngine::with_features(table)
        .select(&cands, &profile, &pos, &mut StdRng::seed_from_u64(0))
        .unwrap();

    assert_ne!(sel.candidate.mv.to_string(), "g1f3");
}

#[test]
fn test_null_profile_picks_max_objective() {
    let pos = Position::startpos();
    let cands = vec![
        cand(&pos, "d2d4", 12),
        cand(&pos, "e2e4", 31),
        cand(&pos, "c2c4", 20),
    ];
    let sel = BiasEngine::new()
        .select(
            &cands,
            &PersonalityProfile::null("null"),
            &pos,
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();
    assert_eq!(sel.candidate.mv.to_string(), "e2e4");
    assert_eq!(sel.index, 1);
}

#[test]
fn test_empty_candidates_is_an_error() {
    let pos = Position::startpos();
    let err = BiasEngine::new()
        .select(
            &[],
            &PersonalityProfile::null("null"),
            &pos,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
    assert_eq!(err, SelectError::NoCandidates);
}

#[test]
fn test_single_candidate_short_circuits() {
    let pos = Position::startpos();
    let only = vec![cand(&pos, "a2a3", -40)];
    let profile = PersonalityProfile::builder("wild")
        .weight(Feature::Check, 500.0)
        .temperature(100.0)
        .build()
        .unwrap();

    let sel = BiasEngine::new()
        .select(&only, &profile, &pos, &mut StdRng::seed_from_u64(0))
        .unwrap();

    assert_eq!(sel.candidate, only[0]);
    assert_eq!(sel.biased, -40.0);
    assert_eq!(sel.features, FeatureVector::default());
    assert!(!sel.bias_decided());
}

#[test]
fn test_ties_prefer_smaller_gap_then_uci_order() {
    let pos = Position::startpos();
    // b1c3 and g1f3 end on the same biased score; g1f3 is objectively closer.
    let cands = vec![
        cand(&pos, "e2e4", 30),
        cand(&pos, "g1f3", 28),
        cand(&pos, "b1c3", 26),
    ];
    let mut table = FeatureTable::new();
    table
        .insert("g1f3", FeatureVector::default().with(Feature::Mobility, 0.5))
        .insert("b1c3", FeatureVector::default().with(Feature::Mobility, 0.75));
    let profile = PersonalityProfile::builder("knights")
        .weight(Feature::Mobility, 8.0)
        .risk_budget(10.0)
        .build()
        .unwrap();

    let engine = BiasEngine::with_features(table);
    let sel = engine
        .select(&cands, &profile, &pos, &mut StdRng::seed_from_u64(0))
        .unwrap();
    assert_eq!(sel.candidate.mv.to_string(), "g1f3");

    // Equal objective and equal bias: alphabetical UCI decides.
    let level = vec![cand(&pos, "g1f3", 20), cand(&pos, "b1c3", 20)];
    let sel = BiasEngine::with_features(FeatureTable::new())
        .select(
            &level,
            &PersonalityProfile::null("null"),
            &pos,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
    assert_eq!(sel.candidate.mv.to_string(), "b1c3");
}

#[test]
fn test_mate_beats_any_centipawn_score() {
    let pos = Position::startpos();
    let cands = vec![
        cand(&pos, "e2e4", 900),
        CandidateMove::new(parse_uci_move(&pos, "d2d4").unwrap(), Score::Mate(3)),
    ];
    let sel = BiasEngine::with_features(FeatureTable::new())
        .select(
            &cands,
            &PersonalityProfile::null("null"),
            &pos,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
    assert_eq!(sel.candidate.mv.to_string(), "d2d4");
}

#[test]
fn test_sampling_is_reproducible_for_a_seed() {
    let (pos, cands, table) = opening();
    let profile = PersonalityProfile::builder("sampler")
        .weight(Feature::Aggression, 1.0)
        .risk_budget(10.0)
        .temperature(5.0)
        .build()
        .unwrap();
    let engine = BiasEngine::with_features(table);

    let run = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..20)
            .map(|_| {
                engine
                    .select(&cands, &profile, &pos, &mut rng)
                    .unwrap()
                    .candidate
                    .mv
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(run(42), run(42));
    let picks = run(7);
    assert!(picks.iter().all(|mv| cands.iter().any(|c| c.mv == *mv)));
}

#[test]
fn test_sampling_spreads_over_admissible_moves() {
    let (pos, cands, table) = opening();
    let profile = PersonalityProfile::builder("hot")
        .risk_budget(10.0)
        .temperature(50.0)
        .build()
        .unwrap();
    let engine = BiasEngine::with_features(table);
    let mut rng = StdRng::seed_from_u64(9);

    let mut seen = std::collections::HashSet::new();
    for _ in 0..200 {
        seen.insert(engine.select(&cands, &profile, &pos, &mut rng).unwrap().index);
    }
    assert_eq!(seen.len(), 3);
}

#[test]
fn test_heuristic_features_feed_selection() {
    let pos = Position::startpos();
    let cands = vec![cand(&pos, "a2a3", 10), cand(&pos, "e2e4", 9)];
    let profile = PersonalityProfile::builder("center")
        .weight(Feature::CenterControl, 20.0)
        .risk_budget(5.0)
        .build()
        .unwrap();

    let sel = BiasEngine::new()
        .select(&cands, &profile, &pos, &mut StdRng::seed_from_u64(0))
        .unwrap();
    assert_eq!(sel.candidate.mv.to_string(), "e2e4");
    assert!(sel.features.get(Feature::CenterControl) > 0.0);
}

fn startpos_candidates(scores: &[i32]) -> Vec<CandidateMove> {
    let pos = Position::startpos();
    chess_core::legal_moves(&pos)
        .into_iter()
        .zip(scores)
        .map(|(mv, cp)| CandidateMove::new(mv, Score::Cp(*cp)))
        .collect()
}

fn weights_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-200.0..200.0f64, Feature::COUNT)
}

fn profile_from(weights: &[f64], budget: f64, temperature: f64) -> PersonalityProfile {
    Feature::ALL
        .into_iter()
        .zip(weights)
        .fold(PersonalityProfile::builder("prop"), |b, (f, w)| b.weight(f, *w))
        .risk_budget(budget)
        .temperature(temperature)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_choice_stays_within_budget(
        scores in prop::collection::vec(-500..500i32, 1..20),
        weights in weights_strategy(),
        budget in 0.0..300.0f64,
        temperature in prop_oneof![Just(0.0), 0.5..100.0f64],
        seed in any::<u64>(),
    ) {
        let pos = Position::startpos();
        let cands = startpos_candidates(&scores);
        let profile = profile_from(&weights, budget, temperature);
        let mut rng = StdRng::seed_from_u64(seed);

        let sel = BiasEngine::new().select(&cands, &profile, &pos, &mut rng).unwrap();

        let best = cands.iter().map(|c| c.objective()).fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(sel.best_objective, best);
        prop_assert!(sel.objective >= best - budget);
        prop_assert!(cands.iter().any(|c| c.mv == sel.candidate.mv));
    }

    #[test]
    fn prop_zero_weights_pick_the_best(
        scores in prop::collection::vec(-500..500i32, 1..20),
        budget in 0.0..300.0f64,
    ) {
        let pos = Position::startpos();
        let cands = startpos_candidates(&scores);
        let profile = profile_from(&[0.0; Feature::COUNT], budget, 0.0);

        let sel = BiasEngine::new()
            .select(&cands, &profile, &pos, &mut StdRng::seed_from_u64(0))
            .unwrap();

        prop_assert_eq!(sel.objective, sel.best_objective);
    }

    #[test]
    fn prop_temperature_zero_is_deterministic(
        scores in prop::collection::vec(-500..500i32, 1..20),
        weights in weights_strategy(),
        budget in 0.0..300.0f64,
        seeds in (any::<u64>(), any::<u64>()),
    ) {
        let pos = Position::startpos();
        let cands = startpos_candidates(&scores);
        let profile = profile_from(&weights, budget, 0.0);
        let engine = BiasEngine::new();

        let a = engine.select(&cands, &profile, &pos, &mut StdRng::seed_from_u64(seeds.0)).unwrap();
        let b = engine.select(&cands, &profile, &pos, &mut StdRng::seed_from_u64(seeds.1)).unwrap();
        prop_assert_eq!(a, b);
    }
}
