use super::*;
use chess_core::{Score, legal_moves, parse_uci_move};

fn features_of(fen: &str, uci: &str) -> FeatureVector {
    let pos = Position::from_fen(fen).unwrap();
    let mv = parse_uci_move(&pos, uci).unwrap();
    extract(&pos, mv)
}

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

#[test]
fn test_feature_names_round_trip() {
    for f in Feature::ALL {
        assert_eq!(Feature::from_name(f.name()), Some(f));
        assert_eq!(f.name().parse::<Feature>(), Ok(f));
    }
    assert_eq!(Feature::from_name("speed"), None);
    assert!(Feature::known_names().contains("king_safety"));
}

#[test]
fn test_vector_clamps_and_drops_non_finite() {
    let v = FeatureVector::default()
        .with(Feature::Material, 3.0)
        .with(Feature::Check, -7.5)
        .with(Feature::Mobility, f64::NAN)
        .with(Feature::Aggression, 0.25);
    assert_eq!(v.get(Feature::Material), 1.0);
    assert_eq!(v.get(Feature::Check), -1.0);
    assert_eq!(v.get(Feature::Mobility), 0.0);
    assert_eq!(v.get(Feature::Aggression), 0.25);
    assert_eq!(v.get(Feature::KingSafety), 0.0);
}

#[test]
fn test_central_pawn_push_gains_center() {
    let v = features_of(chess_core::STARTPOS_FEN, "e2e4");
    assert_eq!(v.get(Feature::Material), 0.0);
    assert_eq!(v.get(Feature::Check), 0.0);
    assert!(v.get(Feature::CenterControl) > 0.0);
    assert!(v.get(Feature::Mobility) > 0.0, "e4 opens the bishop and queen");
}

#[test]
fn test_rook_pawn_push_gains_no_center() {
    let v = features_of(chess_core::STARTPOS_FEN, "h2h3");
    assert_eq!(v.get(Feature::CenterControl), 0.0);
}

#[test]
fn test_capture_scores_material_and_aggression() {
    let v = features_of("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5");
    assert!((v.get(Feature::Material) - 100.0 / 900.0).abs() < 1e-9);
    assert!(v.get(Feature::Aggression) > 0.25);
}

#[test]
fn test_quiet_check_detected() {
    let v = features_of("4k3/8/8/8/8/8/8/R3K3 w - - 0 1", "a1a8");
    assert_eq!(v.get(Feature::Check), 1.0);
    assert_eq!(v.get(Feature::Material), 0.0);
}

#[test]
fn test_shield_pawn_advance_hurts_king_safety() {
    let v = features_of("6k1/8/8/8/8/8/5PPP/6K1 w - - 0 1", "g2g4");
    assert!(v.get(Feature::KingSafety) < 0.0);
}

#[test]
fn test_every_value_in_range_and_deterministic() {
    let pos = Position::from_fen(KIWIPETE).unwrap();
    for mv in legal_moves(&pos) {
        let a = extract(&pos, mv);
        let b = extract(&pos, mv);
        assert_eq!(a, b, "{mv} not deterministic");
        for (f, x) in a.iter() {
            assert!((-1.0..=1.0).contains(&x), "{f} = {x} for {mv}");
        }
    }
}

#[test]
fn test_table_source_defaults_to_zero() {
    let pos = Position::startpos();
    let e4 = CandidateMove::new(parse_uci_move(&pos, "e2e4").unwrap(), Score::Cp(30));
    let d4 = CandidateMove::new(parse_uci_move(&pos, "d2d4").unwrap(), Score::Cp(28));

    let mut table = FeatureTable::new();
    table.insert("e2e4", FeatureVector::default().with(Feature::Aggression, 0.5));

    assert_eq!(table.features(&pos, &e4).get(Feature::Aggression), 0.5);
    assert_eq!(table.features(&pos, &d4), FeatureVector::default());
}

#[test]
fn test_heuristic_source_matches_extract() {
    let pos = Position::startpos();
    let mv = parse_uci_move(&pos, "g1f3").unwrap();
    let cand = CandidateMove::new(mv, Score::Cp(25));
    assert_eq!(HeuristicFeatures.features(&pos, &cand), extract(&pos, mv));
}
