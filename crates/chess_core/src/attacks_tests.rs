use super::*;

#[test]
fn test_attack_map_startpos() {
    let pos = Position::startpos();
    let white = AttackMap::build(&pos, Color::White);

    assert_eq!(white.count(19), 2); // d3: c2, e2
    assert_eq!(white.count(21), 3); // f3: e2, g2, Ng1
    assert_eq!(white.count(16), 2); // a3: b2, Nb1
    assert!(CENTER.iter().all(|&s| !white.attacks(s)));
}

#[test]
fn test_sliders_stop_at_first_blocker() {
    // Rook a1, blocker a4
    let pos = Position::from_fen("4k3/8/8/8/P7/8/8/R3K3 w - - 0 1").unwrap();
    let mut seen = Vec::new();
    for_each_attack(&pos, 0, |s| seen.push(s));
    assert!(seen.contains(&8)); // a2
    assert!(seen.contains(&24)); // a4 (defended)
    assert!(!seen.contains(&32)); // a5
    assert!(seen.contains(&3)); // d1
    assert!(seen.contains(&4)); // e1, the king stops the ray
    assert!(!seen.contains(&5));
}

#[test]
fn test_mobility_startpos() {
    let pos = Position::startpos();
    // Only the knights have somewhere to go
    assert_eq!(mobility(&pos, Color::White), 4);
    assert_eq!(mobility(&pos, Color::Black), 4);
}

#[test]
fn test_king_zone_sizes() {
    assert_eq!(king_zone(4).count(), 6); // e1
    assert_eq!(king_zone(0).count(), 4); // a1
    assert_eq!(king_zone(28).count(), 9); // e4
}
