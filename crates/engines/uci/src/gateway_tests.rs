use super::*;
use chess_core::Score;

fn info(multipv: u16, score: Score, pv: &[&str]) -> InfoLine {
    InfoLine {
        depth: Some(8),
        multipv,
        score: Some(score),
        pv: pv.iter().map(|s| s.to_string()).collect(),
        ..InfoLine::default()
    }
}

#[test]
fn test_setoptions_order() {
    let mut config = UciConfig::new("/usr/bin/stockfish");
    config.hash_mb = Some(256);
    config.threads = Some(2);
    config.skill_level = Some(20);
    config.options.insert("UCI_ShowWDL".into(), "false".into());

    let opts = config.setoptions();
    let names: Vec<_> = opts.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["Hash", "Threads", "Skill Level", "UCI_ShowWDL"]);
    assert_eq!(opts[0].1, "256");
}

#[test]
fn test_gateway_named_after_binary_until_handshake() {
    let gw = UciGateway::new(UciConfig::new("/opt/engines/stockfish-16"));
    assert_eq!(gw.name(), "stockfish-16");
    assert!(!gw.is_running());
}

#[test]
fn test_to_candidate_walks_pv() {
    let pos = Position::startpos();
    let c = to_candidate(&pos, 2, info(2, Score::Cp(25), &["d2d4", "d7d5", "c2c4"])).unwrap();
    assert_eq!(c.mv.to_string(), "d2d4");
    assert_eq!(c.rank, 2);
    assert_eq!(c.depth, 8);
    assert_eq!(c.pv.len(), 3);
}

#[test]
fn test_to_candidate_truncates_bad_tail() {
    let pos = Position::startpos();
    let c = to_candidate(&pos, 1, info(1, Score::Cp(25), &["e2e4", "e2e4"])).unwrap();
    assert_eq!(c.pv.len(), 1);
}

#[test]
fn test_to_candidate_rejects_illegal_first_move() {
    let pos = Position::startpos();
    let err = to_candidate(&pos, 1, info(1, Score::Cp(25), &["e2e5"])).unwrap_err();
    assert!(matches!(err, EngineError::IllegalMove { ref mv, .. } if mv == "e2e5"));
}
