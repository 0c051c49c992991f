use super::*;
use chess_core::Position;

fn run(fen: &str, depth: u8) -> RootOutcome {
    let pos = Position::from_fen(fen).unwrap();
    let tc = TimeControl::new(None);
    tc.start();
    let mut nodes = 0;
    score_root_moves(&pos, depth, &mut nodes, &tc)
}

fn best(outcome: &RootOutcome) -> RootScore {
    *outcome.scores.iter().max_by_key(|s| s.raw).unwrap()
}

#[test]
fn test_scores_every_root_move_from_start() {
    let pos = Position::startpos();
    let tc = TimeControl::new(None);
    tc.start();
    let mut nodes = 0;
    let outcome = score_root_moves(&pos, 3, &mut nodes, &tc);
    assert!(!outcome.stopped);
    assert_eq!(outcome.scores.len(), 20);
    assert!(nodes > 20);
}

#[test]
fn test_finds_mate_in_one() {
    // Back-rank mate: Qe8#
    let outcome = run("6k1/5ppp/8/8/8/8/5PPP/4Q1K1 w - - 0 1", 2);
    let top = best(&outcome);
    assert_eq!(top.mv.to_string(), "e1e8");
    assert_eq!(top.score(), Score::Mate(1));
}

#[test]
fn test_prefers_winning_the_queen() {
    let outcome = run("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1", 2);
    assert_eq!(best(&outcome).mv.to_string(), "d1d5");
}

#[test]
fn test_walking_into_mate_scores_as_mated() {
    // Leaving the back rank allows ...Re1#.
    let outcome = run("4r1k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1", 2);
    let leaving = outcome
        .scores
        .iter()
        .find(|s| s.mv.to_string() == "d1d7")
        .unwrap();
    assert_eq!(leaving.score(), Score::Mate(-1));
    assert!(best(&outcome).raw > -MATE_BOUND);
}

#[test]
fn test_mate_conversion() {
    let mv = Move::new(12, 28);
    assert_eq!(RootScore { mv, raw: MATE_VALUE - 1 }.score(), Score::Mate(1));
    assert_eq!(RootScore { mv, raw: MATE_VALUE - 3 }.score(), Score::Mate(2));
    assert_eq!(RootScore { mv, raw: -(MATE_VALUE - 2) }.score(), Score::Mate(-1));
    assert_eq!(RootScore { mv, raw: 42 }.score(), Score::Cp(42));
}

#[test]
fn test_stopped_clock_reports_stopped() {
    let pos = Position::startpos();
    let tc = TimeControl::new(None);
    tc.start();
    tc.stop();
    let mut nodes = 0;
    let outcome = score_root_moves(&pos, 4, &mut nodes, &tc);
    assert!(outcome.stopped);
    assert!(outcome.scores.is_empty());
}

#[test]
fn test_no_legal_moves_gives_empty_scores() {
    let outcome = run("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1", 3);
    assert!(!outcome.stopped);
    assert!(outcome.scores.is_empty());
}
