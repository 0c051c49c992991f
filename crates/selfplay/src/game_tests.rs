use std::collections::VecDeque;
use std::time::Duration;

use chess_core::{RulesError, Score, coord_to_sq};
use classical_engine::ClassicalGateway;
use personality::ProfileLibrary;

use super::*;
use crate::pgn::PgnWriter;

enum Reply {
    Moves(Vec<(&'static str, Score)>),
    Fail,
}

/// Replays canned answers in order; runs dry with a timeout.
#[derive(Default)]
struct ScriptedGateway {
    replies: VecDeque<Reply>,
    calls: usize,
    new_games: usize,
}

impl ScriptedGateway {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            ..Self::default()
        }
    }

    /// One candidate per ply, in order.
    fn line(moves: &[&'static str]) -> Self {
        Self::new(
            moves
                .iter()
                .map(|&m| Reply::Moves(vec![(m, Score::Cp(0))]))
                .collect(),
        )
    }
}

/// Bare from/to move, with no castling or en-passant flags.
fn raw_move(uci: &str) -> Move {
    let from = coord_to_sq(&uci[0..2]).unwrap();
    let to = coord_to_sq(&uci[2..4]).unwrap();
    Move::new(from, to)
}

impl EngineGateway for ScriptedGateway {
    fn candidates(
        &mut self,
        _pos: &Position,
        _max_candidates: usize,
        _limits: &SearchLimits,
    ) -> Result<Vec<CandidateMove>, EngineError> {
        self.calls += 1;
        match self.replies.pop_front() {
            Some(Reply::Moves(moves)) => Ok(moves
                .into_iter()
                .map(|(uci, score)| CandidateMove::new(raw_move(uci), score))
                .collect()),
            Some(Reply::Fail) | None => Err(EngineError::Timeout(Duration::from_millis(5))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        self.new_games += 1;
        Ok(())
    }
}

fn null(name: &str) -> Arc<PersonalityProfile> {
    Arc::new(PersonalityProfile::null(name))
}

fn settings(max_plies: u32) -> GameSettings {
    GameSettings {
        max_plies,
        limits: SearchLimits::depth(1),
        seed: Some(7),
        ..GameSettings::default()
    }
}

fn scripted_game(gateway: ScriptedGateway, max_plies: u32) -> Game<ScriptedGateway> {
    Game::new(gateway, null("white-null"), null("black-null"), settings(max_plies))
}

fn run<G: EngineGateway>(game: &mut Game<G>) -> GameState {
    loop {
        if let GameState::Finished(outcome) = game.step() {
            return GameState::Finished(outcome);
        }
    }
}

#[test]
fn test_fools_mate_finishes_with_checkmate() {
    let mut game = scripted_game(ScriptedGateway::line(&["f2f3", "e7e5", "g2g4", "d8h4"]), 100);
    assert_eq!(game.state(), GameState::NotStarted);

    let state = run(&mut game);
    assert_eq!(
        state,
        GameState::Finished(Outcome::Checkmate {
            winner: Color::Black
        })
    );
    let record = game.record();
    assert_eq!(record.plies().len(), 4);
    assert_eq!(record.result(), "0-1");
    assert_eq!(record.plies()[3].san, "Qh4#");
    assert!(record.plies()[3].check);
    assert_eq!(record.plies()[0].profile, "white-null");
    assert_eq!(record.plies()[1].profile, "black-null");
    assert_eq!(game.gateway().calls, 4);
    assert_eq!(game.gateway().new_games, 1);
}

#[test]
fn test_step_after_finish_is_a_no_op() {
    let mut game = scripted_game(ScriptedGateway::line(&["e2e4"]), 1);
    let outcome = Outcome::DrawByRule(DrawRule::PlyLimit);
    assert_eq!(game.step(), GameState::Finished(outcome));
    assert_eq!(game.step(), GameState::Finished(outcome));
    assert_eq!(game.record().plies().len(), 1);
    assert_eq!(game.gateway().calls, 1);
}

#[test]
fn test_ply_limit_is_a_draw() {
    let mut game = scripted_game(ScriptedGateway::line(&["g1f3", "g8f6", "f3g1"]), 3);
    let state = run(&mut game);
    assert_eq!(state, GameState::Finished(Outcome::DrawByRule(DrawRule::PlyLimit)));
    assert_eq!(game.record().result(), "1/2-1/2");
    assert_eq!(game.record().plies().len(), 3);
}

#[test]
fn test_threefold_repetition_ends_game() {
    let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"];
    let mut game = scripted_game(ScriptedGateway::line(&shuffle), 100);
    let state = run(&mut game);
    assert_eq!(
        state,
        GameState::Finished(Outcome::DrawByRule(DrawRule::ThreefoldRepetition))
    );
    assert_eq!(game.record().plies().len(), 8);
}

#[test]
fn test_retries_recover_from_engine_failures() {
    let gateway = ScriptedGateway::new(vec![
        Reply::Fail,
        Reply::Moves(vec![]),
        Reply::Moves(vec![("e2e4", Score::Cp(30))]),
    ]);
    let mut game = scripted_game(gateway, 1);
    let state = run(&mut game);
    assert_eq!(state, GameState::Finished(Outcome::DrawByRule(DrawRule::PlyLimit)));
    assert_eq!(game.gateway().calls, 3);
    assert_eq!(game.record().plies()[0].uci, "e2e4");
}

#[test]
fn test_exhausted_retries_abort_with_engine_failure() {
    let gateway = ScriptedGateway::new(vec![Reply::Fail, Reply::Fail, Reply::Fail, Reply::Fail]);
    let mut game = scripted_game(gateway, 10);
    let state = run(&mut game);
    assert_eq!(
        state,
        GameState::Finished(Outcome::Aborted(AbortReason::EngineFailure))
    );
    // One attempt plus two retries.
    assert_eq!(game.gateway().calls, 3);
    assert!(game.record().plies().is_empty());
    assert_eq!(game.record().result(), "*");
    assert!(game.record().abort_detail().unwrap().contains("did not answer"));
}

#[test]
fn test_illegal_candidate_is_an_engine_failure() {
    let bad = || Reply::Moves(vec![("e2e5", Score::Cp(900))]);
    let mut game = scripted_game(ScriptedGateway::new(vec![bad(), bad(), bad()]), 10);
    let state = run(&mut game);
    assert_eq!(
        state,
        GameState::Finished(Outcome::Aborted(AbortReason::EngineFailure))
    );
    assert!(game.record().abort_detail().unwrap().contains("e2e5"));
}

#[test]
fn test_castling_flags_come_from_the_rules() {
    let fen = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";
    let mut s = settings(1);
    s.start = Position::from_fen(fen).unwrap();
    s.custom_start = true;
    let mut game = Game::new(
        ScriptedGateway::line(&["e1g1"]),
        null("w"),
        null("b"),
        s,
    );
    run(&mut game);
    let ply = &game.record().plies()[0];
    assert!(ply.castle);
    assert_eq!(ply.san, "O-O");
    assert_eq!(game.record().metadata.start_fen.as_deref(), Some(fen));
}

struct RejectingRules;

impl Rules for RejectingRules {
    fn legal_moves(&self, pos: &Position) -> Vec<Move> {
        StandardRules.legal_moves(pos)
    }

    fn apply_move(&self, pos: &Position, mv: Move) -> Result<Position, RulesError> {
        Err(RulesError::IllegalMove {
            mv: mv.to_string(),
            fen: pos.to_fen(),
        })
    }

    fn terminal_state(&self, pos: &Position, history: &[u64]) -> Option<Terminal> {
        StandardRules.terminal_state(pos, history)
    }
}

#[test]
fn test_rejected_move_aborts_with_rules_violation() {
    let mut game = scripted_game(ScriptedGateway::line(&["e2e4"]), 10).with_rules(RejectingRules);
    let state = run(&mut game);
    assert_eq!(
        state,
        GameState::Finished(Outcome::Aborted(AbortReason::RulesViolation))
    );
    assert!(game.record().plies().is_empty());
}

#[test]
fn test_cancel_before_start_plays_nothing() {
    let token = CancelToken::new();
    token.cancel();
    let mut game = scripted_game(ScriptedGateway::line(&["e2e4"]), 10).with_cancel(token);
    assert_eq!(
        game.step(),
        GameState::Finished(Outcome::Aborted(AbortReason::Cancelled))
    );
    assert_eq!(game.gateway().calls, 0);
    assert_eq!(game.record().outcome().map(Outcome::termination), Some("unterminated"));
}

#[test]
fn test_cancel_between_plies_keeps_played_moves() {
    let token = CancelToken::new();
    let mut game =
        scripted_game(ScriptedGateway::line(&["e2e4", "e7e5", "g1f3"]), 10).with_cancel(token.clone());
    assert_eq!(game.step(), GameState::InProgress);
    assert_eq!(game.step(), GameState::InProgress);
    token.cancel();
    assert_eq!(
        game.step(),
        GameState::Finished(Outcome::Aborted(AbortReason::Cancelled))
    );
    assert_eq!(game.record().plies().len(), 2);
}

#[test]
fn test_finished_start_position_needs_no_engine() {
    let mut s = settings(10);
    s.start =
        Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
    s.custom_start = true;
    let game = Game::new(ScriptedGateway::default(), null("w"), null("b"), s);
    let record = game.play();
    assert_eq!(
        record.outcome(),
        Some(Outcome::Checkmate {
            winner: Color::Black
        })
    );
    assert!(record.plies().is_empty());
}

#[test]
fn test_null_profiles_follow_the_engine() {
    let gateway = ScriptedGateway::new(vec![Reply::Moves(vec![
        ("d2d4", Score::Cp(25)),
        ("e2e4", Score::Cp(40)),
        ("g1f3", Score::Cp(20)),
    ])]);
    let mut game = scripted_game(gateway, 1);
    run(&mut game);
    let ply = &game.record().plies()[0];
    assert_eq!(ply.uci, "e2e4");
    assert_eq!(ply.best_uci, "e2e4");
    assert_eq!(ply.best, Score::Cp(40));
    assert!(!ply.bias_decided);
    assert_eq!(ply.candidates, 3);
    assert_eq!(ply.delta_cp(), 0);
}

#[test]
fn test_classical_self_play_game_is_annotated() {
    let lib = ProfileLibrary::builtin().unwrap();
    let white = lib.get("aggressive").unwrap();
    let black = lib.get("defensive").unwrap();
    let budgets = [white.risk_budget(), black.risk_budget()];
    let game = Game::new(ClassicalGateway::new(), white, black, settings(16));
    let record = game.play();

    let outcome = record.outcome().unwrap();
    assert!(!outcome.is_aborted(), "{outcome}");
    assert!(!record.plies().is_empty());
    assert!(record.plies().len() <= 16);
    for (i, ply) in record.plies().iter().enumerate() {
        assert_eq!(ply.ply as usize, i + 1);
        let expected = if i % 2 == 0 { "aggressive" } else { "defensive" };
        assert_eq!(ply.profile, expected);
        assert!(ply.delta_cp() <= 0);
        assert!(-(ply.delta_cp() as f64) <= budgets[i % 2], "ply {}", ply.ply);
    }

    let pgn = PgnWriter::new(true).render(&record);
    assert_eq!(pgn.matches("eval=").count(), record.plies().len());
    assert_eq!(pgn.matches("bestEval=").count(), record.plies().len());
}

#[test]
fn test_fixed_seed_replays_the_same_game() {
    let lib = ProfileLibrary::builtin().unwrap();
    let play = || {
        let p = lib.get("tactician").unwrap();
        Game::new(ClassicalGateway::new(), Arc::clone(&p), p, settings(12)).play()
    };
    let first: Vec<String> = play().plies().iter().map(|p| p.uci.clone()).collect();
    let second: Vec<String> = play().plies().iter().map(|p| p.uci.clone()).collect();
    assert_eq!(first, second);
}

/// Answers with the first legal move and a long line of first legal moves
/// after it, remembering the depth of every request.
#[derive(Default)]
struct LongLineGateway {
    depths: Vec<u8>,
}

impl EngineGateway for LongLineGateway {
    fn candidates(
        &mut self,
        pos: &Position,
        _max_candidates: usize,
        limits: &SearchLimits,
    ) -> Result<Vec<CandidateMove>, EngineError> {
        self.depths.push(limits.depth);
        let mut line = Vec::new();
        let mut cursor = pos.clone();
        while line.len() < 9 {
            let Some(&mv) = chess_core::legal_moves(&cursor).first() else {
                break;
            };
            line.push(mv);
            cursor.make_move(mv);
        }
        let mut candidate = CandidateMove::new(line[0], Score::Cp(0));
        candidate.pv = line;
        Ok(vec![candidate])
    }

    fn name(&self) -> &str {
        "long-line"
    }
}

#[test]
fn test_recorded_line_is_capped_and_starts_with_the_move() {
    let mut game = Game::new(
        LongLineGateway::default(),
        null("white-null"),
        null("black-null"),
        settings(2),
    );
    run(&mut game);
    for ply in game.record().plies() {
        assert_eq!(ply.pv.len(), PV_LIMIT);
        assert_eq!(ply.pv[0], ply.uci);
    }
}

#[test]
fn test_depth_can_differ_per_side() {
    let settings = GameSettings {
        depth_white: Some(3),
        ..settings(4)
    };
    let mut game = Game::new(
        LongLineGateway::default(),
        null("white-null"),
        null("black-null"),
        settings,
    );
    run(&mut game);
    assert_eq!(game.gateway().depths, [3, 1, 3, 1]);
}
