use super::*;
use crate::pgn::read_game;

const ANNOTATED: &str = r#"[Event "Personality Self-Play"]
[Result "1-0"]
[PlyCount "7"]

1. e4 {eval=30, biasedEval=41.20, profile=aggressive, best=e2e4, bestEval=30, delta=0, feat=---}
1... e5 {eval=-25, biasedEval=-19.50, profile=defensive, best=c7c5, bestEval=-20, delta=-5, feat=---}
2. Qh5 {eval=10, biasedEval=52.00, profile=aggressive, best=g1f3, bestEval=40, delta=-30, feat=---}
2... Nc6 {eval=-20, biasedEval=-20.00, profile=defensive, best=b8c6, bestEval=-20, delta=0, feat=---}
3. Bc4 {eval=50, biasedEval=61.75, profile=aggressive, best=f1c4, bestEval=50, delta=0, feat=---}
3... Nf6 {eval=-35, biasedEval=-30.00, profile=defensive, best=d7d6, bestEval=-20, delta=-15, feat=---}
4. Qxf7# {eval=#1, biasedEval=99999.00, profile=aggressive, best=h5f7, bestEval=#1, delta=0, feat=CK-}
1-0
"#;

#[test]
fn test_parse_annotation() {
    let data = parse_annotation("eval=#-2, biasedEval=-3.50, profile=my profile, junk, =x");
    assert_eq!(data.len(), 3);
    assert_eq!(data["eval"], "#-2");
    assert_eq!(data["biasedEval"], "-3.50");
    assert_eq!(data["profile"], "my profile");
}

#[test]
fn test_clean_game_passes_check() {
    let game = read_game(ANNOTATED).unwrap();
    let report = check_game(&game);
    assert_eq!(report.errors, Vec::<String>::new());
    assert!(report.is_ok());
    assert_eq!(report.plies, 7);
    assert_eq!(report.result, "1-0");
}

#[test]
fn test_check_reports_each_problem() {
    let text = r#"[Result "*"]
[PlyCount "3"]

1. e4 {eval=30, biasedEval=30.00, best=e2e4, bestEval=30, delta=5, feat=---}
1... e5 {eval=10, biasedEval=x, profile=p, best=e2e4, bestEval=10, delta=0, feat=XYZ} *
"#;
    let report = check_game(&read_game(text).unwrap());
    let has = |needle: &str| report.errors.iter().any(|e| e.contains(needle));

    assert!(has("ply 1: missing keys [\"profile\"]"), "{:?}", report.errors);
    assert!(has("ply 1: delta mismatch: 5 != 30 - 30"));
    assert!(has("ply 1: positive delta 5"));
    assert!(has("ply 2: bad biasedEval 'x'"));
    assert!(has("ply 2: bad feat 'XYZ'"));
    assert!(has("ply 2: best move 'e2e4' is not legal"));
    assert!(has("PlyCount 3 does not match 2 moves"));
    assert_eq!(report.errors.len(), 7);
}

#[test]
fn test_check_flags_wrong_move_flags_and_partial_verbose() {
    let text = "1. e4 {eval=30, biasedEval=30.00, profile=p, best=e2e4, feat=C--} *\n";
    let report = check_game(&read_game(text).unwrap());
    assert!(report.errors.iter().any(|e| e.contains("incomplete verbose keys")));
    assert!(report.errors.iter().any(|e| e.contains("feat 'C--' does not match move e4")));
}

#[test]
fn test_check_reports_illegal_san() {
    let text = "1. e4 {eval=0, biasedEval=0.00, profile=p} 1... e4 {eval=0, biasedEval=0.00, profile=p} *\n";
    let report = check_game(&read_game(text).unwrap());
    assert_eq!(report.errors, ["ply 2: illegal move 'e4'"]);
}

#[test]
fn test_summary() {
    let summary = summarize(&read_game(ANNOTATED).unwrap());
    assert_eq!(summary.result, "1-0");
    assert_eq!(summary.plies, 7);
    assert_eq!(summary.captures_pct, 14.3);
    assert_eq!(summary.checks_pct, 14.3);
    assert_eq!(summary.castles_pct, 0.0);
    assert_eq!(summary.delta_avg, Some(-7.1));
    assert_eq!(summary.delta_std, Some(10.6));
    assert_eq!(summary.engine_agreement_pct, 57.1);
    assert_eq!(summary.profile_counts["aggressive"], 4);
    assert_eq!(summary.profile_counts["defensive"], 3);
}

#[test]
fn test_summary_without_annotations() {
    let summary = summarize(&read_game("1. e4 e5 2. Nf3 *\n").unwrap());
    assert_eq!(summary.plies, 3);
    assert_eq!(summary.delta_avg, None);
    assert_eq!(summary.delta_std, None);
    assert_eq!(summary.engine_agreement_pct, 0.0);
    assert!(summary.profile_counts.is_empty());
}

#[test]
fn test_single_delta_has_no_spread() {
    let text = "1. e4 {eval=0, biasedEval=0.00, profile=p, best=d2d4, bestEval=10, delta=-10, feat=---} *\n";
    let summary = summarize(&read_game(text).unwrap());
    assert_eq!(summary.delta_avg, Some(-10.0));
    assert_eq!(summary.delta_std, None);
}

#[test]
fn test_move_agreement() {
    let game = read_game(ANNOTATED).unwrap();
    let pct = move_agreement(&game).unwrap();
    assert!((pct - 400.0 / 7.0).abs() < 1e-9);
    assert_eq!(move_agreement(&read_game("1. e4 *\n").unwrap()), None);
}

#[test]
fn test_outcome_counts() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for (i, result) in ["1-0", "1/2-1/2", "1-0", "*"].iter().enumerate() {
        let path = dir.path().join(format!("g{i}.pgn"));
        std::fs::write(&path, format!("[Result \"{result}\"]\n\n1. e4 {result}\n")).unwrap();
        paths.push(path);
    }
    let counts = outcome_counts(&paths).unwrap();
    assert_eq!(counts["1-0"], 2);
    assert_eq!(counts["1/2-1/2"], 1);
    assert_eq!(counts["*"], 1);
    assert!(outcome_counts(&[dir.path().join("missing.pgn")]).is_err());
}

#[test]
fn test_check_replays_principal_variations() {
    let clean = "1. e4 {eval=30, biasedEval=30.00, profile=p, best=e2e4, bestEval=30, delta=0, feat=---, pv=e2e4 e7e5 g1f3 b8c6} *\n";
    assert!(check_game(&read_game(clean).unwrap()).is_ok());

    let text = "1. e4 {eval=30, biasedEval=30.00, profile=p, best=e2e4, bestEval=30, delta=0, feat=---, pv=e2e4 e2e4} \
                1... e5 {eval=-20, biasedEval=-20.00, profile=p, best=e7e5, bestEval=-20, delta=0, feat=---, pv=d7d5 e4d5} *\n";
    let report = check_game(&read_game(text).unwrap());
    assert_eq!(
        report.errors,
        [
            "ply 1: pv move 'e2e4' is not legal",
            "ply 2: pv starts with d7d5, not the played move e7e5",
        ]
    );
}
