use broadside::{
    Cell, Engine, EngineConfig, EngineError, ErrorKind, MatchId, MatchStatus, Orientation, Participant,
    ShotClass, SunkShip,
};

/// Every ship horizontal from column 0, one every other row, Destroyer on top.
const LAYOUT: [(&str, usize); 5] = [
    ("Destroyer", 0),
    ("Carrier", 2),
    ("Battleship", 4),
    ("Cruiser", 6),
    ("Submarine", 8),
];

fn fleet_cells() -> Vec<(usize, usize)> {
    let lengths = [2, 5, 4, 3, 3];
    LAYOUT
        .iter()
        .zip(lengths)
        .flat_map(|(&(_, row), len)| (0..len).map(move |y| (row, y)))
        .collect()
}

fn place_fleet(engine: &Engine, id: MatchId, side: &str) {
    for (name, row) in LAYOUT {
        engine.place_ship(id, side, name, row, 0, Orientation::Horizontal).unwrap();
    }
}

fn battle(engine: &Engine) -> MatchId {
    let game = engine
        .create_match(Participant::human("ann"), Some(Participant::human("ben")))
        .unwrap();
    for side in ["ann", "ben"] {
        place_fleet(engine, game.id, side);
        engine.mark_ready(game.id, side).unwrap();
    }
    game.id
}

#[test]
fn destroyer_goes_down_in_two_shots() {
    let engine = Engine::quiet(EngineConfig::default());
    let id = battle(&engine);

    let first = engine.fire(id, "ann", 0, 0).unwrap();
    assert_eq!(first.result, ShotClass::Hit);
    assert_eq!(first.sunk, None);

    let second = engine.fire(id, "ann", 0, 1).unwrap();
    assert_eq!(second.result, ShotClass::Sunk);
    assert_eq!(
        second.sunk,
        Some(SunkShip {
            name: "Destroyer".into(),
            cells: vec![(0, 0), (0, 1)]
        })
    );
    assert_eq!(second.winner, None);

    let board = engine.board(id, "ben").unwrap();
    assert_eq!(board.cell_at(0, 0), Some(Cell::Sunk));
    assert_eq!(board.cell_at(0, 1), Some(Cell::Sunk));
    assert!(engine.placement(id, "ben").unwrap().ship("Destroyer").unwrap().sunk);

    let game = engine.match_state(id).unwrap();
    assert_eq!(game.status, MatchStatus::Battle);
    assert_eq!(game.host.shots, 2);
    assert_eq!(game.current_turn.as_deref(), Some("ann"));
}

#[test]
fn second_shot_on_a_cell_changes_nothing() {
    let engine = Engine::quiet(EngineConfig::default());
    let id = battle(&engine);
    assert_eq!(engine.fire(id, "ann", 0, 0).unwrap().result, ShotClass::Hit);
    let board = engine.board(id, "ben").unwrap();

    let again = engine.fire(id, "ann", 0, 0).unwrap();
    assert_eq!(again.result, ShotClass::AlreadyHit);
    assert_eq!(engine.board(id, "ben").unwrap(), board);

    let moves = engine.moves(id).unwrap();
    assert_eq!(moves.len(), 2);
    assert_eq!(moves[1].prev_cell, Cell::Hit);
    assert_eq!(moves[1].result, ShotClass::AlreadyHit);
}

#[test]
fn miss_hands_the_turn_over() {
    let engine = Engine::quiet(EngineConfig::default());
    let id = battle(&engine);
    assert_eq!(engine.fire(id, "ann", 9, 9).unwrap().result, ShotClass::Miss);
    assert_eq!(engine.board(id, "ben").unwrap().cell_at(9, 9), Some(Cell::Miss));

    let err = engine.fire(id, "ann", 9, 8).unwrap_err();
    assert!(matches!(err, EngineError::NotYourTurn { .. }));
    assert_eq!(err.kind(), ErrorKind::User);

    assert_eq!(engine.fire(id, "ben", 1, 1).unwrap().result, ShotClass::Miss);
    let game = engine.match_state(id).unwrap();
    assert_eq!(game.current_turn.as_deref(), Some("ann"));
    assert_eq!(game.host.shots, 1);
    assert_eq!(game.guest.unwrap().shots, 1);
}

#[test]
fn off_board_shot_is_classified_not_recorded() {
    let engine = Engine::quiet(EngineConfig::default());
    let id = battle(&engine);
    let board = engine.board(id, "ben").unwrap();

    let report = engine.fire(id, "ann", 10, 10).unwrap();
    assert_eq!(report.result, ShotClass::OutOfBounds);
    assert!(engine.moves(id).unwrap().is_empty());
    assert_eq!(engine.board(id, "ben").unwrap(), board);

    let game = engine.match_state(id).unwrap();
    assert_eq!(game.host.shots, 0);
    assert_eq!(game.current_turn.as_deref(), Some("ann"));
}

#[test]
fn sinking_the_last_ship_wins() {
    let engine = Engine::quiet(EngineConfig::default());
    let id = battle(&engine);
    let cells = fleet_cells();
    let (last, rest) = cells.split_last().unwrap();
    for &(x, y) in rest {
        let report = engine.fire(id, "ann", x, y).unwrap();
        assert!(report.winner.is_none());
    }
    let report = engine.fire(id, "ann", last.0, last.1).unwrap();
    assert_eq!(report.result, ShotClass::Sunk);
    assert_eq!(report.winner.as_deref(), Some("ann"));

    let game = engine.match_state(id).unwrap();
    assert_eq!(game.status, MatchStatus::Finished);
    assert_eq!(game.winner.as_deref(), Some("ann"));
    assert_eq!(engine.tally("ann").unwrap().wins, 1);
    assert_eq!(engine.tally("ben").unwrap().losses, 1);
    assert!(!engine.board(id, "ben").unwrap().has_ship_body());

    let err = engine.fire(id, "ann", 9, 9).unwrap_err();
    assert!(matches!(err, EngineError::InvalidStatus { found: MatchStatus::Finished, .. }));
    let err = engine.resolve_shot(id, "ann", "ben", 9, 9).unwrap_err();
    assert!(matches!(err, EngineError::InvalidStatus { found: MatchStatus::Finished, .. }));
    assert_eq!(engine.moves(id).unwrap().len(), cells.len());
}

#[test]
fn raw_shots_cannot_win_outside_battle() {
    let engine = Engine::quiet(EngineConfig::default());
    let game = engine
        .create_match(Participant::human("ann"), Some(Participant::human("ben")))
        .unwrap();
    for side in ["ann", "ben"] {
        place_fleet(&engine, game.id, side);
    }
    for (x, y) in fleet_cells() {
        let report = engine.resolve_shot(game.id, "ann", "ben", x, y).unwrap();
        assert!(report.winner.is_none());
    }
    let state = engine.match_state(game.id).unwrap();
    assert_eq!(state.status, MatchStatus::Setup);
    assert_eq!(state.winner, None);
    assert_eq!(engine.tally("ann").unwrap().wins, 0);

    engine.cancel_match(game.id).unwrap();
    let err = engine.resolve_shot(game.id, "ann", "ben", 9, 9).unwrap_err();
    assert!(matches!(err, EngineError::InvalidStatus { found: MatchStatus::Canceled, .. }));
    let state = engine.match_state(game.id).unwrap();
    assert_eq!(state.status, MatchStatus::Canceled);
    assert_eq!(state.winner, None);
    assert_eq!(engine.tally("ann").unwrap().wins, 0);
    assert_eq!(engine.tally("ben").unwrap().losses, 0);
    assert!(matches!(
        engine.undo(game.id).unwrap_err(),
        EngineError::InvalidStatus { found: MatchStatus::Canceled, .. }
    ));
}

#[test]
fn shot_at_unplaced_side_is_an_integrity_error() {
    let engine = Engine::quiet(EngineConfig::default());
    let game = engine
        .create_match(Participant::human("ann"), Some(Participant::human("ben")))
        .unwrap();
    place_fleet(&engine, game.id, "ann");

    let err = engine.resolve_shot(game.id, "ann", "ben", 0, 0).unwrap_err();
    assert!(matches!(err, EngineError::NoSuchPlacement { .. }));
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(engine.moves(game.id).unwrap().is_empty());
    assert_eq!(engine.match_state(game.id).unwrap().host.shots, 0);

    let err = engine.resolve_shot(game.id, "ann", "zed", 0, 0).unwrap_err();
    assert!(matches!(err, EngineError::UnknownSide { .. }));
}

#[test]
fn firing_before_battle_is_refused() {
    let engine = Engine::quiet(EngineConfig::default());
    let game = engine
        .create_match(Participant::human("ann"), Some(Participant::human("ben")))
        .unwrap();
    let err = engine.fire(game.id, "ann", 0, 0).unwrap_err();
    assert!(matches!(err, EngineError::InvalidStatus { found: MatchStatus::Active, .. }));
    assert!(err.is_user_error());
}

#[test]
fn fresh_shot_discards_redo_history() {
    let engine = Engine::quiet(EngineConfig::default());
    let id = battle(&engine);
    engine.fire(id, "ann", 0, 0).unwrap();
    engine.fire(id, "ann", 2, 0).unwrap();
    engine.undo(id).unwrap();
    engine.undo(id).unwrap();
    assert_eq!(engine.moves(id).unwrap().iter().filter(|m| m.reverted).count(), 2);

    engine.fire(id, "ann", 4, 0).unwrap();
    let moves = engine.moves(id).unwrap();
    assert_eq!(moves.len(), 1);
    assert!(!moves[0].reverted);
    assert_eq!((moves[0].x, moves[0].y), (4, 0));
    assert_eq!(engine.redo(id).unwrap(), broadside::LedgerOutcome::NothingToRedo);
}

#[test]
fn off_board_truncation_follows_config() {
    let engine = Engine::quiet(EngineConfig::default());
    let id = battle(&engine);
    engine.fire(id, "ann", 0, 0).unwrap();
    engine.undo(id).unwrap();
    engine.fire(id, "ann", 12, 0).unwrap();
    assert!(engine.moves(id).unwrap().is_empty());

    let keep = EngineConfig {
        discard_redo_on_out_of_bounds: false,
        ..EngineConfig::default()
    };
    let engine = Engine::quiet(keep);
    let id = battle(&engine);
    engine.fire(id, "ann", 0, 0).unwrap();
    engine.undo(id).unwrap();
    engine.fire(id, "ann", 12, 0).unwrap();
    assert_eq!(engine.moves(id).unwrap().len(), 1);
    assert!(matches!(engine.redo(id).unwrap(), broadside::LedgerOutcome::Replayed(_)));
    assert_eq!(engine.board(id, "ben").unwrap().cell_at(0, 0), Some(Cell::Hit));
}
