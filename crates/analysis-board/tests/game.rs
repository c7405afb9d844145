//! Game orchestration against a scripted in-memory oracle.

mod common;

use analysis_board::{
    BoardStatus, Direction, EngineReply, Game, GameError, GameSettings, MoveOutcome, OracleClient,
    OracleError, Setup,
};
use chess_board::{apply_move, MoveContext, NodeId, Position, TreeError, TreeLimits};
use chess_core::{Board, CastlingRights, Color, LegalMove, Move, Orientation, Piece, PieceKind};
use common::{analysis, fast_settings, game, notation, play, versus_engine, FakeOracle};
use oracle_protocol::StatusFlags;

fn square(o: Orientation, name: &str) -> chess_core::Square {
    o.parse_square(name).unwrap()
}

/// Applies a coordinate move to the current position without committing it.
fn applied(game: &Game<FakeOracle>, coordinate: &str, promotion: Option<PieceKind>) -> Position {
    let o = game.orientation();
    let lm = LegalMove::parse_coordinate(coordinate, o).unwrap();
    let current = game.current_position().unwrap();
    let ctx = MoveContext {
        side_to_move: current.side_to_move(),
        orientation: o,
        castling: current.castling(),
        legal_moves: game.legal_moves(),
        promotion,
    };
    apply_move(&current.board_in(o), lm.mv, &ctx).unwrap()
}

#[test]
fn e2e4_from_start_gives_e4() {
    let (mut game, oracle) = game(&["e2e4", "d2d4", "e7e5"], analysis());
    assert_eq!(oracle.tags(), vec!["get"]);
    assert_eq!(game.legal_moves().len(), 2);

    let outcome = play(&mut game, "e2e4").unwrap();

    assert_eq!(
        outcome,
        MoveOutcome::Played {
            node: NodeId::new(1),
            redirected: false,
            draw_claimable: false,
        }
    );
    let position = game.current_position().unwrap();
    assert_eq!(position.notation().to_string(), "e4");
    assert!(position.captured().is_empty());
    assert_eq!(position.castling(), CastlingRights::ALL);
    assert_eq!(position.ply(), 1);
    assert_eq!(position.turn(), Color::White);
    assert_eq!(game.side_to_move(), Color::Black);

    assert_eq!(oracle.tags(), vec!["get", "get"]);
    let sent = oracle.last_position().unwrap();
    let o = Orientation::White;
    assert_eq!(sent.side_to_move, Color::Black);
    assert_eq!(sent.orientation, o);
    assert_eq!(
        sent.last_move,
        Some(Move::new(square(o, "e2"), square(o, "e4")))
    );
    assert_eq!(game.legal_moves().len(), 1);
}

#[test]
fn capture_is_recorded() {
    let (mut game, _oracle) = game(&["e2e4", "d7d5", "e4d5"], analysis());
    play(&mut game, "e2e4").unwrap();
    play(&mut game, "d7d5").unwrap();

    play(&mut game, "e4d5").unwrap();

    let position = game.current_position().unwrap();
    assert_eq!(position.notation().to_string(), "exd5");
    assert_eq!(
        position.captured(),
        &[Piece::new(PieceKind::Pawn, Color::Black)]
    );
    assert_eq!(position.ply(), 2);
}

#[test]
fn legal_move_requests_are_idempotent() {
    let (mut game, oracle) = game(&["e2e4", "e7e5"], analysis());
    oracle.set_flags(StatusFlags {
        check: true,
        ..StatusFlags::default()
    });
    play(&mut game, "e2e4").unwrap();
    let moves = game.legal_moves().to_vec();

    assert_eq!(game.request_legal_moves().unwrap(), BoardStatus::Check);
    assert_eq!(game.request_legal_moves().unwrap(), BoardStatus::Check);

    assert_eq!(game.legal_moves(), moves.as_slice());
    assert_eq!(notation(&game), "e4+");
    assert!(game.flags().check);
}

#[test]
fn moves_outside_the_legal_list_are_rejected() {
    let (mut game, _oracle) = game(&["e2e4", "e7e5"], analysis());

    let err = play(&mut game, "e2e5").unwrap_err();
    assert!(matches!(err, GameError::InvalidMove(ref m) if m == "e2e5"));
    assert!(matches!(
        play(&mut game, "e7e5"),
        Err(GameError::InvalidMove(_))
    ));
    assert_eq!(game.tree().len(), 1);
    assert_eq!(game.current(), NodeId::ROOT);
}

#[test]
fn replaying_an_existing_move_redirects() {
    let (mut game, _oracle) = game(&["e2e4"], analysis());
    play(&mut game, "e2e4").unwrap();
    assert!(game.step(Direction::Back).unwrap());

    let outcome = play(&mut game, "e2e4").unwrap();

    assert_eq!(
        outcome,
        MoveOutcome::Played {
            node: NodeId::new(1),
            redirected: true,
            draw_claimable: false,
        }
    );
    assert_eq!(game.tree().len(), 2);
}

#[test]
fn sixth_variation_is_rejected() {
    let first_moves = ["a2a3", "b2b3", "c2c3", "d2d3", "e2e3", "f2f3"];
    let (mut game, _oracle) = game(&first_moves, analysis());
    for mv in &first_moves[..5] {
        play(&mut game, mv).unwrap();
        game.step(Direction::Back).unwrap();
    }

    let err = play(&mut game, "f2f3").unwrap_err();

    assert!(matches!(err, GameError::TreeFull { at } if at == NodeId::ROOT));
    assert_eq!(game.tree().children(NodeId::ROOT).unwrap().len(), 5);
    assert_eq!(game.current(), NodeId::ROOT);
}

#[test]
fn nested_variations_stop_at_the_depth_limit() {
    let settings = GameSettings {
        limits: TreeLimits {
            branch_limit: 5,
            depth_limit: 1,
        },
        ..analysis()
    };
    let (mut game, _oracle) = game(&["e2e4", "d2d4", "d7d5", "e7e5"], settings);
    play(&mut game, "e2e4").unwrap();
    game.step(Direction::Back).unwrap();
    play(&mut game, "d2d4").unwrap();
    let d4 = game.current();
    play(&mut game, "d7d5").unwrap();
    game.step(Direction::Back).unwrap();

    let err = play(&mut game, "e7e5").unwrap_err();

    assert!(matches!(err, GameError::TreeFull { at } if at == d4));
    assert_eq!(game.tree().children(d4).unwrap().len(), 1);
}

#[test]
fn visible_slice_nests_variations() {
    let (mut game, _oracle) = game(&["e2e4", "d2d4"], analysis());
    play(&mut game, "e2e4").unwrap();
    game.step(Direction::Back).unwrap();
    play(&mut game, "d2d4").unwrap();

    let slice = game.visible_slice().unwrap();

    assert_eq!(slice.depth(), 1);
    let json = serde_json::to_value(&slice).unwrap();
    assert_eq!(json["layers"][0][1]["label"], "1. e4");
    assert_eq!(json["layers"][1][0]["label"], "1. d4");
    assert_eq!(json["focus"], 2);
}

#[test]
fn mate_ends_the_game_without_a_search() {
    let (mut game, oracle) = game(&["e2e4"], versus_engine(Color::White));
    oracle.set_flags(StatusFlags {
        check: true,
        checkmate: true,
        ..StatusFlags::default()
    });

    play(&mut game, "e2e4").unwrap();

    assert_eq!(game.status(), BoardStatus::Checkmate);
    assert_eq!(notation(&game), "e4#");
    assert_eq!(oracle.count("find"), 0);
    assert!(!game.request_engine_move().unwrap());
}

#[test]
fn insufficient_material_only_ends_engine_games() {
    let flags = StatusFlags {
        insufficient_material: true,
        ..StatusFlags::default()
    };

    let (mut game, oracle) = game(&["e2e4"], analysis());
    oracle.set_flags(flags);
    play(&mut game, "e2e4").unwrap();
    assert_eq!(game.status(), BoardStatus::Ongoing);

    let (mut game, oracle) = common::game(&["e2e4"], versus_engine(Color::White));
    oracle.set_flags(flags);
    play(&mut game, "e2e4").unwrap();
    assert_eq!(game.status(), BoardStatus::InsufficientMaterial);
    assert_eq!(oracle.count("find"), 0);
}

#[test]
fn engine_answers_the_user_move() {
    let (mut game, oracle) = game(&["e2e4", "e7e5"], versus_engine(Color::White));
    oracle.queue_best_move("e7e5");

    play(&mut game, "e2e4").unwrap();
    assert!(game.is_searching());
    assert!(matches!(
        play(&mut game, "e7e5"),
        Err(GameError::EngineTurn)
    ));

    let reply = game.poll_engine_move().unwrap();

    assert!(matches!(
        reply,
        Some(EngineReply::Played(MoveOutcome::Played { node, .. })) if node == NodeId::new(2)
    ));
    assert_eq!(notation(&game), "e5");
    assert_eq!(game.side_to_move(), Color::White);
    assert_eq!(oracle.tags(), vec!["get", "get", "find", "get"]);
    assert_eq!(game.poll_engine_move().unwrap(), None);
}

#[test]
fn engine_opens_when_user_plays_black() {
    let (oracle, handle) = FakeOracle::new(&["e2e4", "e7e5"]);
    handle.queue_best_move("e2e4");
    let client = OracleClient::new(oracle, fast_settings());

    let mut game = Game::new(client, versus_engine(Color::Black)).unwrap();

    assert_eq!(game.orientation(), Orientation::Black);
    assert_eq!(handle.tags(), vec!["get", "find"]);
    let find = handle.last_position().unwrap();
    assert_eq!(find.orientation, Orientation::Black);
    assert_eq!(find.side_to_move, Color::White);

    let reply = game.wait_engine_move().unwrap();

    assert!(matches!(reply, Some(EngineReply::Played(_))));
    assert_eq!(notation(&game), "e4");
    assert_eq!(game.side_to_move(), Color::Black);
    let board = game.current_position().unwrap().board_in(Orientation::White);
    assert_eq!(
        board.get(square(Orientation::White, "e4")),
        Some(Piece::new(PieceKind::Pawn, Color::White))
    );
}

#[test]
fn search_in_analysis_mode_is_a_hint() {
    let (mut game, oracle) = game(&["e2e4"], analysis());
    oracle.queue_best_move("e2e4");

    assert!(game.request_engine_move().unwrap());
    let reply = game.poll_engine_move().unwrap();

    let Some(EngineReply::Hint(hint)) = reply else {
        panic!("expected a hint, got {:?}", reply);
    };
    assert_eq!(hint.to_coordinate(game.orientation()), "e2e4");
    assert_eq!(game.tree().len(), 1);
}

#[test]
fn hint_follows_a_board_flip() {
    let (mut game, oracle) = game(&["e2e4"], analysis());
    oracle.queue_best_move("e2e4");
    game.request_engine_move().unwrap();

    game.flip_board().unwrap();
    let reply = game.poll_engine_move().unwrap();

    let Some(EngineReply::Hint(hint)) = reply else {
        panic!("expected a hint, got {:?}", reply);
    };
    assert_eq!(hint.to_coordinate(Orientation::Black), "e2e4");
}

#[test]
fn stop_drops_a_racing_result() {
    let (mut game, oracle) = game(&["e2e4"], analysis());
    oracle.queue_best_move("e2e4");
    game.request_engine_move().unwrap();

    game.stop_engine().unwrap();

    assert!(!game.is_searching());
    assert_eq!(game.poll_engine_move().unwrap(), None);
    assert_eq!(oracle.tags(), vec!["get", "find", "stop"]);
    assert!(!game.is_faulted());
}

#[test]
fn requests_wait_for_a_running_search() {
    let (mut game, oracle) = game(&["e2e4"], analysis());
    game.request_engine_move().unwrap();

    let err = game.request_legal_moves().unwrap_err();

    assert!(matches!(err, GameError::Oracle(OracleError::SearchInProgress)));
    assert!(!game.is_faulted());

    play(&mut game, "e2e4").unwrap();
    assert_eq!(oracle.tags(), vec!["get", "find", "stop", "get"]);
}

/// Shuffles both knights out and back twice against the engine; the start
/// position occurs for the third time after the engine's last move.
fn knight_shuffle() -> (Game<FakeOracle>, common::FakeHandle, Vec<bool>) {
    let (mut game, oracle) = game(
        &["g1f3", "f3g1", "g8f6", "f6g8"],
        versus_engine(Color::White),
    );
    for best in ["g8f6", "f6g8", "g8f6", "f6g8"] {
        oracle.queue_best_move(best);
    }

    let mut claimable = Vec::new();
    for mv in ["g1f3", "f3g1", "g1f3", "f3g1"] {
        play(&mut game, mv).unwrap();
        match game.poll_engine_move().unwrap() {
            Some(EngineReply::Played(MoveOutcome::Played { draw_claimable, .. })) => {
                claimable.push(draw_claimable)
            }
            other => panic!("expected an engine move, got {:?}", other),
        }
    }
    (game, oracle, claimable)
}

#[test]
fn threefold_repetition_can_be_claimed() {
    let (mut game, _oracle, claimable) = knight_shuffle();

    assert_eq!(claimable, vec![false, false, false, true]);
    assert!(game.draw_claimable());
    assert!(game.claim_draw().unwrap());
    assert_eq!(game.status(), BoardStatus::DrawClaimed);
    assert!(game.legal_moves().is_empty());
    assert!(matches!(play(&mut game, "g1f3"), Err(GameError::InvalidMove(_))));
    assert!(!game.claim_draw().unwrap());
}

#[test]
fn draw_claim_is_lost_by_navigating() {
    let (mut game, _oracle, _) = knight_shuffle();
    assert!(game.draw_claimable());

    game.set_to_node(NodeId::new(1)).unwrap();
    assert!(game.step(Direction::Forward).unwrap());
    assert_eq!(game.current(), NodeId::new(2));

    assert!(!game.draw_claimable());
    assert!(!game.claim_draw().unwrap());
    assert_ne!(game.status(), BoardStatus::DrawClaimed);

    game.set_to_node(NodeId::new(8)).unwrap();
    assert!(!game.claim_draw().unwrap());
}

#[test]
fn draw_claim_is_lost_by_taking_back() {
    let (mut game, _oracle, _) = knight_shuffle();

    assert!(game.take_back().unwrap());

    assert!(!game.draw_claimable());
    assert!(!game.claim_draw().unwrap());
}

#[test]
fn commit_stops_a_running_search() {
    let (mut game, oracle) = game(&["e2e4", "e7e5"], analysis());
    game.request_engine_move().unwrap();
    let position = applied(&game, "e2e4", None);

    let outcome = game.commit(position).unwrap();

    assert!(matches!(
        outcome,
        MoveOutcome::Played { node, redirected: false, .. } if node == NodeId::new(1)
    ));
    assert!(!game.is_searching());
    assert_eq!(game.side_to_move(), Color::Black);
    assert_eq!(
        game.legal_moves(),
        &[LegalMove::parse_coordinate("e7e5", Orientation::White).unwrap()]
    );
    assert_eq!(oracle.tags(), vec!["get", "find", "stop", "get"]);
    assert_eq!(game.poll_engine_move().unwrap(), None);
}

#[test]
fn silent_oracle_faults_the_game() {
    let (mut game, oracle) = game(&["e2e4"], analysis());
    oracle.set_silent(true);

    let err = game.request_legal_moves().unwrap_err();

    assert!(matches!(err, GameError::Oracle(OracleError::Unavailable(_))));
    assert!(game.is_faulted());
    assert!(game.legal_moves().is_empty());
    assert!(matches!(play(&mut game, "e2e4"), Err(GameError::Faulted)));
    assert!(matches!(game.step(Direction::Forward), Err(GameError::Faulted)));
    assert!(matches!(game.flip_board(), Err(GameError::Faulted)));

    oracle.set_silent(false);
    game.restart(true).unwrap();

    assert!(!game.is_faulted());
    assert_eq!(game.legal_moves().len(), 1);
    play(&mut game, "e2e4").unwrap();
}

#[test]
fn garbage_reply_is_a_desync() {
    let (mut game, oracle) = game(&["e2e4"], analysis());
    oracle.set_garbage(Some("what"));

    let err = game.request_legal_moves().unwrap_err();

    assert!(matches!(err, GameError::Oracle(OracleError::Desync(_))));
    assert!(game.is_faulted());

    oracle.set_garbage(None);
    game.restart(false).unwrap();
    assert!(!game.is_faulted());
}

#[test]
fn navigation_keeps_the_tree() {
    let (mut game, _oracle) = game(&["e2e4", "e7e5"], analysis());
    play(&mut game, "e2e4").unwrap();
    play(&mut game, "e7e5").unwrap();

    assert!(game.step(Direction::Back).unwrap());
    assert_eq!(game.current(), NodeId::new(1));
    assert_eq!(game.side_to_move(), Color::Black);
    assert_eq!(game.legal_moves().len(), 1);

    assert!(game.step(Direction::Forward).unwrap());
    assert_eq!(game.current(), NodeId::new(2));
    assert!(!game.step(Direction::Forward).unwrap());

    game.set_to_node(NodeId::ROOT).unwrap();
    assert_eq!(game.side_to_move(), Color::White);
    assert!(!game.step(Direction::Back).unwrap());

    assert!(matches!(
        game.set_to_node(NodeId::new(99)),
        Err(GameError::UnknownKey(id)) if id == NodeId::new(99)
    ));
    assert_eq!(game.tree().len(), 3);
}

#[test]
fn trim_removes_the_current_line() {
    let (mut game, _oracle) = game(&["e2e4", "e7e5", "d7d5"], analysis());
    play(&mut game, "e2e4").unwrap();
    play(&mut game, "e7e5").unwrap();
    game.step(Direction::Back).unwrap();
    play(&mut game, "d7d5").unwrap();
    let variation = game.current();

    let removed = game.trim_from_current().unwrap();

    assert_eq!(removed, vec![variation]);
    assert_eq!(game.current(), NodeId::new(1));
    assert!(!game.tree().contains(variation));
    assert!(matches!(
        game.set_to_node(variation),
        Err(GameError::UnknownKey(_))
    ));

    game.set_to_node(NodeId::ROOT).unwrap();
    assert!(matches!(
        game.trim_from_current(),
        Err(GameError::Tree(TreeError::RootNotTrimmable))
    ));
}

#[test]
fn variation_can_be_promoted() {
    let (mut game, _oracle) = game(&["e2e4", "d2d4"], analysis());
    play(&mut game, "e2e4").unwrap();
    game.step(Direction::Back).unwrap();
    play(&mut game, "d2d4").unwrap();
    let d4 = game.current();

    assert_eq!(game.promote_variation().unwrap(), Some(d4));
    assert_eq!(
        game.tree().children(NodeId::ROOT).unwrap(),
        &[d4, NodeId::new(1)]
    );
    assert_eq!(game.promote_variation().unwrap(), None);
    assert_eq!(game.tree().main_line(), vec![NodeId::ROOT, d4]);
}

#[test]
fn flipped_board_plays_in_the_new_frame() {
    let (mut game, oracle) = game(&["e2e4"], analysis());

    assert_eq!(game.flip_board().unwrap(), Orientation::Black);
    assert_eq!(
        game.legal_moves()[0],
        LegalMove::parse_coordinate("e2e4", Orientation::Black).unwrap()
    );

    play(&mut game, "e2e4").unwrap();

    let position = game.current_position().unwrap();
    assert_eq!(position.notation().to_string(), "e4");
    assert_eq!(position.orientation(), Orientation::Black);
    assert_eq!(
        position
            .board_in(Orientation::White)
            .get(square(Orientation::White, "e4")),
        Some(Piece::new(PieceKind::Pawn, Color::White))
    );
    assert_eq!(
        oracle.last_position().unwrap().orientation,
        Orientation::Black
    );
}

#[test]
fn take_back_steps_back_in_analysis() {
    let (mut game, _oracle) = game(&["e2e4"], analysis());
    assert!(!game.take_back().unwrap());
    play(&mut game, "e2e4").unwrap();

    assert!(game.take_back().unwrap());

    assert_eq!(game.current(), NodeId::ROOT);
    assert_eq!(game.tree().len(), 2);
}

#[test]
fn take_back_against_the_engine_removes_both_moves() {
    let (mut game, oracle) = game(&["e2e4", "e7e5"], versus_engine(Color::White));
    oracle.queue_best_move("e7e5");
    play(&mut game, "e2e4").unwrap();
    game.poll_engine_move().unwrap();

    assert!(game.take_back().unwrap());

    assert_eq!(game.current(), NodeId::ROOT);
    assert_eq!(game.tree().len(), 1);
    assert_eq!(game.side_to_move(), Color::White);
    assert_eq!(oracle.count("find"), 1);
    assert!(!game.is_searching());
}

#[test]
fn take_back_during_a_search_removes_the_user_move() {
    let (mut game, oracle) = game(&["e2e4", "e7e5"], versus_engine(Color::White));
    play(&mut game, "e2e4").unwrap();
    assert!(game.is_searching());

    assert!(game.take_back().unwrap());

    assert_eq!(game.current(), NodeId::ROOT);
    assert_eq!(game.tree().len(), 1);
    assert!(!game.is_searching());
    assert_eq!(oracle.count("stop"), 1);
}

#[test]
fn restart_keeps_or_drops_the_tree() {
    let (mut game, _oracle) = game(&["e2e4"], analysis());
    play(&mut game, "e2e4").unwrap();

    game.restart(true).unwrap();
    assert_eq!(game.current(), NodeId::ROOT);
    assert_eq!(game.tree().len(), 2);

    game.restart(false).unwrap();
    assert_eq!(game.tree().len(), 1);
    assert_eq!(game.status(), BoardStatus::Ongoing);
}

fn promotion_setup() -> Setup {
    let o = Orientation::White;
    let mut board = Board::empty();
    board.set(square(o, "e1"), Some(Piece::new(PieceKind::King, Color::White)));
    board.set(square(o, "h8"), Some(Piece::new(PieceKind::King, Color::Black)));
    board.set(square(o, "a7"), Some(Piece::new(PieceKind::Pawn, Color::White)));
    Setup {
        board,
        orientation: o,
        side_to_move: Color::White,
        castling: CastlingRights::ALL,
    }
}

#[test]
fn setup_game_with_promotion() {
    let (oracle, _handle) = FakeOracle::new(&["a7a8"]);
    let client = OracleClient::new(oracle, fast_settings());
    let mut game = Game::from_setup(client, analysis(), promotion_setup()).unwrap();
    assert_eq!(
        game.current_position().unwrap().castling(),
        CastlingRights::NONE
    );

    assert_eq!(
        play(&mut game, "a7a8").unwrap(),
        MoveOutcome::PromotionRequired
    );
    assert_eq!(game.tree().len(), 1);

    play(&mut game, "a7a8q").unwrap();

    assert_eq!(notation(&game), "a8=Q");
    assert_eq!(
        game.board().unwrap().get(square(Orientation::White, "a8")),
        Some(Piece::new(PieceKind::Queen, Color::White))
    );
}

#[test]
fn commit_refuses_a_pending_promotion() {
    let (oracle, handle) = FakeOracle::new(&["a7a8"]);
    let client = OracleClient::new(oracle, fast_settings());
    let mut game = Game::from_setup(client, analysis(), promotion_setup()).unwrap();
    let pending = applied(&game, "a7a8", None);
    assert!(pending.promotion_pending());

    assert_eq!(game.commit(pending).unwrap(), MoveOutcome::PromotionRequired);

    assert_eq!(game.tree().len(), 1);
    assert_eq!(game.current(), NodeId::ROOT);
    assert_eq!(handle.tags(), vec!["get"]);

    let promoted = applied(&game, "a7a8", Some(PieceKind::Knight));
    game.commit(promoted).unwrap();
    assert_eq!(notation(&game), "a8=N");
}

#[test]
fn setup_without_kings_is_rejected() {
    let mut setup = promotion_setup();
    setup.board.set(square(Orientation::White, "h8"), None);
    let (oracle, handle) = FakeOracle::new(&[]);
    let client = OracleClient::new(oracle, fast_settings());

    let result = Game::from_setup(client, analysis(), setup);

    assert!(matches!(result, Err(GameError::Setup(_))));
    assert!(handle.tags().is_empty());
}

#[test]
fn shutdown_terminates_the_oracle() {
    let (mut game, oracle) = game(&["e2e4"], analysis());
    game.request_engine_move().unwrap();

    game.shutdown().unwrap();

    assert_eq!(oracle.tags(), vec!["get", "find", "stop", "term"]);
    assert!(oracle.is_shut_down());
}
