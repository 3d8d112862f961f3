use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix::prelude::*;
use tokio::time::sleep;
use uuid::Uuid;

use crate::client::conn::{ClientConn, ClientView, SharedView};
use crate::client::{AcquireConfig, AcquireError, Coordinator};
use crate::config::game::WINS_BOARD;
use crate::game::board::{Board, check_outcome};
use crate::game::state::{AdmissionError, MatchState, MoveError, MoveOutcome};
use crate::game::types::{GameMode, Mark, Outcome, PlayerId};
use crate::server::directory::SessionDirectory;
use crate::server::directory::messages::{CreateOrGetSession, ResolveSession};
use crate::server::matchmaking::Matchmaker;
use crate::server::matchmaking::messages::{AddTicket, PendingCount};
use crate::server::state::AppState;
use crate::server::session::MatchSession;
use crate::server::session::messages::{
    ClientMessage, ConnRef, GetState, Join, JoinAttempt, Leave, SubmitMove, Tick,
};
use crate::services::accounts::InMemoryAccounts;
use crate::services::scores::{InMemoryScores, ScoreStore};

fn board_with(cells: &[(usize, Mark)]) -> Board {
    let mut board: Board = [None; 9];
    for (index, mark) in cells {
        board[*index] = Some(*mark);
    }
    board
}

fn two_player_state(mode: GameMode) -> (MatchState, PlayerId, PlayerId) {
    let mut state = MatchState::new(mode);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    assert_eq!(state.admit(a, "alice".to_string()), Some(Mark::X));
    assert_eq!(state.admit(b, "bob".to_string()), Some(Mark::O));
    assert!(state.try_start(1_000));
    (state, a, b)
}

#[test]
fn outcome_none_on_empty_and_open_boards() {
    assert_eq!(check_outcome(&[None; 9]), None);
    let open = board_with(&[(4, Mark::X), (0, Mark::O)]);
    assert_eq!(check_outcome(&open), None);
}

#[test]
fn outcome_detects_every_line() {
    let lines: [[usize; 3]; 8] = [
        [0, 1, 2],
        [3, 4, 5],
        [6, 7, 8],
        [0, 3, 6],
        [1, 4, 7],
        [2, 5, 8],
        [0, 4, 8],
        [2, 4, 6],
    ];
    for line in lines {
        let cells: Vec<(usize, Mark)> = line.iter().map(|&i| (i, Mark::O)).collect();
        assert_eq!(check_outcome(&board_with(&cells)), Some(Outcome::O));
    }
}

#[test]
fn outcome_draw_when_full_without_line() {
    // X O X / X O O / O X X
    let board = board_with(&[
        (0, Mark::X),
        (1, Mark::O),
        (2, Mark::X),
        (3, Mark::X),
        (4, Mark::O),
        (5, Mark::O),
        (6, Mark::O),
        (7, Mark::X),
        (8, Mark::X),
    ]);
    assert_eq!(check_outcome(&board), Some(Outcome::Draw));
}

#[test]
fn third_identity_is_rejected_without_mutation() {
    let (mut state, _, _) = two_player_state(GameMode::Classic);
    let before = state.board;
    let charlie = Uuid::new_v4();
    assert_eq!(state.join_attempt(), Err(AdmissionError::MatchFull));
    assert_eq!(state.admit(charlie, "charlie".to_string()), None);
    assert_eq!(state.player_count(), 2);
    assert_eq!(state.board, before);
}

#[test]
fn game_starts_exactly_once_with_x_to_move() {
    let mut state = MatchState::new(GameMode::Classic);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    state.admit(a, "alice".to_string());
    assert!(!state.try_start(0), "one player is not enough");
    state.admit(b, "bob".to_string());
    assert!(state.try_start(0));
    assert!(state.started);
    assert_eq!(state.next, Some(Mark::X));
    assert!(!state.try_start(0), "already started");
}

#[test]
fn rematch_reset_restores_initial_round() {
    let (mut state, a, _) = two_player_state(GameMode::Timed);
    state.apply_move(&a, Ok(4), 1_000).unwrap();
    state.winner = Some(Outcome::O);
    state.reset_for_rematch();
    assert_eq!(state.board, [None; 9]);
    assert_eq!(state.next, Some(Mark::X));
    assert_eq!(state.winner, None);
    assert!(!state.started);
    assert_eq!(state.turn_deadline, None);
    assert_eq!(state.player_count(), 2, "players survive the reset");
}

#[test]
fn illegal_moves_never_mutate_the_board() {
    let (mut state, a, b) = two_player_state(GameMode::Classic);
    let outsider = Uuid::new_v4();

    assert_eq!(
        state.apply_move(&outsider, Ok(0), 0),
        Err(MoveError::NotInMatch)
    );
    assert_eq!(state.apply_move(&b, Ok(0), 0), Err(MoveError::NotYourTurn));
    assert_eq!(
        state.apply_move(&a, Err(MoveError::BadPayload), 0),
        Err(MoveError::BadPayload)
    );
    assert_eq!(state.apply_move(&a, Ok(9), 0), Err(MoveError::InvalidMove));
    assert_eq!(state.apply_move(&a, Ok(-1), 0), Err(MoveError::InvalidMove));
    assert_eq!(state.board, [None; 9]);
    assert_eq!(state.next, Some(Mark::X));
}

#[test]
fn occupied_cell_is_rejected() {
    // X->4, O->0, X->8, O->2, then X->0 is occupied.
    let (mut state, a, b) = two_player_state(GameMode::Classic);
    state.apply_move(&a, Ok(4), 0).unwrap();
    state.apply_move(&b, Ok(0), 0).unwrap();
    state.apply_move(&a, Ok(8), 0).unwrap();
    state.apply_move(&b, Ok(2), 0).unwrap();
    assert_eq!(state.apply_move(&a, Ok(0), 0), Err(MoveError::InvalidMove));
    assert_eq!(state.next, Some(Mark::X), "turn did not pass");
}

#[test]
fn open_sequence_continues_with_o_to_move() {
    // X->4, O->0, X->1, O->7, X->6: no line, game continues.
    let (mut state, a, b) = two_player_state(GameMode::Classic);
    state.apply_move(&a, Ok(4), 0).unwrap();
    state.apply_move(&b, Ok(0), 0).unwrap();
    state.apply_move(&a, Ok(1), 0).unwrap();
    state.apply_move(&b, Ok(7), 0).unwrap();
    assert_eq!(state.apply_move(&a, Ok(6), 0), Ok(MoveOutcome::Continue));
    assert_eq!(state.winner, None);
    assert_eq!(state.next, Some(Mark::O));
}

#[test]
fn diagonal_win_ends_the_game() {
    // X->0, O->1, X->4, O->2, X->8: diagonal 0-4-8.
    let (mut state, a, b) = two_player_state(GameMode::Classic);
    state.apply_move(&a, Ok(0), 0).unwrap();
    state.apply_move(&b, Ok(1), 0).unwrap();
    state.apply_move(&a, Ok(4), 0).unwrap();
    state.apply_move(&b, Ok(2), 0).unwrap();
    assert_eq!(
        state.apply_move(&a, Ok(8), 0),
        Ok(MoveOutcome::Won(Mark::X))
    );
    assert_eq!(state.winner, Some(Outcome::X));
    assert_eq!(state.next, None);
}

#[test]
fn timed_turn_expiry_forfeits_to_the_waiting_player() {
    let (mut state, a, _) = two_player_state(GameMode::Timed);
    let deadline = state.turn_deadline.expect("timed mode sets a deadline");

    assert!(!state.timeout_expired(deadline));
    assert!(state.timeout_expired(deadline + 1));

    // Timeout resolves before any move of the same tick: X held the turn,
    // so O wins, and the late move is evaluated against the cleared turn.
    assert_eq!(state.expire_turn(), Some(Mark::O));
    assert_eq!(state.winner, Some(Outcome::O));
    assert_eq!(state.next, None);
    assert_eq!(state.turn_deadline, None);
    assert_eq!(
        state.apply_move(&a, Ok(0), deadline + 2),
        Err(MoveError::NotYourTurn)
    );
}

#[test]
fn timed_move_refreshes_the_deadline() {
    let (mut state, a, _) = two_player_state(GameMode::Timed);
    state.apply_move(&a, Ok(4), 10_000).unwrap();
    assert_eq!(state.turn_deadline, Some(10_000 + 30_000));
}

#[test]
fn forfeit_on_leave_fires_exactly_once() {
    let (mut state, a, _) = two_player_state(GameMode::Classic);
    assert!(state.remove_identity(&a));
    assert_eq!(state.forfeit_to_remaining(), Some(Mark::O));
    assert_eq!(state.winner, Some(Outcome::O));
    assert_eq!(state.forfeit_to_remaining(), None, "idempotent");
    assert!(!state.remove_identity(&a), "already gone");
}

// ---------------------------------------------------------------------------
// Actor-level tests
// ---------------------------------------------------------------------------

struct TestStack {
    directory: Addr<SessionDirectory>,
    matchmaker: Addr<Matchmaker>,
    accounts: Arc<InMemoryAccounts>,
    scores: Arc<InMemoryScores>,
}

fn stack() -> TestStack {
    let accounts = Arc::new(InMemoryAccounts::new());
    let scores = Arc::new(InMemoryScores::new());
    let directory = SessionDirectory::new(accounts.clone(), scores.clone()).start();
    let matchmaker = Matchmaker::new(directory.clone()).start();
    TestStack {
        directory,
        matchmaker,
        accounts,
        scores,
    }
}

async fn open_session(stack: &TestStack, mode: GameMode) -> (Uuid, Addr<MatchSession>) {
    let session_id = stack
        .directory
        .send(CreateOrGetSession { mode })
        .await
        .unwrap();
    let addr = stack
        .directory
        .send(ResolveSession { session_id })
        .await
        .unwrap()
        .expect("session just created");
    (session_id, addr)
}

fn test_conn(identity: PlayerId) -> (ConnRef, SharedView) {
    let view: SharedView = Arc::new(Mutex::new(ClientView::default()));
    let conn_id = Uuid::new_v4();
    let addr = ClientConn {
        conn_id,
        identity,
        view: view.clone(),
    }
    .start();
    (
        ConnRef {
            conn_id,
            identity,
            addr: addr.recipient(),
        },
        view,
    )
}

fn move_payload(cell: i64) -> String {
    serde_json::to_string(&ClientMessage::Move { cell }).unwrap()
}

fn fast_config() -> AcquireConfig {
    AcquireConfig {
        negotiation_timeout: Duration::from_millis(100),
        post_negotiation_jitter_ms: (1, 5),
        lookup_jitter_ms: (1, 5),
        create_retry_attempts: 3,
        create_retry_delay: Duration::from_millis(10),
        list_limit: 10,
    }
}

#[actix_rt::test]
async fn session_admits_two_and_rejects_a_third() {
    let stack = stack();
    let (_, session) = open_session(&stack, GameMode::Classic).await;

    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let charlie = Uuid::new_v4();
    let (conn_a, view_a) = test_conn(alice);
    let (conn_b, _view_b) = test_conn(bob);

    session
        .send(JoinAttempt { identity: alice })
        .await
        .unwrap()
        .unwrap();
    session.send(Join { conns: vec![conn_a] }).await.unwrap();
    session
        .send(JoinAttempt { identity: bob })
        .await
        .unwrap()
        .unwrap();
    session.send(Join { conns: vec![conn_b] }).await.unwrap();

    assert_eq!(
        session.send(JoinAttempt { identity: charlie }).await.unwrap(),
        Err(AdmissionError::MatchFull)
    );

    sleep(Duration::from_millis(50)).await;
    let view = view_a.lock().unwrap();
    let state = view.state.as_ref().expect("broadcast received");
    assert!(state.started);
    assert_eq!(state.next, Some(Mark::X));
    assert_eq!(state.players.len(), 2);
}

#[actix_rt::test]
async fn winning_game_updates_the_score_board() {
    let stack = stack();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    stack.accounts.register(alice, "alice");
    stack.accounts.register(bob, "bob");

    let (_, session) = open_session(&stack, GameMode::Classic).await;
    let (conn_a, view_a) = test_conn(alice);
    let (conn_b, view_b) = test_conn(bob);
    let (id_a, id_b) = (conn_a.conn_id, conn_b.conn_id);

    session
        .send(Join {
            conns: vec![conn_a, conn_b],
        })
        .await
        .unwrap();

    // X takes the top row: X->0, O->3, X->1, O->4, X->2.
    for (conn_id, cell) in [(id_a, 0), (id_b, 3), (id_a, 1), (id_b, 4), (id_a, 2)] {
        session
            .send(SubmitMove {
                conn_id,
                payload: move_payload(cell),
            })
            .await
            .unwrap();
    }
    session.send(Tick::default()).await.unwrap();

    let state = session.send(GetState).await.unwrap();
    assert_eq!(state.winner, Some(Outcome::X));
    assert_eq!(state.next, None);
    assert_eq!(
        stack.scores.read_score(WINS_BOARD, &alice).unwrap(),
        Some(1)
    );
    assert_eq!(stack.scores.read_score(WINS_BOARD, &bob).unwrap(), None);

    sleep(Duration::from_millis(50)).await;
    assert!(view_a.lock().unwrap().state.as_ref().unwrap().winner.is_some());
    assert!(view_b.lock().unwrap().state.as_ref().unwrap().winner.is_some());
}

#[actix_rt::test]
async fn rejected_move_is_private_to_the_offender() {
    let stack = stack();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let (_, session) = open_session(&stack, GameMode::Classic).await;
    let (conn_a, view_a) = test_conn(alice);
    let (conn_b, view_b) = test_conn(bob);
    let (id_a, id_b) = (conn_a.conn_id, conn_b.conn_id);

    session
        .send(Join {
            conns: vec![conn_a, conn_b],
        })
        .await
        .unwrap();

    // Bob holds O and it is X's turn.
    session
        .send(SubmitMove {
            conn_id: id_b,
            payload: move_payload(4),
        })
        .await
        .unwrap();
    session.send(Tick::default()).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    assert_eq!(
        view_b.lock().unwrap().last_error.as_deref(),
        Some("not_your_turn")
    );
    assert_eq!(view_a.lock().unwrap().last_error, None);

    // Malformed payload from the player holding the turn is bad_payload,
    // again privately.
    session
        .send(SubmitMove {
            conn_id: id_a,
            payload: "not json".to_string(),
        })
        .await
        .unwrap();
    session.send(Tick::default()).await.unwrap();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(
        view_a.lock().unwrap().last_error.as_deref(),
        Some("bad_payload")
    );
    assert!(
        session
            .send(GetState)
            .await
            .unwrap()
            .board
            .iter()
            .all(|c| c.is_none()),
        "rejected moves never mutate the board"
    );
}

#[actix_rt::test]
async fn leaving_mid_game_forfeits_to_the_opponent() {
    let stack = stack();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let (session_id, session) = open_session(&stack, GameMode::Classic).await;
    let (conn_a, _view_a) = test_conn(alice);
    let (conn_b, view_b) = test_conn(bob);
    let (id_a, id_b) = (conn_a.conn_id, conn_b.conn_id);

    session
        .send(Join {
            conns: vec![conn_a, conn_b],
        })
        .await
        .unwrap();

    session
        .send(Leave {
            conn_ids: vec![id_a],
        })
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;
    {
        let view = view_b.lock().unwrap();
        let state = view.state.as_ref().unwrap();
        assert_eq!(state.winner, Some(Outcome::O), "remaining player wins");
        assert_eq!(state.next, None);
    }

    // Last player leaves: the session terminates and the directory entry
    // disappears.
    session
        .send(Leave {
            conn_ids: vec![id_b],
        })
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;
    assert!(
        stack
            .directory
            .send(ResolveSession { session_id })
            .await
            .unwrap()
            .is_none()
    );
}

#[actix_rt::test]
async fn rematch_resets_in_place_when_a_player_returns() {
    let stack = stack();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let (_, session) = open_session(&stack, GameMode::Classic).await;
    let (conn_a, _view_a) = test_conn(alice);
    let (conn_b, _view_b) = test_conn(bob);
    let (id_a, id_b) = (conn_a.conn_id, conn_b.conn_id);

    session
        .send(Join {
            conns: vec![conn_a, conn_b],
        })
        .await
        .unwrap();
    for (conn_id, cell) in [(id_a, 0), (id_b, 3), (id_a, 1), (id_b, 4), (id_a, 2)] {
        session
            .send(SubmitMove {
                conn_id,
                payload: move_payload(cell),
            })
            .await
            .unwrap();
    }
    session.send(Tick::default()).await.unwrap();
    assert_eq!(
        session.send(GetState).await.unwrap().winner,
        Some(Outcome::X)
    );

    // Bob leaves, a newcomer joins: board resets for a fresh round.
    session
        .send(Leave {
            conn_ids: vec![id_b],
        })
        .await
        .unwrap();
    let carol = Uuid::new_v4();
    let (conn_c, _view_c) = test_conn(carol);
    session.send(Join { conns: vec![conn_c] }).await.unwrap();

    let state = session.send(GetState).await.unwrap();
    assert_eq!(state.winner, None);
    assert!(state.board.iter().all(|c| c.is_none()));
    assert!(state.started, "two players again, new round started");
    assert_eq!(state.next, Some(Mark::X));
    assert_eq!(state.players.len(), 2);
}

#[actix_rt::test]
async fn expired_deadline_resolves_before_a_buffered_move() {
    let stack = stack();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let (_, session) = open_session(&stack, GameMode::Timed).await;
    let (conn_a, view_a) = test_conn(alice);
    let (conn_b, _view_b) = test_conn(bob);
    let id_a = conn_a.conn_id;

    session
        .send(Join {
            conns: vec![conn_a, conn_b],
        })
        .await
        .unwrap();
    let deadline = session
        .send(GetState)
        .await
        .unwrap()
        .turn_deadline
        .expect("timed mode sets a deadline");

    // X's move is buffered, but the same tick finds the clock expired:
    // the timeout resolves first and the late move hits the cleared turn.
    session
        .send(SubmitMove {
            conn_id: id_a,
            payload: move_payload(4),
        })
        .await
        .unwrap();
    session
        .send(Tick {
            now: Some(deadline + 1),
        })
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;

    let state = session.send(GetState).await.unwrap();
    assert_eq!(state.winner, Some(Outcome::O), "X ran out the clock");
    assert_eq!(state.next, None);
    assert!(
        state.board.iter().all(|c| c.is_none()),
        "the late move was not applied"
    );
    assert_eq!(
        view_a.lock().unwrap().last_error.as_deref(),
        Some("not_your_turn")
    );
}

#[actix_rt::test]
async fn pending_endpoint_reports_queue_depth() {
    let stack = stack();
    let state = actix_web::web::Data::new(AppState::new(
        stack.directory.clone(),
        stack.matchmaker.clone(),
        stack.accounts.clone(),
        stack.scores.clone(),
    ));
    let app = actix_web::test::init_service(
        actix_web::App::new()
            .app_data(state)
            .configure(crate::server::router::config),
    )
    .await;

    let (reply, _rx) = tokio::sync::oneshot::channel();
    stack
        .matchmaker
        .send(AddTicket {
            identity: Uuid::new_v4(),
            mode: GameMode::Classic,
            reply,
        })
        .await
        .unwrap();

    let req = actix_web::test::TestRequest::get()
        .uri("/matchmaking/pending?mode=classic")
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["pending"], 1);
    assert_eq!(body["mode"], "classic");
}

#[actix_rt::test]
async fn two_coordinators_converge_on_one_session() {
    let stack = stack();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let coord_a = Coordinator::new(stack.directory.clone(), stack.matchmaker.clone(), alice)
        .with_config(fast_config());
    let coord_b = Coordinator::new(stack.directory.clone(), stack.matchmaker.clone(), bob)
        .with_config(fast_config());

    let (joined_a, joined_b) = tokio::join!(
        coord_a.acquire(GameMode::Classic, None),
        coord_b.acquire(GameMode::Classic, None)
    );
    let joined_a = joined_a.expect("a joins");
    let joined_b = joined_b.expect("b joins");
    assert_eq!(joined_a.session_id, joined_b.session_id, "no two-session split");

    sleep(Duration::from_millis(50)).await;
    let view = coord_a.view();
    let view = view.lock().unwrap();
    let state = view.state.as_ref().unwrap();
    assert!(state.started);
    assert_eq!(state.players.len(), 2);
}

#[actix_rt::test]
async fn lone_coordinator_falls_back_to_create_and_is_found_later() {
    let stack = stack();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    // Alice has no partner: negotiation times out, the fallback tiers end
    // in find-or-create.
    let coord_a = Coordinator::new(stack.directory.clone(), stack.matchmaker.clone(), alice)
        .with_config(fast_config());
    let joined_a = coord_a.acquire(GameMode::Timed, None).await.expect("a joins");

    {
        let view = coord_a.view();
        let view = view.lock().unwrap();
        let state = view.state.as_ref().unwrap();
        assert!(!state.started, "waiting for an opponent");
        assert_eq!(state.mode, GameMode::Timed);
    }

    // Bob arrives later and finds the open session through the lookup tier.
    let coord_b = Coordinator::new(stack.directory.clone(), stack.matchmaker.clone(), bob)
        .with_config(fast_config());
    let joined_b = coord_b.acquire(GameMode::Timed, None).await.expect("b joins");
    assert_eq!(joined_a.session_id, joined_b.session_id);

    sleep(Duration::from_millis(50)).await;
    let view = coord_b.view();
    let view = view.lock().unwrap();
    assert!(view.state.as_ref().unwrap().started);
}

#[actix_rt::test]
async fn cancellation_deregisters_the_ticket() {
    let stack = stack();
    let alice = Uuid::new_v4();
    let coord = Coordinator::new(stack.directory.clone(), stack.matchmaker.clone(), alice);
    let token = coord.cancel_token();

    let (result, _) = tokio::join!(coord.acquire(GameMode::Classic, None), async {
        sleep(Duration::from_millis(50)).await;
        token.cancel();
    });
    assert!(matches!(result, Err(AcquireError::Cancelled)));

    sleep(Duration::from_millis(50)).await;
    let pending = stack
        .matchmaker
        .send(PendingCount {
            mode: GameMode::Classic,
        })
        .await
        .unwrap();
    assert_eq!(pending, 0, "outstanding ticket was removed");
}

#[actix_rt::test]
async fn acquire_excludes_the_previous_session_in_lookup() {
    let stack = stack();
    let alice = Uuid::new_v4();
    let (previous, _) = open_session(&stack, GameMode::Classic).await;

    // The only listed session is excluded, so the coordinator must end up
    // creating (or being handed) a different one via find-or-create... which
    // also returns the excluded session while it stays open, so the attempt
    // exhausts. This mirrors the rejoin guard after a finished game.
    let coord = Coordinator::new(stack.directory.clone(), stack.matchmaker.clone(), alice)
        .with_config(fast_config());
    let result = coord.acquire(GameMode::Classic, Some(previous)).await;
    assert!(matches!(result, Err(AcquireError::Exhausted)));
}
