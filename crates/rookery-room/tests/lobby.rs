//! Integration tests for the lobby: matchmaking, move relay, reconnection,
//! and cleanup, driven through the same entry points the server uses.
//!
//! Each fake client is a registered connection id plus the receiving end
//! of its outbound channel. Every lobby call queues its messages before it
//! returns, so `try_recv` is enough to observe them.

use std::sync::Arc;

use rookery_protocol::{
    ClientMessage, Color, GameResult, GameStatus, Identity, MoveToken, MoveUpdate, RejectReason,
    ServerMessage, SessionId, SessionSnapshot, UserId,
};
use rookery_room::{Lobby, RoomError};
use rookery_rules::StandardChess;
use rookery_store::{MemoryStore, SessionRecord, SessionStore};
use rookery_transport::ConnectionId;
use tokio::sync::mpsc;

type TestLobby = Lobby<StandardChess, MemoryStore>;

// -- Helpers ----------------------------------------------------------------

struct Client {
    conn: ConnectionId,
    identity: Identity,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Client {
    fn next(&mut self) -> ServerMessage {
        self.rx.try_recv().expect("expected a queued message")
    }

    fn assert_silent(&mut self) {
        if let Ok(msg) = self.rx.try_recv() {
            panic!("{} expected no message, got {msg:?}", self.identity.username);
        }
    }

    fn expect_rejected(&mut self, expected: RejectReason) {
        match self.next() {
            ServerMessage::Rejected { reason, code, .. } => {
                assert_eq!(reason, expected);
                assert_eq!(code, expected.code());
            }
            other => panic!("expected Rejected({expected:?}), got {other:?}"),
        }
    }

    fn expect_move(&mut self) -> MoveUpdate {
        match self.next() {
            ServerMessage::MoveAccepted(update) => update,
            other => panic!("expected MoveAccepted, got {other:?}"),
        }
    }

    fn expect_state(&mut self) -> SessionSnapshot {
        match self.next() {
            ServerMessage::SessionState(state) => state,
            other => panic!("expected SessionState, got {other:?}"),
        }
    }

    fn expect_paired(&mut self) -> (SessionId, Color, Identity) {
        match self.next() {
            ServerMessage::Paired {
                session_id,
                color,
                opponent,
            } => (session_id, color, opponent),
            other => panic!("expected Paired, got {other:?}"),
        }
    }
}

fn setup() -> (Arc<TestLobby>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let lobby = Arc::new(Lobby::new(Arc::new(StandardChess), Arc::clone(&store)));
    (lobby, store)
}

/// Registers connection `conn` for user `user`.
async fn client(lobby: &TestLobby, conn: u64, user: u64, name: &str) -> Client {
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = ConnectionId::new(conn);
    lobby.connect(conn, tx).await;
    Client {
        conn,
        identity: Identity::new(UserId(user), name),
        rx,
    }
}

async fn send(lobby: &TestLobby, client: &Client, msg: ClientMessage) {
    lobby.handle(client.conn, &client.identity, msg).await;
}

async fn submit(lobby: &TestLobby, client: &Client, session: &SessionId, token: &str) {
    send(
        lobby,
        client,
        ClientMessage::SubmitMove {
            session_id: session.clone(),
            token: MoveToken::new(token),
        },
    )
    .await;
}

/// Pairs alice (white) with bob (black) and drains the `Queued`/`Paired`
/// messages.
async fn paired_game(lobby: &TestLobby) -> (Client, Client, SessionId) {
    let mut alice = client(lobby, 1, 1, "alice").await;
    let mut bob = client(lobby, 2, 2, "bob").await;
    send(lobby, &alice, ClientMessage::Enqueue).await;
    assert_eq!(alice.next(), ServerMessage::Queued);
    send(lobby, &bob, ClientMessage::Enqueue).await;
    let (session_id, color, _) = alice.expect_paired();
    assert_eq!(color, Color::White);
    let (bob_session, color, _) = bob.expect_paired();
    assert_eq!(color, Color::Black);
    assert_eq!(session_id, bob_session);
    (alice, bob, session_id)
}

async fn play(lobby: &TestLobby, white: &mut Client, black: &mut Client, id: &SessionId, moves: &[&str]) {
    for (ply, token) in moves.iter().enumerate() {
        let mover = if ply % 2 == 0 { &*white } else { &*black };
        submit(lobby, mover, id, token).await;
        white.expect_move();
        black.expect_move();
    }
}

// -- Matchmaking --------------------------------------------------------------

#[tokio::test]
async fn test_enqueue_two_users_pairs_first_as_white() {
    let (lobby, store) = setup();
    let mut alice = client(&lobby, 1, 1, "alice").await;
    let mut bob = client(&lobby, 2, 2, "bob").await;

    send(&lobby, &alice, ClientMessage::Enqueue).await;
    assert_eq!(alice.next(), ServerMessage::Queued);
    bob.assert_silent();

    send(&lobby, &bob, ClientMessage::Enqueue).await;
    let (session_id, color, opponent) = alice.expect_paired();
    assert_eq!(color, Color::White);
    assert_eq!(opponent, bob.identity);
    let (bob_session, color, opponent) = bob.expect_paired();
    assert_eq!(color, Color::Black);
    assert_eq!(opponent, alice.identity);
    assert_eq!(session_id, bob_session);

    let record = store.read_session(&session_id).await.unwrap().unwrap();
    assert_eq!(record.white, UserId(1));
    assert_eq!(record.black, Some(UserId(2)));
    assert_eq!(record.status, GameStatus::Active);
    assert_eq!(store.queue_len().await, 0, "no queue entry outlives a pairing");
    assert!(!lobby.matchmaker().is_queued(UserId(1)).await);

    let members = lobby.tracker().members_of(&session_id).await;
    assert!(members.contains(&alice.conn) && members.contains(&bob.conn));
}

#[tokio::test]
async fn test_enqueue_twice_rejected_already_queued() {
    let (lobby, _store) = setup();
    let mut alice = client(&lobby, 1, 1, "alice").await;
    send(&lobby, &alice, ClientMessage::Enqueue).await;
    assert_eq!(alice.next(), ServerMessage::Queued);

    send(&lobby, &alice, ClientMessage::Enqueue).await;
    alice.expect_rejected(RejectReason::AlreadyQueued);
    assert_eq!(lobby.matchmaker().pool_len().await, 1);
}

#[tokio::test]
async fn test_enqueue_same_user_second_connection_is_already_queued() {
    let (lobby, _store) = setup();
    let mut tab1 = client(&lobby, 1, 1, "alice").await;
    let mut tab2 = client(&lobby, 2, 1, "alice").await;
    send(&lobby, &tab1, ClientMessage::Enqueue).await;
    assert_eq!(tab1.next(), ServerMessage::Queued);
    send(&lobby, &tab2, ClientMessage::Enqueue).await;
    tab2.expect_rejected(RejectReason::AlreadyQueued);
}

#[tokio::test]
async fn test_dequeue_is_idempotent_and_prevents_pairing() {
    let (lobby, store) = setup();
    let mut alice = client(&lobby, 1, 1, "alice").await;
    let mut bob = client(&lobby, 2, 2, "bob").await;

    send(&lobby, &alice, ClientMessage::Enqueue).await;
    assert_eq!(alice.next(), ServerMessage::Queued);
    send(&lobby, &alice, ClientMessage::Dequeue).await;
    assert_eq!(alice.next(), ServerMessage::Dequeued);
    send(&lobby, &alice, ClientMessage::Dequeue).await;
    assert_eq!(alice.next(), ServerMessage::Dequeued);

    send(&lobby, &bob, ClientMessage::Enqueue).await;
    assert_eq!(bob.next(), ServerMessage::Queued);
    alice.assert_silent();
    assert_eq!(store.queue_len().await, 1);
}

#[tokio::test]
async fn test_disconnect_while_queued_removes_entry() {
    let (lobby, store) = setup();
    let mut alice = client(&lobby, 1, 1, "alice").await;
    let mut bob = client(&lobby, 2, 2, "bob").await;

    send(&lobby, &alice, ClientMessage::Enqueue).await;
    assert_eq!(alice.next(), ServerMessage::Queued);
    lobby.disconnect(alice.conn).await;
    assert!(!lobby.matchmaker().is_queued(UserId(1)).await);

    send(&lobby, &bob, ClientMessage::Enqueue).await;
    assert_eq!(bob.next(), ServerMessage::Queued, "vanished user is not paired");
    assert_eq!(store.queue_len().await, 1);
}

#[tokio::test]
async fn test_concurrent_enqueues_pair_each_waiting_user_once() {
    let (lobby, store) = setup();
    let mut clients = Vec::new();
    for n in 1..=6 {
        clients.push(client(&lobby, n, n, &format!("user{n}")).await);
    }

    let mut handles = Vec::new();
    for c in &clients {
        let lobby = Arc::clone(&lobby);
        let (conn, identity) = (c.conn, c.identity.clone());
        handles.push(tokio::spawn(async move {
            lobby.handle(conn, &identity, ClientMessage::Enqueue).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut sessions = std::collections::HashMap::<SessionId, Vec<Color>>::new();
    for c in &mut clients {
        let mut paired = 0;
        while let Ok(msg) = c.rx.try_recv() {
            if let ServerMessage::Paired { session_id, color, .. } = msg {
                sessions.entry(session_id).or_default().push(color);
                paired += 1;
            }
        }
        assert_eq!(paired, 1, "{} paired exactly once", c.identity.username);
    }
    assert_eq!(sessions.len(), 3);
    for colors in sessions.values() {
        assert_eq!(colors.len(), 2);
        assert!(colors.contains(&Color::White) && colors.contains(&Color::Black));
    }
    assert_eq!(store.queue_len().await, 0);
}

// -- Move relay ---------------------------------------------------------------

#[tokio::test]
async fn test_submit_move_broadcasts_then_rejects_illegal_to_sender_only() {
    let (lobby, _store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;

    submit(&lobby, &alice, &id, "e2e4").await;
    let a = alice.expect_move();
    let b = bob.expect_move();
    assert_eq!(a, b);
    assert_eq!(a.token, MoveToken::new("e2e4"));
    assert_eq!(a.turn, Color::Black);
    assert_eq!(a.status, GameStatus::Active);
    assert_eq!(a.result, None);
    assert!(!a.check);
    assert_eq!(a.legal_moves.len(), 20);
    assert!(a.position.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));

    submit(&lobby, &bob, &id, "e2e5").await;
    bob.expect_rejected(RejectReason::IllegalMove);
    alice.assert_silent();
}

#[tokio::test]
async fn test_submit_move_out_of_turn_rejected() {
    let (lobby, _store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;

    submit(&lobby, &bob, &id, "e7e5").await;
    bob.expect_rejected(RejectReason::NotYourTurn);
    alice.assert_silent();
}

#[tokio::test]
async fn test_submit_move_malformed_token_rejected() {
    let (lobby, _store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;

    submit(&lobby, &alice, &id, "pawn to e4").await;
    alice.expect_rejected(RejectReason::MalformedMove);
    bob.assert_silent();
}

#[tokio::test]
async fn test_submit_move_unknown_session_not_found() {
    let (lobby, _store) = setup();
    let mut alice = client(&lobby, 1, 1, "alice").await;
    submit(&lobby, &alice, &SessionId::new("missing"), "e2e4").await;
    alice.expect_rejected(RejectReason::NotFound);
}

#[tokio::test]
async fn test_submit_move_persistence_failure_leaves_state_unchanged() {
    let (lobby, store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;

    store.fail_writes(true);
    submit(&lobby, &alice, &id, "e2e4").await;
    alice.expect_rejected(RejectReason::PersistenceFailure);
    bob.assert_silent();

    let slot = lobby.registry().get(&id).await.unwrap();
    assert!(slot.lock().await.moves().is_empty(), "memory never runs ahead of the store");

    store.fail_writes(false);
    submit(&lobby, &alice, &id, "e2e4").await;
    assert_eq!(alice.expect_move().turn, Color::Black);
    bob.expect_move();
    let record = store.read_session(&id).await.unwrap().unwrap();
    assert_eq!(record.moves, vec![MoveToken::new("e2e4")]);
}

#[tokio::test]
async fn test_concurrent_submissions_accept_exactly_one() {
    let (lobby, _store) = setup();
    let (alice, _bob, id) = paired_game(&lobby).await;

    let first = lobby.submit_move(alice.conn, &alice.identity, &id, MoveToken::new("e2e4"));
    let second = lobby.submit_move(alice.conn, &alice.identity, &id, MoveToken::new("d2d4"));
    let (first, second) = tokio::join!(first, second);

    let results = [first, second];
    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(RoomError::NotYourTurn(UserId(1)))))
    );
}

#[tokio::test]
async fn test_checkmate_finishes_game_and_blocks_further_moves() {
    let (lobby, store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;

    play(&lobby, &mut alice, &mut bob, &id, &["f2f3", "e7e5", "g2g4"]).await;
    submit(&lobby, &bob, &id, "d8h4").await;
    let mate = alice.expect_move();
    assert_eq!(bob.expect_move(), mate);
    assert_eq!(mate.status, GameStatus::Finished);
    assert_eq!(mate.result, Some(GameResult::Black));
    assert!(mate.check);
    assert!(mate.legal_moves.is_empty());

    submit(&lobby, &alice, &id, "e1f2").await;
    alice.expect_rejected(RejectReason::SessionNotActive);

    let record = store.read_session(&id).await.unwrap().unwrap();
    assert_eq!(record.status, GameStatus::Finished);
    assert_eq!(record.result, Some(GameResult::Black));
}

#[tokio::test]
async fn test_request_legal_moves_lists_side_to_move_options() {
    let (lobby, _store) = setup();
    let (mut alice, _bob, id) = paired_game(&lobby).await;

    send(&lobby, &alice, ClientMessage::RequestLegalMoves { session_id: id.clone() }).await;
    match alice.next() {
        ServerMessage::LegalMoves { session_id, moves } => {
            assert_eq!(session_id, id);
            assert_eq!(moves.len(), 20);
            assert!(moves.contains(&MoveToken::new("g1f3")));
        }
        other => panic!("expected LegalMoves, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_legal_moves_non_player_rejected() {
    let (lobby, _store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;
    let mut carol = client(&lobby, 3, 3, "carol").await;

    send(&lobby, &carol, ClientMessage::RequestLegalMoves { session_id: id.clone() }).await;
    carol.expect_rejected(RejectReason::NotParticipant);
    carol.assert_silent();
    alice.assert_silent();
    bob.assert_silent();
    assert!(lobby.registry().is_loaded(&id).await, "members keep it loaded");
}

#[tokio::test]
async fn test_submit_move_failed_mating_commit_keeps_game_active() {
    let (lobby, store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;
    play(&lobby, &mut alice, &mut bob, &id, &["f2f3", "e7e5", "g2g4"]).await;

    store.fail_writes(true);
    submit(&lobby, &bob, &id, "d8h4").await;
    bob.expect_rejected(RejectReason::PersistenceFailure);
    alice.assert_silent();

    {
        let slot = lobby.registry().get(&id).await.unwrap();
        let session = slot.lock().await;
        assert_eq!(session.moves().len(), 3);
        assert_eq!(session.status(), GameStatus::Active);
        assert_eq!(session.result(), None);
    }
    let record = store.read_session(&id).await.unwrap().unwrap();
    assert_eq!(record.moves.len(), 3);
    assert_eq!(record.status, GameStatus::Active);
    assert_eq!(record.result, None);

    store.fail_writes(false);
    submit(&lobby, &bob, &id, "d8h4").await;
    let mate = bob.expect_move();
    assert_eq!(alice.expect_move(), mate);
    assert_eq!(mate.result, Some(GameResult::Black));
    let record = store.read_session(&id).await.unwrap().unwrap();
    assert_eq!(record.moves.len(), 4);
    assert_eq!(record.status, GameStatus::Finished);
    assert_eq!(record.result, Some(GameResult::Black));
}

// -- Joining, reconnection, eviction ------------------------------------------

#[tokio::test]
async fn test_requests_from_unbound_connections_leave_session_unloaded() {
    let (lobby, store) = setup();
    let id = SessionId::new("stored");
    let mut record = SessionRecord::new(id.clone(), UserId(1), Some(UserId(2)), GameStatus::Active);
    record.moves = vec![MoveToken::new("e2e4")];
    store.insert_record(record).await;

    let mut eve = client(&lobby, 9, 9, "eve").await;
    send(&lobby, &eve, ClientMessage::JoinSession { session_id: id.clone() }).await;
    eve.expect_rejected(RejectReason::NotParticipant);
    assert!(!lobby.registry().is_loaded(&id).await, "failed join unloads");

    send(&lobby, &eve, ClientMessage::RequestLegalMoves { session_id: id.clone() }).await;
    eve.expect_rejected(RejectReason::NotParticipant);
    assert!(!lobby.registry().is_loaded(&id).await);

    let mut alice = client(&lobby, 1, 1, "alice").await;
    send(&lobby, &alice, ClientMessage::RequestLegalMoves { session_id: id.clone() }).await;
    match alice.next() {
        ServerMessage::LegalMoves { moves, .. } => assert_eq!(moves.len(), 20),
        other => panic!("expected LegalMoves, got {other:?}"),
    }
    assert!(!lobby.registry().is_loaded(&id).await, "players who never joined do not pin it");

    let mut bob = client(&lobby, 2, 2, "bob").await;
    submit(&lobby, &bob, &id, "e7e5").await;
    assert_eq!(bob.expect_move().turn, Color::White);
    assert!(!lobby.registry().is_loaded(&id).await);
    assert_eq!(store.read_session(&id).await.unwrap().unwrap().moves.len(), 2);

    submit(&lobby, &bob, &id, "d7d5").await;
    bob.expect_rejected(RejectReason::NotYourTurn);
    assert!(!lobby.registry().is_loaded(&id).await);
    assert_eq!(lobby.registry().len().await, 0);
}

#[tokio::test]
async fn test_rejoin_after_disconnect_restores_moves_and_turn() {
    let (lobby, _store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;
    play(&lobby, &mut alice, &mut bob, &id, &["e2e4", "e7e5", "g1f3"]).await;

    lobby.disconnect(alice.conn).await;
    assert!(lobby.registry().is_loaded(&id).await, "bob still holds the session");

    let mut alice2 = client(&lobby, 3, 1, "alice").await;
    send(&lobby, &alice2, ClientMessage::JoinSession { session_id: id.clone() }).await;
    let state = alice2.expect_state();
    assert_eq!(
        state.moves,
        ["e2e4", "e7e5", "g1f3"].map(MoveToken::new).to_vec()
    );
    assert_eq!(state.turn, Color::Black);
    assert_eq!(state.color, Some(Color::White));
    assert_eq!(state.status, GameStatus::Active);
    assert!(!state.degraded);

    match bob.next() {
        ServerMessage::PeerJoined { color, username, .. } => {
            assert_eq!(color, Some(Color::White));
            assert_eq!(username, "alice");
        }
        other => panic!("expected PeerJoined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_last_member_leaving_evicts_and_join_rehydrates_identically() {
    let (lobby, _store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;
    play(&lobby, &mut alice, &mut bob, &id, &["d2d4", "g8f6", "c2c4"]).await;

    let before = {
        let slot = lobby.registry().get(&id).await.unwrap();
        let session = slot.lock().await;
        (session.moves().to_vec(), session.status())
    };
    send(&lobby, &alice, ClientMessage::JoinSession { session_id: id.clone() }).await;
    let live = alice.expect_state();

    send(&lobby, &alice, ClientMessage::LeaveSession { session_id: id.clone() }).await;
    assert!(lobby.registry().is_loaded(&id).await);
    lobby.disconnect(bob.conn).await;
    assert!(!lobby.registry().is_loaded(&id).await, "evicted once empty");

    send(&lobby, &alice, ClientMessage::JoinSession { session_id: id.clone() }).await;
    let rehydrated = alice.expect_state();
    assert_eq!(rehydrated, live);
    assert_eq!((rehydrated.moves.clone(), rehydrated.status), before);
}

#[tokio::test]
async fn test_finished_session_stays_loaded_until_members_leave() {
    let (lobby, _store) = setup();
    let (mut alice, mut bob, id) = paired_game(&lobby).await;
    play(&lobby, &mut alice, &mut bob, &id, &["f2f3", "e7e5", "g2g4", "d8h4"]).await;

    assert!(lobby.registry().is_loaded(&id).await);
    lobby.disconnect(alice.conn).await;
    lobby.disconnect(bob.conn).await;
    assert!(!lobby.registry().is_loaded(&id).await);
}

#[tokio::test]
async fn test_create_session_then_second_user_joins_as_black() {
    let (lobby, store) = setup();
    let mut alice = client(&lobby, 1, 1, "alice").await;
    let mut bob = client(&lobby, 2, 2, "bob").await;
    let mut carol = client(&lobby, 3, 3, "carol").await;

    send(&lobby, &alice, ClientMessage::CreateSession).await;
    let id = match alice.next() {
        ServerMessage::SessionCreated { session_id, color } => {
            assert_eq!(color, Color::White);
            session_id
        }
        other => panic!("expected SessionCreated, got {other:?}"),
    };
    assert_eq!(
        store.read_session(&id).await.unwrap().unwrap().status,
        GameStatus::Waiting
    );

    submit(&lobby, &alice, &id, "e2e4").await;
    alice.expect_rejected(RejectReason::SessionNotActive);

    send(&lobby, &bob, ClientMessage::JoinSession { session_id: id.clone() }).await;
    let state = bob.expect_state();
    assert_eq!(state.color, Some(Color::Black));
    assert_eq!(state.status, GameStatus::Active);
    assert_eq!(state.players.black, Some(UserId(2)));
    match alice.next() {
        ServerMessage::PeerJoined { color, user_id, .. } => {
            assert_eq!(color, Some(Color::Black));
            assert_eq!(user_id, UserId(2));
        }
        other => panic!("expected PeerJoined, got {other:?}"),
    }

    let record = store.read_session(&id).await.unwrap().unwrap();
    assert_eq!(record.black, Some(UserId(2)));
    assert_eq!(record.status, GameStatus::Active);

    send(&lobby, &carol, ClientMessage::JoinSession { session_id: id.clone() }).await;
    carol.expect_rejected(RejectReason::NotParticipant);
    alice.assert_silent();
    bob.assert_silent();
}

#[tokio::test]
async fn test_join_unknown_session_not_found() {
    let (lobby, _store) = setup();
    let mut alice = client(&lobby, 1, 1, "alice").await;
    send(
        &lobby,
        &alice,
        ClientMessage::JoinSession {
            session_id: SessionId::new("does-not-exist"),
        },
    )
    .await;
    alice.expect_rejected(RejectReason::NotFound);
}

#[tokio::test]
async fn test_join_corrupt_session_loads_last_good_and_refuses_moves() {
    let (lobby, store) = setup();
    let id = SessionId::new("legacy");
    let mut record = SessionRecord::new(id.clone(), UserId(1), Some(UserId(2)), GameStatus::Active);
    record.moves = ["e2e4", "e7e5", "e4e5", "d7d6"].map(MoveToken::new).to_vec();
    store.insert_record(record).await;

    let mut alice = client(&lobby, 1, 1, "alice").await;
    send(&lobby, &alice, ClientMessage::JoinSession { session_id: id.clone() }).await;
    let state = alice.expect_state();
    assert_eq!(state.moves, ["e2e4", "e7e5"].map(MoveToken::new).to_vec());
    assert!(state.legal_moves.is_empty());
    assert!(state.degraded, "joiners are told the session is read-only");

    submit(&lobby, &alice, &id, "g1f3").await;
    alice.expect_rejected(RejectReason::CorruptMoveLog);
}
