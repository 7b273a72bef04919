//! Process-wide session registry.
//!
//! Every session, its participants, player numbers and game live behind one
//! exclusive lock. Admission, moves, removal and the broadcasts they trigger
//! all happen inside that lock, so concurrent connections never observe a
//! half-applied change. Broadcasts only enqueue (see [`Participant::send`]),
//! so holding the lock never waits on a socket.

use std::collections::HashMap;
use std::sync::Arc;

use dropfour_core::{
    AdmitError, ConnectionId, GameSnapshot, GameState, MoveError, Player, ServerMessage, SessionId,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::broadcast::broadcast;
use crate::participant::Participant;

/// Seats per session.
pub const SESSION_CAPACITY: usize = 2;

/// Result of a successful admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admission {
    /// The admitted connection.
    pub connection_id: ConnectionId,
    /// Seat assigned for the life of the connection.
    pub player: Player,
    /// Participants in the session after this admission.
    pub active_count: usize,
}

struct Session {
    participants: HashMap<ConnectionId, Arc<Participant>>,
    player_numbers: HashMap<ConnectionId, Player>,
    game: GameState,
}

impl Session {
    fn new() -> Self {
        Self {
            participants: HashMap::new(),
            player_numbers: HashMap::new(),
            game: GameState::new(),
        }
    }

    fn active_count(&self) -> usize {
        self.participants.len()
    }

    /// Lowest seat nobody holds. In connection order this is `active_count + 1`.
    fn free_seat(&self) -> Option<Player> {
        [Player::One, Player::Two]
            .into_iter()
            .find(|seat| !self.player_numbers.values().any(|p| p == seat))
    }
}

/// Owns all sessions. Shared between connection tasks behind an `Arc`.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Seat `participant` in `session_id`, creating the session on first use.
    ///
    /// Under the lock the newcomer is queued its `Player assigned` notice,
    /// and if this fills the session everyone is queued `Game started`.
    /// A full session is left untouched.
    pub fn admit(
        &self,
        session_id: &SessionId,
        participant: Arc<Participant>,
    ) -> Result<Admission, AdmitError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(session_id.clone()).or_insert_with(|| {
            info!(%session_id, "session created");
            Session::new()
        });

        let seat = (session.active_count() < SESSION_CAPACITY)
            .then(|| session.free_seat())
            .flatten();
        let Some(player) = seat else {
            return Err(AdmitError::SessionFull {
                session_id: session_id.clone(),
                capacity: SESSION_CAPACITY,
            });
        };

        let connection_id = participant.id.clone();
        let _ = session
            .player_numbers
            .insert(connection_id.clone(), player);
        let _ = session
            .participants
            .insert(connection_id.clone(), Arc::clone(&participant));
        let active_count = session.active_count();
        info!(%session_id, conn_id = %connection_id, %player, active_count, "participant admitted");

        if !participant.send_message(&ServerMessage::PlayerAssigned { player }) {
            warn!(%session_id, conn_id = %connection_id, "failed to queue player assignment");
        }
        if active_count == SESSION_CAPACITY {
            let next_player = session.game.next_player();
            let _ = broadcast(
                session_id,
                session.participants.values(),
                &ServerMessage::GameStarted { next_player },
            );
        }

        Ok(Admission {
            connection_id,
            player,
            active_count,
        })
    }

    /// Drop a connection from its session, deleting the session when it empties.
    ///
    /// Returns `false` (and changes nothing) if the pair is not registered,
    /// so repeated cleanup is harmless.
    pub fn remove(&self, session_id: &SessionId, connection_id: &ConnectionId) -> bool {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        let removed = session.participants.remove(connection_id).is_some();
        let _ = session.player_numbers.remove(connection_id);
        if removed {
            debug!(%session_id, conn_id = %connection_id, remaining = session.active_count(), "participant removed");
        }
        if session.participants.is_empty() {
            let _ = sessions.remove(session_id);
            info!(%session_id, "session destroyed");
        }
        removed
    }

    /// Apply a move on behalf of `connection_id` and broadcast the new state.
    pub fn apply_move(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        column: i64,
    ) -> Result<GameSnapshot, MoveError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| MoveError::UnknownSession(session_id.clone()))?;
        let player = *session
            .player_numbers
            .get(connection_id)
            .ok_or_else(|| MoveError::UnknownConnection(connection_id.clone()))?;

        let outcome = session.game.apply_move(column, player)?;
        let snapshot = session.game.snapshot();
        debug!(%session_id, %player, column = outcome.column, row = outcome.row, "move applied");
        if let Some(winner) = outcome.winner {
            info!(%session_id, %winner, moves = session.game.move_count(), "game won");
        } else if session.game.is_draw() {
            info!(%session_id, "board full, game drawn");
        }

        let _ = broadcast(
            session_id,
            session.participants.values(),
            &ServerMessage::State(snapshot.clone()),
        );
        Ok(snapshot)
    }

    /// Send `message` to every participant of a session. Returns the number queued.
    pub fn broadcast(&self, session_id: &SessionId, message: &ServerMessage) -> usize {
        let sessions = self.sessions.lock();
        sessions
            .get(session_id)
            .map_or(0, |s| broadcast(session_id, s.participants.values(), message))
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Number of admitted connections across all sessions.
    pub fn connection_count(&self) -> usize {
        self.sessions.lock().values().map(Session::active_count).sum()
    }

    /// Participants in one session (0 if it does not exist).
    pub fn active_count(&self, session_id: &SessionId) -> usize {
        self.sessions
            .lock()
            .get(session_id)
            .map_or(0, Session::active_count)
    }

    /// Current game state of a session.
    pub fn snapshot(&self, session_id: &SessionId) -> Option<GameSnapshot> {
        self.sessions
            .lock()
            .get(session_id)
            .map(|s| s.game.snapshot())
    }

    /// Seat held by a connection.
    pub fn player_of(&self, session_id: &SessionId, connection_id: &ConnectionId) -> Option<Player> {
        self.sessions
            .lock()
            .get(session_id)
            .and_then(|s| s.player_numbers.get(connection_id).copied())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::sync::mpsc;

    fn make_participant() -> (Arc<Participant>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        (Arc::new(Participant::new(ConnectionId::new(), tx)), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<String>>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    fn sid() -> SessionId {
        SessionId::from_raw("ABC123")
    }

    #[test]
    fn first_two_get_seats_in_order() {
        let reg = SessionRegistry::new();
        let (p1, mut rx1) = make_participant();
        let (p2, mut rx2) = make_participant();

        let a1 = reg.admit(&sid(), p1).unwrap();
        assert_eq!(a1.player, Player::One);
        assert_eq!(a1.active_count, 1);
        let first = drain(&mut rx1);
        assert_eq!(first, vec![serde_json::json!({"message": "Player assigned", "player": 1})]);

        let a2 = reg.admit(&sid(), p2).unwrap();
        assert_eq!(a2.player, Player::Two);
        assert_eq!(a2.active_count, 2);

        let started = serde_json::json!({"message": "Game started", "nextPlayer": 1});
        assert_eq!(drain(&mut rx1), vec![started.clone()]);
        assert_eq!(
            drain(&mut rx2),
            vec![serde_json::json!({"message": "Player assigned", "player": 2}), started]
        );
    }

    #[test]
    fn third_participant_rejected_without_mutation() {
        let reg = SessionRegistry::new();
        let (p1, _rx1) = make_participant();
        let (p2, _rx2) = make_participant();
        let (p3, mut rx3) = make_participant();
        let _ = reg.admit(&sid(), p1).unwrap();
        let _ = reg.admit(&sid(), p2).unwrap();
        let before = reg.snapshot(&sid());

        let err = reg.admit(&sid(), Arc::clone(&p3)).unwrap_err();
        assert!(matches!(err, AdmitError::SessionFull { capacity: 2, .. }));
        assert_eq!(reg.active_count(&sid()), 2);
        assert_eq!(reg.player_of(&sid(), &p3.id), None);
        assert_eq!(reg.snapshot(&sid()), before);
        assert!(drain(&mut rx3).is_empty());
    }

    #[test]
    fn sessions_are_independent() {
        let reg = SessionRegistry::new();
        let (a, _ra) = make_participant();
        let (b, _rb) = make_participant();
        assert_eq!(reg.admit(&SessionId::from_raw("one"), a).unwrap().player, Player::One);
        assert_eq!(reg.admit(&SessionId::from_raw("two"), b).unwrap().player, Player::One);
        assert_eq!(reg.session_count(), 2);
        assert_eq!(reg.connection_count(), 2);
    }

    #[test]
    fn last_removal_destroys_session() {
        let reg = SessionRegistry::new();
        let (p1, _rx1) = make_participant();
        let (p2, _rx2) = make_participant();
        let a1 = reg.admit(&sid(), p1).unwrap();
        let a2 = reg.admit(&sid(), p2).unwrap();

        assert!(reg.remove(&sid(), &a1.connection_id));
        assert_eq!(reg.session_count(), 1);
        assert_eq!(reg.active_count(&sid()), 1);

        assert!(reg.remove(&sid(), &a2.connection_id));
        assert_eq!(reg.session_count(), 0);
        assert_eq!(reg.snapshot(&sid()), None);
    }

    #[test]
    fn double_remove_is_noop() {
        let reg = SessionRegistry::new();
        let (p1, _rx1) = make_participant();
        let (p2, _rx2) = make_participant();
        let a1 = reg.admit(&sid(), p1).unwrap();
        let _ = reg.admit(&sid(), p2).unwrap();

        assert!(reg.remove(&sid(), &a1.connection_id));
        assert!(!reg.remove(&sid(), &a1.connection_id));
        assert_eq!(reg.active_count(&sid()), 1);
        assert!(!reg.remove(&SessionId::from_raw("nope"), &a1.connection_id));
        assert_eq!(reg.session_count(), 1);
    }

    #[test]
    fn fresh_game_after_session_destroyed() {
        let reg = SessionRegistry::new();
        let (p1, _rx1) = make_participant();
        let (p2, _rx2) = make_participant();
        let a1 = reg.admit(&sid(), p1).unwrap();
        let a2 = reg.admit(&sid(), p2).unwrap();
        let _ = reg.apply_move(&sid(), &a1.connection_id, 3).unwrap();
        let _ = reg.remove(&sid(), &a1.connection_id);
        let _ = reg.remove(&sid(), &a2.connection_id);

        let (p3, _rx3) = make_participant();
        let a3 = reg.admit(&sid(), p3).unwrap();
        assert_eq!(a3.player, Player::One);
        assert_eq!(reg.snapshot(&sid()), Some(GameState::new().snapshot()));
    }

    #[test]
    fn rejoin_takes_the_free_seat() {
        let reg = SessionRegistry::new();
        let (p1, _rx1) = make_participant();
        let (p2, _rx2) = make_participant();
        let a1 = reg.admit(&sid(), p1).unwrap();
        let a2 = reg.admit(&sid(), p2).unwrap();
        let _ = reg.apply_move(&sid(), &a1.connection_id, 0).unwrap();
        let _ = reg.remove(&sid(), &a1.connection_id);

        let (p3, mut rx3) = make_participant();
        let a3 = reg.admit(&sid(), p3).unwrap();
        assert_eq!(a3.player, Player::One);
        assert_eq!(reg.player_of(&sid(), &a2.connection_id), Some(Player::Two));
        // Game survives and the restart notice reports whose turn it is.
        let frames = drain(&mut rx3);
        assert_eq!(frames[1], serde_json::json!({"message": "Game started", "nextPlayer": 2}));
    }

    #[test]
    fn move_broadcasts_state_to_all() {
        let reg = SessionRegistry::new();
        let (p1, mut rx1) = make_participant();
        let (p2, mut rx2) = make_participant();
        let a1 = reg.admit(&sid(), p1).unwrap();
        let _ = reg.admit(&sid(), p2).unwrap();
        let _ = drain(&mut rx1);
        let _ = drain(&mut rx2);

        let snap = reg.apply_move(&sid(), &a1.connection_id, 3).unwrap();
        assert_eq!(snap.next_player, 2);
        assert_eq!(snap.board[5][3], 1);

        for rx in [&mut rx1, &mut rx2] {
            let frames = drain(rx);
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0]["nextPlayer"], 2);
            assert_eq!(frames[0]["winner"], 0);
            assert_eq!(frames[0]["board"][5][3], 1);
        }
    }

    #[test]
    fn rejected_move_sends_nothing() {
        let reg = SessionRegistry::new();
        let (p1, mut rx1) = make_participant();
        let (p2, mut rx2) = make_participant();
        let a1 = reg.admit(&sid(), p1).unwrap();
        let _ = reg.admit(&sid(), p2).unwrap();
        let _ = reg.apply_move(&sid(), &a1.connection_id, 3).unwrap();
        let _ = drain(&mut rx1);
        let _ = drain(&mut rx2);
        let before = reg.snapshot(&sid());

        let err = reg.apply_move(&sid(), &a1.connection_id, 3).unwrap_err();
        assert!(matches!(err, MoveError::NotYourTurn { player: Player::One }));
        assert_eq!(reg.snapshot(&sid()), before);
        assert!(drain(&mut rx1).is_empty());
        assert!(drain(&mut rx2).is_empty());
    }

    #[test]
    fn column_full_keeps_sixth_state() {
        let reg = SessionRegistry::new();
        let (p1, mut rx1) = make_participant();
        let (p2, _rx2) = make_participant();
        let a1 = reg.admit(&sid(), p1).unwrap();
        let a2 = reg.admit(&sid(), p2).unwrap();
        let movers = [&a1.connection_id, &a2.connection_id];
        for i in 0..6 {
            let _ = reg.apply_move(&sid(), movers[i % 2], 0).unwrap();
        }
        let sixth = reg.snapshot(&sid()).unwrap();
        let last_frame = drain(&mut rx1).pop().unwrap();
        assert_eq!(last_frame, serde_json::to_value(&sixth).unwrap());

        let err = reg.apply_move(&sid(), &a1.connection_id, 0).unwrap_err();
        assert_eq!(err, MoveError::ColumnFull { column: 0 });
        assert_eq!(reg.snapshot(&sid()).unwrap(), sixth);
        assert!(drain(&mut rx1).is_empty());
    }

    #[test]
    fn move_from_unknown_connection_or_session() {
        let reg = SessionRegistry::new();
        let (p1, _rx1) = make_participant();
        let _ = reg.admit(&sid(), p1).unwrap();
        let stranger = ConnectionId::new();
        assert!(matches!(
            reg.apply_move(&sid(), &stranger, 0),
            Err(MoveError::UnknownConnection(_))
        ));
        assert!(matches!(
            reg.apply_move(&SessionId::from_raw("nope"), &stranger, 0),
            Err(MoveError::UnknownSession(_))
        ));
    }

    #[test]
    fn lone_player_can_open_the_game() {
        let reg = SessionRegistry::new();
        let (p1, _rx1) = make_participant();
        let a1 = reg.admit(&sid(), p1).unwrap();
        assert!(reg.apply_move(&sid(), &a1.connection_id, 2).is_ok());
    }

    #[test]
    fn registry_broadcast_to_unknown_session() {
        let reg = SessionRegistry::new();
        let msg = ServerMessage::GameStarted { next_player: Player::One };
        assert_eq!(reg.broadcast(&sid(), &msg), 0);
        let (p1, mut rx1) = make_participant();
        let _ = reg.admit(&sid(), p1).unwrap();
        let _ = drain(&mut rx1);
        assert_eq!(reg.broadcast(&sid(), &msg), 1);
        assert_eq!(drain(&mut rx1).len(), 1);
    }

    #[test]
    fn concurrent_admissions_never_exceed_capacity() {
        let reg = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    let (p, rx) = make_participant();
                    let admitted = reg.admit(&sid(), p).ok();
                    (admitted, rx)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let mut seats: Vec<Player> = results
            .iter()
            .filter_map(|(a, _)| a.as_ref().map(|a| a.player))
            .collect();
        seats.sort_by_key(|p| p.number());
        assert_eq!(seats, vec![Player::One, Player::Two]);
        assert_eq!(reg.active_count(&sid()), 2);
    }

    #[test]
    fn concurrent_churn_leaves_no_stale_sessions() {
        let reg = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    let session = SessionId::from_raw(format!("s{}", i % 3));
                    for _ in 0..50 {
                        let (p, _rx) = make_participant();
                        if let Ok(a) = reg.admit(&session, p) {
                            let _ = reg.apply_move(&session, &a.connection_id, 3);
                            assert!(reg.active_count(&session) <= SESSION_CAPACITY);
                            assert!(reg.remove(&session, &a.connection_id));
                            assert!(!reg.remove(&session, &a.connection_id));
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.session_count(), 0);
        assert_eq!(reg.connection_count(), 0);
    }
}
