//! The in-memory state of one game.

use rand::Rng;
use rookery_protocol::{Color, GameResult, GameStatus, MoveToken, Players, SessionId, UserId};

/// One game's working state.
///
/// Fields are private so that the only ways to change a session are the
/// mutators below, each of which keeps these true:
///
/// - `position` is the replay of `moves` (or the last good replay, if the
///   session is degraded).
/// - `result` is set exactly when `status` is `Finished`.
/// - `Finished` is final.
/// - The side to move is `White` after an even number of moves, `Black`
///   after an odd number.
#[derive(Debug, Clone)]
pub struct GameSession<P> {
    id: SessionId,
    white: UserId,
    black: Option<UserId>,
    moves: Vec<MoveToken>,
    position: P,
    status: GameStatus,
    result: Option<GameResult>,
    degraded: bool,
    evicted: bool,
}

impl<P> GameSession<P> {
    /// A fresh session at `initial`. `Active` if both seats are filled,
    /// `Waiting` otherwise.
    pub fn new(id: SessionId, white: UserId, black: Option<UserId>, initial: P) -> Self {
        let status = if black.is_some() {
            GameStatus::Active
        } else {
            GameStatus::Waiting
        };
        Self {
            id,
            white,
            black,
            moves: Vec::new(),
            position: initial,
            status,
            result: None,
            degraded: false,
            evicted: false,
        }
    }

    /// Rebuilds a session from replayed durable state.
    pub(crate) fn restore(
        id: SessionId,
        players: Players,
        moves: Vec<MoveToken>,
        position: P,
        status: GameStatus,
        result: Option<GameResult>,
        degraded: bool,
    ) -> Self {
        Self {
            id,
            white: players.white,
            black: players.black,
            moves,
            position,
            status,
            result,
            degraded,
            evicted: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn players(&self) -> Players {
        Players {
            white: self.white,
            black: self.black,
        }
    }

    pub fn moves(&self) -> &[MoveToken] {
        &self.moves
    }

    pub fn position(&self) -> &P {
        &self.position
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    /// `true` if the stored move log did not fully replay. A degraded
    /// session is read-only.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// `true` once the registry has dropped this session. Anyone still
    /// holding it must look the id up again.
    pub fn is_evicted(&self) -> bool {
        self.evicted
    }

    /// Whose turn it is, from move-count parity.
    pub fn side_to_move(&self) -> Color {
        Color::for_ply(self.moves.len())
    }

    /// The user seated at `color`, if any.
    pub fn player(&self, color: Color) -> Option<UserId> {
        match color {
            Color::White => Some(self.white),
            Color::Black => self.black,
        }
    }

    /// The color `user` plays, `None` if they are not seated.
    pub fn color_of(&self, user: UserId) -> Option<Color> {
        if user == self.white {
            Some(Color::White)
        } else if self.black == Some(user) {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn is_player(&self, user: UserId) -> bool {
        self.color_of(user).is_some()
    }

    /// Appends an accepted move and adopts the position it produced.
    ///
    /// The caller has already checked turn and legality and made the move
    /// durable.
    pub fn record_move(&mut self, token: MoveToken, position: P) {
        debug_assert!(self.status.is_active(), "move recorded on inactive session");
        self.moves.push(token);
        self.position = position;
    }

    /// Ends the game. A finished session stays finished.
    pub fn finish(&mut self, result: GameResult) {
        if self.status == GameStatus::Finished {
            return;
        }
        self.status = GameStatus::Finished;
        self.result = Some(result);
    }

    /// Seats `user` as black and starts the game. Returns `false` (and
    /// changes nothing) unless the session is waiting for an opponent.
    pub fn seat_black(&mut self, user: UserId) -> bool {
        if self.status != GameStatus::Waiting || self.black.is_some() || user == self.white {
            return false;
        }
        self.black = Some(user);
        self.status = GameStatus::Active;
        true
    }

    pub(crate) fn mark_evicted(&mut self) {
        self.evicted = true;
    }
}

/// Generates a new session id: 128 random bits as 32 lowercase hex chars.
pub fn new_session_id() -> SessionId {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    SessionId::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}
