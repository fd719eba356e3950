//! Standard chess, backed by `shakmaty`.

use rookery_protocol::{Color, MoveToken};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position};

use crate::{DrawReason, RulesEngine, RulesError, Terminal};

/// Occurrences of one position that end the game without a claim.
const FIVEFOLD: usize = 5;

/// Halfmove clock value (150 plies = 75 moves per side) that ends the game
/// without a claim.
const SEVENTY_FIVE_MOVES: u32 = 150;

/// A chess position together with the repetition keys of every position
/// that led to it.
///
/// The history is part of the position because repetition is a property of
/// the whole game, and the position must stay a pure function of the move
/// log.
#[derive(Debug, Clone)]
pub struct ChessPosition {
    board: Chess,
    history: Vec<String>,
}

impl ChessPosition {
    fn start(board: Chess) -> Self {
        let key = repetition_key(&board);
        Self {
            board,
            history: vec![key],
        }
    }

    fn advance(&self, board: Chess) -> Self {
        let mut history = self.history.clone();
        history.push(repetition_key(&board));
        Self { board, history }
    }

    /// How many times the current position has occurred, itself included.
    fn occurrences(&self) -> usize {
        match self.history.last() {
            Some(current) => self.history.iter().filter(|key| *key == current).count(),
            None => 0,
        }
    }

    fn fen(&self) -> String {
        Fen::from_position(self.board.clone(), EnPassantMode::Legal).to_string()
    }
}

/// Board, side to move, castling rights and en passant square: the FEN
/// fields that decide whether two positions are "the same" for repetition.
fn repetition_key(board: &Chess) -> String {
    let fen = Fen::from_position(board.clone(), EnPassantMode::Legal).to_string();
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn color_of(color: shakmaty::Color) -> Color {
    match color {
        shakmaty::Color::White => Color::White,
        shakmaty::Color::Black => Color::Black,
    }
}

/// Standard chess with UCI move tokens.
///
/// Draws are the automatic ones (stalemate, insufficient material,
/// fivefold repetition, seventy-five move rule); there is no protocol for
/// claiming threefold or fifty-move draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardChess;

impl RulesEngine for StandardChess {
    type Position = ChessPosition;

    fn initial_position(&self) -> ChessPosition {
        ChessPosition::start(Chess::default())
    }

    fn apply_move(
        &self,
        position: &ChessPosition,
        token: &MoveToken,
    ) -> Result<ChessPosition, RulesError> {
        let uci: UciMove = token
            .as_str()
            .parse()
            .map_err(|_| RulesError::Malformed(token.to_string()))?;
        let mv = uci
            .to_move(&position.board)
            .map_err(|_| RulesError::Illegal(token.to_string()))?;
        let board = position
            .board
            .clone()
            .play(&mv)
            .map_err(|_| RulesError::Illegal(token.to_string()))?;
        Ok(position.advance(board))
    }

    fn legal_moves(&self, position: &ChessPosition) -> Vec<MoveToken> {
        position
            .board
            .legal_moves()
            .iter()
            .map(|m| MoveToken::new(m.to_uci(CastlingMode::Standard).to_string()))
            .collect()
    }

    fn is_check(&self, position: &ChessPosition) -> bool {
        position.board.is_check()
    }

    fn terminal_status(&self, position: &ChessPosition) -> Option<Terminal> {
        let board = &position.board;
        if board.is_checkmate() {
            // The side to move is mated, so the side that just moved won.
            return Some(Terminal::Checkmate {
                winner: color_of(board.turn()).opposite(),
            });
        }
        if board.is_stalemate() {
            return Some(Terminal::Draw(DrawReason::Stalemate));
        }
        if board.is_insufficient_material() {
            return Some(Terminal::Draw(DrawReason::InsufficientMaterial));
        }
        if position.occurrences() >= FIVEFOLD {
            return Some(Terminal::Draw(DrawReason::FivefoldRepetition));
        }
        if board.halfmoves() >= SEVENTY_FIVE_MOVES {
            return Some(Terminal::Draw(DrawReason::SeventyFiveMoveRule));
        }
        None
    }

    fn encode(&self, position: &ChessPosition) -> String {
        position.fen()
    }
}
