use crate::moves::Move;
use crate::search::MAX_PLY;
use crate::state::{piece_kind, Board, EMPTY};

const HISTORY_MAX: i32 = 16384;

/// Per-colour, piece-to success counter for quiet move ordering.
#[derive(Clone)]
pub struct HistoryTable {
    table: Box<[[[i32; 64]; 6]; 2]>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[0; 64]; 6]; 2]),
        }
    }

    pub fn clear(&mut self) {
        for colour in self.table.iter_mut() {
            for piece in colour.iter_mut() {
                piece.fill(0);
            }
        }
    }

    #[inline(always)]
    pub fn get(&self, board: &Board, mv: Move) -> i32 {
        let piece = board.squares[mv.source() as usize];
        if piece == EMPTY {
            return 0;
        }
        self.table[board.side_to_move][piece_kind(piece)][mv.target() as usize]
    }

    /// Gravity update: large entries resist further growth and decay
    /// towards corrections of the opposite sign.
    pub fn update(&mut self, board: &Board, mv: Move, bonus: i32) {
        let piece = board.squares[mv.source() as usize];
        if piece == EMPTY {
            return;
        }
        let entry =
            &mut self.table[board.side_to_move][piece_kind(piece)][mv.target() as usize];
        *entry += bonus - (*entry * bonus.abs()) / HISTORY_MAX;
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Two quiet moves per ply that recently produced a cutoff at that height.
#[derive(Clone)]
pub struct KillerTable {
    table: [[Move; 2]; MAX_PLY + 1],
}

impl KillerTable {
    pub fn new() -> Self {
        Self {
            table: [[Move::NONE; 2]; MAX_PLY + 1],
        }
    }

    pub fn clear(&mut self) {
        self.table = [[Move::NONE; 2]; MAX_PLY + 1];
    }

    #[inline(always)]
    pub fn get(&self, height: i32) -> [Move; 2] {
        self.table[height as usize]
    }

    /// Shift-and-insert, never duplicating the front slot.
    pub fn insert(&mut self, height: i32, mv: Move) {
        let slot = &mut self.table[height as usize];
        if slot[0] != mv {
            slot[1] = slot[0];
            slot[0] = mv;
        }
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_tables;
    use crate::state::START_FEN;

    #[test]
    fn test_history_update_and_saturation() {
        init_tables();
        let board = Board::from_fen(START_FEN).unwrap();
        let mut history = HistoryTable::new();
        let mv = Move::new(12, 28, Move::NORMAL);

        history.update(&board, mv, 400);
        let first = history.get(&board, mv);
        assert!(first > 0);

        for _ in 0..1000 {
            history.update(&board, mv, 400);
        }
        assert!(history.get(&board, mv) <= HISTORY_MAX);

        history.update(&board, mv, -400);
        assert!(history.get(&board, mv) < HISTORY_MAX);
    }

    #[test]
    fn test_killers_no_duplicate() {
        let mut killers = KillerTable::new();
        let a = Move::new(1, 2, Move::NORMAL);
        let b = Move::new(3, 4, Move::NORMAL);

        killers.insert(5, a);
        killers.insert(5, a);
        assert_eq!(killers.get(5), [a, Move::NONE]);

        killers.insert(5, b);
        assert_eq!(killers.get(5), [b, a]);
    }
}
