//! Text storage for seam: an undoable piece-table buffer plus a rune-indexed
//! view over it.
//!
//! [`PieceBuffer`] stores content as immutable chunks ("pieces") stitched into
//! a doubly linked list. Every mutation swaps one contiguous span of pieces
//! for another and is recorded in an action stack, so undo and redo are pure
//! link surgery with no content copying. [`RuneView`] adapts the byte-oriented
//! buffer to the rune positions the editing model speaks, amortizing forward
//! scans through a cached cursor.

mod content;
mod piece;
mod rune;
pub mod util;

pub use content::Content;
pub use piece::{PieceBuffer, PieceReader, PieceRef};
pub use rune::RuneView;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextError {
    #[error("position is greater than text size")]
    WrongPos,
}
