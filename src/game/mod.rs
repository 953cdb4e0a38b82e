//! Game Domain Module
//!
//! The session data model: identifiers, status machine, the authoritative
//! `Game` record, and its redacted `GameSnapshot` view.

pub mod state;

// Re-export key types
pub use state::{
    reveal_mask, Address, Game, GameId, GameKey, GameMode, GameSnapshot, GameStatus, InviteCode,
    MASK_CHAR,
};
