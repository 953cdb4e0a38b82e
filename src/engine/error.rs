//! Engine Error Taxonomy
//!
//! Every rejected operation surfaces as a typed outcome; nothing is silently
//! dropped. `Conflict` means "a concurrent write beat you — re-fetch and your
//! intent may still be achievable", while `InvalidState` means "this action
//! can never succeed in the current phase".

use thiserror::Error;

use crate::game::GameStatus;
use crate::store::StoreError;

/// Why an operation was forbidden for this caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ForbiddenReason {
    /// Operation requires the session admin.
    #[error("caller is not the game admin")]
    NotAdmin,
    /// Caller was kicked from this game and may never rejoin.
    #[error("caller was kicked from this game")]
    Kicked,
}

/// Which concurrent outcome the caller lost to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictReason {
    /// The last open slot was taken before this write committed.
    #[error("game is full")]
    GameFull,
    /// Another claim already finished the game. Clients should branch to a
    /// losing-outcome presentation, not a retry prompt.
    #[error("game already finished")]
    AlreadyFinished,
    /// The record changed underneath this write; re-fetch and retry.
    #[error("concurrent update, state is stale")]
    StaleWrite,
}

/// Typed rejection returned by the engine and query service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Session or invite code unknown.
    #[error("game not found")]
    NotFound,

    /// Kick target is not a joined player.
    #[error("player not in game")]
    PlayerNotFound,

    /// Operation not legal for the game's current status.
    #[error("operation not allowed while game is {0}")]
    InvalidState(GameStatus),

    /// Caller lacks the required role.
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),

    /// Guard failed because of a concurrent write.
    #[error("conflict: {0}")]
    Conflict(ConflictReason),

    /// Hidden-count adjustment would leave `1..=secret_len`.
    #[error("hidden count {requested} out of range 1..={max}")]
    OutOfRange {
        /// The count the adjustment would have produced.
        requested: i64,
        /// Length of the secret, the upper bound.
        max: usize,
    },

    /// Credential missing or invalid.
    #[error("unauthorized")]
    Unauthorized,

    /// Store backend failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Credential minting failed (signing misconfiguration).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_finished_message_is_explicit() {
        // Clients branch on this exact wording to show a losing outcome.
        let err = EngineError::Conflict(ConflictReason::AlreadyFinished);
        assert_eq!(err.to_string(), "conflict: game already finished");
    }

    #[test]
    fn test_store_error_maps_to_storage() {
        let err: EngineError = StoreError::Backend("boom".into()).into();
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
