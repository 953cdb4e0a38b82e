//! Session Store
//!
//! The durable home of `Game` records. The engine never holds a lock across
//! a store call; all write correctness is delegated to the store's
//! conditional-update atomicity, so any backend offering compare-and-swap
//! style updates (in-memory map, document store, SQL row with a version
//! column) can stand behind this trait.

pub mod guard;
pub mod memory;

pub use guard::{GameDelta, GameGuard};
pub use memory::MemoryStore;

use thiserror::Error;

use crate::game::{Game, GameId, InviteCode};

/// Store backend errors.
///
/// Guard failure is NOT an error: `conditional_update` reports it as a
/// matched count of zero, exactly like a `WHERE` clause that matched no rows.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A record with the same id or invite code already exists.
    #[error("duplicate game record: {0}")]
    Duplicate(GameId),

    /// Backend failure (connection loss, serialization, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Contract every session store must honor.
///
/// `conditional_update` must evaluate the guard and apply the delta as one
/// atomic step with respect to all other updates of the same record, and
/// must bump the record's version marker on every applied update.
pub trait SessionRepository: Send + Sync {
    /// Insert a freshly created game.
    fn insert(&self, game: Game) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Point read by id.
    fn find_by_id(
        &self,
        id: GameId,
    ) -> impl std::future::Future<Output = Result<Option<Game>, StoreError>> + Send;

    /// Point read by invite code.
    fn find_by_invite(
        &self,
        code: &InviteCode,
    ) -> impl std::future::Future<Output = Result<Option<Game>, StoreError>> + Send;

    /// Apply `delta` to the record matching `{id, guard}`.
    ///
    /// Returns the matched count: `1` if the guard held and the delta was
    /// applied, `0` if the record is missing or the guard failed.
    fn conditional_update(
        &self,
        id: GameId,
        guard: GameGuard,
        delta: GameDelta,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;
}
