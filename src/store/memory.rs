//! In-Memory Session Store
//!
//! Reference `SessionRepository` backend. A single map lock makes every
//! conditional update atomic: the guard check and delta application happen
//! under one lock acquisition, with no I/O inside the critical section, so
//! concurrent writers to the same record are totally ordered here exactly
//! the way a CAS-capable database would order them.

use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::game::{Game, GameId, InviteCode};
use crate::store::{GameDelta, GameGuard, SessionRepository, StoreError};

/// In-memory store over a `BTreeMap`, keyed by game id, with an invite-code
/// index for lookup by joining players.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    games: BTreeMap<GameId, Game>,
    invites: BTreeMap<InviteCode, GameId>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored games.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.games.len()
    }

    /// Whether the store holds no games.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.games.is_empty()
    }
}

impl SessionRepository for MemoryStore {
    async fn insert(&self, game: Game) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.games.contains_key(&game.id) || inner.invites.contains_key(&game.invite_code) {
            return Err(StoreError::Duplicate(game.id));
        }
        inner.invites.insert(game.invite_code.clone(), game.id);
        inner.games.insert(game.id, game);
        Ok(())
    }

    async fn find_by_id(&self, id: GameId) -> Result<Option<Game>, StoreError> {
        Ok(self.inner.lock().await.games.get(&id).cloned())
    }

    async fn find_by_invite(&self, code: &InviteCode) -> Result<Option<Game>, StoreError> {
        let inner = self.inner.lock().await;
        let id = match inner.invites.get(code) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(inner.games.get(&id).cloned())
    }

    async fn conditional_update(
        &self,
        id: GameId,
        guard: GameGuard,
        delta: GameDelta,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let game = match inner.games.get_mut(&id) {
            Some(game) => game,
            None => return Ok(0),
        };

        if !guard.matches(game) {
            return Ok(0);
        }

        delta.apply_to(game);
        game.version += 1;
        game.updated_at = Utc::now();
        Ok(1)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Address, GameStatus};

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    async fn store_with_game() -> (MemoryStore, Game) {
        let store = MemoryStore::new();
        let game = Game::new(addr("0xadmin"), "secret", 2);
        store.insert(game.clone()).await.unwrap();
        (store, game)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (store, game) = store_with_game().await;

        let by_id = store.find_by_id(game.id).await.unwrap().unwrap();
        assert_eq!(by_id.id, game.id);

        let by_invite = store.find_by_invite(&game.invite_code).await.unwrap().unwrap();
        assert_eq!(by_invite.id, game.id);
    }

    #[tokio::test]
    async fn test_insert_duplicate_rejected() {
        let (store, game) = store_with_game().await;
        let result = store.insert(game).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_find_unknown_returns_none() {
        let store = MemoryStore::new();
        assert!(store.find_by_id(GameId::generate()).await.unwrap().is_none());
        assert!(store
            .find_by_invite(&InviteCode::new("nope"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_applies_delta_and_bumps_version() {
        let (store, game) = store_with_game().await;

        let matched = store
            .conditional_update(
                game.id,
                GameGuard::any().status_is(GameStatus::Ongoing),
                GameDelta::PushPlayer(addr("0xa")),
            )
            .await
            .unwrap();
        assert_eq!(matched, 1);

        let updated = store.find_by_id(game.id).await.unwrap().unwrap();
        assert_eq!(updated.players, vec![addr("0xa")]);
        assert_eq!(updated.version, game.version + 1);
        assert!(updated.updated_at >= game.updated_at);
    }

    #[tokio::test]
    async fn test_failed_guard_matches_zero_and_leaves_record_untouched() {
        let (store, game) = store_with_game().await;

        let matched = store
            .conditional_update(
                game.id,
                GameGuard::any().status_is(GameStatus::Paused),
                GameDelta::PushPlayer(addr("0xa")),
            )
            .await
            .unwrap();
        assert_eq!(matched, 0);

        let unchanged = store.find_by_id(game.id).await.unwrap().unwrap();
        assert_eq!(unchanged.players.len(), 0);
        assert_eq!(unchanged.version, game.version);
    }

    #[tokio::test]
    async fn test_update_unknown_id_matches_zero() {
        let store = MemoryStore::new();
        let matched = store
            .conditional_update(
                GameId::generate(),
                GameGuard::any(),
                GameDelta::SetStatus(GameStatus::Paused),
            )
            .await
            .unwrap();
        assert_eq!(matched, 0);
    }

    #[tokio::test]
    async fn test_concurrent_finish_has_single_winner() {
        let (store, game) = store_with_game().await;
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let id = game.id;
            handles.push(tokio::spawn(async move {
                store
                    .conditional_update(
                        id,
                        GameGuard::any().status_not(GameStatus::Finished),
                        GameDelta::Finish {
                            winner: addr(&format!("0x{i}")),
                        },
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            successes += handle.await.unwrap();
        }
        assert_eq!(successes, 1, "exactly one concurrent finish may match");

        let final_game = store.find_by_id(game.id).await.unwrap().unwrap();
        assert_eq!(final_game.status, GameStatus::Finished);
        assert!(final_game.winner.is_some());
    }
}
