//! Session Query Service
//!
//! The read path: resolve a game by id or invite code and classify the
//! caller's role against the freshly read record. Role is recomputed on
//! every call and never cached beyond one response, because membership can
//! change underneath the caller at any time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::error::EngineError;
use crate::game::{Address, GameKey, GameSnapshot};
use crate::store::SessionRepository;

/// The caller's relationship to a game, as of one specific read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The caller created the game.
    Admin,
    /// The caller is a joined player.
    Player,
    /// The caller was removed by the admin and may not rejoin.
    Kicked,
    /// The caller has no relationship to the game.
    Outsider,
}

/// A read response: the caller's view plus their current role.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    /// Redacted snapshot (secret present only for the admin).
    pub snapshot: GameSnapshot,
    /// The caller's role at read time.
    pub role: Role,
}

/// Side-effect-free read service. Reads may be retried freely.
pub struct QueryService<R> {
    repo: Arc<R>,
}

impl<R: SessionRepository> QueryService<R> {
    /// Build a query service over a store.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Fetch the current authoritative state and classify `caller`.
    pub async fn fetch(&self, key: &GameKey, caller: &Address) -> Result<SessionView, EngineError> {
        let game = match key {
            GameKey::Id(id) => self.repo.find_by_id(*id).await?,
            GameKey::Invite(code) => self.repo.find_by_invite(code).await?,
        }
        .ok_or(EngineError::NotFound)?;

        let role = if game.is_admin(caller) {
            Role::Admin
        } else if game.has_player(caller) {
            Role::Player
        } else if game.is_kicked(caller) {
            Role::Kicked
        } else {
            Role::Outsider
        };

        Ok(SessionView {
            snapshot: game.snapshot_for(Some(caller)),
            role,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;
    use crate::store::{GameDelta, GameGuard, MemoryStore};

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    async fn service_with_game() -> (QueryService<MemoryStore>, Game) {
        let repo = Arc::new(MemoryStore::new());
        let mut game = Game::new(addr("0xadmin"), "secret", 4);
        game.players.push(addr("0xplayer"));
        game.kicked_players.push(addr("0xkicked"));
        repo.insert(game.clone()).await.unwrap();
        (QueryService::new(repo.clone()), game)
    }

    #[tokio::test]
    async fn test_role_classification() {
        let (service, game) = service_with_game().await;
        let key = GameKey::Id(game.id);

        let cases = [
            ("0xadmin", Role::Admin),
            ("0xplayer", Role::Player),
            ("0xkicked", Role::Kicked),
            ("0xnobody", Role::Outsider),
        ];
        for (caller, expected) in cases {
            let view = service.fetch(&key, &addr(caller)).await.unwrap();
            assert_eq!(view.role, expected, "role of {caller}");
        }
    }

    #[tokio::test]
    async fn test_fetch_by_invite() {
        let (service, game) = service_with_game().await;
        let view = service
            .fetch(&GameKey::Invite(game.invite_code.clone()), &addr("0xplayer"))
            .await
            .unwrap();
        assert_eq!(view.snapshot.id, game.id);
    }

    #[tokio::test]
    async fn test_unknown_game_not_found() {
        let (service, _) = service_with_game().await;
        let result = service
            .fetch(
                &GameKey::Invite(crate::game::InviteCode::new("nope")),
                &addr("0xplayer"),
            )
            .await;
        assert_eq!(result.unwrap_err(), EngineError::NotFound);
    }

    #[tokio::test]
    async fn test_snapshot_redaction_follows_role() {
        let (service, game) = service_with_game().await;
        let key = GameKey::Id(game.id);

        let admin_view = service.fetch(&key, &addr("0xadmin")).await.unwrap();
        assert_eq!(admin_view.snapshot.secret.as_deref(), Some("secret"));

        let player_view = service.fetch(&key, &addr("0xplayer")).await.unwrap();
        assert!(player_view.snapshot.secret.is_none());
    }

    #[tokio::test]
    async fn test_role_is_recomputed_per_call() {
        let repo = Arc::new(MemoryStore::new());
        let game = Game::new(addr("0xadmin"), "secret", 4);
        repo.insert(game.clone()).await.unwrap();
        let service = QueryService::new(repo.clone());
        let key = GameKey::Id(game.id);

        let before = service.fetch(&key, &addr("0xa")).await.unwrap();
        assert_eq!(before.role, Role::Outsider);

        repo.conditional_update(
            game.id,
            GameGuard::any(),
            GameDelta::PushPlayer(addr("0xa")),
        )
        .await
        .unwrap();

        let after = service.fetch(&key, &addr("0xa")).await.unwrap();
        assert_eq!(after.role, Role::Player);
    }
}
