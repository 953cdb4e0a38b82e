//! Session Transition Engine
//!
//! Applies every state-changing operation as one conditional write against
//! the store, then re-reads the canonical post-state and publishes it. No
//! in-process lock protects a game record: two racing writers are ordered by
//! the store's conditional-update atomicity, and exactly one observes its
//! guard hold for mutually-exclusive transitions like claiming the win.
//!
//! When a guard fails, the engine re-reads the record once to classify the
//! race into a precise rejection (slot taken, already finished, stale) and
//! never retries on the caller's behalf.

use std::sync::Arc;

use crate::engine::error::{ConflictReason, EngineError, ForbiddenReason};
use crate::engine::operation::{HiddenAdjust, Operation};
use crate::game::{
    reveal_mask, Address, Game, GameId, GameKey, GameMode, GameSnapshot, GameStatus,
};
use crate::network::auth::TokenIssuer;
use crate::network::broadcast::{Broadcaster, GameEvent};
use crate::store::{GameDelta, GameGuard, SessionRepository};

/// Outcome of a join: a credential bound to the joining address plus the
/// caller's view of the game.
#[derive(Clone, Debug)]
pub struct JoinOutcome {
    /// Credential for subsequent guarded operations.
    pub credential: String,
    /// Post-transition (or current, for re-joins) view of the game.
    pub snapshot: GameSnapshot,
    /// True when the caller was already a member and no delta was applied.
    pub rejoined: bool,
}

/// Outcome of a game creation: the admin credential plus the admin's view.
#[derive(Clone, Debug)]
pub struct CreateOutcome {
    /// Credential bound to the admin address.
    pub credential: String,
    /// The freshly stored game, admin view (secret included).
    pub snapshot: GameSnapshot,
}

/// Outcome of [`TransitionEngine::apply`]: the caller's snapshot plus a
/// credential when the operation issues one (join).
#[derive(Clone, Debug)]
pub struct ApplyOutcome {
    /// The caller's view of the post-transition game.
    pub snapshot: GameSnapshot,
    /// Credential issued by this operation, if any.
    pub credential: Option<String>,
}

/// Owns the authoritative write path for every session.
pub struct TransitionEngine<R, B> {
    repo: Arc<R>,
    broadcaster: Arc<B>,
    tokens: Arc<TokenIssuer>,
}

impl<R: SessionRepository, B: Broadcaster> TransitionEngine<R, B> {
    /// Build an engine over a store, a broadcaster, and a token issuer.
    pub fn new(repo: Arc<R>, broadcaster: Arc<B>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            repo,
            broadcaster,
            tokens,
        }
    }

    // -------------------------------------------------------------------------
    // Creation (outside the transition table: a fresh record, no guard)
    // -------------------------------------------------------------------------

    /// Create and store a new game, issuing the admin's credential.
    pub async fn create_game(
        &self,
        admin: Address,
        secret: impl Into<String>,
        max_players: usize,
    ) -> Result<CreateOutcome, EngineError> {
        let game = Game::new(admin.clone(), secret, max_players);
        self.repo.insert(game.clone()).await?;

        tracing::info!(
            game_id = %game.id,
            invite = %game.invite_code,
            %admin,
            max_players,
            "game created"
        );

        let credential = self.issue(&admin)?;
        Ok(CreateOutcome {
            credential,
            snapshot: game.snapshot_for(Some(&admin)),
        })
    }

    // -------------------------------------------------------------------------
    // Join / Leave
    // -------------------------------------------------------------------------

    /// Join a game.
    ///
    /// Idempotent for existing members: a fresh credential is issued without
    /// touching `players`, so credential reissue is never mistaken for a new
    /// join. Kicked addresses are rejected permanently.
    pub async fn join(&self, key: GameKey, address: Address) -> Result<JoinOutcome, EngineError> {
        let game = self.resolve(&key).await?;

        if game.is_kicked(&address) {
            return Err(EngineError::Forbidden(ForbiddenReason::Kicked));
        }
        if game.has_player(&address) {
            let credential = self.issue(&address)?;
            tracing::debug!(game_id = %game.id, %address, "member rejoin, credential reissued");
            return Ok(JoinOutcome {
                credential,
                snapshot: game.snapshot_for(Some(&address)),
                rejoined: true,
            });
        }
        if game.status != GameStatus::Ongoing {
            return Err(EngineError::InvalidState(game.status));
        }
        if !game.has_capacity() {
            return Err(EngineError::Conflict(ConflictReason::GameFull));
        }

        let guard = GameGuard::any()
            .status_is(GameStatus::Ongoing)
            .not_player(address.clone())
            .not_kicked(address.clone())
            .below_capacity();
        let matched = self
            .repo
            .conditional_update(game.id, guard, GameDelta::PushPlayer(address.clone()))
            .await?;

        if matched == 0 {
            return self.classify_join_race(game.id, address).await;
        }

        let updated = self.reread_and_publish(game.id).await?;
        tracing::info!(
            game_id = %updated.id,
            %address,
            players = updated.players.len(),
            "player joined"
        );

        let credential = self.issue(&address)?;
        Ok(JoinOutcome {
            credential,
            snapshot: updated.snapshot_for(Some(&address)),
            rejoined: false,
        })
    }

    /// Re-read after a failed join guard and turn the race into a precise
    /// outcome: a concurrent join from another device is still a success.
    async fn classify_join_race(
        &self,
        game_id: GameId,
        address: Address,
    ) -> Result<JoinOutcome, EngineError> {
        let now = self.reread(game_id).await?;

        if now.has_player(&address) {
            let credential = self.issue(&address)?;
            return Ok(JoinOutcome {
                credential,
                snapshot: now.snapshot_for(Some(&address)),
                rejoined: true,
            });
        }
        if now.is_kicked(&address) {
            return Err(EngineError::Forbidden(ForbiddenReason::Kicked));
        }
        if now.status != GameStatus::Ongoing {
            return Err(EngineError::InvalidState(now.status));
        }
        if !now.has_capacity() {
            return Err(EngineError::Conflict(ConflictReason::GameFull));
        }
        Err(EngineError::Conflict(ConflictReason::StaleWrite))
    }

    /// Leave a game. Leaving when not a member is a no-op success.
    pub async fn leave(&self, key: GameKey, credential: &str) -> Result<GameSnapshot, EngineError> {
        let caller = self.verify(credential)?;
        let game = self.resolve(&key).await?;

        if !game.has_player(&caller) {
            return Ok(game.snapshot_for(Some(&caller)));
        }

        let guard = GameGuard::any().has_player(caller.clone());
        let matched = self
            .repo
            .conditional_update(game.id, guard, GameDelta::RemovePlayer(caller.clone()))
            .await?;

        if matched == 0 {
            // Removed concurrently (left elsewhere or kicked): same outcome.
            let now = self.reread(game.id).await?;
            return Ok(now.snapshot_for(Some(&caller)));
        }

        let updated = self.reread_and_publish(game.id).await?;
        tracing::info!(
            game_id = %updated.id,
            address = %caller,
            players = updated.players.len(),
            "player left"
        );
        Ok(updated.snapshot_for(Some(&caller)))
    }

    // -------------------------------------------------------------------------
    // Admin operations
    // -------------------------------------------------------------------------

    /// Kick `target` out of the game, barring any future rejoin.
    pub async fn kick(
        &self,
        key: GameKey,
        credential: &str,
        target: Address,
    ) -> Result<GameSnapshot, EngineError> {
        let (admin, game) = self.resolve_admin(&key, credential).await?;

        if game.status == GameStatus::Finished {
            return Err(EngineError::InvalidState(GameStatus::Finished));
        }
        if !game.has_player(&target) {
            // A target kicked by a concurrent request is already gone.
            if game.is_kicked(&target) {
                return Ok(game.snapshot_for(Some(&admin)));
            }
            return Err(EngineError::PlayerNotFound);
        }

        let guard = GameGuard::any()
            .status_not(GameStatus::Finished)
            .has_player(target.clone());
        let matched = self
            .repo
            .conditional_update(game.id, guard, GameDelta::KickPlayer(target.clone()))
            .await?;

        if matched == 0 {
            let now = self.reread(game.id).await?;
            if now.is_kicked(&target) {
                return Ok(now.snapshot_for(Some(&admin)));
            }
            if now.status == GameStatus::Finished {
                return Err(EngineError::InvalidState(GameStatus::Finished));
            }
            return Err(EngineError::PlayerNotFound);
        }

        let updated = self.reread_and_publish(game.id).await?;
        tracing::info!(game_id = %updated.id, %target, "player kicked");
        Ok(updated.snapshot_for(Some(&admin)))
    }

    /// Switch the gameplay mode of a non-finished game.
    pub async fn change_mode(
        &self,
        key: GameKey,
        credential: &str,
        mode: GameMode,
    ) -> Result<GameSnapshot, EngineError> {
        let (admin, game) = self.resolve_admin(&key, credential).await?;

        if game.status == GameStatus::Finished {
            return Err(EngineError::InvalidState(GameStatus::Finished));
        }

        let guard = GameGuard::any().status_not(GameStatus::Finished);
        let matched = self
            .repo
            .conditional_update(game.id, guard, GameDelta::SetMode(mode))
            .await?;

        if matched == 0 {
            return Err(EngineError::InvalidState(GameStatus::Finished));
        }

        let updated = self.reread_and_publish(game.id).await?;
        tracing::info!(game_id = %updated.id, %mode, "mode changed");
        Ok(updated.snapshot_for(Some(&admin)))
    }

    /// Toggle `Ongoing <-> Paused`, guarded on the observed current status so
    /// concurrent toggles resolve to exactly one flip.
    pub async fn pause_resume(
        &self,
        key: GameKey,
        credential: &str,
    ) -> Result<GameSnapshot, EngineError> {
        let (admin, game) = self.resolve_admin(&key, credential).await?;

        let next = match game.status {
            GameStatus::Ongoing => GameStatus::Paused,
            GameStatus::Paused => GameStatus::Ongoing,
            other => return Err(EngineError::InvalidState(other)),
        };

        let guard = GameGuard::any().status_is(game.status);
        let matched = self
            .repo
            .conditional_update(game.id, guard, GameDelta::SetStatus(next))
            .await?;

        if matched == 0 {
            let now = self.reread(game.id).await?;
            if now.status == GameStatus::Finished {
                return Err(EngineError::InvalidState(GameStatus::Finished));
            }
            return Err(EngineError::Conflict(ConflictReason::StaleWrite));
        }

        let updated = self.reread_and_publish(game.id).await?;
        tracing::info!(game_id = %updated.id, status = %updated.status, "status toggled");
        Ok(updated.snapshot_for(Some(&admin)))
    }

    /// Move the hidden-character count by exactly one, recomputing the mask.
    ///
    /// An adjustment that would leave `1..=secret.chars().count()` is rejected with no
    /// partial mutation. The write is guarded on the version observed at
    /// read time, since the new mask was computed from that read.
    pub async fn adjust_hidden(
        &self,
        key: GameKey,
        credential: &str,
        direction: HiddenAdjust,
    ) -> Result<GameSnapshot, EngineError> {
        let (admin, game) = self.resolve_admin(&key, credential).await?;

        if game.status == GameStatus::Finished {
            return Err(EngineError::InvalidState(GameStatus::Finished));
        }

        let requested: i64 = match direction {
            HiddenAdjust::Increase => game.hidden_count as i64 + 1,
            HiddenAdjust::Decrease => game.hidden_count as i64 - 1,
        };
        // Character count, not byte length: the mask is built per char.
        let max = game.secret.chars().count();
        if requested < 1 || requested > max as i64 {
            return Err(EngineError::OutOfRange { requested, max });
        }
        let hidden_count = requested as usize;
        let mask = reveal_mask(&game.secret, hidden_count);

        let guard = GameGuard::any()
            .status_not(GameStatus::Finished)
            .version_is(game.version);
        let matched = self
            .repo
            .conditional_update(
                game.id,
                guard,
                GameDelta::SetHidden {
                    hidden_count,
                    reveal_mask: mask,
                },
            )
            .await?;

        if matched == 0 {
            let now = self.reread(game.id).await?;
            if now.status == GameStatus::Finished {
                return Err(EngineError::InvalidState(GameStatus::Finished));
            }
            return Err(EngineError::Conflict(ConflictReason::StaleWrite));
        }

        let updated = self.reread_and_publish(game.id).await?;
        tracing::info!(
            game_id = %updated.id,
            hidden_count = updated.hidden_count,
            "hidden count adjusted"
        );
        Ok(updated.snapshot_for(Some(&admin)))
    }

    // -------------------------------------------------------------------------
    // End game
    // -------------------------------------------------------------------------

    /// Claim victory. The decisive guard is `status != Finished`: the store
    /// total-orders all concurrent claims, exactly one matches, every other
    /// claimant gets `Conflict(AlreadyFinished)` and can observe the real
    /// winner on the returned re-read path.
    pub async fn end_game(
        &self,
        key: GameKey,
        credential: &str,
    ) -> Result<GameSnapshot, EngineError> {
        let caller = self.verify(credential)?;
        let game = self.resolve(&key).await?;

        if !game.status.can_transition_to(GameStatus::Finished) {
            return Err(match game.status {
                GameStatus::Finished => EngineError::Conflict(ConflictReason::AlreadyFinished),
                other => EngineError::InvalidState(other),
            });
        }

        let guard = GameGuard::any().status_not(GameStatus::Finished);
        let matched = self
            .repo
            .conditional_update(
                game.id,
                guard,
                GameDelta::Finish {
                    winner: caller.clone(),
                },
            )
            .await?;

        if matched == 0 {
            let now = self.reread(game.id).await?;
            tracing::info!(
                game_id = %now.id,
                claimant = %caller,
                winner = ?now.winner,
                "losing claim, game already finished"
            );
            return Err(EngineError::Conflict(ConflictReason::AlreadyFinished));
        }

        let updated = self.reread_and_publish(game.id).await?;
        tracing::info!(game_id = %updated.id, winner = %caller, "game finished");
        Ok(updated.snapshot_for(Some(&caller)))
    }

    // -------------------------------------------------------------------------
    // Typed dispatch
    // -------------------------------------------------------------------------

    /// Apply a typed operation to the game addressed by `key`.
    pub async fn apply(&self, key: GameKey, op: Operation) -> Result<ApplyOutcome, EngineError> {
        match op {
            Operation::Join { address } => {
                let outcome = self.join(key, address).await?;
                Ok(ApplyOutcome {
                    snapshot: outcome.snapshot,
                    credential: Some(outcome.credential),
                })
            }
            Operation::Leave { credential } => {
                let snapshot = self.leave(key, &credential).await?;
                Ok(ApplyOutcome {
                    snapshot,
                    credential: None,
                })
            }
            Operation::Kick { credential, target } => {
                let snapshot = self.kick(key, &credential, target).await?;
                Ok(ApplyOutcome {
                    snapshot,
                    credential: None,
                })
            }
            Operation::ChangeMode { credential, mode } => {
                let snapshot = self.change_mode(key, &credential, mode).await?;
                Ok(ApplyOutcome {
                    snapshot,
                    credential: None,
                })
            }
            Operation::PauseResume { credential } => {
                let snapshot = self.pause_resume(key, &credential).await?;
                Ok(ApplyOutcome {
                    snapshot,
                    credential: None,
                })
            }
            Operation::AdjustHidden {
                credential,
                direction,
            } => {
                let snapshot = self.adjust_hidden(key, &credential, direction).await?;
                Ok(ApplyOutcome {
                    snapshot,
                    credential: None,
                })
            }
            Operation::EndGame { credential } => {
                let snapshot = self.end_game(key, &credential).await?;
                Ok(ApplyOutcome {
                    snapshot,
                    credential: None,
                })
            }
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Look a game up by id or invite code.
    async fn resolve(&self, key: &GameKey) -> Result<Game, EngineError> {
        let found = match key {
            GameKey::Id(id) => self.repo.find_by_id(*id).await?,
            GameKey::Invite(code) => self.repo.find_by_invite(code).await?,
        };
        found.ok_or(EngineError::NotFound)
    }

    /// Verify the credential and require the caller to be the game's admin.
    async fn resolve_admin(
        &self,
        key: &GameKey,
        credential: &str,
    ) -> Result<(Address, Game), EngineError> {
        let caller = self.verify(credential)?;
        let game = self.resolve(key).await?;
        if !game.is_admin(&caller) {
            return Err(EngineError::Forbidden(ForbiddenReason::NotAdmin));
        }
        Ok((caller, game))
    }

    /// Re-read the canonical record after a committed write.
    async fn reread(&self, id: GameId) -> Result<Game, EngineError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(EngineError::NotFound)
    }

    /// Re-read the now-authoritative record and publish its redacted
    /// snapshot. The broadcast carries the public view only; the secret
    /// never leaves through the fan-out channel.
    async fn reread_and_publish(&self, id: GameId) -> Result<Game, EngineError> {
        let game = self.reread(id).await?;
        self.broadcaster.publish(GameEvent::update(game.public_snapshot()));
        Ok(game)
    }

    fn verify(&self, credential: &str) -> Result<Address, EngineError> {
        self.tokens
            .verify(credential)
            .map_err(|_| EngineError::Unauthorized)
    }

    fn issue(&self, address: &Address) -> Result<String, EngineError> {
        self.tokens
            .issue(address)
            .map_err(|e| EngineError::Internal(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
