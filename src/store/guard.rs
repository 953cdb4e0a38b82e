//! Guard Predicates and Typed Deltas
//!
//! A conditional update is "apply `GameDelta` to the record matching
//! `{id, GameGuard}`". The guard is evaluated and the delta applied as one
//! atomic step inside the store; the engine never mutates a record directly.

use crate::game::{Address, Game, GameMode, GameStatus};

// =============================================================================
// GUARD
// =============================================================================

/// Server-verified predicate over the current record, checked atomically
/// at commit time. All set conditions must hold for the update to match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameGuard {
    /// Status must equal this value.
    pub status_is: Option<GameStatus>,
    /// Status must NOT equal this value.
    pub status_not: Option<GameStatus>,
    /// This address must be in `players`.
    pub has_player: Option<Address>,
    /// This address must NOT be in `players`.
    pub not_player: Option<Address>,
    /// This address must NOT be in `kicked_players`.
    pub not_kicked: Option<Address>,
    /// `players.len()` must be strictly below `max_players`.
    pub below_capacity: bool,
    /// Version marker must equal this value (detects concurrent interference
    /// for deltas computed from a prior read).
    pub version_is: Option<u64>,
}

impl GameGuard {
    /// Guard with no conditions (matches any live record).
    pub fn any() -> Self {
        Self::default()
    }

    /// Require `status == status`.
    pub fn status_is(mut self, status: GameStatus) -> Self {
        self.status_is = Some(status);
        self
    }

    /// Require `status != status`.
    pub fn status_not(mut self, status: GameStatus) -> Self {
        self.status_not = Some(status);
        self
    }

    /// Require `address` to be a joined player.
    pub fn has_player(mut self, address: Address) -> Self {
        self.has_player = Some(address);
        self
    }

    /// Require `address` to not be a joined player.
    pub fn not_player(mut self, address: Address) -> Self {
        self.not_player = Some(address);
        self
    }

    /// Require `address` to not have been kicked.
    pub fn not_kicked(mut self, address: Address) -> Self {
        self.not_kicked = Some(address);
        self
    }

    /// Require a free player slot.
    pub fn below_capacity(mut self) -> Self {
        self.below_capacity = true;
        self
    }

    /// Require the record's version marker to equal `version`.
    pub fn version_is(mut self, version: u64) -> Self {
        self.version_is = Some(version);
        self
    }

    /// Evaluate every set condition against `game`.
    pub fn matches(&self, game: &Game) -> bool {
        if let Some(status) = self.status_is {
            if game.status != status {
                return false;
            }
        }
        if let Some(status) = self.status_not {
            if game.status == status {
                return false;
            }
        }
        if let Some(ref addr) = self.has_player {
            if !game.has_player(addr) {
                return false;
            }
        }
        if let Some(ref addr) = self.not_player {
            if game.has_player(addr) {
                return false;
            }
        }
        if let Some(ref addr) = self.not_kicked {
            if game.is_kicked(addr) {
                return false;
            }
        }
        if self.below_capacity && !game.has_capacity() {
            return false;
        }
        if let Some(version) = self.version_is {
            if game.version != version {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// DELTA
// =============================================================================

/// One typed, validated state change. Exactly one delta shape exists per
/// engine operation, so a matched guard can never produce a partial or
/// malformed mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum GameDelta {
    /// Append an address to `players`.
    PushPlayer(Address),
    /// Remove an address from `players`.
    RemovePlayer(Address),
    /// Remove an address from `players` and record it in `kicked_players`,
    /// in the same transition.
    KickPlayer(Address),
    /// Set the gameplay mode.
    SetMode(GameMode),
    /// Set the lifecycle status (pause/resume).
    SetStatus(GameStatus),
    /// Set the hidden-character count and its precomputed mask.
    SetHidden {
        /// New number of masked leading characters.
        hidden_count: usize,
        /// Mask recomputed for `hidden_count` by the engine.
        reveal_mask: String,
    },
    /// Terminal transition: finish the game and record its single winner.
    Finish {
        /// The claiming address.
        winner: Address,
    },
}

impl GameDelta {
    /// Apply this delta to `game`.
    ///
    /// Only called by the store, under its atomicity guarantee, after the
    /// paired guard matched. Version/timestamp bookkeeping stays with the
    /// store, not here.
    pub fn apply_to(&self, game: &mut Game) {
        match self {
            GameDelta::PushPlayer(addr) => {
                game.players.push(addr.clone());
            }
            GameDelta::RemovePlayer(addr) => {
                game.players.retain(|p| p != addr);
            }
            GameDelta::KickPlayer(addr) => {
                game.players.retain(|p| p != addr);
                if !game.kicked_players.contains(addr) {
                    game.kicked_players.push(addr.clone());
                }
            }
            GameDelta::SetMode(mode) => {
                game.mode = *mode;
            }
            GameDelta::SetStatus(status) => {
                game.status = *status;
            }
            GameDelta::SetHidden {
                hidden_count,
                reveal_mask,
            } => {
                game.hidden_count = *hidden_count;
                game.reveal_mask = reveal_mask.clone();
            }
            GameDelta::Finish { winner } => {
                game.status = GameStatus::Finished;
                game.winner = Some(winner.clone());
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
