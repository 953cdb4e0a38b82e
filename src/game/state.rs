//! Game Record Definitions
//!
//! The authoritative session record and its derived views.
//! Every mutation of a `Game` goes through the store's conditional-update
//! path; nothing in this module mutates shared state directly.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Character used to mask hidden positions of the secret.
pub const MASK_CHAR: char = '*';

// =============================================================================
// ADDRESS
// =============================================================================

/// A caller identity (wallet-style address string).
///
/// Addresses are opaque to the engine: equality is exact string equality,
/// and ordering exists only so collections iterate deterministically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create from a raw address string.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Borrow the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// =============================================================================
// GAME ID / INVITE CODE
// =============================================================================

/// Unique game identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(uuid::Uuid);

impl GameId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Short human-shareable code used by joining players to look a game up.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteCode(String);

impl InviteCode {
    /// Number of random bytes in a generated code (hex-encoded, so 6 chars).
    const CODE_BYTES: usize = 3;

    /// Generate a fresh random invite code.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::CODE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap an existing code (e.g. parsed from a request).
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Borrow the raw code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookup key for resolving a game: by id (known members) or by invite code
/// (joining players).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameKey {
    /// Resolve by unique identifier.
    Id(GameId),
    /// Resolve by invite code.
    Invite(InviteCode),
}

impl From<GameId> for GameKey {
    fn from(id: GameId) -> Self {
        GameKey::Id(id)
    }
}

impl From<InviteCode> for GameKey {
    fn from(code: InviteCode) -> Self {
        GameKey::Invite(code)
    }
}

// =============================================================================
// STATUS / MODE
// =============================================================================

/// Game lifecycle status.
///
/// Permitted edges: `Pending -> Ongoing <-> Paused -> Finished`.
/// `Finished` is terminal; a pending game can never finish directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Created but not yet accepting play.
    Pending,
    /// Accepting joins and guesses.
    Ongoing,
    /// Temporarily halted by the admin.
    Paused,
    /// Terminal: a winner has been recorded.
    Finished,
}

impl GameStatus {
    /// Whether the status machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: GameStatus) -> bool {
        use GameStatus::*;
        matches!(
            (self, next),
            (Pending, Ongoing)
                | (Ongoing, Paused)
                | (Paused, Ongoing)
                | (Ongoing, Finished)
                | (Paused, Finished)
        )
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameStatus::Pending => "pending",
            GameStatus::Ongoing => "ongoing",
            GameStatus::Paused => "paused",
            GameStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Gameplay variant: how players produce their guesses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Rolls happen automatically on an interval.
    Auto,
    /// Players trigger each roll themselves.
    Manual,
    /// Continuous brute-force rolling.
    Brute,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameMode::Auto => "auto",
            GameMode::Manual => "manual",
            GameMode::Brute => "brute",
        };
        f.write_str(s)
    }
}

// =============================================================================
// REVEAL MASK
// =============================================================================

/// Compute the masked view of `secret` with its first `hidden_count`
/// characters replaced by [`MASK_CHAR`].
///
/// Callers keep `hidden_count` within `1..=secret.chars().count()`;
/// out-of-range requests are rejected by the engine before any mutation.
pub fn reveal_mask(secret: &str, hidden_count: usize) -> String {
    secret
        .chars()
        .enumerate()
        .map(|(i, ch)| if i < hidden_count { MASK_CHAR } else { ch })
        .collect()
}

// =============================================================================
// GAME RECORD
// =============================================================================

/// The authoritative session record.
///
/// Invariants (hold after every accepted transition):
/// - `players` has no duplicates and `players.len() <= max_players`
/// - `players` and `kicked_players` are disjoint
/// - `winner` is set at most once, together with `status = Finished`
/// - `1 <= hidden_count <= secret.chars().count()`, and `reveal_mask` reflects it
/// - `version` strictly increases with every accepted transition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Unique identifier. Immutable.
    pub id: GameId,
    /// Lookup code shared with joining players. Immutable.
    pub invite_code: InviteCode,
    /// Lifecycle status.
    pub status: GameStatus,
    /// The creator's address. Immutable; holds elevated rights.
    pub admin_address: Address,
    /// Joined players, in join order.
    pub players: Vec<Address>,
    /// Addresses removed by the admin; rejected on any future join.
    pub kicked_players: Vec<Address>,
    /// Capacity bound on `players`.
    pub max_players: usize,
    /// Gameplay variant. Admin-mutable while not finished.
    pub mode: GameMode,
    /// The secret being guessed. Never exposed to non-admin callers.
    pub secret: String,
    /// How many leading characters of `secret` are currently masked.
    pub hidden_count: usize,
    /// `secret` with `hidden_count` leading characters masked.
    pub reveal_mask: String,
    /// The winning address, set exactly once when the game finishes.
    pub winner: Option<Address>,
    /// Monotonic transition counter; the conditional-update predicate
    /// for read-dependent deltas.
    pub version: u64,
    /// Timestamp of the last accepted transition.
    pub updated_at: DateTime<Utc>,
}

impl Game {
    /// Create a fresh game record.
    ///
    /// The game starts `Ongoing` with every character of the secret hidden,
    /// mirroring how an admin opens a session for players to join.
    /// An empty secret or zero capacity is a programmer error at the
    /// creation site, not a runtime condition, so both are asserted.
    pub fn new(admin_address: Address, secret: impl Into<String>, max_players: usize) -> Self {
        let secret = secret.into();
        assert!(!secret.is_empty(), "secret must be non-empty");
        assert!(max_players > 0, "max_players must be positive");

        let hidden_count = secret.chars().count();
        let mask = reveal_mask(&secret, hidden_count);

        Self {
            id: GameId::generate(),
            invite_code: InviteCode::generate(),
            status: GameStatus::Ongoing,
            admin_address,
            players: Vec::new(),
            kicked_players: Vec::new(),
            max_players,
            mode: GameMode::Auto,
            secret,
            hidden_count,
            reveal_mask: mask,
            winner: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Whether `address` is currently a joined player.
    pub fn has_player(&self, address: &Address) -> bool {
        self.players.contains(address)
    }

    /// Whether `address` has been kicked.
    pub fn is_kicked(&self, address: &Address) -> bool {
        self.kicked_players.contains(address)
    }

    /// Whether `address` is the session admin.
    pub fn is_admin(&self, address: &Address) -> bool {
        &self.admin_address == address
    }

    /// Whether another player can still fit.
    pub fn has_capacity(&self) -> bool {
        self.players.len() < self.max_players
    }

    /// Build the redacted view handed to callers and broadcast subscribers.
    ///
    /// Only the admin sees the raw secret; everyone else gets the mask.
    pub fn snapshot_for(&self, viewer: Option<&Address>) -> GameSnapshot {
        let is_admin = viewer.map(|v| self.is_admin(v)).unwrap_or(false);
        GameSnapshot {
            id: self.id,
            invite_code: self.invite_code.clone(),
            status: self.status,
            admin_address: self.admin_address.clone(),
            players: self.players.clone(),
            kicked_players: self.kicked_players.clone(),
            max_players: self.max_players,
            mode: self.mode,
            secret: is_admin.then(|| self.secret.clone()),
            hidden_count: self.hidden_count,
            reveal_mask: self.reveal_mask.clone(),
            winner: self.winner.clone(),
            version: self.version,
            updated_at: self.updated_at,
        }
    }

    /// The redacted public view (no viewer identity).
    pub fn public_snapshot(&self) -> GameSnapshot {
        self.snapshot_for(None)
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// The full post-transition representation of a game, as returned to callers
/// and broadcast to subscribers. Identical to [`Game`] except the secret is
/// present only when the snapshot was built for the admin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Unique identifier.
    pub id: GameId,
    /// Lookup code.
    pub invite_code: InviteCode,
    /// Lifecycle status.
    pub status: GameStatus,
    /// The creator's address.
    pub admin_address: Address,
    /// Joined players, in join order.
    pub players: Vec<Address>,
    /// Addresses removed by the admin.
    pub kicked_players: Vec<Address>,
    /// Capacity bound on `players`.
    pub max_players: usize,
    /// Gameplay variant.
    pub mode: GameMode,
    /// Raw secret; `Some` only for the admin's own view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// How many leading characters are masked.
    pub hidden_count: usize,
    /// Masked view of the secret.
    pub reveal_mask: String,
    /// The winning address, if the game has finished.
    pub winner: Option<Address>,
    /// Monotonic transition counter; the reconciler's ordering key.
    pub version: u64,
    /// Timestamp of the last accepted transition.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// TESTS
// =============================================================================
