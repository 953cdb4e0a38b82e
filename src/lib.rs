//! # Keyrace Session Engine
//!
//! Authoritative session state for Keyrace: an admin hides part of a secret
//! key, players race to reveal it, and the first to claim the finished key
//! wins. Many devices mutate one shared session concurrently; this crate
//! guarantees a single consistent outcome for every race.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   KEYRACE SESSION ENGINE                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Session data model                        │
//! │  └── state.rs    - Game record, status machine, snapshots    │
//! │                                                              │
//! │  store/          - Conditional-update storage                │
//! │  ├── guard.rs    - Guard predicates and typed deltas         │
//! │  └── memory.rs   - In-memory CAS-ordered store               │
//! │                                                              │
//! │  engine/         - Consistency core                          │
//! │  ├── transition.rs - Validate → conditional write → publish  │
//! │  ├── query.rs    - Read path with role classification        │
//! │  ├── operation.rs- Typed operation surface                   │
//! │  └── error.rs    - Rejection taxonomy                        │
//! │                                                              │
//! │  network/        - External collaborators                    │
//! │  ├── auth.rs     - JWT credential issuance                   │
//! │  └── broadcast.rs- Snapshot fan-out                          │
//! │                                                              │
//! │  client/         - Device-side synchronization               │
//! │  ├── cache.rs    - Persisted credential + snapshot           │
//! │  └── reconciler.rs - Cache/fetch/push merge rule             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Guarantee
//!
//! Every mutation is one conditional write: "apply this delta to the record
//! matching this guard". No in-process lock spans a store call, so any
//! number of processes can race the same session and the store's
//! total order picks exactly one winner per mutually-exclusive guard —
//! most importantly, exactly one victory claim ever succeeds.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod client;
pub mod engine;
pub mod game;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use client::{ClientReconciler, MembershipAction, StoredSession};
pub use engine::{
    ConflictReason, EngineError, ForbiddenReason, HiddenAdjust, Operation, QueryService, Role,
    TransitionEngine,
};
pub use game::{Address, Game, GameId, GameKey, GameMode, GameSnapshot, GameStatus, InviteCode};
pub use network::{AuthConfig, Broadcaster, ChannelBroadcaster, GameEvent, TokenIssuer};
pub use store::{GameDelta, GameGuard, MemoryStore, SessionRepository};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
