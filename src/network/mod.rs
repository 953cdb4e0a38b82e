//! External Collaborators
//!
//! Credential issuance and realtime fan-out. The HTTP/websocket transport
//! itself lives outside this crate; these modules define the contracts the
//! engine is written against.

pub mod auth;
pub mod broadcast;

// Re-export key types
pub use auth::{AuthConfig, AuthError, TokenClaims, TokenIssuer};
pub use broadcast::{Broadcaster, ChannelBroadcaster, GameEvent, GAME_UPDATE_EVENT};
