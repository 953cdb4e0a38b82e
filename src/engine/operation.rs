//! Typed Operation Surface
//!
//! One explicit payload shape per state-changing operation. Transports parse
//! whatever arrives on the wire into these variants before the engine sees
//! it, so malformed input is rejected uniformly during parsing instead of
//! causing undefined mutation downstream.

use serde::{Deserialize, Serialize};

use crate::game::{Address, GameMode};

/// Direction of a hidden-count adjustment. Each request moves the count by
/// exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenAdjust {
    /// Mask one more character.
    Increase,
    /// Reveal one more character.
    Decrease,
}

/// A state-changing request against a single game.
///
/// Join identifies the caller by address (it is the operation that first
/// issues a credential); every other variant carries an opaque credential
/// that the engine verifies before trusting any identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Join the addressed game.
    Join {
        /// The joining address.
        address: Address,
    },

    /// Leave the game.
    Leave {
        /// Credential of the leaving player.
        credential: String,
    },

    /// Admin: remove `target` from the game and bar rejoining.
    Kick {
        /// Admin credential.
        credential: String,
        /// Player to remove.
        target: Address,
    },

    /// Admin: switch the gameplay mode.
    ChangeMode {
        /// Admin credential.
        credential: String,
        /// New mode.
        mode: GameMode,
    },

    /// Admin: toggle between ongoing and paused.
    PauseResume {
        /// Admin credential.
        credential: String,
    },

    /// Admin: move the hidden-character count by one.
    AdjustHidden {
        /// Admin credential.
        credential: String,
        /// Direction of the adjustment.
        direction: HiddenAdjust,
    },

    /// Claim victory and finish the game.
    EndGame {
        /// Credential of the claiming player.
        credential: String,
    },
}
