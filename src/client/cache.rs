//! Local Session Cache
//!
//! The client's persisted `{credential, snapshot}` pair, serialized to a
//! JSON string for whatever device-local storage the host app provides.
//! A corrupt or missing payload simply yields nothing; the client then
//! falls back to a fresh fetch.

use serde::{Deserialize, Serialize};

use crate::game::GameSnapshot;

/// A locally cached session: the credential issued on join plus the last
/// snapshot seen before shutdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Credential from the last join, if one was issued.
    pub credential: Option<String>,
    /// The snapshot current when the session was saved.
    pub snapshot: GameSnapshot,
}

impl StoredSession {
    /// Pair a snapshot with its credential for persistence.
    pub fn new(credential: Option<String>, snapshot: GameSnapshot) -> Self {
        Self {
            credential,
            snapshot,
        }
    }

    /// Serialize for device-local storage.
    pub fn to_json(&self) -> String {
        // Serialization of these plain data types cannot fail.
        serde_json::to_string(self).expect("stored session serializes")
    }

    /// Restore from device-local storage. Corrupt payloads yield `None`.
    pub fn from_json(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!("discarding corrupt session cache: {err}");
                None
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Address, Game};

    #[test]
    fn test_round_trip() {
        let snapshot = Game::new(Address::from("0xadmin"), "secret", 4).public_snapshot();
        let stored = StoredSession::new(Some("jwt".into()), snapshot);

        let restored = StoredSession::from_json(&stored.to_json()).unwrap();
        assert_eq!(restored, stored);
    }

    #[test]
    fn test_corrupt_payload_yields_none() {
        assert!(StoredSession::from_json("{not json").is_none());
        assert!(StoredSession::from_json(r#"{"credential":null}"#).is_none());
    }
}
