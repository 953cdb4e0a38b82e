//! Snapshot Fan-Out
//!
//! Publishes post-transition snapshots to every subscriber of a game's
//! channel. Delivery is at-least-once and best-effort: a failed or missed
//! publish never rolls back the committed write, because any subscriber can
//! recover by re-fetching through the query service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::game::{GameId, GameSnapshot};

/// Event name carried by every snapshot publish.
pub const GAME_UPDATE_EVENT: &str = "game_update";

/// Per-game channel capacity. Lagging receivers drop oldest events, which is
/// safe: the newest full snapshot supersedes everything before it.
const CHANNEL_CAPACITY: usize = 64;

/// A published realtime event: the event name plus the full post-transition
/// snapshot of the game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Event name (always [`GAME_UPDATE_EVENT`] for snapshot pushes).
    pub name: String,
    /// The redacted post-transition snapshot.
    pub snapshot: GameSnapshot,
}

impl GameEvent {
    /// Wrap a snapshot in the standard update event.
    pub fn update(snapshot: GameSnapshot) -> Self {
        Self {
            name: GAME_UPDATE_EVENT.to_owned(),
            snapshot,
        }
    }
}

/// Fan-out contract the engine publishes through.
///
/// Implementations must never feed back into write decisions; the engine
/// treats publish as fire-and-forget notification.
pub trait Broadcaster: Send + Sync {
    /// Publish `event` to the channel of the game it describes.
    fn publish(&self, event: GameEvent);
}

/// In-process broadcaster over per-game `tokio::sync::broadcast` channels.
#[derive(Default)]
pub struct ChannelBroadcaster {
    channels: Mutex<BTreeMap<GameId, broadcast::Sender<GameEvent>>>,
}

impl ChannelBroadcaster {
    /// Create an empty broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a game's update channel.
    pub fn subscribe(&self, game_id: GameId) -> broadcast::Receiver<GameEvent> {
        let mut channels = self.channels.lock().expect("broadcast channel map poisoned");
        channels
            .entry(game_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drop a game's channel (e.g. after session cleanup).
    pub fn remove(&self, game_id: GameId) {
        let mut channels = self.channels.lock().expect("broadcast channel map poisoned");
        channels.remove(&game_id);
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, event: GameEvent) {
        let game_id = event.snapshot.id;
        let channels = self.channels.lock().expect("broadcast channel map poisoned");
        match channels.get(&game_id) {
            Some(sender) => {
                if let Err(err) = sender.send(event) {
                    // All receivers gone; subscribers re-fetch on reconnect.
                    tracing::debug!(%game_id, "broadcast dropped: {err}");
                }
            }
            None => {
                tracing::debug!(%game_id, "no subscribers for game update");
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

    fn snapshot() -> GameSnapshot {
        Game::new(Address::from("0xadmin"), "secret", 4).public_snapshot()
    }

    #[tokio::test]
    async fn test_subscribers_receive_published_snapshot() {
        let broadcaster = ChannelBroadcaster::new();
        let snap = snapshot();
        let mut rx_a = broadcaster.subscribe(snap.id);
        let mut rx_b = broadcaster.subscribe(snap.id);

        broadcaster.publish(GameEvent::update(snap.clone()));

        let got_a = rx_a.recv().await.unwrap();
        let got_b = rx_b.recv().await.unwrap();
        assert_eq!(got_a.name, GAME_UPDATE_EVENT);
        assert_eq!(got_a.snapshot, snap);
        assert_eq!(got_b.snapshot, snap);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_harmless() {
        let broadcaster = ChannelBroadcaster::new();
        broadcaster.publish(GameEvent::update(snapshot()));
    }

    #[tokio::test]
    async fn test_channels_are_isolated_per_game() {
        let broadcaster = ChannelBroadcaster::new();
        let snap_a = snapshot();
        let snap_b = snapshot();

        let mut rx_a = broadcaster.subscribe(snap_a.id);
        let _rx_b = broadcaster.subscribe(snap_b.id);

        broadcaster.publish(GameEvent::update(snap_b.clone()));
        broadcaster.publish(GameEvent::update(snap_a.clone()));

        // Only game A's event arrives on A's channel.
        let got = rx_a.recv().await.unwrap();
        assert_eq!(got.snapshot.id, snap_a.id);
    }

    #[tokio::test]
    async fn test_remove_drops_channel() {
        let broadcaster = ChannelBroadcaster::new();
        let snap = snapshot();
        let mut rx = broadcaster.subscribe(snap.id);

        broadcaster.remove(snap.id);
        broadcaster.publish(GameEvent::update(snap));

        // Sender side is gone; the receiver observes closure, not an event.
        assert!(rx.recv().await.is_err());
    }
}
