//! Client-Side State Reconciliation
//!
//! A client sees the same game through three inputs that can disagree: a
//! locally cached snapshot from a previous visit, an explicit fetch, and
//! snapshots pushed over the realtime channel. All three funnel through one
//! merge rule keyed on the snapshot version: the engine only publishes
//! post-commit re-reads, so the highest version seen is always safe to show.

use crate::client::cache::StoredSession;
use crate::engine::query::Role;
use crate::game::{Address, GameSnapshot};

/// Where the currently displayed snapshot came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Restored from the local cache.
    Cache,
    /// Returned by an explicit fetch.
    Fetch,
    /// Pushed over the realtime channel.
    Push,
}

/// What a client should do about membership after resolving a view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipAction {
    /// Caller is the admin; load the admin credential and proceed.
    AdminReady,
    /// Caller is a member and already holds a credential.
    AlreadyMember,
    /// Caller is a member but lost their credential: route through the
    /// idempotent join, which reissues a credential without a join delta.
    ReissueCredential,
    /// Caller is new and joins are allowed: attempt the join transition.
    AutoJoin,
    /// Caller was kicked; present the locked-out outcome.
    KickedOut,
    /// Caller observes without enrolling (explicit opt-out, manual refresh).
    Observe,
}

/// Merges cached, fetched, and pushed snapshots into one consistent view.
#[derive(Debug, Default)]
pub struct ClientReconciler {
    view: Option<GameSnapshot>,
    source: Option<SnapshotSource>,
}

impl ClientReconciler {
    /// Start with no view.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently displayed snapshot, if any.
    pub fn view(&self) -> Option<&GameSnapshot> {
        self.view.as_ref()
    }

    /// Where the current view came from.
    pub fn source(&self) -> Option<SnapshotSource> {
        self.source
    }

    /// Seed the view from the local cache. Only fills an empty view; a
    /// snapshot already obtained this session is never replaced by a
    /// stale restore.
    pub fn restore_cached(&mut self, stored: &StoredSession) {
        if self.view.is_none() {
            self.view = Some(stored.snapshot.clone());
            self.source = Some(SnapshotSource::Cache);
        }
    }

    /// Merge an explicitly fetched snapshot.
    /// Returns true when the displayed view changed.
    pub fn apply_fetch(&mut self, snapshot: GameSnapshot) -> bool {
        self.adopt(snapshot, SnapshotSource::Fetch)
    }

    /// Merge a realtime-pushed snapshot. The engine publishes post-commit
    /// state only, so last-received-wins (by version) is correct.
    /// Returns true when the displayed view changed.
    pub fn apply_push(&mut self, snapshot: GameSnapshot) -> bool {
        self.adopt(snapshot, SnapshotSource::Push)
    }

    fn adopt(&mut self, snapshot: GameSnapshot, source: SnapshotSource) -> bool {
        if let Some(current) = &self.view {
            // Pushes and fetches for a different game replace nothing.
            if current.id != snapshot.id {
                return false;
            }
            if snapshot.version < current.version {
                tracing::debug!(
                    game_id = %snapshot.id,
                    incoming = snapshot.version,
                    current = current.version,
                    "ignoring stale snapshot"
                );
                return false;
            }
        }
        self.view = Some(snapshot);
        self.source = Some(source);
        true
    }

    /// Decide what a freshly loaded client should do about membership.
    ///
    /// `allow_join` is false for paths that must never silently enroll the
    /// viewer (e.g. a manual refresh). Credential reissue is routed through
    /// the idempotent join so it cannot be mistaken for a join attempt.
    pub fn resolve_membership(
        snapshot: &GameSnapshot,
        address: &Address,
        has_credential: bool,
        allow_join: bool,
    ) -> MembershipAction {
        let is_player = snapshot.players.contains(address);
        let is_kicked = snapshot.kicked_players.contains(address) && !is_player;

        if address == &snapshot.admin_address {
            MembershipAction::AdminReady
        } else if is_player && has_credential {
            MembershipAction::AlreadyMember
        } else if is_player {
            MembershipAction::ReissueCredential
        } else if is_kicked {
            MembershipAction::KickedOut
        } else if allow_join {
            MembershipAction::AutoJoin
        } else {
            MembershipAction::Observe
        }
    }

    /// Classify the reconciled view's role for `address`, mirroring the
    /// server-side classification on the latest local snapshot.
    pub fn local_role(&self, address: &Address) -> Option<Role> {
        let snapshot = self.view.as_ref()?;
        let role = if address == &snapshot.admin_address {
            Role::Admin
        } else if snapshot.players.contains(address) {
            Role::Player
        } else if snapshot.kicked_players.contains(address) {
            Role::Kicked
        } else {
            Role::Outsider
        };
        Some(role)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Game, GameStatus};

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    fn snapshot_v(version: u64) -> GameSnapshot {
        let mut snap = Game::new(addr("0xadmin"), "secret", 4).public_snapshot();
        snap.version = version;
        snap
    }

    #[test]
    fn test_restore_only_fills_empty_view() {
        let mut rec = ClientReconciler::new();
        let fresh = snapshot_v(5);
        rec.apply_fetch(fresh.clone());

        let mut stale = fresh.clone();
        stale.version = 1;
        rec.restore_cached(&StoredSession::new(None, stale));

        assert_eq!(rec.view().unwrap().version, 5);
        assert_eq!(rec.source(), Some(SnapshotSource::Fetch));
    }

    #[test]
    fn test_push_supersedes_cached_state() {
        // Cached ongoing state must give way to a pushed finished state
        // without a manual re-fetch.
        let mut rec = ClientReconciler::new();
        let cached = snapshot_v(3);
        assert_eq!(cached.status, GameStatus::Ongoing);
        rec.restore_cached(&StoredSession::new(Some("jwt".into()), cached.clone()));

        let mut pushed = cached;
        pushed.version = 4;
        pushed.status = GameStatus::Finished;
        pushed.winner = Some(addr("0xb"));
        assert!(rec.apply_push(pushed));

        let view = rec.view().unwrap();
        assert_eq!(view.status, GameStatus::Finished);
        assert_eq!(view.winner, Some(addr("0xb")));
        assert_eq!(rec.source(), Some(SnapshotSource::Push));
    }

    #[test]
    fn test_stale_push_after_fresh_fetch_is_ignored() {
        let mut rec = ClientReconciler::new();
        rec.apply_fetch(snapshot_v(10));

        let stale = {
            let mut s = rec.view().unwrap().clone();
            s.version = 7;
            s
        };
        assert!(!rec.apply_push(stale));
        assert_eq!(rec.view().unwrap().version, 10);
    }

    #[test]
    fn test_equal_version_push_wins() {
        // At-least-once delivery can replay the current snapshot; adopting
        // it is harmless and keeps last-received-wins simple.
        let mut rec = ClientReconciler::new();
        rec.apply_fetch(snapshot_v(4));
        assert!(rec.apply_push(rec.view().unwrap().clone()));
        assert_eq!(rec.source(), Some(SnapshotSource::Push));
    }

    #[test]
    fn test_snapshot_for_other_game_is_ignored() {
        let mut rec = ClientReconciler::new();
        rec.apply_fetch(snapshot_v(1));

        let other = Game::new(addr("0xother"), "secret", 4).public_snapshot();
        assert!(!rec.apply_push(other));
    }

    #[test]
    fn test_membership_actions() {
        let mut snap = snapshot_v(1);
        snap.players.push(addr("0xmember"));
        snap.kicked_players.push(addr("0xkicked"));

        let admin = addr("0xadmin");
        let member = addr("0xmember");
        let kicked = addr("0xkicked");
        let newcomer = addr("0xnew");

        assert_eq!(
            ClientReconciler::resolve_membership(&snap, &admin, false, true),
            MembershipAction::AdminReady
        );
        assert_eq!(
            ClientReconciler::resolve_membership(&snap, &member, true, true),
            MembershipAction::AlreadyMember
        );
        assert_eq!(
            ClientReconciler::resolve_membership(&snap, &member, false, true),
            MembershipAction::ReissueCredential
        );
        assert_eq!(
            ClientReconciler::resolve_membership(&snap, &kicked, false, true),
            MembershipAction::KickedOut
        );
        assert_eq!(
            ClientReconciler::resolve_membership(&snap, &newcomer, false, true),
            MembershipAction::AutoJoin
        );
        // A manual refresh must never silently enroll the viewer.
        assert_eq!(
            ClientReconciler::resolve_membership(&snap, &newcomer, false, false),
            MembershipAction::Observe
        );
    }

    #[test]
    fn test_local_role_tracks_latest_view() {
        let mut rec = ClientReconciler::new();
        assert_eq!(rec.local_role(&addr("0xa")), None);

        let mut snap = snapshot_v(1);
        snap.players.push(addr("0xa"));
        rec.apply_fetch(snap.clone());
        assert_eq!(rec.local_role(&addr("0xa")), Some(Role::Player));

        // A push that kicks the player flips the local role too.
        let mut kicked = snap;
        kicked.version = 2;
        kicked.players.clear();
        kicked.kicked_players.push(addr("0xa"));
        rec.apply_push(kicked);
        assert_eq!(rec.local_role(&addr("0xa")), Some(Role::Kicked));
    }
}
