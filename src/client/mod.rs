//! Client-Side Synchronization
//!
//! The pieces a device-local client needs to keep one consistent view of a
//! session: the persisted cache and the reconciler that merges cached,
//! fetched, and pushed snapshots.

pub mod cache;
pub mod reconciler;

// Re-export key types
pub use cache::StoredSession;
pub use reconciler::{ClientReconciler, MembershipAction, SnapshotSource};
