//! Session Consistency Engine
//!
//! The authoritative write path (`transition`), the read path (`query`), the
//! typed operation surface (`operation`), and the rejection taxonomy
//! (`error`). Correctness under arbitrary interleaving comes from one rule:
//! every mutation is a single conditional write, and a failed guard is a
//! typed rejection, never a silent retry.

pub mod error;
pub mod operation;
pub mod query;
pub mod transition;

// Re-export key types
pub use error::{ConflictReason, EngineError, ForbiddenReason};
pub use operation::{HiddenAdjust, Operation};
pub use query::{QueryService, Role, SessionView};
pub use transition::{ApplyOutcome, CreateOutcome, JoinOutcome, TransitionEngine};
