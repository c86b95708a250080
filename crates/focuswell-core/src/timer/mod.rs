mod engine;
mod reconcile;
mod snapshot;

pub use engine::{ProtocolView, SessionTimer, TimerState};
pub use reconcile::{apply_completion, FATIGUE_THRESHOLD};
pub use snapshot::{SessionTimerState, SnapshotMismatch};
