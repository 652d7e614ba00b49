//! Services around the aggregation run: PVR restarts and catch-up playback

pub mod catchup;
pub mod pvr;

pub use catchup::{CachedSource, CatchupService, Program};
pub use pvr::{PvrRestarter, RestartOutcome, RestartState};
