//! Turning source replies into published output
//!
//! [`normalize`] decodes plugin replies, [`aggregator`] runs a full refresh
//! and [`scheduler`] decides when to run one in the background.

pub mod aggregator;
pub mod normalize;
pub mod scheduler;

pub use aggregator::{Aggregator, RefreshOutcome, RefreshSummary};
pub use scheduler::{BackgroundService, TickAction};
