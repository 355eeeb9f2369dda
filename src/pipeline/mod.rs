//! The scrape pipeline.
//!
//! - `diff`: records not seen before
//! - `packetize`: packing rendered items into size-bounded messages
//! - `dispatch`: fan-out of new records to notification channels
//! - `orchestrator`: one run over all collectors

pub mod diff;
pub mod dispatch;
pub mod orchestrator;
pub mod packetize;

pub use diff::{DiffCalculator, diff};
pub use dispatch::{DispatchResult, NotificationDispatcher};
pub use orchestrator::{CollectorOutcome, CollectorState, Orchestrator, RunReport};
pub use packetize::{Packing, packetize};
