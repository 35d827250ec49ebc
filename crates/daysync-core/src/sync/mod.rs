//! Outbound queue draining, full uploads, and inbound snapshot merging.

pub mod engine;
pub mod merge;
pub mod queue;
pub mod worker;

pub use engine::{DrainReport, MergeReport, PushReport, SyncEngine};
pub use merge::{plan_merge, MergePlan};
pub use queue::{PendingOperation, PendingQueue};
pub use worker::SyncWorker;
