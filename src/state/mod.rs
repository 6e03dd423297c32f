//! State owned by the single-threaded pipeline stages
//!
//! - `ProgressSets`: the frontier's visited / to-visit / pending sets
//! - `HostWindow`: the dispatcher's per-host rate-limit history
//!
//! Neither type is synchronised; each lives on exactly one thread.

mod domain_state;
mod page_state;

pub use domain_state::{HostCount, HostWindow};
pub use page_state::{PendingDecision, Progress, ProgressSets, ScanOutcome};
