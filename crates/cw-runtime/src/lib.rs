//! cw-runtime
//!
//! One reconciliation cycle for one device family:
//!
//! ```text
//! Idle -> Fetching -> Reconciling -> Dispatching -> Persisting -> Done
//!            |                                         |
//!            +---------------> Failed <----------------+
//! ```
//!
//! - Nothing fetched => Failed at Fetching, state untouched
//! - A device that could not be read keeps its previous entries
//! - Alert delivery failures degrade the run, never fail it
//! - A failed save => Failed at Persisting; the next cycle retries

mod locks;
mod report;
mod run;

pub use locks::FamilyLocks;
pub use report::{RunPhase, RunReport, RunStatus};
pub use run::ReconciliationRun;
