//! Payment reconciliation workflow
//!
//! [`ReconciliationEngine`] answers one-shot requests (fetch matching data,
//! reconcile a selection, auto-match), while [`ReconcileSession`] keeps the
//! state of an interactive matching screen.

pub mod engine;
pub mod report;
pub mod session;

pub use engine::*;
pub use report::*;
pub use session::*;
