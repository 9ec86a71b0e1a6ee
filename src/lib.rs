//! # Payment Reconcile
//!
//! Payment-to-invoice reconciliation on top of an existing accounting ledger.
//!
//! ## Features
//!
//! - **Account resolution**: picks the one account a payment should be matched
//!   on (outstanding account, then receivable/payable, then any reconcilable one)
//! - **Candidate lookup**: open items of the same partner on that account, capped
//! - **Manual matching**: validate a selection nets to zero, then reconcile it
//! - **Automatic matching**: bounded search for one line, or up to five lines,
//!   that exactly offset the payment
//! - **Backend abstraction**: the host ledger is a trait; an in-memory one ships
//!   for tests and demos
//!
//! ## Quick Start
//!
//! ```rust
//! use payment_reconcile::{find_balancing_subset, select_reconcile_account};
//! use payment_reconcile::{Account, AccountKind, MoveLine, OutstandingAccounts, PaymentDirection};
//! use bigdecimal::BigDecimal;
//!
//! let receivable = Account::new("rcv", "Receivable", AccountKind::Receivable, true);
//! let payment_lines = vec![MoveLine::new(
//!     "l1", "m1", "PAY/1", receivable, Some("p1".into()), BigDecimal::from(-500),
//! )];
//!
//! let account = select_reconcile_account(
//!     &payment_lines,
//!     PaymentDirection::Inbound,
//!     &OutstandingAccounts::default(),
//! );
//! assert_eq!(account.unwrap().id, "rcv");
//!
//! let candidates = vec![BigDecimal::from(200), BigDecimal::from(300)];
//! let subset = find_balancing_subset(
//!     &BigDecimal::from(-500),
//!     &candidates,
//!     5,
//!     &"0.01".parse().unwrap(),
//! );
//! assert_eq!(subset.unwrap().indices, vec![0, 1]);
//! ```

pub mod config;
pub mod matching;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use matching::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
