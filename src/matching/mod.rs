//! Pure matching logic: which account to reconcile on, and which lines offset a payment

pub mod account;
pub mod subset;

pub use account::*;
pub use subset::*;
