//! Traits for the host ledger seam and selection validation

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::validation::{ensure_balanced, ensure_single_account};

/// Host accounting ledger the workflow runs against
///
/// The ledger owns payments, journal items and the actual reconcile
/// bookkeeping. This crate only reads from it and asks it to reconcile a
/// set of lines, so any backend (an ERP over RPC, a SQL schema, in-memory)
/// can be plugged in by implementing these methods.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Get a payment by ID
    async fn get_payment(&self, payment_id: &str) -> ReconcileResult<Option<Payment>>;

    /// Get a company by ID
    async fn get_company(&self, company_id: &str) -> ReconcileResult<Option<Company>>;

    /// All lines of a journal entry, in entry order
    async fn get_move_lines(&self, move_id: &str) -> ReconcileResult<Vec<MoveLine>>;

    /// Fetch lines by ID; unknown IDs are skipped
    async fn browse_lines(&self, line_ids: &[String]) -> ReconcileResult<Vec<MoveLine>>;

    /// Search lines matching `query`, returning at most `limit` of them
    async fn search_lines(
        &self,
        query: &LineQuery,
        limit: Option<usize>,
    ) -> ReconcileResult<Vec<MoveLine>>;

    /// Reconcile the given lines against each other
    ///
    /// Lines that do not fully offset are partially reconciled; the backend
    /// decides which lines end up fully reconciled.
    async fn reconcile(&self, line_ids: &[String]) -> ReconcileResult<ReconcileOutcome>;
}

/// The one query shape the workflow needs: open items of one partner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuery {
    pub partner_id: String,
    /// Restrict to a single account
    pub account_id: Option<String>,
    /// Restrict to accounts of one kind
    pub account_kind: Option<AccountKind>,
    /// Skip lines of this journal entry (usually the payment's own)
    pub exclude_move_id: Option<String>,
    /// Only lines on reconcilable accounts
    pub reconcilable_only: bool,
    /// Only lines not yet fully reconciled
    pub unreconciled_only: bool,
}

impl LineQuery {
    /// Open items of `partner_id`, excluding those of `move_id`
    pub fn open_items(partner_id: impl Into<String>, move_id: impl Into<String>) -> Self {
        Self {
            partner_id: partner_id.into(),
            account_id: None,
            account_kind: None,
            exclude_move_id: Some(move_id.into()),
            reconcilable_only: false,
            unreconciled_only: true,
        }
    }

    pub fn on_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn of_kind(mut self, kind: AccountKind) -> Self {
        self.account_kind = Some(kind);
        self
    }

    pub fn reconcilable(mut self) -> Self {
        self.reconcilable_only = true;
        self
    }

    /// Whether `line` satisfies every filter of this query
    pub fn matches(&self, line: &MoveLine) -> bool {
        if line.partner_id.as_deref() != Some(self.partner_id.as_str()) {
            return false;
        }
        if let Some(ref account_id) = self.account_id {
            if &line.account.id != account_id {
                return false;
            }
        }
        if let Some(kind) = self.account_kind {
            if line.account.kind != kind {
                return false;
            }
        }
        if let Some(ref move_id) = self.exclude_move_id {
            if &line.move_id == move_id {
                return false;
            }
        }
        if self.reconcilable_only && !line.account.reconcile {
            return false;
        }
        if self.unreconciled_only && line.reconciled {
            return false;
        }
        true
    }
}

/// Trait for implementing custom checks on a manual selection
pub trait SelectionValidator: Send + Sync {
    /// Validate the combined payment + selected lines before reconciling
    fn validate_selection(&self, lines: &[MoveLine], tolerance: &BigDecimal)
        -> ReconcileResult<()>;
}

/// Default validator: one account, nets to zero within tolerance
pub struct DefaultSelectionValidator;

impl SelectionValidator for DefaultSelectionValidator {
    fn validate_selection(
        &self,
        lines: &[MoveLine],
        tolerance: &BigDecimal,
    ) -> ReconcileResult<()> {
        ensure_single_account(lines)?;
        ensure_balanced(lines, tolerance)
    }
}
