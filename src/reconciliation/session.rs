//! Interactive matching session for one payment
//!
//! A session keeps the state of a matching screen between user actions:
//! the resolved account, the payment's open balance, the candidate lines on
//! offer and which of them the user has ticked.

use bigdecimal::BigDecimal;
use tracing::info;

use crate::matching::within_tolerance;
use crate::reconciliation::engine::ReconciliationEngine;
use crate::reconciliation::report::Notice;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{ensure_balanced, merge_lines, total_balance};

pub struct ReconcileSession<'e, B: LedgerBackend> {
    engine: &'e ReconciliationEngine<B>,
    payment: Payment,
    reconcile_account: Option<Account>,
    payment_balance: BigDecimal,
    available_lines: Vec<MoveLine>,
    selected: Vec<String>,
}

impl<'e, B: LedgerBackend> ReconcileSession<'e, B> {
    /// Open a session for a posted payment
    pub async fn open(
        engine: &'e ReconciliationEngine<B>,
        payment_id: &str,
    ) -> ReconcileResult<Self> {
        let payment = engine.get_payment_required(payment_id).await?;
        if payment.state != PaymentState::Posted {
            return Err(ReconcileError::PaymentNotPosted(payment.name));
        }

        let mut session = Self {
            engine,
            payment,
            reconcile_account: None,
            payment_balance: BigDecimal::from(0),
            available_lines: Vec::new(),
            selected: Vec::new(),
        };
        session.reload().await?;
        Ok(session)
    }

    async fn reload(&mut self) -> ReconcileResult<()> {
        self.reconcile_account = self.engine.resolve_reconcile_account(&self.payment).await?;

        match self.reconcile_account {
            Some(ref account) => {
                let payment_lines = self.engine.open_payment_lines(&self.payment, account).await?;
                self.payment_balance = total_balance(&payment_lines);
                self.available_lines = self.engine.candidate_lines(&self.payment, account).await?;
            }
            None => {
                self.payment_balance = BigDecimal::from(0);
                self.available_lines.clear();
            }
        }
        Ok(())
    }

    pub fn payment(&self) -> &Payment {
        &self.payment
    }

    pub fn reconcile_account(&self) -> Option<&Account> {
        self.reconcile_account.as_ref()
    }

    /// Open balance of the payment on the reconcile account
    pub fn payment_balance(&self) -> &BigDecimal {
        &self.payment_balance
    }

    pub fn available_lines(&self) -> &[MoveLine] {
        &self.available_lines
    }

    /// Tick a candidate line; only lines on offer can be selected
    pub fn select(&mut self, line_id: &str) -> ReconcileResult<()> {
        if !self.available_lines.iter().any(|l| l.id == line_id) {
            return Err(ReconcileError::LineNotAvailable(line_id.to_string()));
        }
        if !self.selected.iter().any(|id| id == line_id) {
            self.selected.push(line_id.to_string());
        }
        Ok(())
    }

    /// Untick a line; returns whether it was selected
    pub fn deselect(&mut self, line_id: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|id| id != line_id);
        self.selected.len() != before
    }

    /// Tick every line on offer, or clear the selection when all of them
    /// are already ticked; returns whether everything is now selected
    pub fn toggle_select_all(&mut self) -> bool {
        if self.all_selected() {
            self.deselect_all();
            false
        } else {
            self.select_all();
            !self.available_lines.is_empty()
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.available_lines.iter().map(|l| l.id.clone()).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    /// Whether every line on offer is ticked (false when nothing is on offer)
    pub fn all_selected(&self) -> bool {
        !self.available_lines.is_empty()
            && self
                .available_lines
                .iter()
                .all(|l| self.selected.contains(&l.id))
    }

    pub fn selected_line_ids(&self) -> &[String] {
        &self.selected
    }

    pub fn selected_lines(&self) -> Vec<&MoveLine> {
        self.selected
            .iter()
            .filter_map(|id| self.available_lines.iter().find(|l| &l.id == id))
            .collect()
    }

    pub fn selected_balance(&self) -> BigDecimal {
        total_balance(self.selected_lines())
    }

    pub fn selected_debit(&self) -> BigDecimal {
        self.selected_lines().into_iter().map(|l| &l.debit).sum()
    }

    pub fn selected_credit(&self) -> BigDecimal {
        self.selected_lines().into_iter().map(|l| &l.credit).sum()
    }

    /// What would stay open if the current selection were reconciled
    pub fn remaining_balance(&self) -> BigDecimal {
        &self.payment_balance + self.selected_balance()
    }

    /// Remaining balance strictly inside the configured tolerance
    pub fn is_balanced(&self) -> bool {
        within_tolerance(&self.remaining_balance(), &self.engine.config().tolerance)
    }

    /// A non-empty, balanced selection
    pub fn can_reconcile(&self) -> bool {
        !self.selected.is_empty() && self.is_balanced()
    }

    fn require_account(&self) -> ReconcileResult<Account> {
        self.reconcile_account
            .clone()
            .ok_or_else(|| ReconcileError::NoReconcileAccount(self.payment.name.clone()))
    }

    /// Reconcile the payment with the selected lines
    ///
    /// Unlike [`ReconciliationEngine::reconcile_lines`], a selected line on
    /// another account is an error rather than being dropped.
    pub async fn reconcile_selected(&mut self) -> ReconcileResult<Notice> {
        if self.selected.is_empty() {
            return Err(ReconcileError::EmptySelection);
        }
        let account = self.require_account()?;

        let payment_lines = self.engine.open_payment_lines(&self.payment, &account).await?;
        if payment_lines.is_empty() {
            return Err(ReconcileError::NoOpenPaymentLines(account.name));
        }

        let selected = self.engine.backend().browse_lines(&self.selected).await?;
        if let Some(missing) = self
            .selected
            .iter()
            .find(|id| !selected.iter().any(|l| &l.id == *id))
        {
            return Err(ReconcileError::LineNotAvailable(missing.clone()));
        }
        if selected.iter().any(|l| l.account.id != account.id) {
            return Err(ReconcileError::AccountMismatch(account.name));
        }

        let all_lines = merge_lines(&payment_lines, &selected);
        ensure_balanced(&all_lines, &self.engine.config().tolerance)?;

        let line_ids: Vec<String> = all_lines.iter().map(|l| l.id.clone()).collect();
        self.engine.call_reconcile(&line_ids).await?;
        info!(payment = %self.payment.name, lines = line_ids.len(), "reconciled selected lines");

        self.selected.clear();
        self.reload().await?;
        Ok(Notice::success("Reconciliation completed successfully!"))
    }

    /// Automatically match the payment against the lines on offer
    pub async fn auto_reconcile(&mut self) -> ReconcileResult<Notice> {
        let account = self.require_account()?;

        let payment_lines = self.engine.open_payment_lines(&self.payment, &account).await?;
        if payment_lines.is_empty() {
            return Err(ReconcileError::NoOpenPaymentLines(account.name));
        }

        let outcome = self
            .engine
            .auto_match(&payment_lines, &self.available_lines)
            .await?;

        self.selected.clear();
        self.reload().await?;
        Ok(Notice::success(outcome.message))
    }

    /// Drop the selection and reload everything from the ledger
    pub async fn refresh(&mut self) -> ReconcileResult<Notice> {
        self.selected.clear();
        self.reload().await?;
        Ok(Notice::info("Data refreshed successfully"))
    }
}
