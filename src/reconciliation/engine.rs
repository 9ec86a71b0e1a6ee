//! Request-level reconciliation operations for a single payment

use tracing::{debug, error, info, warn};

use crate::config::ReconcileConfig;
use crate::matching::{balancing_subsets, open_lines_on_account, select_reconcile_account};
use crate::reconciliation::report::*;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{merge_lines, total_balance};

/// Reconciliation engine that matches payments against open items of a host ledger
pub struct ReconciliationEngine<B: LedgerBackend> {
    backend: B,
    config: ReconcileConfig,
    validator: Box<dyn SelectionValidator>,
}

impl<B: LedgerBackend> ReconciliationEngine<B> {
    /// Create a new engine with the default configuration
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: ReconcileConfig::default(),
            validator: Box::new(DefaultSelectionValidator),
        }
    }

    /// Create a new engine with a custom configuration
    pub fn with_config(backend: B, config: ReconcileConfig) -> ReconcileResult<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            validator: Box::new(DefaultSelectionValidator),
        })
    }

    /// Replace the validator used for manual selections
    pub fn with_validator(mut self, validator: Box<dyn SelectionValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Get a payment by ID, returning an error if not found
    pub async fn get_payment_required(&self, payment_id: &str) -> ReconcileResult<Payment> {
        self.backend
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| ReconcileError::PaymentNotFound(payment_id.to_string()))
    }

    /// Find the account this payment should be reconciled on
    pub async fn resolve_reconcile_account(
        &self,
        payment: &Payment,
    ) -> ReconcileResult<Option<Account>> {
        let Some(ref move_id) = payment.move_id else {
            return Ok(None);
        };

        let lines = self.backend.get_move_lines(move_id).await?;
        let outstanding = self
            .backend
            .get_company(&payment.company_id)
            .await?
            .map(|c| c.outstanding)
            .unwrap_or_default();

        Ok(select_reconcile_account(
            &lines,
            payment.direction,
            &outstanding,
        ))
    }

    /// The payment's unreconciled lines on `account`
    pub async fn open_payment_lines(
        &self,
        payment: &Payment,
        account: &Account,
    ) -> ReconcileResult<Vec<MoveLine>> {
        let Some(ref move_id) = payment.move_id else {
            return Ok(Vec::new());
        };

        let lines = self.backend.get_move_lines(move_id).await?;
        Ok(open_lines_on_account(&lines, &account.id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Open lines of other entries on `account` for the payment's partner,
    /// capped at the configured candidate limit
    pub async fn candidate_lines(
        &self,
        payment: &Payment,
        account: &Account,
    ) -> ReconcileResult<Vec<MoveLine>> {
        let (Some(partner), Some(move_id)) = (&payment.partner, &payment.move_id) else {
            return Ok(Vec::new());
        };

        let query = LineQuery::open_items(&partner.id, move_id).on_account(&account.id);
        self.backend
            .search_lines(&query, Some(self.config.candidate_limit))
            .await
    }

    /// Resolve account and open payment lines, or fail with the first missing piece
    async fn payment_context(
        &self,
        payment: &Payment,
    ) -> ReconcileResult<(Account, Vec<MoveLine>)> {
        if payment.move_id.is_none() {
            return Err(ReconcileError::MissingJournalEntry(payment.name.clone()));
        }

        let account = self
            .resolve_reconcile_account(payment)
            .await?
            .ok_or_else(|| ReconcileError::NoReconcileAccount(payment.name.clone()))?;

        let payment_lines = self.open_payment_lines(payment, &account).await?;
        if payment_lines.is_empty() {
            return Err(ReconcileError::NoOpenPaymentLines(account.name.clone()));
        }

        Ok((account, payment_lines))
    }

    /// Everything needed to show the matching screen for a payment
    pub async fn get_reconcile_data(&self, payment_id: &str) -> ReconcileResult<ReconcileData> {
        info!(payment_id, "getting reconcile data");

        let payment = self.get_payment_required(payment_id).await?;
        let (account, payment_lines) = self.payment_context(&payment).await?;
        let candidates = self.candidate_lines(&payment, &account).await?;

        let data = ReconcileData {
            payment: PaymentSummary::new(&payment, &account),
            payment_move_lines: payment_lines.iter().map(LineView::payment_line).collect(),
            reconcilable_lines: candidates.iter().map(LineView::candidate).collect(),
        };

        info!(
            payment_lines = data.payment_move_lines.len(),
            reconcilable_lines = data.reconcilable_lines.len(),
            account = %account.name,
            "found lines for reconciliation"
        );
        Ok(data)
    }

    /// Reconcile the payment with the chosen lines
    ///
    /// Selected lines on another account, or already reconciled, are
    /// dropped silently. The combined set must net to zero within the
    /// configured tolerance.
    pub async fn reconcile_lines(
        &self,
        payment_id: &str,
        selected_line_ids: &[String],
    ) -> ReconcileResult<ReconcileSummary> {
        info!(payment_id, selected = ?selected_line_ids, "direct reconciling payment");

        let payment = self.get_payment_required(payment_id).await?;
        let (account, payment_lines) = self.payment_context(&payment).await?;

        let selected: Vec<MoveLine> = self
            .backend
            .browse_lines(selected_line_ids)
            .await?
            .into_iter()
            .filter(|l| l.account.id == account.id && !l.reconciled)
            .collect();
        if selected.is_empty() {
            return Err(ReconcileError::NoValidSelection);
        }

        let all_lines = merge_lines(&payment_lines, &selected);
        self.validator
            .validate_selection(&all_lines, &self.config.tolerance)?;

        self.reconcile_and_summarize(&all_lines).await
    }

    /// Hand `lines` to the ledger and report how many ended up fully reconciled
    pub(crate) async fn reconcile_and_summarize(
        &self,
        lines: &[MoveLine],
    ) -> ReconcileResult<ReconcileSummary> {
        let line_ids: Vec<String> = lines.iter().map(|l| l.id.clone()).collect();
        let outcome = self.call_reconcile(&line_ids).await?;

        if !outcome.partial_reconcile_ids.is_empty() {
            info!(
                partials = outcome.partial_reconcile_ids.len(),
                "partial reconciliation created"
            );
        }

        let reconciled_count = self
            .backend
            .browse_lines(&line_ids)
            .await?
            .iter()
            .filter(|l| l.reconciled)
            .count();
        let line_count = line_ids.len();

        let message = if reconciled_count == line_count {
            format!("Full reconciliation completed for {} lines", line_count)
        } else {
            format!(
                "Partial reconciliation completed: {}/{} lines reconciled",
                reconciled_count, line_count
            )
        };
        info!("{}", message);

        Ok(ReconcileSummary {
            message,
            line_count,
            reconciled_count,
            outcome,
        })
    }

    /// Call the ledger's reconcile primitive, surfacing failures as `ReconcileFailed`
    pub(crate) async fn call_reconcile(
        &self,
        line_ids: &[String],
    ) -> ReconcileResult<ReconcileOutcome> {
        self.backend.reconcile(line_ids).await.map_err(|e| {
            error!(error = %e, "reconciliation method failed");
            match e {
                ReconcileError::Backend(message) => ReconcileError::ReconcileFailed(message),
                other => ReconcileError::ReconcileFailed(other.to_string()),
            }
        })
    }

    /// Find and reconcile candidate lines that exactly offset the payment
    pub async fn auto_reconcile(&self, payment_id: &str) -> ReconcileResult<AutoReconcileOutcome> {
        info!(payment_id, "auto reconciling payment");

        let payment = self.get_payment_required(payment_id).await?;
        let (account, payment_lines) = self.payment_context(&payment).await?;
        let candidates = self.candidate_lines(&payment, &account).await?;

        self.auto_match(&payment_lines, &candidates).await
    }

    /// Try offsetting subsets of `candidates` in search order until the
    /// ledger accepts one
    pub(crate) async fn auto_match(
        &self,
        payment_lines: &[MoveLine],
        candidates: &[MoveLine],
    ) -> ReconcileResult<AutoReconcileOutcome> {
        let payment_balance = total_balance(payment_lines);
        let balances: Vec<_> = candidates.iter().map(MoveLine::balance).collect();

        debug!(
            balance = %payment_balance,
            candidates = candidates.len(),
            "searching for offsetting lines"
        );

        let mut search = balancing_subsets(
            &payment_balance,
            &balances,
            self.config.max_combination_size,
            &self.config.tolerance,
        )
        .with_node_budget(self.config.max_search_nodes);

        for subset in search.by_ref() {
            let matched: Vec<&MoveLine> = subset.indices.iter().map(|&i| &candidates[i]).collect();
            let line_ids: Vec<String> = payment_lines
                .iter()
                .chain(matched.iter().copied())
                .map(|l| l.id.clone())
                .collect();

            match self.backend.reconcile(&line_ids).await {
                Ok(outcome) => {
                    let message = match matched.as_slice() {
                        [single] => format!("Auto-reconciled with {}", single.move_name),
                        many => format!("Auto-reconciled with {} entries", many.len()),
                    };
                    info!("{}", message);
                    return Ok(AutoReconcileOutcome {
                        message,
                        matched_line_ids: matched.iter().map(|l| l.id.clone()).collect(),
                        outcome,
                    });
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        lines = ?line_ids,
                        "matched lines could not be reconciled, trying next match"
                    );
                }
            }
        }

        if search.budget_exhausted() {
            warn!(
                nodes = search.nodes_visited(),
                "combination search stopped at node budget"
            );
        }

        Err(ReconcileError::NoMatchFound)
    }

    /// Number of open receivable/payable items of the payment's partner
    /// outside the payment itself; zero unless the payment is posted and
    /// has both a journal entry and a partner
    pub async fn count_reconcilable_lines(&self, payment: &Payment) -> ReconcileResult<usize> {
        let (PaymentState::Posted, Some(move_id), Some(partner)) =
            (payment.state, &payment.move_id, &payment.partner)
        else {
            return Ok(0);
        };

        let query = LineQuery::open_items(&partner.id, move_id)
            .reconcilable()
            .of_kind(payment.direction.partner_account_kind());
        Ok(self.backend.search_lines(&query, None).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_ledger::MemoryLedger;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn receivable() -> Account {
        Account::new("rcv", "Accounts Receivable", AccountKind::Receivable, true)
    }

    fn bank() -> Account {
        Account::new("bank", "Bank", AccountKind::Liquidity, false)
    }

    /// Inbound payment of 500 booked bank / receivable, plus three customer invoices
    fn setup(invoices: &[&str]) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger
            .add_company(Company {
                id: "c1".to_string(),
                name: "Acme".to_string(),
                outstanding: OutstandingAccounts::default(),
            })
            .unwrap();
        ledger
            .add_payment(Payment {
                id: "pay1".to_string(),
                name: "PBNK1/2024/0001".to_string(),
                amount: dec("500"),
                currency: Currency::new("INR", "₹"),
                partner: Some(Partner::new("p1", "Globex")),
                direction: PaymentDirection::Inbound,
                state: PaymentState::Posted,
                date: None,
                move_id: Some("m_pay".to_string()),
                company_id: "c1".to_string(),
                bank_reference: None,
                cheque_reference: None,
                effective_date: None,
            })
            .unwrap();

        let p1 = Some("p1".to_string());
        ledger
            .add_line(MoveLine::new(
                "pay_bank",
                "m_pay",
                "PBNK1/2024/0001",
                bank(),
                p1.clone(),
                dec("500"),
            ))
            .unwrap();
        ledger
            .add_line(MoveLine::new(
                "pay_rcv",
                "m_pay",
                "PBNK1/2024/0001",
                receivable(),
                p1.clone(),
                dec("-500"),
            ))
            .unwrap();

        for (i, amount) in invoices.iter().enumerate() {
            let n = i + 1;
            ledger
                .add_line(MoveLine::new(
                    format!("inv{n}"),
                    format!("m_inv{n}"),
                    format!("INV/2024/000{n}"),
                    receivable(),
                    p1.clone(),
                    dec(amount),
                ))
                .unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn test_count_reconcilable_lines() {
        let ledger = setup(&["300", "200", "50"]);
        let engine = ReconciliationEngine::new(ledger.clone());
        let payment = engine.get_payment_required("pay1").await.unwrap();
        assert_eq!(engine.count_reconcilable_lines(&payment).await.unwrap(), 3);

        let mut draft = payment.clone();
        draft.state = PaymentState::Draft;
        assert_eq!(engine.count_reconcilable_lines(&draft).await.unwrap(), 0);

        let mut outbound = payment;
        outbound.direction = PaymentDirection::Outbound;
        assert_eq!(engine.count_reconcilable_lines(&outbound).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_lines_drops_foreign_selection() {
        let ledger = setup(&["300", "200"]);
        let other = Account::new("other", "Other", AccountKind::Receivable, true);
        ledger
            .add_line(MoveLine::new("x", "m_x", "MISC/1", other, Some("p1".to_string()), dec("1")))
            .unwrap();
        let engine = ReconciliationEngine::new(ledger);

        let selected = vec!["inv1".to_string(), "inv2".to_string(), "x".to_string()];
        let summary = engine.reconcile_lines("pay1", &selected).await.unwrap();
        assert_eq!(summary.line_count, 3);
        assert!(summary.is_full());
        assert_eq!(summary.message, "Full reconciliation completed for 3 lines");
    }

    #[tokio::test]
    async fn test_auto_match_skips_failing_candidate() {
        let ledger = setup(&["500", "500"]);
        ledger.fail_reconcile_on("inv1").unwrap();
        let engine = ReconciliationEngine::new(ledger.clone());

        let outcome = engine.auto_reconcile("pay1").await.unwrap();
        assert_eq!(outcome.matched_line_ids, vec!["inv2".to_string()]);
        assert_eq!(outcome.message, "Auto-reconciled with INV/2024/0002");
        assert!(!ledger.line("inv1").unwrap().unwrap().reconciled);
    }

    #[tokio::test]
    async fn test_node_budget_limits_auto_match() {
        let ledger = setup(&["100", "100", "100", "200"]);
        let config = ReconcileConfig {
            max_search_nodes: Some(1),
            ..ReconcileConfig::default()
        };
        let engine = ReconciliationEngine::with_config(ledger, config).unwrap();

        // Only (inv1, inv2) is evaluated before the budget runs out
        assert!(matches!(
            engine.auto_reconcile("pay1").await,
            Err(ReconcileError::NoMatchFound)
        ));
    }
}
