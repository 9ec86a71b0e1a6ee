//! In-memory ledger backend for testing

use async_trait::async_trait;
use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::traits::*;
use crate::types::*;

/// Pairing of one debit line with one credit line for `amount`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialReconcile {
    pub id: String,
    pub debit_line_id: String,
    pub credit_line_id: String,
    pub amount: BigDecimal,
}

/// In-memory ledger backend for testing and development
///
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    companies: Arc<RwLock<HashMap<String, Company>>>,
    payments: Arc<RwLock<HashMap<String, Payment>>>,
    lines: Arc<RwLock<Vec<MoveLine>>>,
    partials: Arc<RwLock<Vec<PartialReconcile>>>,
    failing_lines: Arc<RwLock<HashSet<String>>>,
}

fn poisoned<T>(_: PoisonError<T>) -> ReconcileError {
    ReconcileError::Backend("ledger lock poisoned".to_string())
}

/// Residual is zero once rounded to cents
fn is_settled(residual: &BigDecimal) -> bool {
    residual.with_scale_round(2, RoundingMode::HalfEven) == BigDecimal::from(0)
}

impl MemoryLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_company(&self, company: Company) -> ReconcileResult<()> {
        self.companies
            .write()
            .map_err(poisoned)?
            .insert(company.id.clone(), company);
        Ok(())
    }

    pub fn add_payment(&self, payment: Payment) -> ReconcileResult<()> {
        self.payments
            .write()
            .map_err(poisoned)?
            .insert(payment.id.clone(), payment);
        Ok(())
    }

    /// Add a journal item; line IDs must be unique
    pub fn add_line(&self, line: MoveLine) -> ReconcileResult<()> {
        let mut lines = self.lines.write().map_err(poisoned)?;
        if lines.iter().any(|l| l.id == line.id) {
            return Err(ReconcileError::Backend(format!(
                "Line with ID '{}' already exists",
                line.id
            )));
        }
        lines.push(line);
        Ok(())
    }

    /// Make any reconcile call involving `line_id` fail
    pub fn fail_reconcile_on(&self, line_id: impl Into<String>) -> ReconcileResult<()> {
        self.failing_lines
            .write()
            .map_err(poisoned)?
            .insert(line_id.into());
        Ok(())
    }

    /// Partial reconcile records created so far
    pub fn partial_reconciles(&self) -> ReconcileResult<Vec<PartialReconcile>> {
        Ok(self.partials.read().map_err(poisoned)?.clone())
    }

    /// Get a line by ID
    pub fn line(&self, line_id: &str) -> ReconcileResult<Option<MoveLine>> {
        Ok(self
            .lines
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|l| l.id == line_id)
            .cloned())
    }

    /// Drop a line, as when the host deletes its journal entry
    pub fn remove_line(&self, line_id: &str) -> ReconcileResult<Option<MoveLine>> {
        let mut lines = self.lines.write().map_err(poisoned)?;
        Ok(lines
            .iter()
            .position(|l| l.id == line_id)
            .map(|index| lines.remove(index)))
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> ReconcileResult<()> {
        self.companies.write().map_err(poisoned)?.clear();
        self.payments.write().map_err(poisoned)?.clear();
        self.lines.write().map_err(poisoned)?.clear();
        self.partials.write().map_err(poisoned)?.clear();
        self.failing_lines.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

#[async_trait]
impl LedgerBackend for MemoryLedger {
    async fn get_payment(&self, payment_id: &str) -> ReconcileResult<Option<Payment>> {
        Ok(self.payments.read().map_err(poisoned)?.get(payment_id).cloned())
    }

    async fn get_company(&self, company_id: &str) -> ReconcileResult<Option<Company>> {
        Ok(self
            .companies
            .read()
            .map_err(poisoned)?
            .get(company_id)
            .cloned())
    }

    async fn get_move_lines(&self, move_id: &str) -> ReconcileResult<Vec<MoveLine>> {
        let lines = self.lines.read().map_err(poisoned)?;
        Ok(lines.iter().filter(|l| l.move_id == move_id).cloned().collect())
    }

    async fn browse_lines(&self, line_ids: &[String]) -> ReconcileResult<Vec<MoveLine>> {
        let lines = self.lines.read().map_err(poisoned)?;
        Ok(line_ids
            .iter()
            .filter_map(|id| lines.iter().find(|l| &l.id == id))
            .cloned()
            .collect())
    }

    async fn search_lines(
        &self,
        query: &LineQuery,
        limit: Option<usize>,
    ) -> ReconcileResult<Vec<MoveLine>> {
        let lines = self.lines.read().map_err(poisoned)?;
        Ok(lines
            .iter()
            .filter(|l| query.matches(l))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn reconcile(&self, line_ids: &[String]) -> ReconcileResult<ReconcileOutcome> {
        if line_ids.is_empty() {
            return Ok(ReconcileOutcome::default());
        }

        {
            let failing = self.failing_lines.read().map_err(poisoned)?;
            if let Some(id) = line_ids.iter().find(|id| failing.contains(*id)) {
                return Err(ReconcileError::Backend(format!(
                    "Line '{}' is locked and cannot be reconciled",
                    id
                )));
            }
        }

        let mut lines = self.lines.write().map_err(poisoned)?;

        let mut positions = Vec::with_capacity(line_ids.len());
        for id in line_ids {
            let position = lines
                .iter()
                .position(|l| &l.id == id)
                .ok_or_else(|| ReconcileError::Backend(format!("Line not found: {}", id)))?;
            if !positions.contains(&position) {
                positions.push(position);
            }
        }

        let account_id = lines[positions[0]].account.id.clone();
        for &p in &positions {
            let line = &lines[p];
            if line.account.id != account_id {
                return Err(ReconcileError::Backend(
                    "Entries are not from the same account".to_string(),
                ));
            }
            if !line.account.reconcile {
                return Err(ReconcileError::Backend(format!(
                    "Account '{}' does not allow reconciliation",
                    line.account.name
                )));
            }
            if line.reconciled {
                return Err(ReconcileError::Backend(format!(
                    "Line '{}' is already reconciled",
                    line.id
                )));
            }
        }

        let zero = BigDecimal::from(0);
        let debits: Vec<usize> = positions
            .iter()
            .copied()
            .filter(|&p| lines[p].amount_residual > zero)
            .collect();
        let credits: Vec<usize> = positions
            .iter()
            .copied()
            .filter(|&p| lines[p].amount_residual < zero)
            .collect();

        let mut new_partials = Vec::new();
        let (mut d, mut c) = (0, 0);
        while d < debits.len() && c < credits.len() {
            let debit_open = lines[debits[d]].amount_residual.clone();
            let credit_open = -lines[credits[c]].amount_residual.clone();
            let amount = if debit_open < credit_open {
                debit_open
            } else {
                credit_open
            };

            lines[debits[d]].amount_residual -= &amount;
            lines[credits[c]].amount_residual += &amount;

            new_partials.push(PartialReconcile {
                id: uuid::Uuid::new_v4().to_string(),
                debit_line_id: lines[debits[d]].id.clone(),
                credit_line_id: lines[credits[c]].id.clone(),
                amount,
            });

            if lines[debits[d]].amount_residual <= zero {
                d += 1;
            }
            if lines[credits[c]].amount_residual >= zero {
                c += 1;
            }
        }

        for &p in &positions {
            if is_settled(&lines[p].amount_residual) {
                lines[p].reconciled = true;
            }
        }

        let full_reconcile_id = positions
            .iter()
            .all(|&p| lines[p].reconciled)
            .then(|| uuid::Uuid::new_v4().to_string());

        debug!(
            account = %account_id,
            lines = positions.len(),
            partials = new_partials.len(),
            full = full_reconcile_id.is_some(),
            "reconciled lines in memory ledger"
        );

        let outcome = ReconcileOutcome {
            partial_reconcile_ids: new_partials.iter().map(|p| p.id.clone()).collect(),
            full_reconcile_id,
        };
        self.partials
            .write()
            .map_err(poisoned)?
            .extend(new_partials);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn receivable() -> Account {
        Account::new("rcv", "Accounts Receivable", AccountKind::Receivable, true)
    }

    fn seed(ledger: &MemoryLedger) {
        let p1 = Some("p1".to_string());
        ledger
            .add_line(MoveLine::new("pay", "m_pay", "PAY/1", receivable(), p1.clone(), dec("-500")))
            .unwrap();
        ledger
            .add_line(MoveLine::new(
                "inv1",
                "m_inv1",
                "INV/1",
                receivable(),
                p1.clone(),
                dec("300"),
            ))
            .unwrap();
        ledger
            .add_line(MoveLine::new("inv2", "m_inv2", "INV/2", receivable(), p1, dec("200")))
            .unwrap();
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_full_reconcile() {
        let ledger = MemoryLedger::new();
        seed(&ledger);

        let outcome = ledger.reconcile(&ids(&["pay", "inv1", "inv2"])).await.unwrap();
        assert_eq!(outcome.partial_reconcile_ids.len(), 2);
        assert!(outcome.full_reconcile_id.is_some());

        for id in ["pay", "inv1", "inv2"] {
            let line = ledger.line(id).unwrap().unwrap();
            assert!(line.reconciled, "{id} should be reconciled");
            assert_eq!(line.amount_residual, BigDecimal::from(0));
        }
    }

    #[tokio::test]
    async fn test_partial_reconcile_leaves_residual() {
        let ledger = MemoryLedger::new();
        seed(&ledger);

        let outcome = ledger.reconcile(&ids(&["pay", "inv1"])).await.unwrap();
        assert_eq!(outcome.partial_reconcile_ids.len(), 1);
        assert!(outcome.full_reconcile_id.is_none());

        let pay = ledger.line("pay").unwrap().unwrap();
        assert!(!pay.reconciled);
        assert_eq!(pay.amount_residual, dec("-200"));
        assert!(ledger.line("inv1").unwrap().unwrap().reconciled);

        let partials = ledger.partial_reconciles().unwrap();
        assert_eq!(partials[0].debit_line_id, "inv1");
        assert_eq!(partials[0].credit_line_id, "pay");
        assert_eq!(partials[0].amount, dec("300"));
    }

    #[tokio::test]
    async fn test_sub_cent_residual_counts_as_settled() {
        let ledger = MemoryLedger::new();
        let p1 = Some("p1".to_string());
        ledger
            .add_line(MoveLine::new("pay", "m1", "PAY/1", receivable(), p1.clone(), dec("-100")))
            .unwrap();
        ledger
            .add_line(MoveLine::new("inv", "m2", "INV/1", receivable(), p1, dec("100.004")))
            .unwrap();

        let outcome = ledger.reconcile(&ids(&["pay", "inv"])).await.unwrap();
        assert!(outcome.full_reconcile_id.is_some());
    }

    #[tokio::test]
    async fn test_reconcile_rejections() {
        let ledger = MemoryLedger::new();
        seed(&ledger);
        let other = Account::new("rcv2", "Other Receivable", AccountKind::Receivable, true);
        ledger
            .add_line(MoveLine::new("x", "m_x", "INV/X", other, None, dec("10")))
            .unwrap();

        assert!(matches!(
            ledger.reconcile(&ids(&["pay", "x"])).await,
            Err(ReconcileError::Backend(_))
        ));
        assert!(matches!(
            ledger.reconcile(&ids(&["pay", "missing"])).await,
            Err(ReconcileError::Backend(_))
        ));

        ledger.fail_reconcile_on("inv2").unwrap();
        assert!(matches!(
            ledger.reconcile(&ids(&["pay", "inv2"])).await,
            Err(ReconcileError::Backend(_))
        ));

        ledger.reconcile(&ids(&["pay", "inv1", "inv2"])).await.ok();
        assert!(ledger.partial_reconciles().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_query_and_limit() {
        let ledger = MemoryLedger::new();
        seed(&ledger);

        let query = LineQuery::open_items("p1", "m_pay").on_account("rcv");
        let found = ledger.search_lines(&query, None).await.unwrap();
        let found_ids: Vec<&str> = found.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(found_ids, vec!["inv1", "inv2"]);

        let limited = ledger.search_lines(&query, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "inv1");

        let other_partner = LineQuery::open_items("p2", "m_pay");
        assert!(ledger.search_lines(&other_partner, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_line_rejected_and_clear() {
        let ledger = MemoryLedger::new();
        seed(&ledger);
        let dup = MoveLine::new("pay", "m", "M", receivable(), None, dec("1"));
        assert!(ledger.add_line(dup).is_err());

        let shared = ledger.clone();
        shared.clear().unwrap();
        assert!(ledger.line("pay").unwrap().is_none());
    }
}
