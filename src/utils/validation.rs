//! Validation utilities

use bigdecimal::BigDecimal;
use std::collections::{BTreeSet, HashSet};

use crate::traits::*;
use crate::types::*;

/// Sum of line balances
pub fn total_balance<'a, I>(lines: I) -> BigDecimal
where
    I: IntoIterator<Item = &'a MoveLine>,
{
    lines.into_iter().map(|l| l.balance()).sum()
}

/// Union of two line sets, keeping first occurrence order and dropping duplicate IDs
pub fn merge_lines(first: &[MoveLine], second: &[MoveLine]) -> Vec<MoveLine> {
    let mut seen = HashSet::new();
    first
        .iter()
        .chain(second.iter())
        .filter(|l| seen.insert(l.id.clone()))
        .cloned()
        .collect()
}

/// Validate that every line is booked on the same account
pub fn ensure_single_account(lines: &[MoveLine]) -> ReconcileResult<()> {
    let accounts: BTreeSet<&str> = lines.iter().map(|l| l.account.id.as_str()).collect();
    if accounts.len() > 1 {
        return Err(ReconcileError::MixedAccounts(
            accounts.into_iter().map(str::to_string).collect(),
        ));
    }
    Ok(())
}

/// Validate that the lines net to zero, allowing `tolerance` of rounding
pub fn ensure_balanced(lines: &[MoveLine], tolerance: &BigDecimal) -> ReconcileResult<()> {
    let total = total_balance(lines);
    if total.abs() > *tolerance {
        return Err(ReconcileError::Unbalanced { total });
    }
    Ok(())
}

/// Validate that no line has been fully reconciled already
pub fn ensure_open(lines: &[MoveLine]) -> ReconcileResult<()> {
    match lines.iter().find(|l| l.reconciled) {
        Some(line) => Err(ReconcileError::AlreadyReconciled(line.id.clone())),
        None => Ok(()),
    }
}

/// Validate that every line belongs to `partner_id`
pub fn ensure_partner(lines: &[MoveLine], partner_id: &str) -> ReconcileResult<()> {
    match lines
        .iter()
        .find(|l| l.partner_id.as_deref() != Some(partner_id))
    {
        Some(line) => Err(ReconcileError::PartnerMismatch(line.id.clone())),
        None => Ok(()),
    }
}

/// Stricter validator: on top of the default checks, every line must be
/// open and belong to the same partner
pub struct StrictSelectionValidator;

impl SelectionValidator for StrictSelectionValidator {
    fn validate_selection(
        &self,
        lines: &[MoveLine],
        tolerance: &BigDecimal,
    ) -> ReconcileResult<()> {
        ensure_single_account(lines)?;
        ensure_open(lines)?;

        if let Some(partner_id) = lines.first().and_then(|l| l.partner_id.clone()) {
            ensure_partner(lines, &partner_id)?;
        }

        ensure_balanced(lines, tolerance)
    }
}
