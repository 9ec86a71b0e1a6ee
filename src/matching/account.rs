//! Reconcile account selection for a payment

use tracing::debug;

use crate::types::*;

/// Pick the account a payment should be reconciled on.
///
/// Only reconcilable, unreconciled lines are considered. In priority order:
///
/// 1. the company's outstanding receipts/payments account for the payment
///    direction, if one of the lines uses it;
/// 2. the first receivable (inbound) or payable (outbound) account;
/// 3. the account of the first open line.
///
/// Returns `None` when the payment has no open reconcilable line.
pub fn select_reconcile_account(
    ledger_lines: &[MoveLine],
    direction: PaymentDirection,
    outstanding: &OutstandingAccounts,
) -> Option<Account> {
    let open: Vec<&MoveLine> = ledger_lines.iter().filter(|l| l.is_open()).collect();
    let first = open.first()?;

    if let Some(outstanding_id) = outstanding.for_direction(direction) {
        if let Some(line) = open.iter().find(|l| l.account.id == outstanding_id) {
            debug!(account = %line.account.id, "selected outstanding account");
            return Some(line.account.clone());
        }
    }

    let partner_kind = direction.partner_account_kind();
    if let Some(line) = open.iter().find(|l| l.account.kind == partner_kind) {
        debug!(account = %line.account.id, kind = ?partner_kind, "selected partner account");
        return Some(line.account.clone());
    }

    debug!(account = %first.account.id, "falling back to first reconcilable account");
    Some(first.account.clone())
}

/// Unreconciled lines booked on `account_id`, in their original order
pub fn open_lines_on_account<'a>(lines: &'a [MoveLine], account_id: &str) -> Vec<&'a MoveLine> {
    lines
        .iter()
        .filter(|l| l.account.id == account_id && !l.reconciled)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn account(id: &str, kind: AccountKind, reconcile: bool) -> Account {
        Account::new(id, id.to_uppercase(), kind, reconcile)
    }

    fn line(id: &str, account: Account, debit: i64, credit: i64, reconciled: bool) -> MoveLine {
        MoveLine {
            id: id.to_string(),
            move_id: "pay_move".to_string(),
            move_name: "PBNK1/2024/0001".to_string(),
            move_ref: None,
            name: None,
            account,
            partner_id: Some("p1".to_string()),
            debit: BigDecimal::from(debit),
            credit: BigDecimal::from(credit),
            amount_currency: BigDecimal::from(debit - credit),
            currency: None,
            date: None,
            reconciled,
            amount_residual: BigDecimal::from(debit - credit),
        }
    }

    fn outstanding() -> OutstandingAccounts {
        OutstandingAccounts {
            receipt_account_id: Some("out_rcpt".to_string()),
            payment_account_id: Some("out_pay".to_string()),
        }
    }

    #[test]
    fn test_outstanding_account_wins() {
        let lines = vec![
            line("l1", account("rcv", AccountKind::Receivable, true), 0, 100, false),
            line("l2", account("out_rcpt", AccountKind::Other, true), 100, 0, false),
        ];

        let selected =
            select_reconcile_account(&lines, PaymentDirection::Inbound, &outstanding()).unwrap();
        assert_eq!(selected.id, "out_rcpt");
    }

    #[test]
    fn test_outstanding_account_for_other_direction_is_ignored() {
        // Inbound payment, but only the outstanding *payments* account is present
        let lines = vec![
            line("l1", account("out_pay", AccountKind::Other, true), 100, 0, false),
            line("l2", account("rcv", AccountKind::Receivable, true), 0, 100, false),
        ];

        let selected =
            select_reconcile_account(&lines, PaymentDirection::Inbound, &outstanding()).unwrap();
        assert_eq!(selected.id, "rcv");
    }

    #[test]
    fn test_reconciled_outstanding_line_falls_through_to_payable() {
        let lines = vec![
            line("l1", account("out_pay", AccountKind::Other, true), 0, 100, true),
            line("l2", account("pay", AccountKind::Payable, true), 100, 0, false),
        ];

        let selected =
            select_reconcile_account(&lines, PaymentDirection::Outbound, &outstanding()).unwrap();
        assert_eq!(selected.id, "pay");
    }

    #[test]
    fn test_falls_back_to_first_reconcilable_line() {
        let lines = vec![
            line("l1", account("bank", AccountKind::Liquidity, false), 100, 0, false),
            line("l2", account("suspense", AccountKind::Other, true), 0, 60, false),
            line("l3", account("clearing", AccountKind::Other, true), 0, 40, false),
        ];

        let selected = select_reconcile_account(
            &lines,
            PaymentDirection::Inbound,
            &OutstandingAccounts::default(),
        )
        .unwrap();
        assert_eq!(selected.id, "suspense");
    }

    #[test]
    fn test_no_open_reconcilable_line() {
        let lines = vec![
            line("l1", account("bank", AccountKind::Liquidity, false), 100, 0, false),
            line("l2", account("rcv", AccountKind::Receivable, true), 0, 100, true),
        ];

        assert!(
            select_reconcile_account(&lines, PaymentDirection::Inbound, &outstanding()).is_none()
        );
        assert!(
            select_reconcile_account(&[], PaymentDirection::Outbound, &outstanding()).is_none()
        );
    }

    #[test]
    fn test_open_lines_on_account_skips_reconciled_and_other_accounts() {
        let rcv = account("rcv", AccountKind::Receivable, true);
        let lines = vec![
            line("l1", rcv.clone(), 0, 100, false),
            line("l2", rcv, 0, 50, true),
            line("l3", account("bank", AccountKind::Liquidity, false), 150, 0, false),
        ];

        let open = open_lines_on_account(&lines, "rcv");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "l1");
    }
}
