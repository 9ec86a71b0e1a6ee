//! Serializable views returned by the reconciliation workflow

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::*;

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Payment header shown above the matching table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub id: String,
    pub name: String,
    pub amount: BigDecimal,
    pub currency_code: String,
    pub currency_symbol: String,
    pub partner_id: Option<String>,
    pub partner_name: Option<String>,
    pub direction: PaymentDirection,
    /// `%Y-%m-%d`, empty when the payment has no date
    pub date: String,
    pub reconcile_account_id: String,
    pub reconcile_account_name: String,
}

impl PaymentSummary {
    pub fn new(payment: &Payment, account: &Account) -> Self {
        Self {
            id: payment.id.clone(),
            name: payment.name.clone(),
            amount: payment.amount.clone(),
            currency_code: payment.currency.code.clone(),
            currency_symbol: payment.currency.symbol.clone(),
            partner_id: payment.partner.as_ref().map(|p| p.id.clone()),
            partner_name: payment.partner.as_ref().map(|p| p.name.clone()),
            direction: payment.direction,
            date: format_date(payment.date),
            reconcile_account_id: account.id.clone(),
            reconcile_account_name: account.name.clone(),
        }
    }
}

/// One journal item as displayed in the matching table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineView {
    pub id: String,
    /// Line label, or the journal entry number when the line has none
    pub name: String,
    pub account_id: String,
    pub account_name: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub balance: BigDecimal,
    pub amount_currency: BigDecimal,
    pub currency_code: Option<String>,
    pub date: String,
    /// Only set for candidate lines
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub move_ref: Option<String>,
    /// Only set for candidate lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_name: Option<String>,
}

impl LineView {
    /// View of one of the payment's own lines
    pub fn payment_line(line: &MoveLine) -> Self {
        Self {
            id: line.id.clone(),
            name: line.label().to_string(),
            account_id: line.account.id.clone(),
            account_name: line.account.name.clone(),
            debit: line.debit.clone(),
            credit: line.credit.clone(),
            balance: line.balance(),
            amount_currency: line.amount_currency.clone(),
            currency_code: line.currency.as_ref().map(|c| c.code.clone()),
            date: format_date(line.date),
            move_ref: None,
            move_name: None,
        }
    }

    /// View of a candidate line, carrying its journal entry reference and number
    pub fn candidate(line: &MoveLine) -> Self {
        Self {
            move_ref: Some(line.move_ref.clone().unwrap_or_default()),
            move_name: Some(line.move_name.clone()),
            ..Self::payment_line(line)
        }
    }
}

/// Everything needed to render the manual matching screen for a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileData {
    pub payment: PaymentSummary,
    /// The payment's open lines on the reconcile account
    pub payment_move_lines: Vec<LineView>,
    /// Open lines of other entries on the same account and partner
    pub reconcilable_lines: Vec<LineView>,
}

/// Result of reconciling a payment with a chosen set of lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub message: String,
    /// Lines handed to the ledger
    pub line_count: usize,
    /// Lines fully reconciled afterwards
    pub reconciled_count: usize,
    pub outcome: ReconcileOutcome,
}

impl ReconcileSummary {
    pub fn is_full(&self) -> bool {
        self.reconciled_count == self.line_count
    }
}

/// Result of a successful automatic match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoReconcileOutcome {
    pub message: String,
    /// Candidate lines matched against the payment
    pub matched_line_ids: Vec<String>,
    pub outcome: ReconcileOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
}

/// User-facing notification produced by session actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            title: "Success".to_string(),
            message: message.into(),
            level: NoticeLevel::Success,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            title: "Info".to_string(),
            message: message.into(),
            level: NoticeLevel::Info,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            title: "Warning".to_string(),
            message: message.into(),
            level: NoticeLevel::Warning,
        }
    }
}

impl From<&ReconcileError> for Notice {
    /// Rejected user actions are reported as warnings
    fn from(err: &ReconcileError) -> Self {
        match err {
            ReconcileError::PaymentNotPosted(_) => {
                Notice::warning("You can only reconcile posted payments.")
            }
            ReconcileError::Unbalanced { .. } => {
                Notice::warning("Reconciliation is not balanced. Please check your selection.")
            }
            other => Notice::warning(other.to_string()),
        }
    }
}
