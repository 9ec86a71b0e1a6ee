//! Core types and data structures for the reconciliation workflow

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Classification of a ledger account, as far as reconciliation cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    /// Customer receivables - what partners owe the business
    Receivable,
    /// Vendor payables - what the business owes partners
    Payable,
    /// Bank and cash accounts
    Liquidity,
    /// Anything else (outstanding/suspense accounts, income, expense, ...)
    Other,
}

/// Direction of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentDirection {
    /// Money received from a customer
    Inbound,
    /// Money paid to a vendor
    Outbound,
}

impl PaymentDirection {
    /// Returns the partner account kind this direction settles
    /// Inbound payments settle receivables, outbound payments settle payables
    pub fn partner_account_kind(&self) -> AccountKind {
        match self {
            PaymentDirection::Inbound => AccountKind::Receivable,
            PaymentDirection::Outbound => AccountKind::Payable,
        }
    }
}

/// Posting state of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentState {
    Draft,
    Posted,
    Cancelled,
}

/// Ledger account as seen by the reconciliation workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Human-readable account name
    pub name: String,
    /// Kind of account (Receivable, Payable, ...)
    pub kind: AccountKind,
    /// Whether lines on this account can be reconciled against each other
    pub reconcile: bool,
}

impl Account {
    /// Create a new account
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: AccountKind,
        reconcile: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            reconcile,
        }
    }
}

/// Currency reference carried on payments and lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO code, e.g. "INR"
    pub code: String,
    /// Display symbol, e.g. "₹"
    pub symbol: String,
}

impl Currency {
    pub fn new(code: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            symbol: symbol.into(),
        }
    }
}

/// Counterparty of a payment or ledger line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: String,
    pub name: String,
}

impl Partner {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A payment record owned by the host ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier for the payment
    pub id: String,
    /// Payment reference, e.g. "PBNK1/2024/0001"
    pub name: String,
    /// Amount in payment currency
    pub amount: BigDecimal,
    pub currency: Currency,
    /// Counterparty; payments without one cannot be matched
    pub partner: Option<Partner>,
    pub direction: PaymentDirection,
    pub state: PaymentState,
    pub date: Option<NaiveDate>,
    /// Journal entry generated when the payment was posted
    pub move_id: Option<String>,
    /// Company that owns the payment
    pub company_id: String,
    /// Reference quoted on the bank transfer
    #[serde(default)]
    pub bank_reference: Option<String>,
    #[serde(default)]
    pub cheque_reference: Option<String>,
    /// Date a post-dated cheque takes effect
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

/// A single journal item (one side of a journal entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveLine {
    /// Unique identifier for the line
    pub id: String,
    /// Journal entry this line belongs to
    pub move_id: String,
    /// Journal entry number, e.g. "INV/2024/0007"
    pub move_name: String,
    /// Journal entry reference (vendor bill number, customer reference, ...)
    pub move_ref: Option<String>,
    /// Optional line label
    pub name: Option<String>,
    pub account: Account,
    pub partner_id: Option<String>,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    /// Amount in the line's foreign currency, if any
    pub amount_currency: BigDecimal,
    pub currency: Option<Currency>,
    pub date: Option<NaiveDate>,
    /// Fully matched by the host ledger
    pub reconciled: bool,
    /// Signed amount still open for matching
    pub amount_residual: BigDecimal,
}

impl MoveLine {
    /// Create an open line from a signed balance (positive is a debit)
    pub fn new(
        id: impl Into<String>,
        move_id: impl Into<String>,
        move_name: impl Into<String>,
        account: Account,
        partner_id: Option<String>,
        balance: BigDecimal,
    ) -> Self {
        let zero = BigDecimal::from(0);
        let (debit, credit) = if balance >= zero {
            (balance.clone(), zero)
        } else {
            (zero, -balance.clone())
        };
        Self {
            id: id.into(),
            move_id: move_id.into(),
            move_name: move_name.into(),
            move_ref: None,
            name: None,
            account,
            partner_id,
            debit,
            credit,
            amount_currency: balance.clone(),
            currency: None,
            date: None,
            reconciled: false,
            amount_residual: balance,
        }
    }

    pub fn with_label(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ref(mut self, move_ref: impl Into<String>) -> Self {
        self.move_ref = Some(move_ref.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Signed balance: debit minus credit
    pub fn balance(&self) -> BigDecimal {
        &self.debit - &self.credit
    }

    /// Line label, falling back to the journal entry number
    pub fn label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.move_name,
        }
    }

    /// Whether this line can still take part in a reconciliation
    pub fn is_open(&self) -> bool {
        self.account.reconcile && !self.reconciled
    }
}

/// Company-level outstanding (suspense) accounts used by payments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingAccounts {
    /// Outstanding receipts account, used by inbound payments
    pub receipt_account_id: Option<String>,
    /// Outstanding payments account, used by outbound payments
    pub payment_account_id: Option<String>,
}

impl OutstandingAccounts {
    /// Outstanding account id relevant to a payment direction
    pub fn for_direction(&self, direction: PaymentDirection) -> Option<&str> {
        match direction {
            PaymentDirection::Inbound => self.receipt_account_id.as_deref(),
            PaymentDirection::Outbound => self.payment_account_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub outstanding: OutstandingAccounts,
}

/// What the host ledger reports after a reconcile call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Partial reconcile records created by the call
    pub partial_reconcile_ids: Vec<String>,
    /// Full reconcile record, when every line became fully matched
    pub full_reconcile_id: Option<String>,
}

/// Errors that can occur in the reconciliation workflow
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),
    #[error("Payment has no journal entry: {0}")]
    MissingJournalEntry(String),
    #[error("You can only reconcile posted payments: {0}")]
    PaymentNotPosted(String),
    #[error("No reconcilable account found in payment: {0}")]
    NoReconcileAccount(String),
    #[error("No unreconciled payment lines found in reconcile account {0}")]
    NoOpenPaymentLines(String),
    #[error("Please select at least one line to reconcile")]
    EmptySelection,
    #[error("No valid selected lines from the same account")]
    NoValidSelection,
    #[error("Line is not available for reconciliation: {0}")]
    LineNotAvailable(String),
    #[error("Some selected lines are not from the reconcile account ({0})")]
    AccountMismatch(String),
    #[error("Lines from different accounts detected: {0:?}")]
    MixedAccounts(Vec<String>),
    #[error("Line is already reconciled: {0}")]
    AlreadyReconciled(String),
    #[error("Line belongs to another partner: {0}")]
    PartnerMismatch(String),
    #[error(
        "Reconciliation is not balanced. Total balance: {}",
        .total.with_scale_round(2, bigdecimal::RoundingMode::HalfEven)
    )]
    Unbalanced { total: BigDecimal },
    #[error("No matching entries found for automatic reconciliation")]
    NoMatchFound,
    #[error("Reconciliation failed: {0}")]
    ReconcileFailed(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: Option<&str>, debit: i64, credit: i64) -> MoveLine {
        MoveLine {
            id: "l1".to_string(),
            move_id: "m1".to_string(),
            move_name: "INV/2024/0001".to_string(),
            move_ref: None,
            name: name.map(str::to_string),
            account: Account::new("rcv", "Receivable", AccountKind::Receivable, true),
            partner_id: Some("p1".to_string()),
            debit: BigDecimal::from(debit),
            credit: BigDecimal::from(credit),
            amount_currency: BigDecimal::from(debit - credit),
            currency: None,
            date: None,
            reconciled: false,
            amount_residual: BigDecimal::from(debit - credit),
        }
    }

    #[test]
    fn test_balance_is_debit_minus_credit() {
        assert_eq!(line(None, 0, 250).balance(), BigDecimal::from(-250));
        assert_eq!(line(None, 400, 0).balance(), BigDecimal::from(400));
    }

    #[test]
    fn test_label_falls_back_to_move_name() {
        assert_eq!(line(Some("Consulting"), 1, 0).label(), "Consulting");
        assert_eq!(line(Some(""), 1, 0).label(), "INV/2024/0001");
        assert_eq!(line(None, 1, 0).label(), "INV/2024/0001");
    }

    #[test]
    fn test_direction_maps_to_partner_account_and_outstanding() {
        let outstanding = OutstandingAccounts {
            receipt_account_id: Some("out_rcpt".to_string()),
            payment_account_id: None,
        };

        assert_eq!(
            PaymentDirection::Inbound.partner_account_kind(),
            AccountKind::Receivable
        );
        assert_eq!(
            PaymentDirection::Outbound.partner_account_kind(),
            AccountKind::Payable
        );
        assert_eq!(
            outstanding.for_direction(PaymentDirection::Inbound),
            Some("out_rcpt")
        );
        assert_eq!(outstanding.for_direction(PaymentDirection::Outbound), None);
    }

    #[test]
    fn test_unbalanced_error_rounds_to_two_places() {
        let err = ReconcileError::Unbalanced {
            total: "12.3456".parse().unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Reconciliation is not balanced. Total balance: 12.35"
        );
    }

    #[test]
    fn test_payment_references_are_optional_in_json() {
        let payment = Payment {
            id: "pay1".to_string(),
            name: "PBNK1/2024/0001".to_string(),
            amount: BigDecimal::from(500),
            currency: Currency::new("INR", "₹"),
            partner: Some(Partner::new("p1", "Globex")),
            direction: PaymentDirection::Inbound,
            state: PaymentState::Posted,
            date: None,
            move_id: Some("m_pay1".to_string()),
            company_id: "c1".to_string(),
            bank_reference: Some("UTR0001".to_string()),
            cheque_reference: Some("000123".to_string()),
            effective_date: NaiveDate::from_ymd_opt(2024, 5, 1),
        };

        let mut value = serde_json::to_value(&payment).unwrap();
        let restored: Payment = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(restored, payment);

        let fields = value.as_object_mut().unwrap();
        fields.remove("bank_reference");
        fields.remove("cheque_reference");
        fields.remove("effective_date");
        let bare: Payment = serde_json::from_value(value).unwrap();
        assert_eq!(bare.bank_reference, None);
        assert_eq!(bare.cheque_reference, None);
        assert_eq!(bare.effective_date, None);
    }
}
