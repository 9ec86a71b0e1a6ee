//! Automatic reconciliation example: settle several vendor bills with one payment

use bigdecimal::BigDecimal;
use payment_reconcile::utils::MemoryLedger;
use payment_reconcile::{
    Account, AccountKind, Company, Currency, MoveLine, OutstandingAccounts, Partner, Payment,
    PaymentDirection, PaymentState, ReconcileConfig, ReconciliationEngine,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🧾 Payment Reconcile - Automatic Matching Example\n");

    let ledger = MemoryLedger::new();
    let outstanding = Account::new("101403", "Outstanding Payments", AccountKind::Other, true);
    let bank = Account::new("101401", "Bank", AccountKind::Liquidity, false);
    let vendor = Some("initech".to_string());

    ledger.add_company(Company {
        id: "acme".to_string(),
        name: "Acme Traders".to_string(),
        outstanding: OutstandingAccounts {
            receipt_account_id: Some("101402".to_string()),
            payment_account_id: Some("101403".to_string()),
        },
    })?;
    ledger.add_payment(Payment {
        id: "pay2".to_string(),
        name: "PBNK1/2024/0002".to_string(),
        amount: BigDecimal::from(4200),
        currency: Currency::new("INR", "₹"),
        partner: Some(Partner::new("initech", "Initech")),
        direction: PaymentDirection::Outbound,
        state: PaymentState::Posted,
        date: None,
        move_id: Some("m_pay2".to_string()),
        company_id: "acme".to_string(),
        bank_reference: None,
        cheque_reference: None,
        effective_date: None,
    })?;

    ledger.add_line(MoveLine::new(
        "pay2_out",
        "m_pay2",
        "PBNK1/2024/0002",
        outstanding.clone(),
        vendor.clone(),
        BigDecimal::from(4200),
    ))?;
    ledger.add_line(MoveLine::new(
        "pay2_bank",
        "m_pay2",
        "PBNK1/2024/0002",
        bank,
        vendor.clone(),
        BigDecimal::from(-4200),
    ))?;

    // Statement lines waiting on the outstanding payments account
    for (id, amount) in [("st1", -1500), ("st2", -900), ("st3", -2000), ("st4", -700)] {
        ledger.add_line(MoveLine::new(
            id,
            format!("m_{id}"),
            format!("BNK1/2024/{id}"),
            outstanding.clone(),
            vendor.clone(),
            BigDecimal::from(amount),
        ))?;
    }

    let config = ReconcileConfig::from_json(r#"{"max_combination_size": 3}"#)?;
    let engine = ReconciliationEngine::with_config(ledger.clone(), config)?;

    let data = engine.get_reconcile_data("pay2").await?;
    println!(
        "📊 {} candidate lines for {} on {}",
        data.reconcilable_lines.len(),
        data.payment.name,
        data.payment.reconcile_account_name
    );

    let outcome = engine.auto_reconcile("pay2").await?;
    println!("  ✓ {}", outcome.message);
    println!("  Matched lines: {}", outcome.matched_line_ids.join(", "));
    println!(
        "  Partial records: {}, full reconcile: {}",
        outcome.outcome.partial_reconcile_ids.len(),
        outcome.outcome.full_reconcile_id.is_some()
    );

    Ok(())
}
