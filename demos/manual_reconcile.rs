//! Manual reconciliation example: pick invoices for a customer payment

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use payment_reconcile::utils::MemoryLedger;
use payment_reconcile::{
    Account, AccountKind, Company, Currency, MoveLine, Notice, OutstandingAccounts, Partner,
    Payment, PaymentDirection, PaymentState, ReconcileSession, ReconciliationEngine,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🧾 Payment Reconcile - Manual Matching Example\n");

    let ledger = MemoryLedger::new();
    let receivable = Account::new("121000", "Account Receivable", AccountKind::Receivable, true);
    let bank = Account::new("101401", "Bank", AccountKind::Liquidity, false);
    let customer = Some("globex".to_string());

    ledger.add_company(Company {
        id: "acme".to_string(),
        name: "Acme Traders".to_string(),
        outstanding: OutstandingAccounts::default(),
    })?;
    ledger.add_payment(Payment {
        id: "pay1".to_string(),
        name: "PBNK1/2024/0001".to_string(),
        amount: BigDecimal::from(15000),
        currency: Currency::new("INR", "₹"),
        partner: Some(Partner::new("globex", "Globex Corporation")),
        direction: PaymentDirection::Inbound,
        state: PaymentState::Posted,
        date: NaiveDate::from_ymd_opt(2024, 4, 10),
        move_id: Some("m_pay1".to_string()),
        company_id: "acme".to_string(),
        bank_reference: None,
        cheque_reference: None,
        effective_date: None,
    })?;

    // Payment entry: bank debit / receivable credit
    ledger.add_line(MoveLine::new(
        "pay1_bank",
        "m_pay1",
        "PBNK1/2024/0001",
        bank,
        customer.clone(),
        BigDecimal::from(15000),
    ))?;
    ledger.add_line(MoveLine::new(
        "pay1_rcv",
        "m_pay1",
        "PBNK1/2024/0001",
        receivable.clone(),
        customer.clone(),
        BigDecimal::from(-15000),
    ))?;

    // Open customer invoices
    for (id, amount) in [("inv1", 10000), ("inv2", 5000), ("inv3", 2500)] {
        ledger.add_line(
            MoveLine::new(
                id,
                format!("m_{id}"),
                format!("INV/2024/{id}"),
                receivable.clone(),
                customer.clone(),
                BigDecimal::from(amount),
            )
            .with_ref(format!("PO-{id}")),
        )?;
    }

    let engine = ReconciliationEngine::new(ledger.clone());

    // 1. What the matching screen shows
    let data = engine.get_reconcile_data("pay1").await?;
    println!(
        "💰 Payment {} of {}{} on {}",
        data.payment.name,
        data.payment.currency_symbol,
        data.payment.amount,
        data.payment.reconcile_account_name
    );
    for line in &data.reconcilable_lines {
        println!("  • {} ({}) balance {}", line.name, line.id, line.balance);
    }
    println!();

    // 2. Pick lines interactively
    let mut session = ReconcileSession::open(&engine, "pay1").await?;
    session.select("inv1")?;
    session.select("inv3")?;
    println!(
        "  Remaining after inv1 + inv3: {} (can reconcile: {})",
        session.remaining_balance(),
        session.can_reconcile()
    );

    if let Err(e) = session.reconcile_selected().await {
        let notice = Notice::from(&e);
        println!("  ⚠️  {}: {}", notice.title, notice.message);
    }

    session.deselect("inv3");
    session.select("inv2")?;
    println!("  Remaining after inv1 + inv2: {}", session.remaining_balance());

    let notice = session.reconcile_selected().await?;
    println!("  ✓ {}", notice.message);

    let left = ledger.line("inv3")?.map(|l| l.reconciled).unwrap_or_default();
    println!("\n  inv3 still open: {}", !left);

    Ok(())
}
