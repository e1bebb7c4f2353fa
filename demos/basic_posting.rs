//! Basic posting example: chart setup, vouchers, reskontro and reports

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use regnskap_core::utils::MemoryStorage;
use regnskap_core::{
    patterns, CounterpartyKind, Ledger, NewSubledgerEntry, VatCode, VoucherBuilder,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Regnskap Core - Basic Posting Example\n");

    // Create a new ledger with in-memory storage
    let storage = MemoryStorage::new();
    let mut ledger = Ledger::new(storage);
    let client = Uuid::new_v4();

    // 1. Seed the standard Norwegian small-business chart
    println!("📊 Setting up Chart of Accounts...");
    let accounts = ledger.setup_standard_chart(client).await?;

    let mut sorted: Vec<_> = accounts.values().collect();
    sorted.sort_by(|a, b| a.number.cmp(&b.number));
    for account in sorted {
        println!(
            "  ✓ Created account: {} - {} ({:?})",
            account.number, account.name, account.account_type
        );
    }
    println!();

    // 2. Post some vouchers
    println!("💰 Posting Vouchers...\n");

    // Owner puts capital into the bank account
    let capital = VoucherBuilder::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        "M",
        "Innskutt egenkapital",
    )
    .debit("1920", BigDecimal::from(100_000))
    .credit("2050", BigDecimal::from(100_000))
    .build()?;

    let posted = ledger.post(client, capital).await?;
    println!(
        "  ✓ Posted voucher {}-{}: Capital injection of 100 000 kr",
        posted.voucher_series, posted.voucher_number
    );

    // Supplier invoice for goods, 25% input VAT
    let purchase = patterns::supplier_invoice(
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        "K",
        "Varekjøp fra Grossist AS",
        "4000",
        "2710",
        "2400",
        BigDecimal::from(8_000),
        VatCode::Standard25,
    )?;

    let posted = ledger.post(client, purchase).await?;
    println!(
        "  ✓ Posted voucher {}-{}: Goods purchase of 8 000 kr net",
        posted.voucher_series, posted.voucher_number
    );

    // Sales invoice, tracked as an open customer item
    let sale = patterns::sales_invoice(
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        "F",
        "Faktura 1001 til Kunde AS",
        "1500",
        "3000",
        "2700",
        BigDecimal::from(20_000),
        VatCode::Standard25,
    )?;

    let posted = ledger.post(client, sale).await?;
    println!(
        "  ✓ Posted voucher {}-{}: Sales invoice of 20 000 kr net",
        posted.voucher_series, posted.voucher_number
    );

    let open_item = ledger
        .register_subledger_entry(
            client,
            NewSubledgerEntry {
                kind: CounterpartyKind::Customer,
                counterparty_name: "Kunde AS".to_string(),
                counterparty_id: "C-001".to_string(),
                invoice_number: "1001".to_string(),
                invoice_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2024, 2, 9).unwrap(),
                amount: "25000.00".parse::<BigDecimal>()?,
                currency: "NOK".to_string(),
                kid_number: Some("123456789012".to_string()),
            },
        )
        .await?;
    println!("  ✓ Registered open customer item for invoice 1001");

    // Partial payment settles part of the open item
    let payment = patterns::customer_payment(
        NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
        "B",
        "Delbetaling faktura 1001",
        "1920",
        "1500",
        BigDecimal::from(10_000),
        open_item.id,
    )?;

    ledger.post(client, payment).await?;
    let open_item = ledger.subledger_entry(client, open_item.id).await?;
    println!(
        "  ✓ Payment of 10 000 kr applied; invoice 1001 is {:?} with {} kr remaining\n",
        open_item.status, open_item.remaining_amount
    );

    // 3. Reports
    println!("📈 Generating Reports...\n");

    println!("📒 General Ledger, account 1920 (Bankinnskudd):");
    let rows = ledger.general_ledger(client, "1920", None, None).await?;
    for row in &rows {
        println!(
            "  {} {}-{} {:<28} D {:>10} C {:>10} = {}",
            row.accounting_date,
            row.voucher_series,
            row.voucher_number,
            row.description,
            row.debit,
            row.credit,
            row.running_balance
        );
    }
    println!();

    let as_of = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let trial_balance = ledger.trial_balance(client, as_of, None).await?;
    println!("🔍 Trial Balance as of January 31, 2024:");
    for row in &trial_balance.rows {
        println!(
            "  {} {:<32} {}",
            row.account.number, row.account.name, row.closing_balance
        );
    }
    println!("  Total Debits:  {} kr", trial_balance.total_debit);
    println!("  Total Credits: {} kr", trial_balance.total_credit);
    println!(
        "  Balanced: {}",
        if trial_balance.is_balanced {
            "✅ Yes"
        } else {
            "❌ No"
        }
    );
    println!();

    let aging = ledger.aging(client, as_of).await?;
    println!("⏳ Aging Report as of January 31, 2024:");
    println!("  Not yet due: {} kr", aging.not_due.total);
    println!("  0-30 days:   {} kr", aging.days_0_30.total);
    println!("  31-60 days:  {} kr", aging.days_31_60.total);
    println!("  61-90 days:  {} kr", aging.days_61_90.total);
    println!("  Over 90:     {} kr", aging.days_over_90.total);
    println!("  Total open:  {} kr", aging.total_remaining);

    // 4. Validate ledger integrity
    println!("\n🔍 Validating Ledger Integrity...");
    let report = ledger.validate_integrity(client, as_of).await?;
    if report.is_valid {
        println!("  ✅ Ledger integrity check passed!");
    } else {
        println!("  ❌ Ledger integrity check failed:");
        for issue in &report.issues {
            println!("    - {}", issue);
        }
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
