//! Review workflow example: AI-suggested postings, correction and learning

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use regnskap_core::utils::MemoryStorage;
use regnskap_core::{
    DocumentKind, IncomingDocument, JournalLine, Ledger, ReviewAction, ReviewPriority,
};
use uuid::Uuid;

fn freight_invoice(month: &str, day: u32) -> IncomingDocument {
    // Extraction output for a freight invoice: the model guesses the
    // generic freight account 6100 at modest confidence.
    IncomingDocument {
        kind: DocumentKind::Invoice,
        supplier: "Transport Nord AS".to_string(),
        description: format!("Frakt {}", month),
        amount: "625.00".parse().unwrap(),
        document_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        suggested_lines: vec![
            JournalLine::debit("6100", "500.00".parse().unwrap()),
            JournalLine::debit("2710", "125.00".parse().unwrap()),
            JournalLine::credit("2400", "625.00".parse().unwrap()),
        ],
        base_confidence: 55,
        priority: ReviewPriority::Normal,
        extensions: HashMap::new(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🤖 Regnskap Core - Review Workflow Example\n");

    let storage = MemoryStorage::new();
    let mut ledger = Ledger::new(storage);
    let client = Uuid::new_v4();
    ledger.setup_standard_chart(client).await?;

    // 1. First freight invoice arrives from the extraction pipeline
    println!("📥 Submitting first freight invoice for review...");
    let first = ledger
        .submit_for_review(client, freight_invoice("januar", 5))
        .await?;
    println!(
        "  Item {} from {} at confidence {}",
        first.id, first.supplier, first.confidence
    );

    let pending = ledger.pending_review(client).await?;
    println!("  Pending queue holds {} item(s)\n", pending.len());

    // 2. The bookkeeper reroutes the cost to goods purchases (4000)
    println!("✏️  Correcting the suggested posting to account 4000...");
    let corrected_lines = vec![
        JournalLine::debit("4000", "500.00".parse::<BigDecimal>()?),
        JournalLine::debit("2710", "125.00".parse::<BigDecimal>()?),
        JournalLine::credit("2400", "625.00".parse::<BigDecimal>()?),
    ];
    let outcome = ledger
        .resolve_review(client, first.id, ReviewAction::Correct {
            lines: corrected_lines,
        })
        .await?;

    let entry = outcome.posted.expect("correction posts a voucher");
    println!(
        "  ✓ Posted voucher {}-{} with the corrected lines",
        entry.voucher_series, entry.voucher_number
    );
    println!("  ✓ Pattern learned: Transport Nord AS freight goes to 4000\n");

    // 3. The next month's invoice benefits from the learned pattern
    println!("📥 Submitting second freight invoice for review...");
    let second = ledger
        .submit_for_review(client, freight_invoice("februar", 28))
        .await?;
    println!(
        "  Item {} now at confidence {} (pattern matched: {})",
        second.id,
        second.confidence,
        !second.suggested_patterns.is_empty()
    );

    let cost_line = second
        .suggested_lines
        .iter()
        .find(|line| line.debit > BigDecimal::from(0) && line.account_number != "2710")
        .expect("suggestion has a cost line");
    println!("  Suggested cost account: {}\n", cost_line.account_number);

    // 4. This time the suggestion is right, so a plain approve suffices
    println!("👍 Approving the suggestion as-is...");
    let outcome = ledger
        .resolve_review(client, second.id, ReviewAction::Approve)
        .await?;
    let entry = outcome.posted.expect("approval posts a voucher");
    println!(
        "  ✓ Posted voucher {}-{} straight from the suggestion",
        entry.voucher_series, entry.voucher_number
    );

    let pending = ledger.pending_review(client).await?;
    println!("  Pending queue holds {} item(s)", pending.len());

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
