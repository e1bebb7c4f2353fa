//! Core types and data structures for the ledger engine

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::tax::VatCode;

/// Tenant identifier. Every read and write path takes one explicitly;
/// there is no ambient "current client" anywhere in the crate.
pub type ClientId = Uuid;

/// Scale (decimal places) at which all monetary comparisons happen.
pub const MINOR_UNIT_SCALE: i64 = 2;

/// Normalize an amount to minor-unit precision (e.g. øre/cents).
///
/// Balance checks compare sums at this scale with zero tolerance.
pub fn minor_units(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(MINOR_UNIT_SCALE, RoundingMode::HalfUp)
}

/// The two sides of a double-entry posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Debit,
    Credit,
}

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what the business owns (bank, receivables, inventory)
    Asset,
    /// Liabilities - what the business owes (payables, VAT due, loans)
    Liability,
    /// Equity - owner's interest in the business
    Equity,
    /// Revenue - money earned by the business
    Revenue,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type.
    /// Assets and Expenses normally carry debit balances;
    /// Liabilities, Equity, and Revenue carry credit balances.
    pub fn normal_balance(&self) -> Side {
        match self {
            AccountType::Asset | AccountType::Expense => Side::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => Side::Credit,
        }
    }
}

/// An account in a client's chart of accounts.
///
/// Immutable once referenced by a posting; chart management beyond
/// creation is handled by an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Owning tenant
    pub client_id: ClientId,
    /// Account code within the chart (e.g. "1920", "2400", "3000")
    pub number: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// When the account was created
    pub created_at: NaiveDateTime,
}

impl Account {
    /// Create a new account
    pub fn new(
        client_id: ClientId,
        number: String,
        name: String,
        account_type: AccountType,
    ) -> Self {
        Self {
            client_id,
            number,
            name,
            account_type,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Origin of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Manual,
    Ai,
    Import,
}

/// One debit/credit line within a journal entry.
///
/// Exactly one of `debit`/`credit` is non-zero for the principal
/// amount; `vat_amount` rides alongside for VAT-bearing lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Account code the line posts to
    pub account_number: String,
    /// Debit amount, non-negative
    pub debit: BigDecimal,
    /// Credit amount, non-negative
    pub credit: BigDecimal,
    /// VAT treatment of this line, if any
    pub vat_code: Option<VatCode>,
    /// Declared VAT amount for the line
    pub vat_amount: BigDecimal,
    /// Optional description for this specific line
    pub description: Option<String>,
    /// Subledger entry this line pays down, if it settles an open item
    pub settles: Option<Uuid>,
}

impl JournalLine {
    /// Create a debit line
    pub fn debit(account_number: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            account_number: account_number.into(),
            debit: amount,
            credit: BigDecimal::from(0),
            vat_code: None,
            vat_amount: BigDecimal::from(0),
            description: None,
            settles: None,
        }
    }

    /// Create a credit line
    pub fn credit(account_number: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            account_number: account_number.into(),
            debit: BigDecimal::from(0),
            credit: amount,
            vat_code: None,
            vat_amount: BigDecimal::from(0),
            description: None,
            settles: None,
        }
    }

    /// Attach a VAT code and declared VAT amount
    pub fn with_vat(mut self, code: VatCode, vat_amount: BigDecimal) -> Self {
        self.vat_code = Some(code);
        self.vat_amount = vat_amount;
        self
    }

    /// Attach a line description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this line as settling a subledger entry
    pub fn settling(mut self, subledger_id: Uuid) -> Self {
        self.settles = Some(subledger_id);
        self
    }

    /// The principal amount of the line, whichever side it sits on
    pub fn principal(&self) -> &BigDecimal {
        if self.debit > BigDecimal::from(0) {
            &self.debit
        } else {
            &self.credit
        }
    }

    /// The side the principal amount sits on
    pub fn side(&self) -> Side {
        if self.debit > BigDecimal::from(0) {
            Side::Debit
        } else {
            Side::Credit
        }
    }
}

/// A committed voucher: one atomic, balanced accounting transaction.
///
/// Immutable after creation. Corrections are new entries flagged
/// `adjustment`, never in-place edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier for the entry
    pub id: Uuid,
    /// Owning tenant
    pub client_id: ClientId,
    /// Date the transaction belongs to, for reporting
    pub accounting_date: NaiveDate,
    /// Voucher series the number was drawn from (e.g. "B" for bank)
    pub voucher_series: String,
    /// Number within the series, unique per (client, series)
    pub voucher_number: u32,
    /// Description of the transaction
    pub description: String,
    /// How the entry entered the system
    pub source_type: SourceType,
    /// True for reversing/adjusting entries
    pub adjustment: bool,
    /// Ordered, non-empty line collection
    pub lines: Vec<JournalLine>,
    /// When the entry was committed
    pub created_at: NaiveDateTime,
    /// Storage-assigned global creation order, the deterministic
    /// tiebreak for same-date ledger ordering
    pub sequence: u64,
}

impl JournalEntry {
    /// Sum of all debit amounts at minor-unit precision
    pub fn total_debits(&self) -> BigDecimal {
        minor_units(&self.lines.iter().map(|l| &l.debit).sum())
    }

    /// Sum of all credit amounts at minor-unit precision
    pub fn total_credits(&self) -> BigDecimal {
        minor_units(&self.lines.iter().map(|l| &l.credit).sum())
    }

    /// Check the fundamental invariant: debits equal credits exactly
    pub fn is_balanced(&self) -> bool {
        self.total_debits() == self.total_credits()
    }
}

/// What a caller hands the poster: a voucher before numbering and commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherDraft {
    pub accounting_date: NaiveDate,
    pub voucher_series: String,
    pub description: String,
    pub source_type: SourceType,
    pub adjustment: bool,
    pub lines: Vec<JournalLine>,
}

/// One row of a general ledger (hovedbok) view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub entry_id: Uuid,
    pub accounting_date: NaiveDate,
    pub voucher_series: String,
    pub voucher_number: u32,
    pub description: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    /// Balance after this row, signed by the account's normal side
    pub running_balance: BigDecimal,
}

/// Per-account row of a trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account: Account,
    /// Net balance of postings before the period start
    pub opening_balance: BigDecimal,
    pub period_debit: BigDecimal,
    pub period_credit: BigDecimal,
    pub closing_balance: BigDecimal,
}

/// Trial balance (saldobalanse) - all-accounts balance summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub client_id: ClientId,
    pub as_of_date: NaiveDate,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    /// Always true for a report the engine actually returns; an
    /// unbalanced journal halts the report with a consistency fault.
    pub is_balanced: bool,
}

/// Customer or vendor side of the reskontro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterpartyKind {
    Customer,
    Vendor,
}

/// Payment state of an open item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubledgerStatus {
    Open,
    PartiallyPaid,
    Paid,
}

/// An open item in the customer/vendor subledger (reskontro).
///
/// `remaining_amount` only moves through journal entries that settle
/// the item; the tracker never decides payment state on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubledgerEntry {
    pub id: Uuid,
    pub client_id: ClientId,
    pub kind: CounterpartyKind,
    pub counterparty_name: String,
    pub counterparty_id: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Original invoice amount
    pub amount: BigDecimal,
    /// What is still unpaid; decreases monotonically under payments
    pub remaining_amount: BigDecimal,
    /// ISO 4217 code; carried, never converted
    pub currency: String,
    pub status: SubledgerStatus,
    /// Norwegian KID payment reference, when present
    pub kid_number: Option<String>,
    pub created_at: NaiveDateTime,
}

impl SubledgerEntry {
    /// Days past due at the evaluation date; zero when not yet due.
    /// Derived on demand, never stored.
    pub fn days_overdue(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.due_date).num_days().max(0)
    }
}

/// Fields needed to register a new open item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubledgerEntry {
    pub kind: CounterpartyKind,
    pub counterparty_name: String,
    pub counterparty_id: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub amount: BigDecimal,
    pub currency: String,
    pub kid_number: Option<String>,
}

/// One aging bucket: total remaining plus the entries inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingBucket {
    pub total: BigDecimal,
    pub entries: Vec<Uuid>,
}

impl AgingBucket {
    pub(crate) fn empty() -> Self {
        Self {
            total: BigDecimal::from(0),
            entries: Vec::new(),
        }
    }
}

/// Aging report over all non-paid subledger entries.
///
/// The five buckets partition the remaining amounts exactly:
/// every non-paid entry lands in one bucket and the bucket totals
/// sum to `total_remaining`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingReport {
    pub client_id: ClientId,
    pub as_of_date: NaiveDate,
    pub not_due: AgingBucket,
    pub days_0_30: AgingBucket,
    pub days_31_60: AgingBucket,
    pub days_61_90: AgingBucket,
    pub days_over_90: AgingBucket,
    pub total_remaining: BigDecimal,
}

impl AgingReport {
    /// Sum of the five bucket totals
    pub fn bucket_total(&self) -> BigDecimal {
        &self.not_due.total
            + &self.days_0_30.total
            + &self.days_31_60.total
            + &self.days_61_90.total
            + &self.days_over_90.total
    }
}

/// Kind of ingested document awaiting review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Invoice,
    Receipt,
}

/// Review item lifecycle. Resolved states are terminal; an item
/// never re-enters Pending except through posting-failure rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Corrected,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewPriority {
    Low,
    Normal,
    High,
}

/// An AI-suggested posting awaiting human confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub id: Uuid,
    pub client_id: ClientId,
    pub kind: DocumentKind,
    pub status: ReviewStatus,
    pub priority: ReviewPriority,
    /// 0-100; base from ingestion plus any pattern boost
    pub confidence: u8,
    pub supplier: String,
    /// Document description as extracted (e.g. "Frakt januar")
    pub description: String,
    pub amount: BigDecimal,
    pub document_date: NaiveDate,
    /// The posting the AI proposes
    pub suggested_lines: Vec<JournalLine>,
    /// Patterns that matched this item at intake
    pub suggested_patterns: Vec<Uuid>,
    /// Open extension map for fields outside the known invoice/receipt
    /// shape, validated string-only at the ingestion boundary
    pub extensions: HashMap<String, String>,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

/// What the ingestion collaborator delivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingDocument {
    pub kind: DocumentKind,
    pub supplier: String,
    pub description: String,
    pub amount: BigDecimal,
    pub document_date: NaiveDate,
    pub suggested_lines: Vec<JournalLine>,
    /// Confidence assessed by the extraction model, 0-100
    pub base_confidence: u8,
    pub priority: ReviewPriority,
    pub extensions: HashMap<String, String>,
}

/// Human decision on a review item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "action")]
pub enum ReviewAction {
    Approve,
    Correct { lines: Vec<JournalLine> },
    Reject,
}

/// Result of resolving a review item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub item: ReviewItem,
    /// The committed voucher, for approve/correct resolutions
    pub posted: Option<JournalEntry>,
}

/// A learned posting pattern: maps a correction's shape to a
/// preferred account, with usage-based confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: Uuid,
    pub client_id: ClientId,
    /// Human-readable summary of what the pattern encodes
    pub description: String,
    /// Normalized supplier name the pattern matches on
    pub supplier_key: String,
    /// Leading description tokens the pattern matches on
    pub token_key: String,
    /// Expense/revenue account the corrections converged on
    pub target_account: String,
    /// Times the pattern matched an incoming item and was reused
    pub match_count: u32,
    pub accepted_count: u32,
    pub corrected_count: u32,
    /// Recomputed from accept/correct history, never set by hand
    pub confidence: u8,
    pub last_used: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

/// Errors that can occur in the ledger engine
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Entry is not balanced: debits = {debits}, credits = {credits}")]
    Unbalanced {
        debits: BigDecimal,
        credits: BigDecimal,
    },
    #[error("Account {number} not found for client {client_id}")]
    AccountNotFound { client_id: ClientId, number: String },
    #[error("Journal entry not found: {0}")]
    EntryNotFound(Uuid),
    #[error("Subledger entry not found: {0}")]
    SubledgerEntryNotFound(Uuid),
    #[error("Review item not found: {0}")]
    ReviewItemNotFound(Uuid),
    #[error("Client {client_id} may not access {resource} {id}")]
    Forbidden {
        client_id: ClientId,
        resource: &'static str,
        id: Uuid,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Consistency fault: {0}")]
    ConsistencyFault(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_rounds_half_up() {
        let v: BigDecimal = "10.005".parse().unwrap();
        assert_eq!(minor_units(&v), "10.01".parse::<BigDecimal>().unwrap());
        let v: BigDecimal = "10.004".parse().unwrap();
        assert_eq!(minor_units(&v), "10.00".parse::<BigDecimal>().unwrap());
    }

    #[test]
    fn normal_balance_sides() {
        assert_eq!(AccountType::Asset.normal_balance(), Side::Debit);
        assert_eq!(AccountType::Expense.normal_balance(), Side::Debit);
        assert_eq!(AccountType::Liability.normal_balance(), Side::Credit);
        assert_eq!(AccountType::Equity.normal_balance(), Side::Credit);
        assert_eq!(AccountType::Revenue.normal_balance(), Side::Credit);
    }

    #[test]
    fn review_action_wire_format_is_tagged() {
        let action = ReviewAction::Correct {
            lines: vec![
                JournalLine::debit("4000", BigDecimal::from(500)),
                JournalLine::credit("2400", BigDecimal::from(500)),
            ],
        };

        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "correct");
        assert_eq!(json["lines"][0]["account_number"], "4000");

        let back: ReviewAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);

        assert_eq!(
            serde_json::to_value(SubledgerStatus::PartiallyPaid).unwrap(),
            serde_json::json!("partially_paid")
        );
    }

    #[test]
    fn days_overdue_is_never_negative() {
        let entry = SubledgerEntry {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            kind: CounterpartyKind::Customer,
            counterparty_name: "Acme AS".to_string(),
            counterparty_id: "C-1".to_string(),
            invoice_number: "1001".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            amount: BigDecimal::from(625),
            remaining_amount: BigDecimal::from(625),
            currency: "NOK".to_string(),
            status: SubledgerStatus::Open,
            kid_number: None,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let before_due = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(entry.days_overdue(before_due), 0);

        let after_due = NaiveDate::from_ymd_opt(2024, 2, 11).unwrap();
        assert_eq!(entry.days_overdue(after_due), 10);
    }
}
