//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for the ledger engine.
///
/// This trait lets the engine work with any backend (PostgreSQL,
/// SQLite, in-memory, ...) by implementing these methods. Every
/// method is tenant-scoped: implementations must never return data
/// owned by a different client. Lookups by id that hit a record owned
/// by another client return `LedgerError::Forbidden`, not `None`.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    // --- Chart of accounts ---

    /// Save an account into a client's chart
    async fn save_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Get an account by number within one client's chart
    async fn get_account(
        &self,
        client_id: ClientId,
        number: &str,
    ) -> LedgerResult<Option<Account>>;

    /// List a client's full chart of accounts, ordered by number
    async fn list_accounts(&self, client_id: ClientId) -> LedgerResult<Vec<Account>>;

    // --- Journal ---

    /// Allocate the next voucher number for a (client, series) pair.
    ///
    /// Allocation is serialized: two concurrent callers must never
    /// receive the same number. Numbers are monotonically increasing
    /// per series and never reused.
    async fn next_voucher_number(&mut self, client_id: ClientId, series: &str)
        -> LedgerResult<u32>;

    /// Commit a journal entry and all its lines as one atomic unit.
    ///
    /// Assigns the storage-global `sequence` and returns the stored
    /// entry. A duplicate `(client, series, voucher_number)` fails
    /// with `LedgerError::Conflict` and writes nothing. A concurrent
    /// reader observes either the whole entry or none of it.
    ///
    /// Lines carrying `settles` references are applied to the
    /// subledger within the same atomic step: capacity is checked and
    /// the remaining amounts updated under the commit's own guard, so
    /// a capacity violation fails the whole commit and concurrent
    /// settlements can never drive a remaining amount negative.
    async fn commit_entry(&mut self, entry: JournalEntry) -> LedgerResult<JournalEntry>;

    /// Get a journal entry by id
    async fn get_entry(
        &self,
        client_id: ClientId,
        entry_id: Uuid,
    ) -> LedgerResult<Option<JournalEntry>>;

    /// All of a client's journal entries within an accounting-date
    /// range, ordered by `(accounting_date, sequence)`
    async fn entries_in_range(
        &self,
        client_id: ClientId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<JournalEntry>>;

    // --- Subledger (reskontro) ---

    /// Save or overwrite a subledger entry
    async fn save_subledger_entry(&mut self, entry: &SubledgerEntry) -> LedgerResult<()>;

    /// Get a subledger entry by id
    async fn get_subledger_entry(
        &self,
        client_id: ClientId,
        id: Uuid,
    ) -> LedgerResult<Option<SubledgerEntry>>;

    /// List a client's subledger entries, optionally filtered by status
    async fn list_subledger_entries(
        &self,
        client_id: ClientId,
        status: Option<SubledgerStatus>,
    ) -> LedgerResult<Vec<SubledgerEntry>>;

    // --- Review queue ---

    /// Save or overwrite a review item
    async fn save_review_item(&mut self, item: &ReviewItem) -> LedgerResult<()>;

    /// Get a review item by id
    async fn get_review_item(
        &self,
        client_id: ClientId,
        id: Uuid,
    ) -> LedgerResult<Option<ReviewItem>>;

    /// List a client's review items, optionally filtered by status
    async fn list_review_items(
        &self,
        client_id: ClientId,
        status: Option<ReviewStatus>,
    ) -> LedgerResult<Vec<ReviewItem>>;

    // --- Patterns ---

    /// Save or overwrite a learned pattern
    async fn save_pattern(&mut self, pattern: &Pattern) -> LedgerResult<()>;

    /// Get a pattern by id
    async fn get_pattern(&self, client_id: ClientId, id: Uuid) -> LedgerResult<Option<Pattern>>;

    /// Find the pattern for a matching key, if one has been learned
    async fn find_pattern(
        &self,
        client_id: ClientId,
        supplier_key: &str,
        token_key: &str,
    ) -> LedgerResult<Option<Pattern>>;

    /// List all of a client's patterns
    async fn list_patterns(&self, client_id: ClientId) -> LedgerResult<Vec<Pattern>>;
}

/// Trait for implementing custom voucher validation rules
pub trait VoucherValidator: Send + Sync {
    /// Validate a draft before numbering and commit
    fn validate_draft(&self, draft: &VoucherDraft) -> LedgerResult<()>;
}

/// Default validator enforcing the double-entry rules
pub struct DefaultVoucherValidator;

impl VoucherValidator for DefaultVoucherValidator {
    fn validate_draft(&self, draft: &VoucherDraft) -> LedgerResult<()> {
        if draft.lines.is_empty() {
            return Err(LedgerError::Validation(
                "Voucher must have at least one line".to_string(),
            ));
        }

        if draft.lines.len() < 2 {
            return Err(LedgerError::Validation(
                "Voucher must have at least two lines for double-entry bookkeeping".to_string(),
            ));
        }

        let zero = BigDecimal::from(0);
        for line in &draft.lines {
            if line.debit < zero || line.credit < zero {
                return Err(LedgerError::Validation(format!(
                    "Line on account {} has a negative amount",
                    line.account_number
                )));
            }
            let has_debit = line.debit > zero;
            let has_credit = line.credit > zero;
            if has_debit == has_credit {
                return Err(LedgerError::Validation(format!(
                    "Line on account {} must carry its principal amount on exactly one side",
                    line.account_number
                )));
            }
        }

        let debits = minor_units(&draft.lines.iter().map(|l| &l.debit).sum());
        let credits = minor_units(&draft.lines.iter().map(|l| &l.credit).sum());
        if debits != credits {
            return Err(LedgerError::Unbalanced { debits, credits });
        }

        Ok(())
    }
}
