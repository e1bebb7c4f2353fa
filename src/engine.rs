//! Engine facade orchestrating the chart, journal, subledger, and
//! review subsystems over one storage backend

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::chart::ChartRegistry;
use crate::journal::{JournalPoster, LedgerAggregator, TrialBalanceEngine};
use crate::review::ReviewQueue;
use crate::subledger::SubledgerTracker;
use crate::traits::LedgerStorage;
use crate::types::*;

/// Main ledger engine. Every operation takes the acting `client_id`
/// explicitly; nothing is tenant-ambient.
pub struct Ledger<S: LedgerStorage + Clone> {
    chart: ChartRegistry<S>,
    poster: JournalPoster<S>,
    aggregator: LedgerAggregator<S>,
    trial_balance: TrialBalanceEngine<S>,
    subledger: SubledgerTracker<S>,
    review: ReviewQueue<S>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new engine over the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            chart: ChartRegistry::new(storage.clone()),
            poster: JournalPoster::new(storage.clone()),
            aggregator: LedgerAggregator::new(storage.clone()),
            trial_balance: TrialBalanceEngine::new(storage.clone()),
            subledger: SubledgerTracker::new(storage.clone()),
            review: ReviewQueue::new(storage),
        }
    }

    // Chart of accounts

    /// Add an account to a client's chart
    pub async fn add_account(
        &mut self,
        client_id: ClientId,
        number: String,
        name: String,
        account_type: AccountType,
    ) -> LedgerResult<Account> {
        self.chart
            .add_account(client_id, number, name, account_type)
            .await
    }

    /// Resolve an account number within a client's chart
    pub async fn resolve_account(
        &self,
        client_id: ClientId,
        number: &str,
    ) -> LedgerResult<Account> {
        self.chart.resolve(client_id, number).await
    }

    /// List a client's chart of accounts
    pub async fn list_accounts(&self, client_id: ClientId) -> LedgerResult<Vec<Account>> {
        self.chart.list(client_id).await
    }

    /// Seed a standard Norwegian small-business chart
    pub async fn setup_standard_chart(
        &mut self,
        client_id: ClientId,
    ) -> LedgerResult<HashMap<String, Account>> {
        self.chart.standard_chart(client_id).await
    }

    // Journal

    /// Validate and commit a voucher
    pub async fn post(
        &mut self,
        client_id: ClientId,
        draft: VoucherDraft,
    ) -> LedgerResult<JournalEntry> {
        self.poster.post(client_id, draft).await
    }

    /// Fetch a committed voucher by id
    pub async fn get_entry(
        &self,
        client_id: ClientId,
        entry_id: Uuid,
    ) -> LedgerResult<JournalEntry> {
        self.poster.get_entry(client_id, entry_id).await
    }

    /// General ledger for one account, with running balance
    pub async fn general_ledger(
        &self,
        client_id: ClientId,
        account_number: &str,
        period: Option<(NaiveDate, NaiveDate)>,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<LedgerRow>> {
        self.aggregator
            .general_ledger(client_id, account_number, period, limit)
            .await
    }

    /// Net balance of one account as of a date
    pub async fn account_balance(
        &self,
        client_id: ClientId,
        account_number: &str,
        as_of_date: Option<NaiveDate>,
    ) -> LedgerResult<bigdecimal::BigDecimal> {
        self.aggregator
            .account_balance(client_id, account_number, as_of_date)
            .await
    }

    /// Trial balance over every posted account
    pub async fn trial_balance(
        &self,
        client_id: ClientId,
        as_of_date: NaiveDate,
        period_start: Option<NaiveDate>,
    ) -> LedgerResult<TrialBalance> {
        self.trial_balance
            .trial_balance(client_id, as_of_date, period_start)
            .await
    }

    // Subledger (reskontro)

    /// Register a new open item
    pub async fn register_subledger_entry(
        &mut self,
        client_id: ClientId,
        entry: NewSubledgerEntry,
    ) -> LedgerResult<SubledgerEntry> {
        self.subledger.register(client_id, entry).await
    }

    /// Get one subledger entry
    pub async fn subledger_entry(
        &self,
        client_id: ClientId,
        id: Uuid,
    ) -> LedgerResult<SubledgerEntry> {
        self.subledger.get(client_id, id).await
    }

    /// List subledger entries, optionally filtered by status
    pub async fn subledger_entries(
        &self,
        client_id: ClientId,
        status: Option<SubledgerStatus>,
    ) -> LedgerResult<Vec<SubledgerEntry>> {
        self.subledger.open_entries(client_id, status).await
    }

    /// Aging report over non-paid subledger entries
    pub async fn aging(
        &self,
        client_id: ClientId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<AgingReport> {
        self.subledger.aging(client_id, as_of_date).await
    }

    // Review queue

    /// Queue an ingested document for review
    pub async fn submit_for_review(
        &mut self,
        client_id: ClientId,
        document: IncomingDocument,
    ) -> LedgerResult<ReviewItem> {
        self.review.submit(client_id, document).await
    }

    /// Items awaiting a decision
    pub async fn pending_review(&self, client_id: ClientId) -> LedgerResult<Vec<ReviewItem>> {
        self.review.pending(client_id).await
    }

    /// Resolve a pending review item
    pub async fn resolve_review(
        &mut self,
        client_id: ClientId,
        item_id: Uuid,
        action: ReviewAction,
    ) -> LedgerResult<ReviewOutcome> {
        self.review.resolve(client_id, item_id, action).await
    }

    /// Validate the integrity of a client's ledger: the trial balance
    /// must balance and the aging buckets must partition the open
    /// subledger amounts. Faults from either check are collected, not
    /// propagated, so one broken report does not hide the other.
    pub async fn validate_integrity(
        &self,
        client_id: ClientId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<LedgerIntegrityReport> {
        let mut issues = Vec::new();

        match self.trial_balance(client_id, as_of_date, None).await {
            Ok(_) => {}
            Err(LedgerError::ConsistencyFault(msg)) => issues.push(msg),
            Err(other) => return Err(other),
        }

        match self.aging(client_id, as_of_date).await {
            Ok(_) => {}
            Err(LedgerError::ConsistencyFault(msg)) => issues.push(msg),
            Err(other) => return Err(other),
        }

        Ok(LedgerIntegrityReport {
            client_id,
            as_of_date,
            is_valid: issues.is_empty(),
            issues,
        })
    }
}

/// Report on ledger integrity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub client_id: ClientId,
    pub as_of_date: NaiveDate,
    pub is_valid: bool,
    pub issues: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::VoucherBuilder;
    use crate::utils::memory_storage::MemoryStorage;
    use bigdecimal::BigDecimal;

    #[tokio::test]
    async fn engine_posts_and_reports() {
        let storage = MemoryStorage::new();
        let mut ledger = Ledger::new(storage);
        let client = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        ledger.setup_standard_chart(client).await.unwrap();

        let draft = VoucherBuilder::new(date, "B", "Kapitalinnskudd")
            .debit("1920", BigDecimal::from(100_000))
            .credit("2050", BigDecimal::from(100_000))
            .build()
            .unwrap();
        ledger.post(client, draft).await.unwrap();

        let balance = ledger.account_balance(client, "1920", None).await.unwrap();
        assert_eq!(balance, BigDecimal::from(100_000));

        let tb = ledger.trial_balance(client, date, None).await.unwrap();
        assert!(tb.is_balanced);
        assert_eq!(tb.total_debit, BigDecimal::from(100_000));

        let report = ledger.validate_integrity(client, date).await.unwrap();
        assert!(report.is_valid);
    }
}
