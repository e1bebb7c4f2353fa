//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::subledger;
use crate::traits::*;
use crate::types::*;

/// Journal state kept under a single lock so that voucher-number
/// uniqueness, sequence assignment, and the entry insert are one
/// atomic step. A concurrent reader sees the whole entry or none of it.
#[derive(Debug, Default)]
struct JournalState {
    entries: HashMap<Uuid, JournalEntry>,
    voucher_counters: HashMap<(ClientId, String), u32>,
    next_sequence: u64,
}

/// In-memory storage for tests and development.
///
/// Cloning is cheap and clones share the underlying maps, so the
/// engine's managers all see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    accounts: Arc<RwLock<HashMap<(ClientId, String), Account>>>,
    journal: Arc<RwLock<JournalState>>,
    subledger: Arc<RwLock<HashMap<Uuid, SubledgerEntry>>>,
    review_items: Arc<RwLock<HashMap<Uuid, ReviewItem>>>,
    patterns: Arc<RwLock<HashMap<Uuid, Pattern>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.accounts.write().unwrap().clear();
        *self.journal.write().unwrap() = JournalState::default();
        self.subledger.write().unwrap().clear();
        self.review_items.write().unwrap().clear();
        self.patterns.write().unwrap().clear();
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn save_account(&mut self, account: &Account) -> LedgerResult<()> {
        self.accounts.write().unwrap().insert(
            (account.client_id, account.number.clone()),
            account.clone(),
        );
        Ok(())
    }

    async fn get_account(
        &self,
        client_id: ClientId,
        number: &str,
    ) -> LedgerResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .get(&(client_id, number.to_string()))
            .cloned())
    }

    async fn list_accounts(&self, client_id: ClientId) -> LedgerResult<Vec<Account>> {
        let accounts = self.accounts.read().unwrap();
        let mut listed: Vec<Account> = accounts
            .values()
            .filter(|account| account.client_id == client_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(listed)
    }

    async fn next_voucher_number(
        &mut self,
        client_id: ClientId,
        series: &str,
    ) -> LedgerResult<u32> {
        let mut journal = self.journal.write().unwrap();
        let counter = journal
            .voucher_counters
            .entry((client_id, series.to_string()))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn commit_entry(&mut self, mut entry: JournalEntry) -> LedgerResult<JournalEntry> {
        let mut journal = self.journal.write().unwrap();

        let duplicate = journal.entries.values().any(|existing| {
            existing.client_id == entry.client_id
                && existing.voucher_series == entry.voucher_series
                && existing.voucher_number == entry.voucher_number
        });
        if duplicate {
            return Err(LedgerError::Conflict(format!(
                "Voucher number {}-{} is already taken for this client",
                entry.voucher_series, entry.voucher_number
            )));
        }

        // Settlement capacity is re-checked and applied while both
        // guards are held, so the journal insert and the subledger
        // update are one atomic step and remaining amounts can never
        // go negative under concurrent settlements.
        let mut items = self.subledger.write().unwrap();
        let deltas = subledger::settlement_deltas(&entry.lines);
        for (id, amount) in &deltas {
            let item = match items.get(id) {
                Some(item) if item.client_id == entry.client_id => item,
                Some(item) => {
                    return Err(LedgerError::Forbidden {
                        client_id: entry.client_id,
                        resource: "subledger entry",
                        id: item.id,
                    })
                }
                None => return Err(LedgerError::SubledgerEntryNotFound(*id)),
            };
            subledger::check_settlement_capacity(item, amount, entry.adjustment)?;
        }
        // Every delta was checked above, so application cannot fail
        for (id, amount) in &deltas {
            if let Some(item) = items.get_mut(id) {
                subledger::apply_settlement(item, amount, entry.adjustment);
            }
        }

        journal.next_sequence += 1;
        entry.sequence = journal.next_sequence;
        journal.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_entry(
        &self,
        client_id: ClientId,
        entry_id: Uuid,
    ) -> LedgerResult<Option<JournalEntry>> {
        match self.journal.read().unwrap().entries.get(&entry_id) {
            Some(entry) if entry.client_id == client_id => Ok(Some(entry.clone())),
            Some(entry) => Err(LedgerError::Forbidden {
                client_id,
                resource: "journal entry",
                id: entry.id,
            }),
            None => Ok(None),
        }
    }

    async fn entries_in_range(
        &self,
        client_id: ClientId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<JournalEntry>> {
        let journal = self.journal.read().unwrap();
        let mut entries: Vec<JournalEntry> = journal
            .entries
            .values()
            .filter(|entry| {
                if entry.client_id != client_id {
                    return false;
                }
                if let Some(start) = start_date {
                    if entry.accounting_date < start {
                        return false;
                    }
                }
                if let Some(end) = end_date {
                    if entry.accounting_date > end {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.accounting_date
                .cmp(&b.accounting_date)
                .then(a.sequence.cmp(&b.sequence))
        });
        Ok(entries)
    }

    async fn save_subledger_entry(&mut self, entry: &SubledgerEntry) -> LedgerResult<()> {
        self.subledger
            .write()
            .unwrap()
            .insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_subledger_entry(
        &self,
        client_id: ClientId,
        id: Uuid,
    ) -> LedgerResult<Option<SubledgerEntry>> {
        match self.subledger.read().unwrap().get(&id) {
            Some(entry) if entry.client_id == client_id => Ok(Some(entry.clone())),
            Some(entry) => Err(LedgerError::Forbidden {
                client_id,
                resource: "subledger entry",
                id: entry.id,
            }),
            None => Ok(None),
        }
    }

    async fn list_subledger_entries(
        &self,
        client_id: ClientId,
        status: Option<SubledgerStatus>,
    ) -> LedgerResult<Vec<SubledgerEntry>> {
        let subledger = self.subledger.read().unwrap();
        let mut entries: Vec<SubledgerEntry> = subledger
            .values()
            .filter(|entry| {
                entry.client_id == client_id && status.is_none_or(|s| entry.status == s)
            })
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then(a.invoice_number.cmp(&b.invoice_number))
        });
        Ok(entries)
    }

    async fn save_review_item(&mut self, item: &ReviewItem) -> LedgerResult<()> {
        self.review_items
            .write()
            .unwrap()
            .insert(item.id, item.clone());
        Ok(())
    }

    async fn get_review_item(
        &self,
        client_id: ClientId,
        id: Uuid,
    ) -> LedgerResult<Option<ReviewItem>> {
        match self.review_items.read().unwrap().get(&id) {
            Some(item) if item.client_id == client_id => Ok(Some(item.clone())),
            Some(item) => Err(LedgerError::Forbidden {
                client_id,
                resource: "review item",
                id: item.id,
            }),
            None => Ok(None),
        }
    }

    async fn list_review_items(
        &self,
        client_id: ClientId,
        status: Option<ReviewStatus>,
    ) -> LedgerResult<Vec<ReviewItem>> {
        let items = self.review_items.read().unwrap();
        let mut listed: Vec<ReviewItem> = items
            .values()
            .filter(|item| item.client_id == client_id && status.is_none_or(|s| item.status == s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(listed)
    }

    async fn save_pattern(&mut self, pattern: &Pattern) -> LedgerResult<()> {
        self.patterns
            .write()
            .unwrap()
            .insert(pattern.id, pattern.clone());
        Ok(())
    }

    async fn get_pattern(&self, client_id: ClientId, id: Uuid) -> LedgerResult<Option<Pattern>> {
        match self.patterns.read().unwrap().get(&id) {
            Some(pattern) if pattern.client_id == client_id => Ok(Some(pattern.clone())),
            Some(pattern) => Err(LedgerError::Forbidden {
                client_id,
                resource: "pattern",
                id: pattern.id,
            }),
            None => Ok(None),
        }
    }

    async fn find_pattern(
        &self,
        client_id: ClientId,
        supplier_key: &str,
        token_key: &str,
    ) -> LedgerResult<Option<Pattern>> {
        Ok(self
            .patterns
            .read()
            .unwrap()
            .values()
            .find(|pattern| {
                pattern.client_id == client_id
                    && pattern.supplier_key == supplier_key
                    && pattern.token_key == token_key
            })
            .cloned())
    }

    async fn list_patterns(&self, client_id: ClientId) -> LedgerResult<Vec<Pattern>> {
        let patterns = self.patterns.read().unwrap();
        let mut listed: Vec<Pattern> = patterns
            .values()
            .filter(|pattern| pattern.client_id == client_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn entry(client: ClientId, series: &str, number: u32) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            client_id: client,
            accounting_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            voucher_series: series.to_string(),
            voucher_number: number,
            description: "Test".to_string(),
            source_type: SourceType::Manual,
            adjustment: false,
            lines: vec![
                JournalLine::debit("1920", BigDecimal::from(100)),
                JournalLine::credit("3000", BigDecimal::from(100)),
            ],
            created_at: chrono::Utc::now().naive_utc(),
            sequence: 0,
        }
    }

    #[tokio::test]
    async fn voucher_numbers_are_monotonic_per_series() {
        let mut storage = MemoryStorage::new();
        let client = Uuid::new_v4();

        assert_eq!(storage.next_voucher_number(client, "B").await.unwrap(), 1);
        assert_eq!(storage.next_voucher_number(client, "B").await.unwrap(), 2);
        // Separate series and separate clients count independently
        assert_eq!(storage.next_voucher_number(client, "F").await.unwrap(), 1);
        let other = Uuid::new_v4();
        assert_eq!(storage.next_voucher_number(other, "B").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_voucher_number_conflicts() {
        let mut storage = MemoryStorage::new();
        let client = Uuid::new_v4();

        storage.commit_entry(entry(client, "B", 1)).await.unwrap();
        let err = storage.commit_entry(entry(client, "B", 1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        // Same number in another series or for another client is fine
        storage.commit_entry(entry(client, "F", 1)).await.unwrap();
        storage
            .commit_entry(entry(Uuid::new_v4(), "B", 1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn commit_assigns_increasing_sequence() {
        let mut storage = MemoryStorage::new();
        let client = Uuid::new_v4();

        let first = storage.commit_entry(entry(client, "B", 1)).await.unwrap();
        let second = storage.commit_entry(entry(client, "B", 2)).await.unwrap();
        assert!(second.sequence > first.sequence);
    }

    #[tokio::test]
    async fn commit_applies_settlements_atomically_with_capacity_check() {
        let mut storage = MemoryStorage::new();
        let client = Uuid::new_v4();

        let invoice = SubledgerEntry {
            id: Uuid::new_v4(),
            client_id: client,
            kind: CounterpartyKind::Customer,
            counterparty_name: "Kunde AS".to_string(),
            counterparty_id: "K-1".to_string(),
            invoice_number: "2024-9".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            amount: BigDecimal::from(500),
            remaining_amount: BigDecimal::from(500),
            currency: "NOK".to_string(),
            status: SubledgerStatus::Open,
            kid_number: None,
            created_at: chrono::Utc::now().naive_utc(),
        };
        storage.save_subledger_entry(&invoice).await.unwrap();

        let settling = |number: u32| {
            let mut e = entry(client, "B", number);
            e.lines = vec![
                JournalLine::debit("1920", BigDecimal::from(400)),
                JournalLine::credit("1500", BigDecimal::from(400)).settling(invoice.id),
            ];
            e
        };

        // Two settlements of 400 against 500 remaining: the first
        // commits and pays down, the second must fail even though a
        // pre-commit check would have passed for both.
        storage.commit_entry(settling(1)).await.unwrap();
        let err = storage.commit_entry(settling(2)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        // The failed commit wrote nothing on either side
        let item = storage
            .get_subledger_entry(client, invoice.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.remaining_amount, BigDecimal::from(100));
        assert_eq!(item.status, SubledgerStatus::PartiallyPaid);
        let entries = storage.entries_in_range(client, None, None).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn cross_tenant_entry_lookup_is_forbidden() {
        let mut storage = MemoryStorage::new();
        let owner = Uuid::new_v4();
        let committed = storage.commit_entry(entry(owner, "B", 1)).await.unwrap();

        let intruder = Uuid::new_v4();
        let err = storage.get_entry(intruder, committed.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden { .. }));
    }
}
