//! Subledger (reskontro) tracking: open items, payment state, aging

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, error};
use uuid::Uuid;

use crate::traits::LedgerStorage;
use crate::types::*;

/// Open-item tracker for customer/vendor invoices.
///
/// Payment state only ever changes as a side effect of a committed
/// journal entry whose lines settle an item; the tracker itself never
/// decides that something was paid.
pub struct SubledgerTracker<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> SubledgerTracker<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Register a new open item (invoice ingestion side)
    pub async fn register(
        &mut self,
        client_id: ClientId,
        new_entry: NewSubledgerEntry,
    ) -> LedgerResult<SubledgerEntry> {
        if new_entry.amount <= BigDecimal::from(0) {
            return Err(LedgerError::Validation(
                "Subledger entry amount must be positive".to_string(),
            ));
        }

        let entry = SubledgerEntry {
            id: Uuid::new_v4(),
            client_id,
            kind: new_entry.kind,
            counterparty_name: new_entry.counterparty_name,
            counterparty_id: new_entry.counterparty_id,
            invoice_number: new_entry.invoice_number,
            invoice_date: new_entry.invoice_date,
            due_date: new_entry.due_date,
            remaining_amount: new_entry.amount.clone(),
            amount: new_entry.amount,
            currency: new_entry.currency,
            status: SubledgerStatus::Open,
            kid_number: new_entry.kid_number,
            created_at: chrono::Utc::now().naive_utc(),
        };

        self.storage.save_subledger_entry(&entry).await?;
        Ok(entry)
    }

    /// Get one open item by id
    pub async fn get(&self, client_id: ClientId, id: Uuid) -> LedgerResult<SubledgerEntry> {
        self.storage
            .get_subledger_entry(client_id, id)
            .await?
            .ok_or(LedgerError::SubledgerEntryNotFound(id))
    }

    /// List a client's items, optionally filtered by payment status
    pub async fn open_entries(
        &self,
        client_id: ClientId,
        status: Option<SubledgerStatus>,
    ) -> LedgerResult<Vec<SubledgerEntry>> {
        self.storage.list_subledger_entries(client_id, status).await
    }

    /// Aging report over all non-paid items.
    ///
    /// Every open/partially-paid item lands in exactly one bucket by
    /// `due_date` versus the evaluation date; fully paid items are
    /// excluded. The bucket totals must partition the total remaining
    /// amount exactly; a mismatch is a consistency fault.
    pub async fn aging(&self, client_id: ClientId, as_of_date: NaiveDate) -> LedgerResult<AgingReport> {
        let entries = self.storage.list_subledger_entries(client_id, None).await?;

        let mut report = AgingReport {
            client_id,
            as_of_date,
            not_due: AgingBucket::empty(),
            days_0_30: AgingBucket::empty(),
            days_31_60: AgingBucket::empty(),
            days_61_90: AgingBucket::empty(),
            days_over_90: AgingBucket::empty(),
            total_remaining: BigDecimal::from(0),
        };

        for entry in entries {
            if entry.status == SubledgerStatus::Paid {
                continue;
            }

            let bucket = match entry.days_overdue(as_of_date) {
                0 if entry.due_date >= as_of_date => &mut report.not_due,
                0..=30 => &mut report.days_0_30,
                31..=60 => &mut report.days_31_60,
                61..=90 => &mut report.days_61_90,
                _ => &mut report.days_over_90,
            };

            bucket.total += &entry.remaining_amount;
            bucket.entries.push(entry.id);
            report.total_remaining += &entry.remaining_amount;
        }

        if minor_units(&report.bucket_total()) != minor_units(&report.total_remaining) {
            error!(
                %client_id,
                bucket_total = %report.bucket_total(),
                total_remaining = %report.total_remaining,
                "aging buckets do not partition the remaining amounts"
            );
            return Err(LedgerError::ConsistencyFault(format!(
                "Aging buckets sum to {} but total remaining is {}",
                report.bucket_total(),
                report.total_remaining
            )));
        }

        Ok(report)
    }
}

/// Aggregate a line collection's settlement amounts per referenced
/// subledger entry, at minor-unit precision.
pub(crate) fn settlement_deltas(lines: &[JournalLine]) -> HashMap<Uuid, BigDecimal> {
    let mut applied: HashMap<Uuid, BigDecimal> = HashMap::new();
    for line in lines {
        if let Some(id) = line.settles {
            *applied.entry(id).or_insert_with(|| BigDecimal::from(0)) +=
                minor_units(line.principal());
        }
    }
    applied
}

/// Check one item's capacity for a settlement amount: a payment must
/// not drive `remaining_amount` below zero, an adjustment must not
/// push it above the original invoice amount.
pub(crate) fn check_settlement_capacity(
    item: &SubledgerEntry,
    amount: &BigDecimal,
    adjustment: bool,
) -> LedgerResult<()> {
    if adjustment {
        let headroom = &item.amount - &item.remaining_amount;
        if *amount > minor_units(&headroom) {
            return Err(LedgerError::Validation(format!(
                "Adjustment of {} would push invoice {} above its original amount",
                amount, item.invoice_number
            )));
        }
    } else if *amount > minor_units(&item.remaining_amount) {
        return Err(LedgerError::Validation(format!(
            "Payment of {} exceeds remaining amount {} on invoice {}",
            amount, item.remaining_amount, item.invoice_number
        )));
    }
    Ok(())
}

/// Apply one settlement amount to an item and recompute its status.
///
/// A normal entry pays the item down; an adjustment entry restores
/// remaining amount and may re-open a paid item. Capacity must have
/// been checked under the same guard that calls this.
pub(crate) fn apply_settlement(item: &mut SubledgerEntry, amount: &BigDecimal, adjustment: bool) {
    if adjustment {
        item.remaining_amount = minor_units(&(&item.remaining_amount + amount));
    } else {
        item.remaining_amount = minor_units(&(&item.remaining_amount - amount));
    }

    item.status = if item.remaining_amount == BigDecimal::from(0) {
        SubledgerStatus::Paid
    } else if item.remaining_amount < minor_units(&item.amount) {
        SubledgerStatus::PartiallyPaid
    } else {
        SubledgerStatus::Open
    };

    debug!(
        invoice = %item.invoice_number,
        remaining = %item.remaining_amount,
        status = ?item.status,
        "subledger entry updated from journal entry"
    );
}

/// Pre-commit check that a draft's settlement lines can be applied:
/// every referenced item exists under this client and has capacity.
///
/// This fails fast before a voucher number is allocated. The
/// authoritative check runs again inside the storage commit, under
/// the same guard that applies the settlements, so two concurrent
/// posters cannot both pass on the same remaining amount.
pub(crate) async fn check_settlements<S: LedgerStorage>(
    storage: &S,
    client_id: ClientId,
    draft: &VoucherDraft,
) -> LedgerResult<()> {
    for (id, amount) in settlement_deltas(&draft.lines) {
        let entry = storage
            .get_subledger_entry(client_id, id)
            .await?
            .ok_or(LedgerError::SubledgerEntryNotFound(id))?;
        check_settlement_capacity(&entry, &amount, draft.adjustment)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use chrono::NaiveDate;

    fn new_invoice(due: NaiveDate, amount: i64) -> NewSubledgerEntry {
        NewSubledgerEntry {
            kind: CounterpartyKind::Customer,
            counterparty_name: "Acme AS".to_string(),
            counterparty_id: "C-1".to_string(),
            invoice_number: "1001".to_string(),
            invoice_date: due - chrono::Duration::days(14),
            due_date: due,
            amount: BigDecimal::from(amount),
            currency: "NOK".to_string(),
            kid_number: Some("002345676".to_string()),
        }
    }

    #[tokio::test]
    async fn aging_buckets_partition_remaining_amounts() {
        let storage = MemoryStorage::new();
        let mut tracker = SubledgerTracker::new(storage);
        let client = uuid::Uuid::new_v4();
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        // One per bucket
        for (days_before, amount) in [(-10, 100), (15, 200), (45, 300), (75, 400), (120, 500)] {
            tracker
                .register(
                    client,
                    new_invoice(as_of - chrono::Duration::days(days_before), amount),
                )
                .await
                .unwrap();
        }

        let report = tracker.aging(client, as_of).await.unwrap();
        assert_eq!(report.not_due.total, BigDecimal::from(100));
        assert_eq!(report.days_0_30.total, BigDecimal::from(200));
        assert_eq!(report.days_31_60.total, BigDecimal::from(300));
        assert_eq!(report.days_61_90.total, BigDecimal::from(400));
        assert_eq!(report.days_over_90.total, BigDecimal::from(500));
        assert_eq!(report.bucket_total(), report.total_remaining);
        assert_eq!(report.total_remaining, BigDecimal::from(1500));
    }

    #[tokio::test]
    async fn register_rejects_non_positive_amount() {
        let storage = MemoryStorage::new();
        let mut tracker = SubledgerTracker::new(storage);
        let client = uuid::Uuid::new_v4();
        let due = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let err = tracker
            .register(client, new_invoice(due, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn cross_tenant_lookup_is_rejected() {
        let storage = MemoryStorage::new();
        let mut tracker = SubledgerTracker::new(storage);
        let owner = uuid::Uuid::new_v4();
        let intruder = uuid::Uuid::new_v4();
        let due = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let entry = tracker.register(owner, new_invoice(due, 100)).await.unwrap();

        let err = tracker.get(intruder, entry.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden { .. }));
    }
}
