//! General ledger (hovedbok) aggregation

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::traits::LedgerStorage;
use crate::types::*;

/// Read-side view over the journal: per-account rows with running
/// balance. Always computed from the committed journal, so the result
/// is identical to a naive full re-scan; nothing here is cached.
pub struct LedgerAggregator<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> LedgerAggregator<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// General ledger for one account: rows ordered by
    /// `(accounting_date, creation order)` with a running balance
    /// signed by the account's normal side.
    ///
    /// An unknown account is an error, never an empty result.
    pub async fn general_ledger(
        &self,
        client_id: ClientId,
        account_number: &str,
        period: Option<(NaiveDate, NaiveDate)>,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<LedgerRow>> {
        let account = self
            .storage
            .get_account(client_id, account_number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound {
                client_id,
                number: account_number.to_string(),
            })?;

        let (start, end) = match period {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };
        let entries = self.storage.entries_in_range(client_id, start, end).await?;

        let mut rows = Vec::new();
        let mut running = BigDecimal::from(0);

        for entry in &entries {
            for line in &entry.lines {
                if line.account_number != account_number {
                    continue;
                }

                running += match account.account_type.normal_balance() {
                    Side::Debit => &line.debit - &line.credit,
                    Side::Credit => &line.credit - &line.debit,
                };

                rows.push(LedgerRow {
                    entry_id: entry.id,
                    accounting_date: entry.accounting_date,
                    voucher_series: entry.voucher_series.clone(),
                    voucher_number: entry.voucher_number,
                    description: line
                        .description
                        .clone()
                        .unwrap_or_else(|| entry.description.clone()),
                    debit: line.debit.clone(),
                    credit: line.credit.clone(),
                    running_balance: running.clone(),
                });

                if let Some(limit) = limit {
                    if rows.len() >= limit {
                        return Ok(rows);
                    }
                }
            }
        }

        Ok(rows)
    }

    /// Net balance of one account as of a date, signed by its normal side
    pub async fn account_balance(
        &self,
        client_id: ClientId,
        account_number: &str,
        as_of_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let account = self
            .storage
            .get_account(client_id, account_number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound {
                client_id,
                number: account_number.to_string(),
            })?;

        let entries = self
            .storage
            .entries_in_range(client_id, None, as_of_date)
            .await?;

        let mut balance = BigDecimal::from(0);
        for entry in &entries {
            for line in &entry.lines {
                if line.account_number != account_number {
                    continue;
                }
                balance += match account.account_type.normal_balance() {
                    Side::Debit => &line.debit - &line.credit,
                    Side::Credit => &line.credit - &line.debit,
                };
            }
        }

        Ok(balance)
    }

    /// Fetch the voucher behind a ledger row (drilldown navigation)
    pub async fn entry(&self, client_id: ClientId, entry_id: Uuid) -> LedgerResult<JournalEntry> {
        self.storage
            .get_entry(client_id, entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))
    }
}
