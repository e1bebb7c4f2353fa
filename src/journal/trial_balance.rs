//! Trial balance (saldobalanse) aggregation

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::error;

use crate::traits::LedgerStorage;
use crate::types::*;

/// Per-account accumulator for one trial balance scan
#[derive(Default)]
struct AccountSums {
    opening_debit: BigDecimal,
    opening_credit: BigDecimal,
    period_debit: BigDecimal,
    period_credit: BigDecimal,
}

/// Aggregates every posted account's balances and asserts the global
/// debit = credit invariant.
pub struct TrialBalanceEngine<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> TrialBalanceEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Trial balance as of a date, over every account with at least
    /// one posting. One full journal scan, not a per-account call.
    ///
    /// Postings dated before `period_start` fold into the opening
    /// balance; without a period start the opening balance is zero and
    /// everything lands in the period columns.
    ///
    /// A journal whose totals disagree can only mean the poster's
    /// enforcement was bypassed. That is reported as a
    /// `ConsistencyFault` after a critical log, never silently
    /// corrected, and the report is withheld.
    pub async fn trial_balance(
        &self,
        client_id: ClientId,
        as_of_date: NaiveDate,
        period_start: Option<NaiveDate>,
    ) -> LedgerResult<TrialBalance> {
        let entries = self
            .storage
            .entries_in_range(client_id, None, Some(as_of_date))
            .await?;

        // BTreeMap keeps rows ordered by account number
        let mut sums: BTreeMap<String, AccountSums> = BTreeMap::new();
        for entry in &entries {
            let in_period = match period_start {
                Some(start) => entry.accounting_date >= start,
                None => true,
            };
            for line in &entry.lines {
                let acc = sums.entry(line.account_number.clone()).or_default();
                if in_period {
                    acc.period_debit += &line.debit;
                    acc.period_credit += &line.credit;
                } else {
                    acc.opening_debit += &line.debit;
                    acc.opening_credit += &line.credit;
                }
            }
        }

        let mut rows = Vec::with_capacity(sums.len());
        let mut total_debit = BigDecimal::from(0);
        let mut total_credit = BigDecimal::from(0);

        for (number, acc) in sums {
            let account = self
                .storage
                .get_account(client_id, &number)
                .await?
                .ok_or_else(|| {
                    // A posted line always references a resolvable
                    // account; a miss here is corrupted storage.
                    LedgerError::ConsistencyFault(format!(
                        "Journal references account {} missing from the chart",
                        number
                    ))
                })?;

            let sign = account.account_type.normal_balance();
            let signed = |debit: &BigDecimal, credit: &BigDecimal| match sign {
                Side::Debit => debit - credit,
                Side::Credit => credit - debit,
            };

            let opening_balance = signed(&acc.opening_debit, &acc.opening_credit);
            let closing_balance =
                &opening_balance + signed(&acc.period_debit, &acc.period_credit);

            // Closing balances bucket onto their natural side; a
            // negative balance flips to the opposite column.
            match sign {
                Side::Debit if closing_balance >= BigDecimal::from(0) => {
                    total_debit += &closing_balance;
                }
                Side::Debit => total_credit += closing_balance.abs(),
                Side::Credit if closing_balance >= BigDecimal::from(0) => {
                    total_credit += &closing_balance;
                }
                Side::Credit => total_debit += closing_balance.abs(),
            }

            rows.push(TrialBalanceRow {
                account,
                opening_balance,
                period_debit: acc.period_debit,
                period_credit: acc.period_credit,
                closing_balance,
            });
        }

        let total_debit = minor_units(&total_debit);
        let total_credit = minor_units(&total_credit);
        let is_balanced = total_debit == total_credit;

        if !is_balanced {
            error!(
                %client_id,
                %total_debit,
                %total_credit,
                "trial balance does not balance; journal contains an entry that bypassed posting enforcement"
            );
            return Err(LedgerError::ConsistencyFault(format!(
                "Trial balance for client {} does not balance: debit = {}, credit = {}",
                client_id, total_debit, total_credit
            )));
        }

        Ok(TrialBalance {
            client_id,
            as_of_date,
            rows,
            total_debit,
            total_credit,
            is_balanced,
        })
    }
}
