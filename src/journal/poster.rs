//! Journal poster: the only write path into the journal

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::subledger;
use crate::tax;
use crate::traits::*;
use crate::types::*;

/// Validates and atomically commits balanced vouchers.
///
/// Corrections go through the same path as new entries, flagged
/// `adjustment`; nothing in the journal is ever edited in place.
pub struct JournalPoster<S: LedgerStorage> {
    storage: S,
    validator: Box<dyn VoucherValidator>,
}

impl<S: LedgerStorage> JournalPoster<S> {
    /// Create a new poster with the default double-entry validator
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultVoucherValidator),
        }
    }

    /// Create a new poster with a custom validator
    pub fn with_validator(storage: S, validator: Box<dyn VoucherValidator>) -> Self {
        Self { storage, validator }
    }

    /// Validate and commit a voucher draft for a client.
    ///
    /// Validation order: non-empty, account resolution, line shape and
    /// balance, VAT declarations, subledger settlement capacity. The
    /// caller always receives the first violated rule in that order.
    /// Only then is a voucher number allocated and the entry committed
    /// atomically; a number collision under a concurrent race is
    /// retried once with a fresh allocation before surfacing as
    /// `Conflict`.
    pub async fn post(
        &mut self,
        client_id: ClientId,
        draft: VoucherDraft,
    ) -> LedgerResult<JournalEntry> {
        if draft.lines.is_empty() {
            return Err(LedgerError::Validation(
                "Voucher must have at least one line".to_string(),
            ));
        }

        for line in &draft.lines {
            if self
                .storage
                .get_account(client_id, &line.account_number)
                .await?
                .is_none()
            {
                return Err(LedgerError::AccountNotFound {
                    client_id,
                    number: line.account_number.clone(),
                });
            }
        }

        self.validator.validate_draft(&draft)?;

        for line in &draft.lines {
            tax::check_line_vat(line).map_err(|e| LedgerError::Validation(e.to_string()))?;
        }

        subledger::check_settlements(&self.storage, client_id, &draft).await?;

        let mut entry = self.number_and_commit(client_id, &draft).await;
        if matches!(entry, Err(LedgerError::Conflict(_))) {
            debug!(%client_id, series = %draft.voucher_series, "voucher number collision, retrying once");
            entry = self.number_and_commit(client_id, &draft).await;
        }
        // The commit itself re-checks settlement capacity and applies
        // the settlements under its own atomic guard.
        let entry = entry?;

        debug!(
            %client_id,
            voucher = %format!("{}-{}", entry.voucher_series, entry.voucher_number),
            lines = entry.lines.len(),
            "journal entry committed"
        );

        Ok(entry)
    }

    /// Get a committed entry by id
    pub async fn get_entry(
        &self,
        client_id: ClientId,
        entry_id: Uuid,
    ) -> LedgerResult<JournalEntry> {
        self.storage
            .get_entry(client_id, entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))
    }

    async fn number_and_commit(
        &mut self,
        client_id: ClientId,
        draft: &VoucherDraft,
    ) -> LedgerResult<JournalEntry> {
        let voucher_number = self
            .storage
            .next_voucher_number(client_id, &draft.voucher_series)
            .await?;

        let entry = JournalEntry {
            id: Uuid::new_v4(),
            client_id,
            accounting_date: draft.accounting_date,
            voucher_series: draft.voucher_series.clone(),
            voucher_number,
            description: draft.description.clone(),
            source_type: draft.source_type,
            adjustment: draft.adjustment,
            lines: draft.lines.clone(),
            created_at: chrono::Utc::now().naive_utc(),
            // Assigned by storage inside the atomic commit
            sequence: 0,
        };

        self.storage.commit_entry(entry).await
    }
}

/// Builder for voucher drafts
#[derive(Debug)]
pub struct VoucherBuilder {
    draft: VoucherDraft,
}

impl VoucherBuilder {
    /// Start a draft for a date, voucher series, and description
    pub fn new(
        accounting_date: NaiveDate,
        voucher_series: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            draft: VoucherDraft {
                accounting_date,
                voucher_series: voucher_series.into(),
                description: description.into(),
                source_type: SourceType::Manual,
                adjustment: false,
                lines: Vec::new(),
            },
        }
    }

    /// Set how the entry entered the system
    pub fn source(mut self, source_type: SourceType) -> Self {
        self.draft.source_type = source_type;
        self
    }

    /// Flag the voucher as a reversing/adjusting entry
    pub fn adjustment(mut self) -> Self {
        self.draft.adjustment = true;
        self
    }

    /// Add a debit line
    pub fn debit(mut self, account_number: impl Into<String>, amount: BigDecimal) -> Self {
        self.draft.lines.push(JournalLine::debit(account_number, amount));
        self
    }

    /// Add a credit line
    pub fn credit(mut self, account_number: impl Into<String>, amount: BigDecimal) -> Self {
        self.draft.lines.push(JournalLine::credit(account_number, amount));
        self
    }

    /// Add a prepared line
    pub fn line(mut self, line: JournalLine) -> Self {
        self.draft.lines.push(line);
        self
    }

    /// Validate the draft's line shape and balance, and hand it back
    pub fn build(self) -> LedgerResult<VoucherDraft> {
        DefaultVoucherValidator.validate_draft(&self.draft)?;
        Ok(self.draft)
    }
}

/// Common posting patterns
pub mod patterns {
    use super::*;
    use crate::tax::VatCode;

    /// Supplier invoice: debit expense net, debit input VAT, credit payables gross
    pub fn supplier_invoice(
        date: NaiveDate,
        series: impl Into<String>,
        description: impl Into<String>,
        expense_account: impl Into<String>,
        vat_receivable_account: impl Into<String>,
        payables_account: impl Into<String>,
        net_amount: BigDecimal,
        vat_code: VatCode,
    ) -> LedgerResult<VoucherDraft> {
        let vat = vat_code.vat_of_net(&net_amount);
        let gross = &net_amount + &vat;

        VoucherBuilder::new(date, series, description)
            .line(JournalLine::debit(expense_account, net_amount).with_vat(vat_code, vat.clone()))
            .debit(vat_receivable_account, vat)
            .credit(payables_account, gross)
            .build()
    }

    /// Sales invoice: debit receivables gross, credit revenue net, credit output VAT
    pub fn sales_invoice(
        date: NaiveDate,
        series: impl Into<String>,
        description: impl Into<String>,
        receivables_account: impl Into<String>,
        revenue_account: impl Into<String>,
        vat_payable_account: impl Into<String>,
        net_amount: BigDecimal,
        vat_code: VatCode,
    ) -> LedgerResult<VoucherDraft> {
        let vat = vat_code.vat_of_net(&net_amount);
        let gross = &net_amount + &vat;

        VoucherBuilder::new(date, series, description)
            .debit(receivables_account, gross)
            .line(JournalLine::credit(revenue_account, net_amount).with_vat(vat_code, vat.clone()))
            .credit(vat_payable_account, vat)
            .build()
    }

    /// Customer payment settling an open reskontro item:
    /// debit bank, credit receivables
    pub fn customer_payment(
        date: NaiveDate,
        series: impl Into<String>,
        description: impl Into<String>,
        bank_account: impl Into<String>,
        receivables_account: impl Into<String>,
        amount: BigDecimal,
        settles: Uuid,
    ) -> LedgerResult<VoucherDraft> {
        VoucherBuilder::new(date, series, description)
            .debit(bank_account, amount.clone())
            .line(JournalLine::credit(receivables_account, amount).settling(settles))
            .build()
    }

    /// Vendor payment settling an open reskontro item:
    /// debit payables, credit bank
    pub fn vendor_payment(
        date: NaiveDate,
        series: impl Into<String>,
        description: impl Into<String>,
        payables_account: impl Into<String>,
        bank_account: impl Into<String>,
        amount: BigDecimal,
        settles: Uuid,
    ) -> LedgerResult<VoucherDraft> {
        VoucherBuilder::new(date, series, description)
            .line(JournalLine::debit(payables_account, amount.clone()).settling(settles))
            .credit(bank_account, amount)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::VatCode;
    use crate::utils::memory_storage::MemoryStorage;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn unknown_account_is_reported_before_imbalance() {
        let mut storage = MemoryStorage::new();
        let client = Uuid::new_v4();
        storage
            .save_account(&Account::new(
                client,
                "2400".to_string(),
                "Leverandørgjeld".to_string(),
                AccountType::Liability,
            ))
            .await
            .unwrap();

        // Built by hand so the draft carries both defects at once
        let draft = VoucherDraft {
            accounting_date: date(),
            voucher_series: "F".to_string(),
            description: "Ukjent konto og skeiv".to_string(),
            source_type: SourceType::Manual,
            adjustment: false,
            lines: vec![
                JournalLine::debit("9999", BigDecimal::from(500)),
                JournalLine::credit("2400", BigDecimal::from(600)),
            ],
        };

        let mut poster = JournalPoster::new(storage);
        let err = poster.post(client, draft).await.unwrap_err();
        assert!(
            matches!(err, LedgerError::AccountNotFound { ref number, .. } if number == "9999"),
            "expected AccountNotFound, got {:?}",
            err
        );
    }

    #[test]
    fn builder_rejects_unbalanced_draft() {
        let err = VoucherBuilder::new(date(), "M", "Unbalanced")
            .debit("6100", BigDecimal::from(500))
            .credit("2400", BigDecimal::from(600))
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unbalanced { .. }));
    }

    #[test]
    fn builder_rejects_single_line() {
        let err = VoucherBuilder::new(date(), "M", "Half a posting")
            .debit("6100", BigDecimal::from(500))
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn builder_rejects_line_with_both_sides() {
        let mut line = JournalLine::debit("6100", BigDecimal::from(500));
        line.credit = BigDecimal::from(500);
        let err = VoucherBuilder::new(date(), "M", "Both sides")
            .line(line)
            .credit("2400", BigDecimal::from(500))
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn balance_check_catches_minor_unit_discrepancy() {
        let err = VoucherBuilder::new(date(), "M", "Off by one øre")
            .debit("6100", "500.00".parse().unwrap())
            .credit("2400", "500.01".parse().unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unbalanced { .. }));
    }

    #[test]
    fn supplier_invoice_pattern_balances() {
        let draft = patterns::supplier_invoice(
            date(),
            "F",
            "Frakt januar",
            "6100",
            "2710",
            "2400",
            BigDecimal::from(500),
            VatCode::Standard25,
        )
        .unwrap();

        let debits: BigDecimal = draft.lines.iter().map(|l| &l.debit).sum();
        let credits: BigDecimal = draft.lines.iter().map(|l| &l.credit).sum();
        assert_eq!(minor_units(&debits), minor_units(&credits));
        assert_eq!(minor_units(&debits), "625.00".parse::<BigDecimal>().unwrap());
    }
}
