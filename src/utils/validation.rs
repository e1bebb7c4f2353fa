//! Validation utilities

use crate::traits::*;
use crate::types::*;

/// Validate an account number: digits only, chart-code length
pub fn validate_account_number(number: &str) -> LedgerResult<()> {
    if number.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account number cannot be empty".to_string(),
        ));
    }

    if number.len() > 8 {
        return Err(LedgerError::Validation(
            "Account number cannot exceed 8 characters".to_string(),
        ));
    }

    if !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(LedgerError::Validation(
            "Account number can only contain digits".to_string(),
        ));
    }

    Ok(())
}

/// Validate an account name
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(LedgerError::Validation(
            "Account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a voucher description
pub fn validate_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Description cannot be empty".to_string(),
        ));
    }

    if description.len() > 500 {
        return Err(LedgerError::Validation(
            "Description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a voucher series code
pub fn validate_voucher_series(series: &str) -> LedgerResult<()> {
    if series.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Voucher series cannot be empty".to_string(),
        ));
    }

    if series.len() > 10 || !series.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LedgerError::Validation(
            "Voucher series must be short and alphanumeric".to_string(),
        ));
    }

    Ok(())
}

/// Strict voucher validator layering field checks on top of the
/// default double-entry rules
pub struct StrictVoucherValidator;

impl VoucherValidator for StrictVoucherValidator {
    fn validate_draft(&self, draft: &VoucherDraft) -> LedgerResult<()> {
        DefaultVoucherValidator.validate_draft(draft)?;

        validate_description(&draft.description)?;
        validate_voucher_series(&draft.voucher_series)?;

        for line in &draft.lines {
            validate_account_number(&line.account_number)?;
            if let Some(description) = &line.description {
                validate_description(description)?;
            }
        }

        // The same account must not appear twice on the same side;
        // that is almost always a doubled line from ingestion.
        let mut seen = std::collections::HashSet::new();
        for line in &draft.lines {
            if !seen.insert((&line.account_number, line.side())) {
                return Err(LedgerError::Validation(format!(
                    "Account {} appears multiple times on the same side",
                    line.account_number
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn draft(lines: Vec<JournalLine>) -> VoucherDraft {
        VoucherDraft {
            accounting_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            voucher_series: "M".to_string(),
            description: "Test voucher".to_string(),
            source_type: SourceType::Manual,
            adjustment: false,
            lines,
        }
    }

    #[test]
    fn account_number_must_be_numeric() {
        assert!(validate_account_number("1920").is_ok());
        assert!(validate_account_number("").is_err());
        assert!(validate_account_number("19-20").is_err());
        assert!(validate_account_number("192000001").is_err());
    }

    #[test]
    fn strict_validator_rejects_doubled_line() {
        let d = draft(vec![
            JournalLine::debit("6100", BigDecimal::from(100)),
            JournalLine::debit("6100", BigDecimal::from(100)),
            JournalLine::credit("2400", BigDecimal::from(200)),
        ]);
        assert!(matches!(
            StrictVoucherValidator.validate_draft(&d),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn strict_validator_accepts_clean_draft() {
        let d = draft(vec![
            JournalLine::debit("6100", BigDecimal::from(500)),
            JournalLine::debit("2710", BigDecimal::from(125)),
            JournalLine::credit("2400", BigDecimal::from(625)),
        ]);
        assert!(StrictVoucherValidator.validate_draft(&d).is_ok());
    }
}
