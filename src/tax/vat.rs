//! Norwegian VAT (MVA) codes and line-level VAT checks

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{minor_units, JournalLine};

/// VAT treatment codes for the Norwegian rate structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatCode {
    /// Outside the VAT system (no VAT reported)
    None,
    /// Standard rate, 25%
    Standard25,
    /// Foodstuffs, 15%
    Food15,
    /// Reduced rate (transport, lodging, culture), 12%
    Low12,
    /// Zero-rated (exports, books)
    Zero,
}

impl VatCode {
    /// Rate in percent
    pub fn rate(&self) -> BigDecimal {
        match self {
            VatCode::None | VatCode::Zero => BigDecimal::from(0),
            VatCode::Standard25 => BigDecimal::from(25),
            VatCode::Food15 => BigDecimal::from(15),
            VatCode::Low12 => BigDecimal::from(12),
        }
    }

    /// VAT on a net amount, at minor-unit precision
    pub fn vat_of_net(&self, net: &BigDecimal) -> BigDecimal {
        minor_units(&(net * self.rate() / BigDecimal::from(100)))
    }

    /// Extract the net amount from a gross (VAT-inclusive) amount
    pub fn net_of_gross(&self, gross: &BigDecimal) -> BigDecimal {
        let divisor = BigDecimal::from(100) + self.rate();
        minor_units(&(gross * BigDecimal::from(100) / divisor))
    }

    /// Gross amount for a net amount
    pub fn gross_of_net(&self, net: &BigDecimal) -> BigDecimal {
        minor_units(&(net + self.vat_of_net(net)))
    }
}

/// Errors in VAT declarations
#[derive(Debug, thiserror::Error)]
pub enum VatError {
    #[error("Declared VAT {declared} does not match {rate}% of {net} (expected {expected})")]
    Mismatch {
        declared: BigDecimal,
        rate: BigDecimal,
        net: BigDecimal,
        expected: BigDecimal,
    },
    #[error("VAT amount {0} is negative")]
    NegativeAmount(BigDecimal),
}

/// Check a journal line's declared VAT against its code.
///
/// The line's principal amount is the net basis; a line without a
/// VAT code must not declare a VAT amount.
pub fn check_line_vat(line: &JournalLine) -> Result<(), VatError> {
    if line.vat_amount < BigDecimal::from(0) {
        return Err(VatError::NegativeAmount(line.vat_amount.clone()));
    }

    let Some(code) = line.vat_code else {
        // No code: nothing to check beyond the sign above. A non-zero
        // declared amount without a code is a mismatch against 0%.
        if minor_units(&line.vat_amount) != minor_units(&BigDecimal::from(0)) {
            return Err(VatError::Mismatch {
                declared: line.vat_amount.clone(),
                rate: BigDecimal::from(0),
                net: line.principal().clone(),
                expected: minor_units(&BigDecimal::from(0)),
            });
        }
        return Ok(());
    };

    let expected = code.vat_of_net(line.principal());
    if minor_units(&line.vat_amount) != expected {
        return Err(VatError::Mismatch {
            declared: line.vat_amount.clone(),
            rate: code.rate(),
            net: line.principal().clone(),
            expected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_rate_vat_of_net() {
        let net = BigDecimal::from(500);
        assert_eq!(
            VatCode::Standard25.vat_of_net(&net),
            "125.00".parse::<BigDecimal>().unwrap()
        );
    }

    #[test]
    fn net_of_gross_inverts_gross_of_net() {
        let net = "1000.00".parse::<BigDecimal>().unwrap();
        let gross = VatCode::Food15.gross_of_net(&net);
        assert_eq!(gross, "1150.00".parse::<BigDecimal>().unwrap());
        assert_eq!(VatCode::Food15.net_of_gross(&gross), net);
    }

    #[test]
    fn line_with_matching_vat_passes() {
        let line = JournalLine::debit("6100", BigDecimal::from(500))
            .with_vat(VatCode::Standard25, BigDecimal::from(125));
        assert!(check_line_vat(&line).is_ok());
    }

    #[test]
    fn line_with_wrong_vat_fails() {
        let line = JournalLine::debit("6100", BigDecimal::from(500))
            .with_vat(VatCode::Standard25, BigDecimal::from(120));
        assert!(matches!(
            check_line_vat(&line),
            Err(VatError::Mismatch { .. })
        ));
    }

    #[test]
    fn uncoded_line_must_not_declare_vat() {
        let mut line = JournalLine::debit("6100", BigDecimal::from(500));
        line.vat_amount = BigDecimal::from(10);
        assert!(check_line_vat(&line).is_err());
    }

    #[test]
    fn zero_rated_expects_zero_vat() {
        let line = JournalLine::credit("3000", BigDecimal::from(900))
            .with_vat(VatCode::Zero, BigDecimal::from(0));
        assert!(check_line_vat(&line).is_ok());
    }
}
