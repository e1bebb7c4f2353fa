//! Chart of accounts registry
//!
//! Per-client catalog of valid account numbers. The journal poster
//! resolves every line through this registry; chart mutation beyond
//! account creation lives with an external collaborator.

use std::collections::HashMap;

use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::validation::{validate_account_name, validate_account_number};

/// Registry over one client's chart of accounts
pub struct ChartRegistry<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> ChartRegistry<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Resolve an account number for a client.
    ///
    /// A number missing from this client's chart is `AccountNotFound`,
    /// whether it never existed or belongs to another tenant.
    pub async fn resolve(&self, client_id: ClientId, number: &str) -> LedgerResult<Account> {
        self.storage
            .get_account(client_id, number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound {
                client_id,
                number: number.to_string(),
            })
    }

    /// Add an account to a client's chart
    pub async fn add_account(
        &mut self,
        client_id: ClientId,
        number: String,
        name: String,
        account_type: AccountType,
    ) -> LedgerResult<Account> {
        validate_account_number(&number)?;
        validate_account_name(&name)?;

        if self.storage.get_account(client_id, &number).await?.is_some() {
            return Err(LedgerError::Validation(format!(
                "Account {} already exists in this chart",
                number
            )));
        }

        let account = Account::new(client_id, number, name, account_type);
        self.storage.save_account(&account).await?;
        Ok(account)
    }

    /// List a client's full chart
    pub async fn list(&self, client_id: ClientId) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(client_id).await
    }

    /// Seed a standard Norwegian small-business chart for a client.
    ///
    /// Returns the created accounts keyed by a stable short name.
    pub async fn standard_chart(
        &mut self,
        client_id: ClientId,
    ) -> LedgerResult<HashMap<String, Account>> {
        let plan: &[(&str, &str, &str, AccountType)] = &[
            ("receivables", "1500", "Kundefordringer", AccountType::Asset),
            ("bank", "1920", "Bankinnskudd", AccountType::Asset),
            ("payables", "2400", "Leverandørgjeld", AccountType::Liability),
            ("vat_payable", "2700", "Utgående merverdiavgift", AccountType::Liability),
            ("vat_receivable", "2710", "Inngående merverdiavgift", AccountType::Asset),
            ("equity", "2050", "Annen egenkapital", AccountType::Equity),
            ("sales", "3000", "Salgsinntekt, avgiftspliktig", AccountType::Revenue),
            ("goods", "4000", "Varekjøp", AccountType::Expense),
            ("freight", "6100", "Frakt og transport", AccountType::Expense),
            ("rent", "6300", "Leie lokale", AccountType::Expense),
            ("office", "6800", "Kontorkostnad", AccountType::Expense),
        ];

        let mut accounts = HashMap::new();
        for (key, number, name, account_type) in plan {
            let account = self
                .add_account(
                    client_id,
                    number.to_string(),
                    name.to_string(),
                    *account_type,
                )
                .await?;
            accounts.insert(key.to_string(), account);
        }

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use uuid::Uuid;

    #[tokio::test]
    async fn resolve_is_tenant_scoped() {
        let storage = MemoryStorage::new();
        let mut chart = ChartRegistry::new(storage);

        let client_a = Uuid::new_v4();
        let client_b = Uuid::new_v4();

        chart
            .add_account(
                client_a,
                "1920".to_string(),
                "Bankinnskudd".to_string(),
                AccountType::Asset,
            )
            .await
            .unwrap();

        assert!(chart.resolve(client_a, "1920").await.is_ok());
        assert!(matches!(
            chart.resolve(client_b, "1920").await,
            Err(LedgerError::AccountNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_account_number_rejected() {
        let storage = MemoryStorage::new();
        let mut chart = ChartRegistry::new(storage);
        let client = Uuid::new_v4();

        chart
            .add_account(
                client,
                "3000".to_string(),
                "Salgsinntekt".to_string(),
                AccountType::Revenue,
            )
            .await
            .unwrap();

        let err = chart
            .add_account(
                client,
                "3000".to_string(),
                "Salgsinntekt igjen".to_string(),
                AccountType::Revenue,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn standard_chart_seeds_expected_accounts() {
        let storage = MemoryStorage::new();
        let mut chart = ChartRegistry::new(storage);
        let client = Uuid::new_v4();

        let accounts = chart.standard_chart(client).await.unwrap();
        assert!(accounts.contains_key("bank"));
        assert!(accounts.contains_key("payables"));
        assert_eq!(accounts["freight"].number, "6100");
        assert_eq!(accounts["vat_receivable"].number, "2710");
    }
}
