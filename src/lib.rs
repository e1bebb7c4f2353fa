//! # Regnskap Core
//!
//! Double-entry bookkeeping ledger engine with an AI-assisted posting
//! pipeline.
//!
//! ## Features
//!
//! - **Journal posting**: every voucher is validated and committed
//!   atomically; debits always equal credits at minor-unit precision
//! - **General ledger**: per-account postings with running balance,
//!   always consistent with the committed journal
//! - **Trial balance**: all-accounts summary with a hard
//!   debit = credit invariant
//! - **Reskontro**: open-item subledger with payment status and aging
//!   buckets driven only by journal entries
//! - **Review queue**: AI-suggested postings awaiting confirmation,
//!   with patterns learned from human corrections
//! - **Storage abstraction**: database-agnostic trait-based backend
//!
//! ## Quick start
//!
//! ```rust
//! use regnskap_core::{Ledger, VoucherBuilder};
//! use regnskap_core::utils::MemoryStorage;
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//! use uuid::Uuid;
//!
//! # async fn run() -> regnskap_core::LedgerResult<()> {
//! let mut ledger = Ledger::new(MemoryStorage::new());
//! let client = Uuid::new_v4();
//! ledger.setup_standard_chart(client).await?;
//!
//! let draft = VoucherBuilder::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
//!     "B",
//!     "Kapitalinnskudd",
//! )
//! .debit("1920", BigDecimal::from(50_000))
//! .credit("2050", BigDecimal::from(50_000))
//! .build()?;
//!
//! let entry = ledger.post(client, draft).await?;
//! assert!(entry.is_balanced());
//! # Ok(())
//! # }
//! ```

pub mod chart;
pub mod engine;
pub mod journal;
pub mod review;
pub mod subledger;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use chart::ChartRegistry;
pub use engine::{Ledger, LedgerIntegrityReport};
pub use journal::*;
pub use review::*;
pub use subledger::SubledgerTracker;
pub use tax::*;
pub use traits::*;
pub use types::*;

// Re-export posting patterns for convenience
pub use journal::poster::patterns;
