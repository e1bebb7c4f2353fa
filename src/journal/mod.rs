//! Journal posting and the derived ledger views

pub mod ledger;
pub mod poster;
pub mod trial_balance;

pub use ledger::*;
pub use poster::*;
pub use trial_balance::*;
