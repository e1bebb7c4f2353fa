//! VAT (merverdiavgift) handling

pub mod vat;

pub use vat::*;
