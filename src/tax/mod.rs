//! UK statutory tax computations over the ledger: the nine-box VAT return,
//! Corporation Tax with marginal relief, and the Self Assessment income tax
//! and National Insurance calculation.

pub mod corporation;
pub mod income;
pub mod uk;
pub mod vat;

pub use corporation::{CorporationTaxComputation, TradingSplit};
pub use income::{BandSlice, IncomeSources, IncomeTaxAssessment, NationalInsurance};
pub use uk::{FinancialYear, TaxBand, TaxYear};
pub use vat::{VatReturn, VatReturnStatus};
