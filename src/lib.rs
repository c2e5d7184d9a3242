//! UK double-entry bookkeeping engine.
//!
//! A library core for single-user UK small-business accounting: a chart of
//! accounts, a general ledger of postings with incrementally maintained
//! balances, sales and purchase invoices that auto-generate their ledger
//! postings, directly-paid expenses, and the statutory tax computations
//! (nine-box VAT return, Corporation Tax with marginal relief, Self
//! Assessment income tax with National Insurance).
//!
//! The [`Ledger`] is the single entry point for all mutation; everything
//! else reads from it. Presentation, persistence, and the HMRC API client
//! are external collaborators, with [`mtd`] defining the submission payload
//! shapes at that boundary.

pub mod account;
pub mod error;
pub mod expense;
pub mod invoice;
pub mod ledger;
pub mod mtd;
pub mod tax;
pub mod transaction;

pub use account::{Account, AccountCategory, AccountType, AccountUpdate, ChartOfAccounts};
pub use error::{Error, Result};
pub use expense::{Expense, ExpenseCategory, PaymentMethod};
pub use invoice::{Invoice, InvoiceItem, InvoiceType, PaymentStatus};
pub use ledger::{Ledger, LedgerSummary, PostingAccounts};
pub use transaction::{
    JournalEntry, JournalLine, Transaction, TransactionStatus, TransactionType,
};
