use rust_decimal::Decimal;

/// Failure taxonomy for the ledger and tax calculators.
///
/// Every variant carries enough detail (which account, which field, which
/// rule) for a presentation layer to render a precise message.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("account not found: {0}")]
    AccountNotFound(String),
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("invoice not found: {0}")]
    InvoiceNotFound(String),
    #[error("duplicate account code: {0}")]
    DuplicateAccount(String),
    #[error("invalid amount for {field}: {reason}")]
    InvalidAmount {
        field: &'static str,
        reason: String,
    },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("unbalanced journal entry: debits {debits} != credits {credits}")]
    UnbalancedJournal { debits: Decimal, credits: Decimal },
    #[error("invalid period: {0}")]
    InvalidPeriod(String),
    #[error("no tax rates for year: {0}")]
    UnknownTaxYear(String),
    #[error("validation failed for {field}: {reason}")]
    ValidationFailed {
        field: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
