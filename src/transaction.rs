use crate::error::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Round half-up to exactly 2 decimal places (pennies). The result always
/// carries a scale of 2 so monetary fields serialize as stable `"x.xx"`
/// strings.
pub(crate) fn round2(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Generate a document number of the form `{PREFIX}-{YYYYMMDD}-{8HEX}`.
pub(crate) fn generate_document_number(prefix: &str, date: NaiveDate) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("{}-{}-{}", prefix, date.format("%Y%m%d"), suffix)
}

/// Reconciliation status of a posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Unreconciled,
    Reconciled,
    Pending,
}

/// What produced a posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    Manual,
    Invoice,
    Payment,
    Receipt,
    Expense,
    Transfer,
    Journal,
    OpeningBalance,
}

/// A single ledger posting: a signed amount against one account.
///
/// Exactly one of `debit` and `credit` is strictly positive. Postings that
/// belong to the same business document (all legs of one invoice, one
/// journal entry) share a `document_number`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable unique identifier
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    /// Account code this posting applies to
    pub account: String,
    pub debit: Decimal,
    pub credit: Decimal,
    #[serde(default)]
    pub vat: Decimal,
    #[serde(default)]
    pub document_number: String,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub notes: String,
}

impl Transaction {
    /// A debit posting. Amounts are quantized half-up to 2 decimal places.
    pub fn debit(date: NaiveDate, account: &str, amount: Decimal) -> Self {
        Transaction::new(date, account, round2(amount), Decimal::ZERO)
    }

    /// A credit posting. Amounts are quantized half-up to 2 decimal places.
    pub fn credit(date: NaiveDate, account: &str, amount: Decimal) -> Self {
        Transaction::new(date, account, Decimal::ZERO, round2(amount))
    }

    fn new(date: NaiveDate, account: &str, debit: Decimal, credit: Decimal) -> Self {
        Transaction {
            id: Uuid::new_v4().to_string(),
            date,
            description: String::new(),
            account: account.to_string(),
            debit,
            credit,
            vat: Decimal::ZERO,
            document_number: String::new(),
            status: TransactionStatus::Unreconciled,
            transaction_type: TransactionType::Manual,
            notes: String::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_vat(mut self, vat: Decimal) -> Self {
        self.vat = round2(vat);
        self
    }

    pub fn with_document_number(mut self, document_number: &str) -> Self {
        self.document_number = document_number.to_string();
        self
    }

    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    /// Signed balance delta this posting applies to its account.
    pub fn delta(&self) -> Decimal {
        self.debit - self.credit
    }

    /// Check the posting invariants: an account code is present and exactly
    /// one of debit/credit is strictly positive.
    pub fn validate(&self) -> Result<()> {
        if self.account.is_empty() {
            return Err(Error::ValidationFailed {
                field: "account",
                reason: "account code is required".to_string(),
            });
        }
        if self.debit < Decimal::ZERO || self.credit < Decimal::ZERO {
            return Err(Error::InvalidAmount {
                field: "debit/credit",
                reason: format!("must not be negative: {}/{}", self.debit, self.credit),
            });
        }
        if self.debit.is_zero() && self.credit.is_zero() {
            return Err(Error::InvalidAmount {
                field: "debit/credit",
                reason: "either debit or credit must be greater than zero".to_string(),
            });
        }
        if self.debit > Decimal::ZERO && self.credit > Decimal::ZERO {
            return Err(Error::InvalidAmount {
                field: "debit/credit",
                reason: "debit and credit cannot both be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// One leg of a journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLine {
    pub account: String,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    #[serde(default)]
    pub vat: Decimal,
}

impl JournalLine {
    pub fn debit(account: &str, amount: Decimal) -> Self {
        JournalLine {
            account: account.to_string(),
            debit: round2(amount),
            credit: Decimal::ZERO,
            vat: Decimal::ZERO,
        }
    }

    pub fn credit(account: &str, amount: Decimal) -> Self {
        JournalLine {
            account: account.to_string(),
            debit: Decimal::ZERO,
            credit: round2(amount),
            vat: Decimal::ZERO,
        }
    }
}

/// A balanced posting group: owns its legs and validates
/// `Σdebit == Σcredit` atomically before any leg is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    /// Generated as `JRN-{YYYYMMDD}-{8HEX}` when absent
    #[serde(default)]
    pub document_number: Option<String>,
    pub lines: Vec<JournalLine>,
    #[serde(default)]
    pub notes: String,
}

impl JournalEntry {
    pub fn new(date: NaiveDate, description: &str, lines: Vec<JournalLine>) -> Self {
        JournalEntry {
            date,
            description: description.to_string(),
            document_number: None,
            lines,
            notes: String::new(),
        }
    }

    pub fn total_debits(&self) -> Decimal {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credits(&self) -> Decimal {
        self.lines.iter().map(|l| l.credit).sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.lines.is_empty() {
            return Err(Error::ValidationFailed {
                field: "lines",
                reason: "journal entry needs at least one line".to_string(),
            });
        }
        let debits = self.total_debits();
        let credits = self.total_credits();
        if debits != credits {
            return Err(Error::UnbalancedJournal { debits, credits });
        }
        Ok(())
    }

    /// Expand into postings, one per leg, sharing a document number.
    /// Legs are validated individually as well as in aggregate.
    pub(crate) fn into_transactions(self) -> Result<Vec<Transaction>> {
        self.validate()?;
        let document_number = self
            .document_number
            .unwrap_or_else(|| generate_document_number("JRN", self.date));
        let mut transactions = Vec::with_capacity(self.lines.len());
        for line in self.lines {
            let tx = Transaction {
                id: Uuid::new_v4().to_string(),
                date: self.date,
                description: self.description.clone(),
                account: line.account,
                debit: round2(line.debit),
                credit: round2(line.credit),
                vat: round2(line.vat),
                document_number: document_number.clone(),
                status: TransactionStatus::Unreconciled,
                transaction_type: TransactionType::Journal,
                notes: self.notes.clone(),
            };
            tx.validate()?;
            transactions.push(tx);
        }
        Ok(transactions)
    }
}
