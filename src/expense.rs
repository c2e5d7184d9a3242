use crate::error::{Error, Result};
use crate::ledger::PostingAccounts;
use crate::transaction::{generate_document_number, round2, Transaction, TransactionType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Expense category, resolved to an expense account via [`PostingAccounts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Office,
    Travel,
    Marketing,
    Rent,
    Utilities,
    Software,
    Professional,
    Salary,
    Bank,
    Other,
}

/// How an expense was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    #[default]
    Bank,
}

/// A directly-paid business expense (no supplier invoice).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    /// `EXP-{YYYYMMDD}-{8HEX}`, generated when not supplied
    pub receipt_number: String,
    pub date: NaiveDate,
    pub description: String,
    pub category: ExpenseCategory,
    /// Net amount, excluding VAT
    pub amount: Decimal,
    pub vat: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_auto_post")]
    pub auto_post: bool,
}

fn default_auto_post() -> bool {
    true
}

impl Expense {
    /// New expense with VAT derived at the default 20% rate.
    pub fn new(
        date: NaiveDate,
        category: ExpenseCategory,
        description: &str,
        amount: Decimal,
    ) -> Self {
        let amount = round2(amount);
        Expense {
            id: Uuid::new_v4().to_string(),
            receipt_number: generate_document_number("EXP", date),
            date,
            description: description.to_string(),
            category,
            amount,
            vat: round2(amount * dec!(20) / dec!(100)),
            payment_method: PaymentMethod::Bank,
            notes: String::new(),
            auto_post: true,
        }
    }

    /// Recompute VAT at the given percent rate.
    pub fn with_vat_rate(mut self, vat_rate: Decimal) -> Self {
        self.vat = round2(self.amount * vat_rate / dec!(100));
        self
    }

    pub fn with_vat(mut self, vat: Decimal) -> Self {
        self.vat = round2(vat);
        self
    }

    pub fn with_payment_method(mut self, payment_method: PaymentMethod) -> Self {
        self.payment_method = payment_method;
        self
    }

    pub fn with_receipt_number(mut self, receipt_number: &str) -> Self {
        self.receipt_number = receipt_number.to_string();
        self
    }

    pub fn without_auto_post(mut self) -> Self {
        self.auto_post = false;
        self
    }

    pub fn total(&self) -> Decimal {
        self.amount + self.vat
    }

    pub fn validate(&self) -> Result<()> {
        if self.description.is_empty() {
            return Err(Error::ValidationFailed {
                field: "description",
                reason: "expense description is required".to_string(),
            });
        }
        if self.amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount {
                field: "amount",
                reason: format!("must be positive: {}", self.amount),
            });
        }
        Ok(())
    }

    /// Posting recipe: debit the category's expense account for the net
    /// amount, debit VAT input if any, credit cash/bank for the gross.
    pub(crate) fn posting_legs(&self, accounts: &PostingAccounts) -> Result<Vec<Transaction>> {
        self.validate()?;
        let expense_account = accounts.expense_account(self.category);
        let settlement_account = match self.payment_method {
            PaymentMethod::Cash => &accounts.cash,
            PaymentMethod::Bank => &accounts.bank,
        };

        let leg = |tx: Transaction| {
            tx.with_description(&self.description)
                .with_document_number(&self.receipt_number)
                .with_type(TransactionType::Expense)
                .with_notes(&self.notes)
        };

        let mut legs = vec![leg(Transaction::debit(
            self.date,
            expense_account,
            self.amount,
        ))];
        if self.vat > Decimal::ZERO {
            legs.push(leg(Transaction::debit(self.date, &accounts.vat_input, self.vat)).with_vat(self.vat));
        }
        legs.push(leg(Transaction::credit(
            self.date,
            settlement_account,
            self.total(),
        )));
        Ok(legs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn vat_defaults_to_twenty_percent() {
        let expense = Expense::new(date("2024-05-01"), ExpenseCategory::Office, "Stationery", dec!(50));
        assert_eq!(expense.vat, dec!(10.00));
        assert_eq!(expense.total(), dec!(60.00));
    }

    #[test]
    fn zero_rate_drops_vat_leg() {
        let expense = Expense::new(date("2024-05-01"), ExpenseCategory::Salary, "Payroll", dec!(2000))
            .with_vat_rate(dec!(0));
        let legs = expense.posting_legs(&PostingAccounts::default()).unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!((legs[0].account.as_str(), legs[0].debit), ("5100", dec!(2000.00)));
        assert_eq!((legs[1].account.as_str(), legs[1].credit), ("1100", dec!(2000.00)));
    }

    #[test]
    fn bank_payment_posts_three_legs() {
        let expense = Expense::new(date("2024-05-01"), ExpenseCategory::Travel, "Train to client", dec!(80));
        let legs = expense.posting_legs(&PostingAccounts::default()).unwrap();
        assert_eq!(legs.len(), 3);
        assert_eq!((legs[0].account.as_str(), legs[0].debit), ("5700", dec!(80.00)));
        assert_eq!((legs[1].account.as_str(), legs[1].debit), ("2200", dec!(16.00)));
        assert_eq!((legs[2].account.as_str(), legs[2].credit), ("1100", dec!(96.00)));
        assert!(legs.iter().all(|l| l.transaction_type == TransactionType::Expense));
        assert!(legs
            .iter()
            .all(|l| l.document_number == expense.receipt_number));
    }

    #[test]
    fn cash_payment_credits_petty_cash() {
        let expense = Expense::new(date("2024-05-01"), ExpenseCategory::Office, "Stamps", dec!(10))
            .with_payment_method(PaymentMethod::Cash);
        let legs = expense.posting_legs(&PostingAccounts::default()).unwrap();
        assert_eq!(legs.last().unwrap().account, "1000");
    }

    #[test]
    fn non_positive_amount_rejected() {
        let expense = Expense::new(date("2024-05-01"), ExpenseCategory::Office, "Nothing", dec!(0));
        assert!(matches!(
            expense.validate(),
            Err(Error::InvalidAmount { field: "amount", .. })
        ));
    }

    #[test]
    fn receipt_number_format() {
        let expense = Expense::new(date("2024-05-01"), ExpenseCategory::Office, "Stationery", dec!(50));
        assert!(expense.receipt_number.starts_with("EXP-20240501-"));
    }
}
