use crate::error::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Account type, determines the sign convention for debits and credits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl AccountType {
    /// Whether a debit increases the balance of an account of this type
    pub fn debit_increases(self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

/// Sub-classification within an account type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    CurrentAsset,
    FixedAsset,
    CurrentLiability,
    LongTermLiability,
    Equity,
    Revenue,
    CostOfSales,
    OperatingExpense,
    FinancialExpense,
    OtherIncome,
}

/// A single account in the chart of accounts.
///
/// `balance` is a materialized projection maintained by the [`Ledger`];
/// it can always be rebuilt from the transaction log via `Ledger::refresh`.
///
/// [`Ledger`]: crate::ledger::Ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique account code, e.g. "1200"
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub category: Option<AccountCategory>,
    /// Default VAT rate (percent) associated with this account
    #[serde(default)]
    pub vat_rate: Decimal,
    /// Whether this account counts as trading for Corporation Tax
    #[serde(default = "default_trading")]
    pub trading: bool,
    #[serde(default)]
    pub balance: Decimal,
}

fn default_trading() -> bool {
    true
}

impl Account {
    pub fn new(code: &str, name: &str, account_type: AccountType) -> Self {
        Account {
            code: code.to_string(),
            name: name.to_string(),
            account_type,
            category: None,
            vat_rate: Decimal::ZERO,
            trading: true,
            balance: Decimal::ZERO,
        }
    }

    pub fn with_category(mut self, category: AccountCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_vat_rate(mut self, vat_rate: Decimal) -> Self {
        self.vat_rate = vat_rate;
        self
    }

    pub fn non_trading(mut self) -> Self {
        self.trading = false;
        self
    }

    /// Apply a debit. Increases asset/expense balances, decreases the rest.
    /// Returns the new balance.
    pub fn debit(&mut self, amount: Decimal) -> Result<Decimal> {
        let amount = validate_amount("debit", amount)?;
        if self.account_type.debit_increases() {
            self.balance += amount;
        } else {
            self.balance -= amount;
        }
        log::debug!("debit {}: {} -> {}", self.code, amount, self.balance);
        Ok(self.balance)
    }

    /// Apply a credit. Decreases asset/expense balances, increases the rest.
    /// Returns the new balance.
    pub fn credit(&mut self, amount: Decimal) -> Result<Decimal> {
        let amount = validate_amount("credit", amount)?;
        if self.account_type.debit_increases() {
            self.balance -= amount;
        } else {
            self.balance += amount;
        }
        log::debug!("credit {}: {} -> {}", self.code, amount, self.balance);
        Ok(self.balance)
    }

    pub fn reset_balance(&mut self) {
        self.balance = Decimal::ZERO;
    }
}

fn validate_amount(field: &'static str, amount: Decimal) -> Result<Decimal> {
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount {
            field,
            reason: format!("must not be negative: {amount}"),
        });
    }
    Ok(amount)
}

/// Fields of an account that may change after creation.
/// The account type is fixed for the lifetime of the account.
#[derive(Debug, Default, Clone)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub category: Option<AccountCategory>,
    pub vat_rate: Option<Decimal>,
    pub trading: Option<bool>,
}

/// The chart of accounts, keyed by account code.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ChartOfAccounts {
    accounts: Vec<Account>,
}

impl ChartOfAccounts {
    pub fn new() -> Self {
        ChartOfAccounts::default()
    }

    /// Add an account. Fails if the code is already taken.
    pub fn add(&mut self, account: Account) -> Result<()> {
        if self.accounts.iter().any(|a| a.code == account.code) {
            return Err(Error::DuplicateAccount(account.code));
        }
        log::debug!("account added: {} - {}", account.code, account.name);
        self.accounts.push(account);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Result<&Account> {
        self.accounts
            .iter()
            .find(|a| a.code == code)
            .ok_or_else(|| Error::AccountNotFound(code.to_string()))
    }

    pub fn get_mut(&mut self, code: &str) -> Result<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|a| a.code == code)
            .ok_or_else(|| Error::AccountNotFound(code.to_string()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.accounts.iter().any(|a| a.code == code)
    }

    /// Update the mutable fields of an account.
    pub fn update(&mut self, code: &str, update: AccountUpdate) -> Result<&Account> {
        let account = self.get_mut(code)?;
        if let Some(name) = update.name {
            account.name = name;
        }
        if let Some(category) = update.category {
            account.category = Some(category);
        }
        if let Some(vat_rate) = update.vat_rate {
            account.vat_rate = vat_rate;
        }
        if let Some(trading) = update.trading {
            account.trading = trading;
        }
        Ok(account)
    }

    /// Remove an account. Existing postings referencing it are not checked.
    pub fn remove(&mut self, code: &str) -> Result<Account> {
        let idx = self
            .accounts
            .iter()
            .position(|a| a.code == code)
            .ok_or_else(|| Error::AccountNotFound(code.to_string()))?;
        Ok(self.accounts.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Account> {
        self.accounts.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn by_type(&self, account_type: AccountType) -> Vec<&Account> {
        self.accounts
            .iter()
            .filter(|a| a.account_type == account_type)
            .collect()
    }

    pub fn by_category(&self, category: AccountCategory) -> Vec<&Account> {
        self.accounts
            .iter()
            .filter(|a| a.category == Some(category))
            .collect()
    }

    /// The standard UK chart seeded when no chart exists yet.
    pub fn default_uk() -> Self {
        use AccountCategory::*;
        use AccountType::*;

        let vat = dec!(20);
        let mut chart = ChartOfAccounts::new();
        let accounts = vec![
            // Assets (1000-1999)
            Account::new("1000", "Petty Cash", Asset).with_category(CurrentAsset),
            Account::new("1100", "Bank Current Account", Asset).with_category(CurrentAsset),
            Account::new("1200", "Accounts Receivable", Asset).with_category(CurrentAsset),
            Account::new("1300", "Inventory", Asset).with_category(CurrentAsset),
            Account::new("1400", "Prepaid Expenses", Asset).with_category(CurrentAsset),
            Account::new("1500", "Fixed Assets", Asset).with_category(FixedAsset),
            Account::new("1600", "Accumulated Depreciation", Asset).with_category(FixedAsset),
            // Liabilities (2000-2999)
            Account::new("2000", "Accounts Payable", Liability).with_category(CurrentLiability),
            Account::new("2100", "VAT Output", Liability).with_category(CurrentLiability),
            // recoverable VAT is owed to the business
            Account::new("2200", "VAT Input", Asset).with_category(CurrentAsset),
            Account::new("2300", "Taxes Payable", Liability).with_category(CurrentLiability),
            Account::new("2400", "Long Term Loans", Liability).with_category(LongTermLiability),
            // Equity (3000-3999)
            Account::new("3000", "Capital", AccountType::Equity)
                .with_category(AccountCategory::Equity),
            Account::new("3100", "Retained Earnings", AccountType::Equity)
                .with_category(AccountCategory::Equity),
            Account::new("3200", "Current Year Earnings", AccountType::Equity)
                .with_category(AccountCategory::Equity),
            // Income (4000-4999)
            Account::new("4000", "Sales Revenue", Income)
                .with_category(Revenue)
                .with_vat_rate(vat),
            Account::new("4100", "Service Revenue", Income)
                .with_category(Revenue)
                .with_vat_rate(vat),
            Account::new("4200", "Discounts Given", Income)
                .with_category(Revenue)
                .with_vat_rate(vat),
            Account::new("4300", "Other Income", Income)
                .with_category(OtherIncome)
                .non_trading(),
            // Expenses (5000-5999)
            Account::new("5000", "Cost of Goods Sold", Expense)
                .with_category(CostOfSales)
                .with_vat_rate(vat),
            Account::new("5100", "Salaries and Wages", Expense).with_category(OperatingExpense),
            Account::new("5200", "Rent", Expense)
                .with_category(OperatingExpense)
                .with_vat_rate(vat),
            Account::new("5300", "Office Expenses", Expense)
                .with_category(OperatingExpense)
                .with_vat_rate(vat),
            Account::new("5400", "Depreciation", Expense).with_category(OperatingExpense),
            Account::new("5500", "Marketing and Advertising", Expense)
                .with_category(OperatingExpense)
                .with_vat_rate(vat),
            Account::new("5600", "Communication", Expense)
                .with_category(OperatingExpense)
                .with_vat_rate(vat),
            Account::new("5700", "Travel and Accommodation", Expense)
                .with_category(OperatingExpense)
                .with_vat_rate(vat),
            Account::new("5800", "Professional Services", Expense)
                .with_category(OperatingExpense)
                .with_vat_rate(vat),
            Account::new("5900", "Bank Charges", Expense)
                .with_category(FinancialExpense)
                .non_trading(),
        ];
        for account in accounts {
            // codes are distinct by construction
            let _ = chart.add(account);
        }
        log::info!("seeded default UK chart of accounts ({} accounts)", chart.len());
        chart
    }
}
