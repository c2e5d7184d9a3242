use crate::account::AccountType;
use crate::error::Result;
use crate::ledger::{check_period, Ledger};
use crate::tax::uk::FinancialYear;
use crate::transaction::round2;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Income or expense totals split by trading status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingSplit {
    pub trading: Decimal,
    pub non_trading: Decimal,
}

impl TradingSplit {
    pub fn total(&self) -> Decimal {
        self.trading + self.non_trading
    }
}

/// A Corporation Tax computation for one accounting period.
///
/// Income and expenses are aggregated from the ledger's income and expense
/// accounts, split by each account's trading flag. Marginal relief applies
/// between the lower and upper profit limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporationTaxComputation {
    pub financial_year: FinancialYear,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub income: TradingSplit,
    pub expenses: TradingSplit,
    /// Profit floored at zero; a loss produces no tax charge
    pub taxable_profit: Decimal,
    pub marginal_relief: Decimal,
    pub tax_due: Decimal,
    /// Percent of taxable profit, zero when there is no profit
    pub effective_rate: Decimal,
}

impl CorporationTaxComputation {
    /// Compute the charge for an accounting period. The financial year is
    /// the one the period's midpoint falls in.
    pub fn calculate(ledger: &Ledger, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        check_period(start, end)?;
        let year = FinancialYear::for_period(start, end);
        year.ensure_supported()?;

        let mut income = TradingSplit {
            trading: Decimal::ZERO,
            non_trading: Decimal::ZERO,
        };
        let mut expenses = TradingSplit {
            trading: Decimal::ZERO,
            non_trading: Decimal::ZERO,
        };

        for tx in ledger.transactions_in_period(start, end)? {
            let Ok(account) = ledger.accounts().get(&tx.account) else {
                continue;
            };
            match account.account_type {
                AccountType::Income => {
                    let amount = tx.credit - tx.debit;
                    if account.trading {
                        income.trading += amount;
                    } else {
                        income.non_trading += amount;
                    }
                }
                AccountType::Expense => {
                    let amount = tx.debit - tx.credit;
                    if account.trading {
                        expenses.trading += amount;
                    } else {
                        expenses.non_trading += amount;
                    }
                }
                _ => {}
            }
        }

        let taxable_profit = (income.total() - expenses.total()).max(Decimal::ZERO);
        let (tax_due, marginal_relief) = charge(year, taxable_profit);

        let effective_rate = if taxable_profit > Decimal::ZERO {
            round2(tax_due / taxable_profit * Decimal::ONE_HUNDRED)
        } else {
            Decimal::ZERO
        };

        let computation = CorporationTaxComputation {
            financial_year: year,
            period_start: start,
            period_end: end,
            income: TradingSplit {
                trading: round2(income.trading),
                non_trading: round2(income.non_trading),
            },
            expenses: TradingSplit {
                trading: round2(expenses.trading),
                non_trading: round2(expenses.non_trading),
            },
            taxable_profit: round2(taxable_profit),
            marginal_relief: round2(marginal_relief),
            tax_due: round2(tax_due),
            effective_rate,
        };
        log::info!(
            "corporation tax {}: profit {} due {}",
            year,
            computation.taxable_profit,
            computation.tax_due
        );
        Ok(computation)
    }

    pub fn total_income(&self) -> Decimal {
        self.income.total()
    }

    pub fn total_expenses(&self) -> Decimal {
        self.expenses.total()
    }
}

/// Tax due and marginal relief for a profit figure.
///
/// At or below the lower limit the small profits rate applies; at or above
/// the upper limit the main rate applies. In between, tax at the main rate
/// is reduced by `(main - small) * L * (U - P) / (U - L)`, which meets the
/// small-profits charge exactly at the lower limit and vanishes at the
/// upper limit, so the charge is continuous across both band edges.
fn charge(year: FinancialYear, profit: Decimal) -> (Decimal, Decimal) {
    let lower = year.lower_limit();
    let upper = year.upper_limit();

    if profit <= lower {
        (profit * year.small_profits_rate(), Decimal::ZERO)
    } else if profit >= upper {
        (profit * year.main_rate(), Decimal::ZERO)
    } else {
        let rate_gap = year.main_rate() - year.small_profits_rate();
        let relief = rate_gap * lower * (upper - profit) / (upper - lower);
        (profit * year.main_rate() - relief, relief)
    }
}
