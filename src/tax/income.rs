use crate::error::Result;
use crate::tax::uk::{TaxBand, TaxYear};
use crate::transaction::round2;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Income and deductions for one individual in one tax year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeSources {
    pub employment: Decimal,
    pub self_employment: Decimal,
    pub property: Decimal,
    pub dividends: Decimal,
    pub pension_contributions: Decimal,
    pub gift_aid_donations: Decimal,
    pub other_deductions: Decimal,
}

impl IncomeSources {
    /// Sole-trader convenience: aggregate the ledger's income and expense
    /// accounts over the tax year into a self-employment profit figure.
    /// Other sources and deductions start at zero and can be filled in.
    pub fn self_employment_from_ledger(
        ledger: &crate::ledger::Ledger,
        tax_year: TaxYear,
    ) -> Result<Self> {
        use crate::account::AccountType;

        let mut income = Decimal::ZERO;
        let mut expenses = Decimal::ZERO;
        for tx in ledger.transactions_in_period(tax_year.start_date(), tax_year.end_date())? {
            let Ok(account) = ledger.accounts().get(&tx.account) else {
                continue;
            };
            match account.account_type {
                AccountType::Income => income += tx.credit - tx.debit,
                AccountType::Expense => expenses += tx.debit - tx.credit,
                _ => {}
            }
        }
        Ok(IncomeSources {
            self_employment: (income - expenses).max(Decimal::ZERO),
            ..Default::default()
        })
    }

    pub fn total_income(&self) -> Decimal {
        self.employment + self.self_employment + self.property + self.dividends
    }

    pub fn total_deductions(&self) -> Decimal {
        self.pension_contributions + self.gift_aid_donations + self.other_deductions
    }
}

/// One band's slice of taxable income and the tax charged on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSlice {
    pub amount: Decimal,
    pub tax: Decimal,
}

/// Class 2 and Class 4 National Insurance on self-employment profits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalInsurance {
    pub class2: Decimal,
    pub class4: Decimal,
}

impl NationalInsurance {
    pub fn total(&self) -> Decimal {
        self.class2 + self.class4
    }
}

/// A full Self Assessment style computation for one tax year.
///
/// Non-dividend income fills the bands first; dividends are then taxed at
/// the dividend rates in whatever headroom each band has left, so dividend
/// income can never drop into a band other income has already consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTaxAssessment {
    pub tax_year: TaxYear,
    pub total_income: Decimal,
    pub total_deductions: Decimal,
    pub taxable_income: Decimal,
    /// Personal allowance after the high-income taper
    pub personal_allowance: Decimal,
    pub taxable_after_allowance: Decimal,
    pub basic: BandSlice,
    pub higher: BandSlice,
    pub additional: BandSlice,
    /// Tax on non-dividend income across the three bands
    pub income_tax: Decimal,
    pub dividend_basic: BandSlice,
    pub dividend_higher: BandSlice,
    pub dividend_additional: BandSlice,
    pub dividend_tax: Decimal,
    pub total_income_tax: Decimal,
    pub national_insurance: NationalInsurance,
    pub total_tax_and_ni: Decimal,
}

impl IncomeTaxAssessment {
    pub fn calculate(tax_year: TaxYear, sources: &IncomeSources) -> Result<Self> {
        tax_year.ensure_supported()?;

        let total_income = sources.total_income();
        let total_deductions = sources.total_deductions();
        let taxable_income = (total_income - total_deductions).max(Decimal::ZERO);

        // taper: £1 off for every £2 of total income over the threshold
        let mut personal_allowance = tax_year.personal_allowance();
        let taper_threshold = tax_year.allowance_taper_threshold();
        if total_income > taper_threshold {
            let reduction =
                ((total_income - taper_threshold) / Decimal::TWO).min(personal_allowance);
            personal_allowance -= reduction;
        }

        let taxable_after_allowance = (taxable_income - personal_allowance).max(Decimal::ZERO);

        // band widths are measured from the standard allowance, so the
        // taper does not widen the basic band
        let basic_width = tax_year.basic_rate_threshold() - tax_year.personal_allowance();
        let higher_width = tax_year.higher_rate_threshold() - tax_year.basic_rate_threshold();

        let non_dividend = (taxable_after_allowance - sources.dividends).max(Decimal::ZERO);
        let basic_amount = non_dividend.min(basic_width);
        let higher_amount = (non_dividend - basic_amount).min(higher_width);
        let additional_amount = non_dividend - basic_amount - higher_amount;

        let slice = |amount: Decimal, band: TaxBand| BandSlice {
            amount: round2(amount),
            tax: round2(amount * tax_year.income_rate(band)),
        };
        let basic = slice(basic_amount, TaxBand::Basic);
        let higher = slice(higher_amount, TaxBand::Higher);
        let additional = slice(additional_amount, TaxBand::Additional);
        let income_tax = basic.tax + higher.tax + additional.tax;

        // dividends take the band headroom left by other income; only the
        // part of them still in charge after the personal allowance counts
        let dividend_in_charge = (taxable_after_allowance - non_dividend).max(Decimal::ZERO);
        let taxable_dividend =
            (dividend_in_charge - tax_year.dividend_allowance()).max(Decimal::ZERO);
        let basic_headroom = (basic_width - non_dividend).max(Decimal::ZERO);
        let higher_headroom =
            (higher_width - (non_dividend - basic_width).max(Decimal::ZERO)).max(Decimal::ZERO);

        let div_basic_amount = taxable_dividend.min(basic_headroom);
        let div_higher_amount = (taxable_dividend - div_basic_amount).min(higher_headroom);
        let div_additional_amount = taxable_dividend - div_basic_amount - div_higher_amount;

        let div_slice = |amount: Decimal, band: TaxBand| BandSlice {
            amount: round2(amount),
            tax: round2(amount * tax_year.dividend_rate(band)),
        };
        let dividend_basic = div_slice(div_basic_amount, TaxBand::Basic);
        let dividend_higher = div_slice(div_higher_amount, TaxBand::Higher);
        let dividend_additional = div_slice(div_additional_amount, TaxBand::Additional);
        let dividend_tax = dividend_basic.tax + dividend_higher.tax + dividend_additional.tax;

        let national_insurance = national_insurance(tax_year, sources.self_employment);
        let total_income_tax = income_tax + dividend_tax;

        let assessment = IncomeTaxAssessment {
            tax_year,
            total_income: round2(total_income),
            total_deductions: round2(total_deductions),
            taxable_income: round2(taxable_income),
            personal_allowance: round2(personal_allowance),
            taxable_after_allowance: round2(taxable_after_allowance),
            basic,
            higher,
            additional,
            income_tax: round2(income_tax),
            dividend_basic,
            dividend_higher,
            dividend_additional,
            dividend_tax: round2(dividend_tax),
            total_income_tax: round2(total_income_tax),
            national_insurance,
            total_tax_and_ni: round2(total_income_tax + national_insurance.total()),
        };
        log::info!(
            "income tax {}: taxable {} due {}",
            tax_year,
            assessment.taxable_after_allowance,
            assessment.total_tax_and_ni
        );
        Ok(assessment)
    }
}

fn national_insurance(tax_year: TaxYear, profits: Decimal) -> NationalInsurance {
    let class2 = if profits > tax_year.ni_class2_threshold() {
        tax_year.ni_class2_weekly() * Decimal::from(52)
    } else {
        Decimal::ZERO
    };

    let lower = tax_year.ni_class4_lower();
    let upper = tax_year.ni_class4_upper();
    let mut class4 = Decimal::ZERO;
    if profits > lower {
        class4 += (profits.min(upper) - lower) * tax_year.ni_class4_main_rate();
    }
    if profits > upper {
        class4 += (profits - upper) * tax_year.ni_class4_upper_rate();
    }

    NationalInsurance {
        class2: round2(class2),
        class4: round2(class4),
    }
}
