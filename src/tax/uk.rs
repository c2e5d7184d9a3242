use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Income tax band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBand {
    #[default]
    Basic,
    Higher,
    Additional,
}

/// UK tax year for personal taxes (runs 6 April to 5 April).
/// The inner value is the end year, so `TaxYear(2025)` is 2024-25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxYear(pub i32);

impl TaxYear {
    /// Parse the HMRC "YYYY-YY" form, e.g. "2024-25".
    pub fn parse(s: &str) -> Result<TaxYear> {
        let invalid = || Error::InvalidPeriod(format!("invalid tax year: {s}"));
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start: i32 = start.parse().map_err(|_| invalid())?;
        let end: i32 = end.parse().map_err(|_| invalid())?;
        if end != (start + 1) % 100 {
            return Err(invalid());
        }
        Ok(TaxYear(start + 1))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year();
        // on or after 6 April falls in the year ending next April
        if date >= apr(year, 6) {
            TaxYear(year + 1)
        } else {
            TaxYear(year)
        }
    }

    /// 6 April of the preceding calendar year.
    pub fn start_date(&self) -> NaiveDate {
        apr(self.0 - 1, 6)
    }

    /// 5 April.
    pub fn end_date(&self) -> NaiveDate {
        apr(self.0, 5)
    }

    /// Rate tables cover 2023-24 and 2024-25.
    pub fn ensure_supported(&self) -> Result<()> {
        if (2024..=2025).contains(&self.0) {
            Ok(())
        } else {
            Err(Error::UnknownTaxYear(self.to_string()))
        }
    }

    /// Personal allowance before any taper.
    pub fn personal_allowance(&self) -> Decimal {
        dec!(12570)
    }

    /// Adjusted net income above which the personal allowance tapers away,
    /// £1 for every £2.
    pub fn allowance_taper_threshold(&self) -> Decimal {
        dec!(100000)
    }

    /// Upper bound of the basic rate band (including the allowance).
    pub fn basic_rate_threshold(&self) -> Decimal {
        dec!(50270)
    }

    /// Upper bound of the higher rate band (including the allowance).
    pub fn higher_rate_threshold(&self) -> Decimal {
        dec!(125140)
    }

    pub fn income_rate(&self, band: TaxBand) -> Decimal {
        match band {
            TaxBand::Basic => dec!(0.20),
            TaxBand::Higher => dec!(0.40),
            TaxBand::Additional => dec!(0.45),
        }
    }

    pub fn dividend_allowance(&self) -> Decimal {
        match self.0 {
            // halved from April 2024
            2025.. => dec!(500),
            _ => dec!(1000),
        }
    }

    pub fn dividend_rate(&self, band: TaxBand) -> Decimal {
        match band {
            TaxBand::Basic => dec!(0.0875),
            TaxBand::Higher => dec!(0.3375),
            TaxBand::Additional => dec!(0.3935),
        }
    }

    /// Class 2 NI weekly rate.
    pub fn ni_class2_weekly(&self) -> Decimal {
        dec!(3.45)
    }

    /// Small profits threshold for Class 2 NI.
    pub fn ni_class2_threshold(&self) -> Decimal {
        dec!(12570)
    }

    /// Class 4 lower profits limit.
    pub fn ni_class4_lower(&self) -> Decimal {
        dec!(12570)
    }

    /// Class 4 upper profits limit.
    pub fn ni_class4_upper(&self) -> Decimal {
        dec!(50270)
    }

    /// Class 4 main rate, between the lower and upper limits.
    pub fn ni_class4_main_rate(&self) -> Decimal {
        match self.0 {
            // cut from 9% at April 2024
            2025.. => dec!(0.06),
            _ => dec!(0.09),
        }
    }

    /// Class 4 rate above the upper limit.
    pub fn ni_class4_upper_rate(&self) -> Decimal {
        dec!(0.02)
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.0 - 1, self.0 % 100)
    }
}

/// UK financial year for Corporation Tax (runs 1 April to 31 March).
/// The inner value is the start year, so `FinancialYear(2023)` is FY2023.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FinancialYear(pub i32);

impl FinancialYear {
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year();
        if date >= apr(year, 1) {
            FinancialYear(year)
        } else {
            FinancialYear(year - 1)
        }
    }

    /// Financial year an accounting period is taxed in: the year its
    /// midpoint falls in.
    pub fn for_period(start: NaiveDate, end: NaiveDate) -> Self {
        let days = (end - start).num_days();
        FinancialYear::from_date(start + chrono::Days::new((days / 2) as u64))
    }

    /// Rate tables cover FY2023 and FY2024.
    pub fn ensure_supported(&self) -> Result<()> {
        if (2023..=2024).contains(&self.0) {
            Ok(())
        } else {
            Err(Error::UnknownTaxYear(self.to_string()))
        }
    }

    /// Small profits rate, applied at or below the lower limit.
    pub fn small_profits_rate(&self) -> Decimal {
        dec!(0.19)
    }

    /// Main rate, applied at or above the upper limit.
    pub fn main_rate(&self) -> Decimal {
        dec!(0.25)
    }

    pub fn lower_limit(&self) -> Decimal {
        dec!(50000)
    }

    pub fn upper_limit(&self) -> Decimal {
        dec!(250000)
    }
}

impl std::fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.0, (self.0 + 1) % 100)
    }
}

fn apr(year: i32, day: u32) -> NaiveDate {
    // 1..=6 April always exists
    NaiveDate::from_ymd_opt(year, 4, day).unwrap()
}
