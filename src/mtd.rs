//! Wire payload shapes for HMRC's Making Tax Digital APIs.
//!
//! The OAuth2/HTTP client itself lives outside this crate; these types are
//! the boundary it is fed through. Field names serialize in the camelCase
//! form the HMRC schemas use, and a JSON schema can be generated for each
//! payload via [`schemars`].

use crate::tax::{CorporationTaxComputation, VatReturn};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The nine-box VAT return payload.
///
/// `finalised` is the taxpayer's declaration and is never set by
/// conversion; call [`finalise`](VatSubmission::finalise) explicitly once
/// the figures have been confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VatSubmission {
    pub period_key: String,
    /// Box 1
    pub vat_due_sales: Decimal,
    /// Box 2
    pub vat_due_acquisitions: Decimal,
    /// Box 3
    pub total_vat_due: Decimal,
    /// Box 4
    pub vat_reclaimed_curr_period: Decimal,
    /// Box 5
    pub net_vat_due: Decimal,
    /// Box 6
    #[serde(rename = "totalValueSalesExVAT")]
    pub total_value_sales_ex_vat: Decimal,
    /// Box 7
    #[serde(rename = "totalValuePurchasesExVAT")]
    pub total_value_purchases_ex_vat: Decimal,
    /// Box 8
    #[serde(rename = "totalValueGoodsSuppliedExVAT")]
    pub total_value_goods_supplied_ex_vat: Decimal,
    /// Box 9
    #[serde(rename = "totalAcquisitionsExVAT")]
    pub total_acquisitions_ex_vat: Decimal,
    pub finalised: bool,
}

impl VatSubmission {
    pub fn finalise(mut self) -> Self {
        self.finalised = true;
        self
    }
}

impl From<&VatReturn> for VatSubmission {
    fn from(ret: &VatReturn) -> Self {
        VatSubmission {
            period_key: ret.period_key.clone(),
            vat_due_sales: ret.vat_due_sales,
            vat_due_acquisitions: ret.vat_due_acquisitions,
            total_vat_due: ret.total_vat_due,
            vat_reclaimed_curr_period: ret.vat_reclaimed,
            net_vat_due: ret.net_vat_due,
            total_value_sales_ex_vat: ret.total_sales_ex_vat,
            total_value_purchases_ex_vat: ret.total_purchases_ex_vat,
            total_value_goods_supplied_ex_vat: ret.ec_goods_supplied_ex_vat,
            total_acquisitions_ex_vat: ret.ec_acquisitions_ex_vat,
            finalised: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountingPeriod {
    /// YYYY-MM-DD
    pub start_date: String,
    /// YYYY-MM-DD
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeBreakdown {
    pub trading_income: Decimal,
    pub non_trading_income: Decimal,
    pub total_income: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpensesBreakdown {
    pub trading_expenses: Decimal,
    pub non_trading_expenses: Decimal,
    pub total_expenses: Decimal,
}

/// Corporation Tax return payload.
///
/// `declaration` mirrors `finalised` on the VAT side: conversion leaves it
/// false and [`declare`](CorporationTaxSubmission::declare) must be called
/// explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorporationTaxSubmission {
    pub company_name: String,
    pub company_registration_number: String,
    pub accounting_period: AccountingPeriod,
    pub income: IncomeBreakdown,
    pub expenses: ExpensesBreakdown,
    pub taxable_profit: Decimal,
    pub tax_due: Decimal,
    pub declaration: bool,
}

impl CorporationTaxSubmission {
    pub fn new(
        computation: &CorporationTaxComputation,
        company_name: &str,
        company_registration_number: &str,
    ) -> Self {
        CorporationTaxSubmission {
            company_name: company_name.to_string(),
            company_registration_number: company_registration_number.to_string(),
            accounting_period: AccountingPeriod {
                start_date: computation.period_start.format("%Y-%m-%d").to_string(),
                end_date: computation.period_end.format("%Y-%m-%d").to_string(),
            },
            income: IncomeBreakdown {
                trading_income: computation.income.trading,
                non_trading_income: computation.income.non_trading,
                total_income: computation.total_income(),
            },
            expenses: ExpensesBreakdown {
                trading_expenses: computation.expenses.trading,
                non_trading_expenses: computation.expenses.non_trading,
                total_expenses: computation.total_expenses(),
            },
            taxable_profit: computation.taxable_profit,
            tax_due: computation.tax_due,
            declaration: false,
        }
    }

    pub fn declare(mut self) -> Self {
        self.declaration = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::transaction::Transaction;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn vat_submission_serializes_hmrc_field_names() {
        let mut ledger = Ledger::new();
        ledger
            .add_transaction(Transaction::credit(date("2024-04-10"), "2100", dec!(20)))
            .unwrap();
        let ret = VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();
        let submission = VatSubmission::from(&ret);

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["periodKey"], "2404-2406");
        assert_eq!(json["vatDueSales"], serde_json::json!("20.00"));
        assert!(json.get("totalValueSalesExVAT").is_some());
        assert!(json.get("vatReclaimedCurrPeriod").is_some());
        assert_eq!(json["finalised"], serde_json::json!(false));
    }

    #[test]
    fn finalised_only_by_explicit_call() {
        let mut ledger = Ledger::new();
        ledger
            .add_transaction(Transaction::credit(date("2024-04-10"), "2100", dec!(20)))
            .unwrap();
        let ret = VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();
        let submission = VatSubmission::from(&ret);
        assert!(!submission.finalised);
        assert!(submission.finalise().finalised);
    }

    #[test]
    fn corporation_tax_submission_shape() {
        let mut ledger = Ledger::new();
        ledger
            .add_transaction(Transaction::credit(date("2023-06-01"), "4000", dec!(50000)))
            .unwrap();
        let computation = crate::tax::CorporationTaxComputation::calculate(
            &ledger,
            date("2023-04-01"),
            date("2024-03-31"),
        )
        .unwrap();
        let submission =
            CorporationTaxSubmission::new(&computation, "Acme Ltd", "01234567");

        assert!(!submission.declaration);
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["companyName"], "Acme Ltd");
        assert_eq!(json["accountingPeriod"]["startDate"], "2023-04-01");
        assert_eq!(json["income"]["tradingIncome"], serde_json::json!("50000.00"));
        assert_eq!(json["taxDue"], serde_json::json!("9500.00"));
    }

    #[test]
    fn payload_schema_generates() {
        let schema = schemars::schema_for!(VatSubmission);
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json["properties"].get("periodKey").is_some());
    }
}
