use crate::error::{Error, Result};
use crate::ledger::{check_period, Ledger};
use crate::transaction::round2;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Lifecycle of a VAT return. Submission is irreversible; a rejected return
/// is recalculated as a fresh draft, never edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatReturnStatus {
    #[default]
    Draft,
    Submitted,
    Accepted,
    Rejected,
}

/// A nine-box UK VAT return for one period.
///
/// Derived entirely from the ledger's transaction log, so recalculating the
/// same period over an unchanged ledger always produces the same boxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatReturn {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// `{yymm}-{yymm}` of the period bounds, e.g. "2404-2406"
    pub period_key: String,
    /// Box 1: VAT due on sales
    pub vat_due_sales: Decimal,
    /// Box 2: VAT due on EC acquisitions
    pub vat_due_acquisitions: Decimal,
    /// Box 3: total VAT due (box 1 + box 2)
    pub total_vat_due: Decimal,
    /// Box 4: VAT reclaimed on purchases
    pub vat_reclaimed: Decimal,
    /// Box 5: net VAT due, signed; negative means a repayment from HMRC
    pub net_vat_due: Decimal,
    /// Box 6: total sales ex VAT, whole pounds
    pub total_sales_ex_vat: Decimal,
    /// Box 7: total purchases ex VAT, whole pounds
    pub total_purchases_ex_vat: Decimal,
    /// Box 8: EC goods supplied ex VAT, whole pounds
    pub ec_goods_supplied_ex_vat: Decimal,
    /// Box 9: EC acquisitions ex VAT, whole pounds
    pub ec_acquisitions_ex_vat: Decimal,
    pub status: VatReturnStatus,
    /// Only set by an explicit [`finalise`](VatReturn::finalise) call
    pub finalised: bool,
    pub submission_date: Option<NaiveDate>,
}

impl VatReturn {
    /// Calculate the return for a period from the ledger. Read-only and
    /// idempotent.
    ///
    /// Box sources: box 1 sums credits to the VAT output account, box 4
    /// debits to VAT input, box 2 credits to the EC acquisitions VAT
    /// account when one is configured. Box 6 sums credits to the income
    /// accounts (code prefix "4"), box 7 debits to the expense accounts
    /// (prefix "5"); boxes 8 and 9 read the configured EC lanes and are
    /// included in boxes 6 and 7 respectively.
    pub fn calculate(ledger: &Ledger, start: NaiveDate, end: NaiveDate) -> Result<VatReturn> {
        check_period(start, end)?;
        let posting = ledger.posting_accounts();

        let mut vat_due_sales = Decimal::ZERO;
        let mut vat_due_acquisitions = Decimal::ZERO;
        let mut vat_reclaimed = Decimal::ZERO;
        let mut total_sales = Decimal::ZERO;
        let mut total_purchases = Decimal::ZERO;
        let mut ec_goods_supplied = Decimal::ZERO;
        let mut ec_acquisitions = Decimal::ZERO;

        for tx in ledger.transactions_in_period(start, end)? {
            if tx.account == posting.vat_output {
                vat_due_sales += tx.credit;
            } else if tx.account == posting.vat_input {
                vat_reclaimed += tx.debit;
            } else if posting.ec_vat_acquisitions.as_deref() == Some(tx.account.as_str()) {
                vat_due_acquisitions += tx.credit;
            } else if tx.account.starts_with('4') {
                total_sales += tx.credit;
                if posting.ec_sales.as_deref() == Some(tx.account.as_str()) {
                    ec_goods_supplied += tx.credit;
                }
            } else if tx.account.starts_with('5') {
                total_purchases += tx.debit;
                if posting.ec_purchases.as_deref() == Some(tx.account.as_str()) {
                    ec_acquisitions += tx.debit;
                }
            }
        }

        let total_vat_due = vat_due_sales + vat_due_acquisitions;
        let vat_return = VatReturn {
            period_start: start,
            period_end: end,
            period_key: format!("{}-{}", start.format("%y%m"), end.format("%y%m")),
            vat_due_sales: round2(vat_due_sales),
            vat_due_acquisitions: round2(vat_due_acquisitions),
            total_vat_due: round2(total_vat_due),
            vat_reclaimed: round2(vat_reclaimed),
            net_vat_due: round2(total_vat_due - vat_reclaimed),
            total_sales_ex_vat: pounds(total_sales),
            total_purchases_ex_vat: pounds(total_purchases),
            ec_goods_supplied_ex_vat: pounds(ec_goods_supplied),
            ec_acquisitions_ex_vat: pounds(ec_acquisitions),
            status: VatReturnStatus::Draft,
            finalised: false,
            submission_date: None,
        };
        log::info!(
            "vat return {} calculated: net due {}",
            vat_return.period_key,
            vat_return.net_vat_due
        );
        Ok(vat_return)
    }

    /// Internal consistency check for a snapshot that may have been
    /// persisted and reloaded: box 3 must equal box 1 + box 2 to within a
    /// penny.
    pub fn validate(&self) -> Result<()> {
        let expected = self.vat_due_sales + self.vat_due_acquisitions;
        if (self.total_vat_due - expected).abs() > Decimal::new(1, 2) {
            return Err(Error::ValidationFailed {
                field: "total_vat_due",
                reason: format!(
                    "box 3 is {} but boxes 1 + 2 sum to {}",
                    self.total_vat_due, expected
                ),
            });
        }
        Ok(())
    }

    /// Declare the figures final. Only a draft can be finalised.
    pub fn finalise(&mut self) -> Result<()> {
        if self.status != VatReturnStatus::Draft {
            return Err(self.state_error("only a draft return can be finalised"));
        }
        self.finalised = true;
        Ok(())
    }

    /// Mark as submitted to HMRC. Requires a consistent, finalised draft;
    /// irreversible.
    pub fn submit(&mut self, submission_date: NaiveDate) -> Result<()> {
        if self.status != VatReturnStatus::Draft {
            return Err(self.state_error("only a draft return can be submitted"));
        }
        if !self.finalised {
            return Err(self.state_error("return must be finalised before submission"));
        }
        self.validate()?;
        self.status = VatReturnStatus::Submitted;
        self.submission_date = Some(submission_date);
        log::info!("vat return {} submitted", self.period_key);
        Ok(())
    }

    pub fn accept(&mut self) -> Result<()> {
        if self.status != VatReturnStatus::Submitted {
            return Err(self.state_error("only a submitted return can be accepted"));
        }
        self.status = VatReturnStatus::Accepted;
        Ok(())
    }

    pub fn reject(&mut self) -> Result<()> {
        if self.status != VatReturnStatus::Submitted {
            return Err(self.state_error("only a submitted return can be rejected"));
        }
        self.status = VatReturnStatus::Rejected;
        Ok(())
    }

    fn state_error(&self, reason: &str) -> Error {
        Error::InvalidState(format!("{reason} (period {})", self.period_key))
    }
}

/// Whole-pound rounding used for boxes 6-9.
fn pounds(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::{Expense, ExpenseCategory};
    use crate::invoice::{Invoice, InvoiceItem, InvoiceType};
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn quarter_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        let invoice = Invoice::new(InvoiceType::Sales, date("2024-04-10"), "Acme Ltd")
            .with_item(InvoiceItem::new("Consulting", dec!(1), dec!(100), dec!(20)));
        ledger.add_invoice(invoice).unwrap();
        ledger
            .add_expense(Expense::new(
                date("2024-05-03"),
                ExpenseCategory::Office,
                "Stationery",
                dec!(50),
            ))
            .unwrap();
        ledger
    }

    #[test]
    fn boxes_from_one_sale_and_one_expense() {
        let ledger = quarter_ledger();
        let ret = VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();
        assert_eq!(ret.vat_due_sales, dec!(20.00));
        assert_eq!(ret.vat_due_acquisitions, dec!(0.00));
        assert_eq!(ret.total_vat_due, dec!(20.00));
        assert_eq!(ret.vat_reclaimed, dec!(10.00));
        assert_eq!(ret.net_vat_due, dec!(10.00));
        assert_eq!(ret.total_sales_ex_vat, dec!(100));
        assert_eq!(ret.total_purchases_ex_vat, dec!(50));
        assert_eq!(ret.period_key, "2404-2406");
    }

    #[test]
    fn net_vat_due_is_signed() {
        let mut ledger = Ledger::new();
        ledger
            .add_expense(Expense::new(
                date("2024-05-03"),
                ExpenseCategory::Software,
                "Licences",
                dec!(500),
            ))
            .unwrap();
        let ret = VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();
        // repayment position
        assert_eq!(ret.net_vat_due, dec!(-100.00));
    }

    #[test]
    fn calculation_is_idempotent() {
        let ledger = quarter_ledger();
        let a = VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();
        let b = VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn transactions_outside_period_excluded() {
        let ledger = quarter_ledger();
        let ret = VatReturn::calculate(&ledger, date("2024-07-01"), date("2024-09-30")).unwrap();
        assert_eq!(ret.net_vat_due, dec!(0.00));
        assert_eq!(ret.total_sales_ex_vat, dec!(0));
    }

    #[test]
    fn inverted_period_rejected() {
        let ledger = Ledger::new();
        assert!(matches!(
            VatReturn::calculate(&ledger, date("2024-06-30"), date("2024-04-01")),
            Err(Error::InvalidPeriod(_))
        ));
    }

    #[test]
    fn submission_lifecycle() {
        let ledger = quarter_ledger();
        let mut ret =
            VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();

        // cannot submit before finalising
        assert!(matches!(
            ret.submit(date("2024-07-07")),
            Err(Error::InvalidState(_))
        ));
        ret.finalise().unwrap();
        ret.submit(date("2024-07-07")).unwrap();
        assert_eq!(ret.status, VatReturnStatus::Submitted);
        assert_eq!(ret.submission_date, Some(date("2024-07-07")));

        // submission is irreversible
        assert!(matches!(
            ret.submit(date("2024-07-08")),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(ret.finalise(), Err(Error::InvalidState(_))));

        ret.accept().unwrap();
        assert_eq!(ret.status, VatReturnStatus::Accepted);
        assert!(matches!(ret.reject(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn tampered_snapshot_fails_consistency_check() {
        let ledger = quarter_ledger();
        let mut ret =
            VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();
        assert!(ret.validate().is_ok());

        ret.total_vat_due = dec!(999.00);
        ret.finalise().unwrap();
        assert!(matches!(
            ret.submit(date("2024-07-07")),
            Err(Error::ValidationFailed {
                field: "total_vat_due",
                ..
            })
        ));
    }

    #[test]
    fn rejected_after_submission() {
        let ledger = quarter_ledger();
        let mut ret =
            VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();
        ret.finalise().unwrap();
        ret.submit(date("2024-07-07")).unwrap();
        ret.reject().unwrap();
        assert_eq!(ret.status, VatReturnStatus::Rejected);
    }

    #[test]
    fn ec_lanes_feed_boxes_two_eight_and_nine() {
        use crate::account::{Account, AccountType};
        use crate::ledger::PostingAccounts;
        use crate::transaction::Transaction;

        let mut ledger = Ledger::new().with_posting_accounts(PostingAccounts {
            ec_vat_acquisitions: Some("2250".to_string()),
            ec_sales: Some("4400".to_string()),
            ec_purchases: Some("5050".to_string()),
            ..Default::default()
        });
        ledger
            .add_account(Account::new("2250", "VAT on EC Acquisitions", AccountType::Liability))
            .unwrap();
        ledger
            .add_account(Account::new("4400", "EC Sales", AccountType::Income))
            .unwrap();
        ledger
            .add_account(Account::new("5050", "EC Purchases", AccountType::Expense))
            .unwrap();

        ledger
            .add_transaction(Transaction::credit(date("2024-04-10"), "4400", dec!(300)))
            .unwrap();
        ledger
            .add_transaction(Transaction::debit(date("2024-04-12"), "5050", dec!(200)))
            .unwrap();
        ledger
            .add_transaction(Transaction::credit(date("2024-04-12"), "2250", dec!(40)))
            .unwrap();

        let ret = VatReturn::calculate(&ledger, date("2024-04-01"), date("2024-06-30")).unwrap();
        assert_eq!(ret.vat_due_acquisitions, dec!(40.00));
        assert_eq!(ret.total_vat_due, dec!(40.00));
        assert_eq!(ret.ec_goods_supplied_ex_vat, dec!(300));
        assert_eq!(ret.ec_acquisitions_ex_vat, dec!(200));
        // EC lanes are included in the headline boxes
        assert_eq!(ret.total_sales_ex_vat, dec!(300));
        assert_eq!(ret.total_purchases_ex_vat, dec!(200));
    }
}
