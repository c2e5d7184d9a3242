use crate::error::{Error, Result};
use crate::ledger::PostingAccounts;
use crate::transaction::{generate_document_number, round2, Transaction, TransactionType};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Sales,
    Purchase,
}

impl InvoiceType {
    fn number_prefix(self) -> &'static str {
        match self {
            InvoiceType::Sales => "INV",
            InvoiceType::Purchase => "PUR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Partial,
    Overdue,
}

/// A single invoice line.
///
/// `net`, `vat` and `total` are derived at construction and each rounded
/// half-up to 2 decimal places independently, before any summation at the
/// invoice level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// VAT rate in percent
    pub vat_rate: Decimal,
    pub net_amount: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceItem {
    pub fn new(description: &str, quantity: Decimal, unit_price: Decimal, vat_rate: Decimal) -> Self {
        let net_amount = round2(quantity * unit_price);
        let vat_amount = round2(net_amount * vat_rate / dec!(100));
        InvoiceItem {
            description: description.to_string(),
            quantity,
            unit_price,
            vat_rate,
            net_amount,
            vat_amount,
            total: net_amount + vat_amount,
        }
    }
}

/// A sales or purchase invoice.
///
/// Aggregate totals are always computed from the current items, so they can
/// never drift from the line data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    /// `{INV|PUR}-{YYYYMMDD}-{8HEX}`, generated when not supplied
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub date: NaiveDate,
    /// Defaults to `date` + 30 days
    pub due_date: NaiveDate,
    /// Customer (sales) or supplier (purchase)
    pub entity_name: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    /// Generate ledger postings automatically when added to the ledger
    #[serde(default = "default_auto_post")]
    pub auto_post: bool,
}

fn default_auto_post() -> bool {
    true
}

impl Invoice {
    pub fn new(invoice_type: InvoiceType, date: NaiveDate, entity_name: &str) -> Self {
        Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: generate_document_number(invoice_type.number_prefix(), date),
            invoice_type,
            date,
            due_date: date + Days::new(30),
            entity_name: entity_name.to_string(),
            entity_id: None,
            items: Vec::new(),
            notes: String::new(),
            payment_status: PaymentStatus::Unpaid,
            payment_date: None,
            payment_method: None,
            payment_reference: None,
            auto_post: true,
        }
    }

    pub fn with_invoice_number(mut self, invoice_number: &str) -> Self {
        self.invoice_number = invoice_number.to_string();
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_entity_id(mut self, entity_id: &str) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    pub fn without_auto_post(mut self) -> Self {
        self.auto_post = false;
        self
    }

    pub fn with_item(mut self, item: InvoiceItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn add_item(&mut self, item: InvoiceItem) {
        self.items.push(item);
    }

    pub fn remove_item(&mut self, index: usize) -> Result<InvoiceItem> {
        if index >= self.items.len() {
            return Err(Error::ValidationFailed {
                field: "items",
                reason: format!("no item at index {index}"),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Sum of item-level rounded net amounts (not re-rounded).
    pub fn net_amount(&self) -> Decimal {
        self.items.iter().map(|i| i.net_amount).sum()
    }

    /// Sum of item-level rounded VAT amounts (not re-rounded).
    pub fn vat_amount(&self) -> Decimal {
        self.items.iter().map(|i| i.vat_amount).sum()
    }

    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(|i| i.total).sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.invoice_number.is_empty() {
            return Err(Error::ValidationFailed {
                field: "invoice_number",
                reason: "invoice number is required".to_string(),
            });
        }
        if self.entity_name.is_empty() {
            return Err(Error::ValidationFailed {
                field: "entity_name",
                reason: "customer/supplier name is required".to_string(),
            });
        }
        if self.items.is_empty() {
            return Err(Error::ValidationFailed {
                field: "items",
                reason: "at least one invoice item is required".to_string(),
            });
        }
        Ok(())
    }

    /// Whether the invoice is past due and still unpaid. Derived; does not
    /// change `payment_status`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.payment_status == PaymentStatus::Unpaid && today > self.due_date
    }

    /// Materialize the overdue state onto `payment_status`.
    pub fn update_payment_status(&mut self, today: NaiveDate) {
        if self.is_overdue(today) {
            self.payment_status = PaymentStatus::Overdue;
        }
    }

    /// The fixed posting recipe for this invoice: each leg a separate
    /// posting sharing the invoice number as document number, dated to the
    /// invoice date.
    ///
    /// Sales: debit receivable gross, credit revenue net, credit VAT output.
    /// Purchase: debit cost-of-sales net, debit VAT input, credit payable gross.
    pub(crate) fn posting_legs(&self, accounts: &PostingAccounts) -> Result<Vec<Transaction>> {
        self.validate()?;
        let net = self.net_amount();
        let vat = self.vat_amount();
        let total = self.total_amount();
        let mut legs = Vec::new();

        let leg = |tx: Transaction, description: &str| {
            tx.with_description(description)
                .with_document_number(&self.invoice_number)
                .with_type(TransactionType::Invoice)
                .with_notes(&self.notes)
        };

        match self.invoice_type {
            InvoiceType::Sales => {
                let description = format!("Sales Invoice - {}", self.entity_name);
                legs.push(leg(
                    Transaction::debit(self.date, &accounts.receivable, total),
                    &description,
                ));
                legs.push(leg(
                    Transaction::credit(self.date, &accounts.sales_revenue, net),
                    &description,
                ));
                if vat > Decimal::ZERO {
                    legs.push(
                        leg(
                            Transaction::credit(self.date, &accounts.vat_output, vat),
                            &description,
                        )
                        .with_vat(vat),
                    );
                }
            }
            InvoiceType::Purchase => {
                let description = format!("Purchase Invoice - {}", self.entity_name);
                legs.push(leg(
                    Transaction::debit(self.date, &accounts.cost_of_sales, net),
                    &description,
                ));
                if vat > Decimal::ZERO {
                    legs.push(
                        leg(
                            Transaction::debit(self.date, &accounts.vat_input, vat),
                            &description,
                        )
                        .with_vat(vat),
                    );
                }
                legs.push(leg(
                    Transaction::credit(self.date, &accounts.payable, total),
                    &description,
                ));
            }
        }
        Ok(legs)
    }

    /// The payment leg-pair posted when the invoice is marked paid, under
    /// document number `PMT-{invoice_number}`. Moves funds between bank and
    /// receivable/payable.
    pub(crate) fn payment_legs(
        &self,
        payment_date: NaiveDate,
        accounts: &PostingAccounts,
    ) -> Vec<Transaction> {
        let total = self.total_amount();
        let document_number = format!("PMT-{}", self.invoice_number);
        let notes = format!("payment for invoice {}", self.invoice_number);

        match self.invoice_type {
            InvoiceType::Sales => {
                let description = format!("Invoice Receipt - {}", self.entity_name);
                let leg = |tx: Transaction| {
                    tx.with_description(&description)
                        .with_document_number(&document_number)
                        .with_type(TransactionType::Receipt)
                        .with_notes(&notes)
                };
                vec![
                    leg(Transaction::debit(payment_date, &accounts.bank, total)),
                    leg(Transaction::credit(
                        payment_date,
                        &accounts.receivable,
                        total,
                    )),
                ]
            }
            InvoiceType::Purchase => {
                let description = format!("Invoice Payment - {}", self.entity_name);
                let leg = |tx: Transaction| {
                    tx.with_description(&description)
                        .with_document_number(&document_number)
                        .with_type(TransactionType::Payment)
                        .with_notes(&notes)
                };
                vec![
                    leg(Transaction::debit(payment_date, &accounts.payable, total)),
                    leg(Transaction::credit(payment_date, &accounts.bank, total)),
                ]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn item_amounts_derived_and_rounded() {
        let item = InvoiceItem::new("Consulting", dec!(1), dec!(100.00), dec!(20));
        assert_eq!(item.net_amount, dec!(100.00));
        assert_eq!(item.vat_amount, dec!(20.00));
        assert_eq!(item.total, dec!(120.00));
    }

    #[test]
    fn item_rounds_half_up_before_summation() {
        // 3 x 0.335 = 1.005 -> 1.01 at the item level
        let item = InvoiceItem::new("Widgets", dec!(3), dec!(0.335), dec!(20));
        assert_eq!(item.net_amount, dec!(1.01));
        assert_eq!(item.vat_amount, dec!(0.20));
        assert_eq!(item.total, dec!(1.21));
    }

    #[test]
    fn totals_are_sums_of_item_level_rounding() {
        let invoice = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "Acme Ltd")
            .with_item(InvoiceItem::new("A", dec!(1), dec!(0.335), dec!(20)))
            .with_item(InvoiceItem::new("B", dec!(1), dec!(0.335), dec!(20)));
        // each item rounds 0.335 -> 0.34 before summation
        assert_eq!(invoice.net_amount(), dec!(0.68));
    }

    #[test]
    fn invoice_number_prefix_by_type() {
        let sales = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "Acme Ltd");
        assert!(sales.invoice_number.starts_with("INV-20240501-"));
        let purchase = Invoice::new(InvoiceType::Purchase, date("2024-05-01"), "Supplies Co");
        assert!(purchase.invoice_number.starts_with("PUR-20240501-"));
    }

    #[test]
    fn due_date_defaults_to_thirty_days() {
        let invoice = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "Acme Ltd");
        assert_eq!(invoice.due_date, date("2024-05-31"));
    }

    #[test]
    fn validate_requires_items_and_entity() {
        let invoice = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "Acme Ltd");
        assert!(matches!(
            invoice.validate(),
            Err(Error::ValidationFailed { field: "items", .. })
        ));
        let invoice = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "")
            .with_item(InvoiceItem::new("A", dec!(1), dec!(1), dec!(20)));
        assert!(matches!(
            invoice.validate(),
            Err(Error::ValidationFailed {
                field: "entity_name",
                ..
            })
        ));
    }

    #[test]
    fn overdue_is_derived_until_materialized() {
        let mut invoice = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "Acme Ltd")
            .with_item(InvoiceItem::new("A", dec!(1), dec!(100), dec!(20)));
        assert!(!invoice.is_overdue(date("2024-05-31")));
        assert!(invoice.is_overdue(date("2024-06-01")));
        assert_eq!(invoice.payment_status, PaymentStatus::Unpaid);

        invoice.update_payment_status(date("2024-06-01"));
        assert_eq!(invoice.payment_status, PaymentStatus::Overdue);
    }

    #[test]
    fn paid_invoice_never_overdue() {
        let mut invoice = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "Acme Ltd")
            .with_item(InvoiceItem::new("A", dec!(1), dec!(100), dec!(20)));
        invoice.payment_status = PaymentStatus::Paid;
        assert!(!invoice.is_overdue(date("2025-01-01")));
    }

    #[test]
    fn sales_posting_recipe() {
        let invoice = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "Acme Ltd")
            .with_item(InvoiceItem::new("Consulting", dec!(1), dec!(100), dec!(20)));
        let legs = invoice.posting_legs(&PostingAccounts::default()).unwrap();
        assert_eq!(legs.len(), 3);
        assert_eq!((legs[0].account.as_str(), legs[0].debit), ("1200", dec!(120.00)));
        assert_eq!((legs[1].account.as_str(), legs[1].credit), ("4000", dec!(100.00)));
        assert_eq!((legs[2].account.as_str(), legs[2].credit), ("2100", dec!(20.00)));
        assert!(legs.iter().all(|l| l.document_number == invoice.invoice_number));
        assert!(legs.iter().all(|l| l.transaction_type == TransactionType::Invoice));
        assert!(legs.iter().all(|l| l.date == invoice.date));
    }

    #[test]
    fn zero_vat_sales_posts_two_legs() {
        let invoice = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "Acme Ltd")
            .with_item(InvoiceItem::new("Export", dec!(1), dec!(100), dec!(0)));
        let legs = invoice.posting_legs(&PostingAccounts::default()).unwrap();
        assert_eq!(legs.len(), 2);
    }

    #[test]
    fn purchase_posting_recipe() {
        let invoice = Invoice::new(InvoiceType::Purchase, date("2024-05-01"), "Supplies Co")
            .with_item(InvoiceItem::new("Stock", dec!(1), dec!(50), dec!(20)));
        let legs = invoice.posting_legs(&PostingAccounts::default()).unwrap();
        assert_eq!(legs.len(), 3);
        assert_eq!((legs[0].account.as_str(), legs[0].debit), ("5000", dec!(50.00)));
        assert_eq!((legs[1].account.as_str(), legs[1].debit), ("2200", dec!(10.00)));
        assert_eq!((legs[2].account.as_str(), legs[2].credit), ("2000", dec!(60.00)));
    }

    #[test]
    fn sales_payment_legs_move_bank_and_receivable() {
        let invoice = Invoice::new(InvoiceType::Sales, date("2024-05-01"), "Acme Ltd")
            .with_item(InvoiceItem::new("Consulting", dec!(1), dec!(100), dec!(20)));
        let legs = invoice.payment_legs(date("2024-05-15"), &PostingAccounts::default());
        assert_eq!(legs.len(), 2);
        assert_eq!((legs[0].account.as_str(), legs[0].debit), ("1100", dec!(120.00)));
        assert_eq!((legs[1].account.as_str(), legs[1].credit), ("1200", dec!(120.00)));
        let expected = format!("PMT-{}", invoice.invoice_number);
        assert!(legs.iter().all(|l| l.document_number == expected));
        assert!(legs.iter().all(|l| l.transaction_type == TransactionType::Receipt));
    }

    #[test]
    fn purchase_payment_legs_settle_payable() {
        let invoice = Invoice::new(InvoiceType::Purchase, date("2024-05-01"), "Supplies Co")
            .with_item(InvoiceItem::new("Stock", dec!(1), dec!(50), dec!(20)));
        let legs = invoice.payment_legs(date("2024-05-20"), &PostingAccounts::default());
        assert_eq!((legs[0].account.as_str(), legs[0].debit), ("2000", dec!(60.00)));
        assert_eq!((legs[1].account.as_str(), legs[1].credit), ("1100", dec!(60.00)));
        assert!(legs.iter().all(|l| l.transaction_type == TransactionType::Payment));
    }
}
