use crate::account::{Account, AccountUpdate, ChartOfAccounts};
use crate::error::{Error, Result};
use crate::expense::{Expense, ExpenseCategory};
use crate::invoice::{Invoice, PaymentStatus};
use crate::transaction::{JournalEntry, Transaction, TransactionStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account-code-to-purpose mapping used by the posting recipes, the summary
/// and the VAT box logic. Configuration, not business logic: defaults match
/// the seeded UK chart but any code can be remapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingAccounts {
    pub cash: String,
    pub bank: String,
    pub receivable: String,
    pub payable: String,
    pub vat_output: String,
    pub vat_input: String,
    pub sales_revenue: String,
    pub cost_of_sales: String,
    pub office_expenses: String,
    pub travel: String,
    pub marketing: String,
    pub rent: String,
    pub salaries: String,
    pub professional_services: String,
    pub bank_charges: String,
    /// VAT on EC acquisitions (Box 2); unset unless the EC lanes are used
    pub ec_vat_acquisitions: Option<String>,
    /// EC supplies of goods (Box 8)
    pub ec_sales: Option<String>,
    /// EC acquisitions of goods (Box 9)
    pub ec_purchases: Option<String>,
}

impl Default for PostingAccounts {
    fn default() -> Self {
        PostingAccounts {
            cash: "1000".to_string(),
            bank: "1100".to_string(),
            receivable: "1200".to_string(),
            payable: "2000".to_string(),
            vat_output: "2100".to_string(),
            vat_input: "2200".to_string(),
            sales_revenue: "4000".to_string(),
            cost_of_sales: "5000".to_string(),
            office_expenses: "5300".to_string(),
            travel: "5700".to_string(),
            marketing: "5500".to_string(),
            rent: "5200".to_string(),
            salaries: "5100".to_string(),
            professional_services: "5800".to_string(),
            bank_charges: "5900".to_string(),
            ec_vat_acquisitions: None,
            ec_sales: None,
            ec_purchases: None,
        }
    }
}

impl PostingAccounts {
    /// Expense account code for a category.
    pub fn expense_account(&self, category: ExpenseCategory) -> &str {
        match category {
            ExpenseCategory::Office | ExpenseCategory::Utilities | ExpenseCategory::Software => {
                &self.office_expenses
            }
            ExpenseCategory::Travel => &self.travel,
            ExpenseCategory::Marketing => &self.marketing,
            ExpenseCategory::Rent => &self.rent,
            ExpenseCategory::Salary => &self.salaries,
            ExpenseCategory::Professional => &self.professional_services,
            ExpenseCategory::Bank => &self.bank_charges,
            ExpenseCategory::Other => &self.cost_of_sales,
        }
    }
}

/// Dashboard totals read off the current ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub total_profit: Decimal,
    pub vat_payable: Decimal,
    pub vat_receivable: Decimal,
    pub net_vat: Decimal,
    pub accounts_receivable: Decimal,
    pub accounts_payable: Decimal,
    pub bank_balance: Decimal,
    pub cash_balance: Decimal,
}

/// The general ledger: chart of accounts plus the transaction log, with
/// invoices and expenses as posting sources. The single entry point for all
/// mutation.
///
/// Balances are maintained incrementally (O(1) per edit); [`refresh`]
/// rebuilds every balance from the log and must produce identical results;
/// that equivalence is the core invariant of the engine.
///
/// Single-writer by construction: every mutation takes `&mut self` and runs
/// to completion before the next.
///
/// [`refresh`]: Ledger::refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    chart: ChartOfAccounts,
    transactions: Vec<Transaction>,
    invoices: Vec<Invoice>,
    expenses: Vec<Expense>,
    #[serde(default)]
    posting_accounts: PostingAccounts,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new()
    }
}

impl Ledger {
    /// Ledger seeded with the default UK chart of accounts.
    pub fn new() -> Self {
        Ledger::with_chart(ChartOfAccounts::default_uk())
    }

    pub fn with_chart(chart: ChartOfAccounts) -> Self {
        Ledger {
            chart,
            transactions: Vec::new(),
            invoices: Vec::new(),
            expenses: Vec::new(),
            posting_accounts: PostingAccounts::default(),
        }
    }

    pub fn with_posting_accounts(mut self, posting_accounts: PostingAccounts) -> Self {
        self.posting_accounts = posting_accounts;
        self
    }

    pub fn posting_accounts(&self) -> &PostingAccounts {
        &self.posting_accounts
    }

    // --- accounts ---

    pub fn accounts(&self) -> &ChartOfAccounts {
        &self.chart
    }

    pub fn add_account(&mut self, account: Account) -> Result<()> {
        self.chart.add(account)
    }

    pub fn update_account(&mut self, code: &str, update: AccountUpdate) -> Result<&Account> {
        self.chart.update(code, update)
    }

    /// Remove an account. Postings referencing it are left in place.
    pub fn delete_account(&mut self, code: &str) -> Result<Account> {
        self.chart.remove(code)
    }

    /// Apply a signed `debit - credit` delta to an account balance under the
    /// account-type sign convention.
    fn apply_delta(&mut self, code: &str, delta: Decimal) -> Result<()> {
        let account = self.chart.get_mut(code)?;
        if account.account_type.debit_increases() {
            account.balance += delta;
        } else {
            account.balance -= delta;
        }
        Ok(())
    }

    // --- transactions ---

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transaction(&self, id: &str) -> Result<&Transaction> {
        self.transactions
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::TransactionNotFound(id.to_string()))
    }

    /// Validate and persist a posting, then apply its balance delta
    /// incrementally. Returns the transaction id.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<String> {
        transaction.validate()?;
        if !self.chart.contains(&transaction.account) {
            return Err(Error::AccountNotFound(transaction.account.clone()));
        }
        let id = transaction.id.clone();
        let delta = transaction.delta();
        let account = transaction.account.clone();
        self.transactions.push(transaction);
        self.apply_delta(&account, delta)?;
        log::debug!("posted {} to {} (delta {})", id, account, delta);
        Ok(id)
    }

    /// Replace a posting: the old delta is reversed before the new one is
    /// applied, so the balances never drift.
    pub fn update_transaction(&mut self, id: &str, mut updated: Transaction) -> Result<()> {
        updated.id = id.to_string();
        updated.validate()?;
        if !self.chart.contains(&updated.account) {
            return Err(Error::AccountNotFound(updated.account.clone()));
        }
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::TransactionNotFound(id.to_string()))?;

        let old_account = self.transactions[idx].account.clone();
        let old_delta = self.transactions[idx].delta();
        self.reverse_delta(&old_account, old_delta);

        let new_account = updated.account.clone();
        let new_delta = updated.delta();
        self.transactions[idx] = updated;
        self.apply_delta(&new_account, new_delta)?;
        log::debug!("updated {} ({} -> {})", id, old_account, new_account);
        Ok(())
    }

    /// Remove a posting, reversing its balance effect.
    pub fn delete_transaction(&mut self, id: &str) -> Result<Transaction> {
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::TransactionNotFound(id.to_string()))?;
        let transaction = self.transactions.remove(idx);
        self.reverse_delta(&transaction.account, transaction.delta());
        Ok(transaction)
    }

    // Reversal tolerates a missing account (the account may have been
    // deleted after the posting was made); the drift is repaired by refresh.
    fn reverse_delta(&mut self, code: &str, delta: Decimal) {
        if self.apply_delta(code, -delta).is_err() {
            log::warn!("cannot reverse posting against missing account {code}");
        }
    }

    /// Post a balanced journal entry. All legs are validated and their
    /// accounts checked before any leg is persisted. Returns the document
    /// number shared by the legs.
    pub fn add_journal_entry(&mut self, entry: JournalEntry) -> Result<String> {
        let transactions = entry.into_transactions()?;
        for tx in &transactions {
            if !self.chart.contains(&tx.account) {
                return Err(Error::AccountNotFound(tx.account.clone()));
            }
        }
        let document_number = transactions[0].document_number.clone();
        for tx in transactions {
            self.add_transaction(tx)?;
        }
        log::info!("journal entry posted: {document_number}");
        Ok(document_number)
    }

    /// Authoritative full recompute: zero every balance, then replay the
    /// whole transaction log in storage order. Postings against accounts
    /// that no longer exist are skipped.
    pub fn refresh(&mut self) {
        for account in self.chart.iter_mut() {
            account.reset_balance();
        }
        let replay: Vec<(String, Decimal)> = self
            .transactions
            .iter()
            .map(|t| (t.account.clone(), t.delta()))
            .collect();
        for (account, delta) in replay {
            if self.apply_delta(&account, delta).is_err() {
                log::warn!("refresh: skipping posting against missing account {account}");
            }
        }
        log::info!("balances recomputed from {} postings", self.transactions.len());
    }

    pub fn transactions_by_account(&self, code: &str) -> Vec<&Transaction> {
        self.transactions.iter().filter(|t| t.account == code).collect()
    }

    pub fn transactions_by_document(&self, document_number: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.document_number == document_number)
            .collect()
    }

    pub fn transactions_in_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<&Transaction>> {
        check_period(start, end)?;
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
            .collect())
    }

    /// Account balance replayed from the log up to and including `as_of`,
    /// under the account's sign convention.
    pub fn account_balance_as_of(&self, code: &str, as_of: NaiveDate) -> Result<Decimal> {
        let account = self.chart.get(code)?;
        let delta: Decimal = self
            .transactions
            .iter()
            .filter(|t| t.account == code && t.date <= as_of)
            .map(|t| t.delta())
            .sum();
        Ok(if account.account_type.debit_increases() {
            delta
        } else {
            -delta
        })
    }

    pub fn reconcile_transaction(&mut self, id: &str) -> Result<()> {
        let transaction = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::TransactionNotFound(id.to_string()))?;
        transaction.status = TransactionStatus::Reconciled;
        Ok(())
    }

    // --- invoices ---

    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn invoice(&self, id: &str) -> Result<&Invoice> {
        self.invoices
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::InvoiceNotFound(id.to_string()))
    }

    pub fn invoice_by_number(&self, invoice_number: &str) -> Result<&Invoice> {
        self.invoices
            .iter()
            .find(|i| i.invoice_number == invoice_number)
            .ok_or_else(|| Error::InvoiceNotFound(invoice_number.to_string()))
    }

    /// Add an invoice; when `auto_post` is set, generate its ledger postings
    /// (one leg per recipe step, sharing the invoice number as document
    /// number). Returns the invoice id.
    pub fn add_invoice(&mut self, invoice: Invoice) -> Result<String> {
        invoice.validate()?;
        if invoice.auto_post {
            let legs = invoice.posting_legs(&self.posting_accounts)?;
            for leg in &legs {
                if !self.chart.contains(&leg.account) {
                    return Err(Error::AccountNotFound(leg.account.clone()));
                }
            }
            for leg in legs {
                self.add_transaction(leg)?;
            }
        }
        let id = invoice.id.clone();
        log::info!("invoice added: {}", invoice.invoice_number);
        self.invoices.push(invoice);
        Ok(id)
    }

    /// Replace an invoice from its new state. Posted legs are not adjusted
    /// differentially: every posting under the old document number is
    /// deleted and the invoice is re-posted from scratch
    /// (idempotent-replace semantics).
    pub fn update_invoice(&mut self, id: &str, mut updated: Invoice) -> Result<()> {
        updated.validate()?;
        let idx = self
            .invoices
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::InvoiceNotFound(id.to_string()))?;
        updated.id = id.to_string();

        // validate the new legs before touching the old postings, so a
        // failed re-post leaves the ledger as it was
        let legs = if updated.auto_post {
            let legs = updated.posting_legs(&self.posting_accounts)?;
            for leg in &legs {
                if !self.chart.contains(&leg.account) {
                    return Err(Error::AccountNotFound(leg.account.clone()));
                }
            }
            legs
        } else {
            Vec::new()
        };

        let old_document = self.invoices[idx].invoice_number.clone();
        self.delete_transactions_by_document(&old_document);

        for leg in legs {
            self.add_transaction(leg)?;
        }
        log::info!("invoice re-posted: {}", updated.invoice_number);
        self.invoices[idx] = updated;
        Ok(())
    }

    /// Delete an invoice and, when `delete_transactions` is set, every
    /// posting sharing its document number.
    pub fn delete_invoice(&mut self, id: &str, delete_transactions: bool) -> Result<Invoice> {
        let idx = self
            .invoices
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::InvoiceNotFound(id.to_string()))?;
        let invoice = self.invoices.remove(idx);
        if delete_transactions {
            self.delete_transactions_by_document(&invoice.invoice_number);
        }
        Ok(invoice)
    }

    fn delete_transactions_by_document(&mut self, document_number: &str) {
        let ids: Vec<String> = self
            .transactions
            .iter()
            .filter(|t| t.document_number == document_number)
            .map(|t| t.id.clone())
            .collect();
        for id in ids {
            // ids were just read from the log
            let _ = self.delete_transaction(&id);
        }
    }

    /// Mark an invoice paid and post the settlement leg-pair under
    /// `PMT-{invoice_number}`.
    pub fn mark_invoice_paid(
        &mut self,
        id: &str,
        payment_date: NaiveDate,
        payment_method: Option<&str>,
        payment_reference: Option<&str>,
    ) -> Result<()> {
        let idx = self
            .invoices
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::InvoiceNotFound(id.to_string()))?;
        if self.invoices[idx].payment_status == PaymentStatus::Paid {
            return Err(Error::InvalidState(format!(
                "invoice already paid: {}",
                self.invoices[idx].invoice_number
            )));
        }

        // validate the settlement legs before flipping the status, so a
        // missing account cannot leave a Paid invoice with nothing posted
        let legs = self.invoices[idx].payment_legs(payment_date, &self.posting_accounts);
        for leg in &legs {
            if !self.chart.contains(&leg.account) {
                return Err(Error::AccountNotFound(leg.account.clone()));
            }
        }

        {
            let invoice = &mut self.invoices[idx];
            invoice.payment_status = PaymentStatus::Paid;
            invoice.payment_date = Some(payment_date);
            invoice.payment_method = payment_method.map(str::to_string);
            invoice.payment_reference = payment_reference.map(str::to_string);
        }

        for leg in legs {
            self.add_transaction(leg)?;
        }
        log::info!("invoice paid: {}", self.invoices[idx].invoice_number);
        Ok(())
    }

    pub fn invoices_in_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<&Invoice>> {
        check_period(start, end)?;
        Ok(self
            .invoices
            .iter()
            .filter(|i| i.date >= start && i.date <= end)
            .collect())
    }

    pub fn invoices_by_entity(&self, entity_name: &str) -> Vec<&Invoice> {
        self.invoices
            .iter()
            .filter(|i| i.entity_name == entity_name)
            .collect()
    }

    pub fn overdue_invoices(&self, today: NaiveDate) -> Vec<&Invoice> {
        self.invoices
            .iter()
            .filter(|i| i.is_overdue(today) || i.payment_status == PaymentStatus::Overdue)
            .collect()
    }

    pub fn unpaid_invoices(&self) -> Vec<&Invoice> {
        self.invoices
            .iter()
            .filter(|i| {
                matches!(
                    i.payment_status,
                    PaymentStatus::Unpaid | PaymentStatus::Overdue | PaymentStatus::Partial
                )
            })
            .collect()
    }

    // --- expenses ---

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    /// Add an expense; when `auto_post` is set, generate its postings under
    /// the receipt number. Returns the expense id.
    pub fn add_expense(&mut self, expense: Expense) -> Result<String> {
        expense.validate()?;
        if expense.auto_post {
            let legs = expense.posting_legs(&self.posting_accounts)?;
            for leg in &legs {
                if !self.chart.contains(&leg.account) {
                    return Err(Error::AccountNotFound(leg.account.clone()));
                }
            }
            for leg in legs {
                self.add_transaction(leg)?;
            }
        }
        let id = expense.id.clone();
        log::info!("expense added: {}", expense.receipt_number);
        self.expenses.push(expense);
        Ok(id)
    }

    // --- summary ---

    /// Dashboard totals. Income comes from sales invoices, expense totals
    /// from expense records; the remaining figures are read off the mapped
    /// account balances.
    pub fn summary(&self) -> LedgerSummary {
        let total_income: Decimal = self
            .invoices
            .iter()
            .filter(|i| i.invoice_type == crate::invoice::InvoiceType::Sales)
            .map(|i| i.net_amount())
            .sum();
        let total_expense: Decimal = self.expenses.iter().map(|e| e.amount).sum();

        let balance = |code: &str| {
            self.chart
                .get(code)
                .map(|a| a.balance)
                .unwrap_or(Decimal::ZERO)
        };
        let vat_payable = balance(&self.posting_accounts.vat_output);
        let vat_receivable = balance(&self.posting_accounts.vat_input);

        LedgerSummary {
            total_income,
            total_expense,
            total_profit: total_income - total_expense,
            vat_payable,
            vat_receivable,
            net_vat: vat_payable - vat_receivable,
            accounts_receivable: balance(&self.posting_accounts.receivable),
            accounts_payable: balance(&self.posting_accounts.payable),
            bank_balance: balance(&self.posting_accounts.bank),
            cash_balance: balance(&self.posting_accounts.cash),
        }
    }
}

pub(crate) fn check_period(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(Error::InvalidPeriod(format!(
            "start {start} is after end {end}"
        )));
    }
    Ok(())
}
