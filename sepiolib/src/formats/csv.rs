//! CSV: фиксированный порядок колонок, суммы с двумя знаками, даты ISO-8601.
//! Заголовок пишется всегда — пустой набор записей даёт файл из одной строки.

use crate::{
    error::{Result, SepioError},
    model::{CreditDebit, EntryRecord, EntryStatus, PaymentInstruction},
    schema::parse_date,
    traits::{ReadFormat, WriteFormat},
};
use csv::{ReaderBuilder, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

pub const ENTRY_COLUMNS: [&str; 9] = [
    "booking_date",
    "value_date",
    "amount",
    "currency",
    "credit_debit",
    "status",
    "remittance_info",
    "counterparty_name",
    "counterparty_iban",
];

pub const PAYMENT_COLUMNS: [&str; 10] = [
    "payment_id",
    "end_to_end_id",
    "execution_date",
    "amount",
    "currency",
    "debtor_name",
    "debtor_iban",
    "creditor_name",
    "creditor_iban",
    "remittance_info",
];

#[derive(Serialize)]
struct EntryRow<'a> {
    booking_date: String,
    value_date: String,
    amount: String,
    currency: &'a str,
    credit_debit: &'a str,
    status: &'a str,
    remittance_info: Option<&'a str>,
    counterparty_name: Option<&'a str>,
    counterparty_iban: Option<&'a str>,
}

#[derive(Deserialize)]
struct EntryCsvRow {
    booking_date: String,
    value_date: String,
    amount: String,
    currency: String,
    credit_debit: String,
    status: String,
    remittance_info: Option<String>,
    counterparty_name: Option<String>,
    counterparty_iban: Option<String>,
}

/// Экспорт записей выписки и обратный «строгой схемы» читатель.
pub struct EntryCsv;

impl WriteFormat for EntryCsv {
    type Input = [EntryRecord];

    fn write<W: Write>(mut w: W, entries: &[EntryRecord]) -> Result<()> {
        let mut wrt = WriterBuilder::new().has_headers(false).from_writer(&mut w);
        wrt.write_record(&ENTRY_COLUMNS)?;
        for e in entries {
            wrt.serialize(EntryRow {
                booking_date: e.booking_date.format("%Y-%m-%d").to_string(),
                value_date: e.value_date.format("%Y-%m-%d").to_string(),
                amount: format!("{:.2}", e.amount),
                currency: &e.currency,
                credit_debit: e.credit_debit.as_code(),
                status: e.status.as_code(),
                remittance_info: e.remittance_info.as_deref(),
                counterparty_name: e.counterparty_name.as_deref(),
                counterparty_iban: e.counterparty_iban.as_deref(),
            })?;
        }
        wrt.flush()?;
        Ok(())
    }
}

impl ReadFormat for EntryCsv {
    type Output = Vec<EntryRecord>;

    fn read<R: BufRead>(r: R) -> Result<Self::Output> {
        let mut rdr = ReaderBuilder::new().from_reader(r);
        let mut entries = Vec::new();
        for rec in rdr.deserialize::<EntryCsvRow>() {
            let row = rec?;
            entries.push(EntryRecord {
                booking_date: parse_date(&row.booking_date)?,
                value_date: parse_date(&row.value_date)?,
                amount: Decimal::from_str_exact(&row.amount)
                    .map_err(|e| SepioError::Parse(format!("amount {}: {e}", row.amount)))?,
                currency: row.currency,
                credit_debit: CreditDebit::from_code(&row.credit_debit)?,
                status: EntryStatus::from_code(&row.status)?,
                remittance_info: row.remittance_info.filter(|s| !s.is_empty()),
                counterparty_name: row.counterparty_name.filter(|s| !s.is_empty()),
                counterparty_iban: row.counterparty_iban.filter(|s| !s.is_empty()),
            });
        }
        Ok(entries)
    }
}

#[derive(Serialize)]
struct PaymentRow<'a> {
    payment_id: &'a str,
    end_to_end_id: &'a str,
    execution_date: String,
    amount: String,
    currency: &'a str,
    debtor_name: &'a str,
    debtor_iban: &'a str,
    creditor_name: &'a str,
    creditor_iban: &'a str,
    remittance_info: Option<&'a str>,
}

/// Плоский экспорт PAIN.001: одна строка на транзакцию с контекстом блока.
pub struct PaymentCsv;

impl WriteFormat for PaymentCsv {
    type Input = PaymentInstruction;

    fn write<W: Write>(mut w: W, instr: &PaymentInstruction) -> Result<()> {
        let mut wrt = WriterBuilder::new().has_headers(false).from_writer(&mut w);
        wrt.write_record(&PAYMENT_COLUMNS)?;
        for block in &instr.payment_info {
            for tx in &block.transactions {
                wrt.serialize(PaymentRow {
                    payment_id: &block.payment_id,
                    end_to_end_id: &tx.end_to_end_id,
                    execution_date: block
                        .requested_execution_date
                        .format("%Y-%m-%d")
                        .to_string(),
                    amount: format!("{:.2}", tx.amount),
                    currency: &tx.currency,
                    debtor_name: &block.debtor.name,
                    debtor_iban: &block.debtor_account_iban,
                    creditor_name: &tx.creditor.name,
                    creditor_iban: &tx.creditor_account_iban,
                    remittance_info: tx.remittance_info.as_deref(),
                })?;
            }
        }
        wrt.flush()?;
        Ok(())
    }
}
