use crate::{
    error::{Result, SepioError},
    model::{
        BalanceCode, BalanceRecord, CreditDebit, EntryRecord, EntryStatus, StatementRecord,
    },
    schema::{parse_amount, parse_date, parse_datetime},
    traits::ReadFormat,
};
use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::{events::Event, Reader};
use rust_decimal::Decimal;
use std::io::BufRead;

/// Извлечение CAMT.053: один проход в порядке документа, выписки и записи
/// сохраняют исходный порядок. Обратного направления нет — выписка только
/// читается.
pub struct Camt053;

#[derive(Default)]
struct PendingStatement {
    statement_id: Option<String>,
    account_iban: Option<String>,
    created: Option<NaiveDateTime>,
    balances: Vec<BalanceRecord>,
    entries: Vec<EntryRecord>,
}

#[derive(Default)]
struct PendingBalance {
    code: Option<BalanceCode>,
    amount: Option<Decimal>,
    currency: Option<String>,
    credit_debit: Option<CreditDebit>,
    date: Option<NaiveDate>,
}

#[derive(Default)]
struct PendingEntry {
    amount: Option<Decimal>,
    currency: Option<String>,
    credit_debit: Option<CreditDebit>,
    status: Option<EntryStatus>,
    booking_date: Option<NaiveDate>,
    value_date: Option<NaiveDate>,
    ustrd: Vec<String>,
    addtl_info: Option<String>,
    debtor_name: Option<String>,
    debtor_iban: Option<String>,
    creditor_name: Option<String>,
    creditor_iban: Option<String>,
}

impl ReadFormat for Camt053 {
    type Output = Vec<StatementRecord>;

    fn read<R: BufRead>(r: R) -> Result<Self::Output> {
        let mut reader = Reader::from_reader(r);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut path: Vec<String> = Vec::new();

        let mut statements: Vec<StatementRecord> = Vec::new();
        let mut stmt: Option<PendingStatement> = None;
        let mut bal: Option<PendingBalance> = None;
        let mut entry: Option<PendingEntry> = None;
        // сквозной индекс записи по документу — им именуются ошибки
        let mut entry_index = 0usize;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    path.push(name);

                    if ends(&path, &["Stmt"]) {
                        stmt = Some(PendingStatement::default());
                    } else if ends(&path, &["Ntry"]) {
                        entry = Some(PendingEntry::default());
                    } else if ends(&path, &["Stmt", "Bal"]) {
                        bal = Some(PendingBalance::default());
                    } else if ends(&path, &["Ntry", "Amt"]) {
                        if let (Some(en), Some(ccy)) = (entry.as_mut(), ccy_attr(&e)) {
                            en.currency = Some(ccy);
                        }
                    } else if ends(&path, &["Bal", "Amt"]) {
                        if let (Some(b), Some(ccy)) = (bal.as_mut(), ccy_attr(&e)) {
                            b.currency = Some(ccy);
                        }
                    }
                }
                Ok(Event::Text(t)) => {
                    let text = t.unescape().map_err(xml)?.into_owned();
                    if ends(&path, &["Stmt", "Id"]) {
                        if let Some(st) = stmt.as_mut() {
                            st.statement_id.get_or_insert(text);
                        }
                    } else if ends(&path, &["Stmt", "CreDtTm"]) {
                        if let Some(st) = stmt.as_mut() {
                            st.created = Some(parse_datetime(&text)?);
                        }
                    } else if ends(&path, &["Acct", "Id", "IBAN"])
                        || ends(&path, &["Acct", "Id", "Othr", "Id"])
                    {
                        if let Some(st) = stmt.as_mut() {
                            st.account_iban.get_or_insert(text);
                        }
                    } else if bal.is_some() {
                        read_balance_field(&path, &text, bal.as_mut().unwrap())?;
                    } else if entry.is_some() {
                        read_entry_field(&path, &text, entry.as_mut().unwrap())?;
                    }
                }
                Ok(Event::End(_)) => {
                    if ends(&path, &["Ntry"]) {
                        let pending = entry.take().unwrap_or_default();
                        let record = finish_entry(pending, entry_index)?;
                        if let Some(st) = stmt.as_mut() {
                            st.entries.push(record);
                        }
                        entry_index += 1;
                    } else if ends(&path, &["Stmt", "Bal"]) {
                        let pending = bal.take().unwrap_or_default();
                        if let Some(st) = stmt.as_mut() {
                            st.balances.push(finish_balance(pending)?);
                        }
                    } else if ends(&path, &["Stmt"]) {
                        if let Some(pending) = stmt.take() {
                            statements.push(finish_statement(pending)?);
                        }
                    }
                    path.pop();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(statements)
    }
}

fn read_balance_field(path: &[String], text: &str, b: &mut PendingBalance) -> Result<()> {
    if ends(path, &["Bal", "Tp", "CdOrPrtry", "Cd"]) {
        b.code = Some(BalanceCode::from_code(text)?);
    } else if ends(path, &["Bal", "Amt"]) {
        b.amount = Some(parse_amount(text)?);
    } else if ends(path, &["Bal", "CdtDbtInd"]) {
        b.credit_debit = Some(CreditDebit::from_code(text)?);
    } else if ends(path, &["Bal", "Dt", "Dt"]) {
        b.date = Some(parse_date(text)?);
    } else if ends(path, &["Bal", "Dt", "DtTm"]) {
        b.date = Some(parse_datetime(text)?.date());
    }
    Ok(())
}

fn read_entry_field(path: &[String], text: &str, en: &mut PendingEntry) -> Result<()> {
    if ends(path, &["Ntry", "Amt"]) {
        en.amount = Some(parse_amount(text)?);
    } else if ends(path, &["Ntry", "CdtDbtInd"]) {
        en.credit_debit = Some(CreditDebit::from_code(text)?);
    } else if ends(path, &["Ntry", "Sts"]) {
        en.status = Some(EntryStatus::from_code(text)?);
    } else if ends(path, &["BookgDt", "Dt"]) {
        en.booking_date = Some(parse_date(text)?);
    } else if ends(path, &["BookgDt", "DtTm"]) {
        en.booking_date = Some(parse_datetime(text)?.date());
    } else if ends(path, &["ValDt", "Dt"]) {
        en.value_date = Some(parse_date(text)?);
    } else if ends(path, &["ValDt", "DtTm"]) {
        en.value_date = Some(parse_datetime(text)?.date());
    } else if ends(path, &["RmtInf", "Ustrd"]) {
        en.ustrd.push(text.to_string());
    } else if ends(path, &["Ntry", "AddtlNtryInf"]) {
        en.addtl_info = Some(text.to_string());
    } else if ends(path, &["Dbtr", "Nm"]) {
        en.debtor_name.get_or_insert(text.to_string());
    } else if ends(path, &["DbtrAcct", "Id", "IBAN"])
        || ends(path, &["DbtrAcct", "Id", "Othr", "Id"])
    {
        en.debtor_iban.get_or_insert(text.to_string());
    } else if ends(path, &["Cdtr", "Nm"]) {
        en.creditor_name.get_or_insert(text.to_string());
    } else if ends(path, &["CdtrAcct", "Id", "IBAN"])
        || ends(path, &["CdtrAcct", "Id", "Othr", "Id"])
    {
        en.creditor_iban.get_or_insert(text.to_string());
    }
    Ok(())
}

fn finish_entry(p: PendingEntry, index: usize) -> Result<EntryRecord> {
    let missing = |field| SepioError::IncompleteEntry { index, field };
    let amount = p.amount.ok_or_else(|| missing("Amt"))?;
    if amount.is_sign_negative() {
        return Err(SepioError::Parse(format!("entry {index}: negative amount {amount}")));
    }
    let currency = p.currency.ok_or_else(|| missing("Ccy"))?;
    let credit_debit = p.credit_debit.ok_or_else(|| missing("CdtDbtInd"))?;
    let status = p.status.ok_or_else(|| missing("Sts"))?;
    let booking_date = p.booking_date.ok_or_else(|| missing("BookgDt"))?;
    let value_date = p.value_date.ok_or_else(|| missing("ValDt"))?;

    // контрагент: для кредита — плательщик (Dbtr), для дебета — получатель (Cdtr)
    let (counterparty_name, counterparty_iban) = match credit_debit {
        CreditDebit::Credit => (p.debtor_name, p.debtor_iban),
        CreditDebit::Debit => (p.creditor_name, p.creditor_iban),
    };
    let remittance_info = if p.ustrd.is_empty() {
        p.addtl_info
    } else {
        Some(p.ustrd.join(" "))
    };

    Ok(EntryRecord {
        booking_date,
        value_date,
        amount,
        currency,
        credit_debit,
        status,
        remittance_info,
        counterparty_name,
        counterparty_iban,
    })
}

fn finish_balance(p: PendingBalance) -> Result<BalanceRecord> {
    let missing = |field: &str| SepioError::Parse(format!("balance without <{field}>"));
    Ok(BalanceRecord {
        code: p.code.ok_or_else(|| missing("Cd"))?,
        amount: p.amount.ok_or_else(|| missing("Amt"))?,
        currency: p.currency.ok_or_else(|| missing("Ccy"))?,
        credit_debit: p.credit_debit.ok_or_else(|| missing("CdtDbtInd"))?,
        date: p.date.ok_or_else(|| missing("Dt"))?,
    })
}

fn finish_statement(p: PendingStatement) -> Result<StatementRecord> {
    let statement_id = p
        .statement_id
        .ok_or_else(|| SepioError::Parse("statement without <Id>".into()))?;
    let account_iban = p
        .account_iban
        .ok_or_else(|| SepioError::Parse("statement without account identification".into()))?;
    Ok(StatementRecord {
        statement_id,
        account_iban,
        created: p.created,
        balances: p.balances,
        entries: p.entries,
    })
}

fn ends(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

fn ccy_attr(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"Ccy")
        .and_then(|a| String::from_utf8(a.value.into_owned()).ok())
}

fn xml<E: std::fmt::Display>(e: E) -> SepioError {
    SepioError::MalformedXml(e.to_string())
}
