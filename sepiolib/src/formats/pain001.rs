use crate::{
    error::{Result, SepioError},
    model::{CreditTransferTransaction, PartyInfo, PaymentInfoBlock, PaymentInstruction},
    schema::{parse_amount, parse_date, parse_datetime, MessageVersion},
    traits::{ReadFormat, WriteFormat},
};
use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::{
    events::{BytesDecl, BytesStart, BytesText, Event},
    Reader, Writer,
};
use rust_decimal::Decimal;
use std::io::{BufRead, Write};

/// PAIN.001: генерация поручения в XML и обратный разбор в ту же модель.
/// Закон симметрии: parse(build(x)) == x для любого валидного x.
pub struct Pain001;

/* ------------------------------- WRITE ---------------------------------- */

impl WriteFormat for Pain001 {
    type Input = PaymentInstruction;

    fn write<W: Write>(mut w: W, instr: &PaymentInstruction) -> Result<()> {
        // инварианты проверяются до того, как выписан хоть один байт
        check_instruction(instr)?;

        let mut wr = Writer::new_with_indent(&mut w, b' ', 2);

        wr.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(emit)?;

        let ns = MessageVersion::pain_001_v3().namespace();
        let mut doc = BytesStart::new("Document");
        doc.push_attribute(("xmlns", ns.as_str()));
        wr.write_event(Event::Start(doc)).map_err(emit)?;
        start(&mut wr, "CstmrCdtTrfInitn").map_err(emit)?;

        write_group_header(&mut wr, instr).map_err(emit)?;
        for block in &instr.payment_info {
            write_payment_info(&mut wr, block).map_err(emit)?;
        }

        end(&mut wr, "CstmrCdtTrfInitn").map_err(emit)?;
        end(&mut wr, "Document").map_err(emit)?;
        Ok(())
    }
}

fn check_instruction(instr: &PaymentInstruction) -> Result<()> {
    let bad = |msg: String| Err(SepioError::InvalidInstruction(msg));
    if instr.message_id.trim().is_empty() {
        return bad("empty MsgId".into());
    }
    if instr.payment_info.is_empty() {
        return bad("no payment information blocks".into());
    }
    for block in &instr.payment_info {
        if block.payment_id.trim().is_empty() {
            return bad("empty PmtInfId".into());
        }
        if block.debtor_account_iban.trim().is_empty() {
            return bad(format!("payment {}: missing debtor account IBAN", block.payment_id));
        }
        if block.transactions.is_empty() {
            return bad(format!("payment {}: no transactions", block.payment_id));
        }
        for tx in &block.transactions {
            if tx.amount <= Decimal::ZERO {
                return bad(format!(
                    "transaction {}: non-positive amount {}",
                    tx.end_to_end_id, tx.amount
                ));
            }
        }
    }
    Ok(())
}

type XmlResult = std::result::Result<(), quick_xml::Error>;

fn write_group_header<W: Write>(wr: &mut Writer<W>, instr: &PaymentInstruction) -> XmlResult {
    start(wr, "GrpHdr")?;
    leaf(wr, "MsgId", &instr.message_id)?;
    leaf(
        wr,
        "CreDtTm",
        &instr.creation_datetime.format("%Y-%m-%dT%H:%M:%S").to_string(),
    )?;
    leaf(wr, "NbOfTxs", &instr.transaction_count().to_string())?;
    leaf(wr, "CtrlSum", &instr.control_sum().to_string())?;
    write_party(wr, "InitgPty", &instr.initiating_party)?;
    end(wr, "GrpHdr")
}

fn write_payment_info<W: Write>(wr: &mut Writer<W>, block: &PaymentInfoBlock) -> XmlResult {
    start(wr, "PmtInf")?;
    leaf(wr, "PmtInfId", &block.payment_id)?;
    leaf(wr, "PmtMtd", "TRF")?;
    leaf(wr, "NbOfTxs", &block.transactions.len().to_string())?;
    let sum: Decimal = block.transactions.iter().map(|t| t.amount).sum();
    leaf(wr, "CtrlSum", &sum.to_string())?;
    leaf(
        wr,
        "ReqdExctnDt",
        &block.requested_execution_date.format("%Y-%m-%d").to_string(),
    )?;
    write_party(wr, "Dbtr", &block.debtor)?;
    write_iban_account(wr, "DbtrAcct", &block.debtor_account_iban)?;

    // агент дебитора обязателен по схеме; банк не знаем — SEPA-заполнитель
    start(wr, "DbtrAgt")?;
    start(wr, "FinInstnId")?;
    start(wr, "Othr")?;
    leaf(wr, "Id", "NOTPROVIDED")?;
    end(wr, "Othr")?;
    end(wr, "FinInstnId")?;
    end(wr, "DbtrAgt")?;

    for tx in &block.transactions {
        write_transaction(wr, tx)?;
    }
    end(wr, "PmtInf")
}

fn write_transaction<W: Write>(wr: &mut Writer<W>, tx: &CreditTransferTransaction) -> XmlResult {
    start(wr, "CdtTrfTxInf")?;
    start(wr, "PmtId")?;
    leaf(wr, "EndToEndId", &tx.end_to_end_id)?;
    end(wr, "PmtId")?;

    start(wr, "Amt")?;
    let amt = tx.amount.to_string();
    wr.write_event(Event::Start(
        BytesStart::new("InstdAmt").with_attributes([("Ccy", tx.currency.as_str())]),
    ))?;
    wr.write_event(Event::Text(BytesText::new(&amt)))?;
    end(wr, "InstdAmt")?;
    end(wr, "Amt")?;

    write_party(wr, "Cdtr", &tx.creditor)?;
    write_iban_account(wr, "CdtrAcct", &tx.creditor_account_iban)?;

    if let Some(ref rmt) = tx.remittance_info {
        start(wr, "RmtInf")?;
        leaf(wr, "Ustrd", rmt)?;
        end(wr, "RmtInf")?;
    }
    end(wr, "CdtTrfTxInf")
}

fn write_party<W: Write>(wr: &mut Writer<W>, tag: &str, party: &PartyInfo) -> XmlResult {
    start(wr, tag)?;
    leaf(wr, "Nm", &party.name)?;
    if let Some(ref id) = party.identifier {
        start(wr, "Id")?;
        start(wr, "OrgId")?;
        start(wr, "Othr")?;
        leaf(wr, "Id", id)?;
        end(wr, "Othr")?;
        end(wr, "OrgId")?;
        end(wr, "Id")?;
    }
    end(wr, tag)
}

fn write_iban_account<W: Write>(wr: &mut Writer<W>, tag: &str, iban: &str) -> XmlResult {
    start(wr, tag)?;
    start(wr, "Id")?;
    leaf(wr, "IBAN", iban)?;
    end(wr, "Id")?;
    end(wr, tag)
}

fn start<W: Write>(wr: &mut Writer<W>, tag: &str) -> XmlResult {
    wr.write_event(Event::Start(BytesStart::new(tag)))
}

fn end<W: Write>(wr: &mut Writer<W>, tag: &str) -> XmlResult {
    wr.write_event(Event::End(BytesStart::new(tag).to_end()))
}

fn leaf<W: Write>(wr: &mut Writer<W>, tag: &str, text: &str) -> XmlResult {
    start(wr, tag)?;
    wr.write_event(Event::Text(BytesText::new(text)))?;
    end(wr, tag)
}

/* ------------------------------- READ ----------------------------------- */

#[derive(Default)]
struct PendingHeader {
    message_id: Option<String>,
    creation_datetime: Option<NaiveDateTime>,
    initiating_name: Option<String>,
    initiating_id: Option<String>,
}

#[derive(Default)]
struct PendingBlock {
    payment_id: Option<String>,
    requested_execution_date: Option<NaiveDate>,
    debtor_name: Option<String>,
    debtor_id: Option<String>,
    debtor_iban: Option<String>,
    transactions: Vec<CreditTransferTransaction>,
}

#[derive(Default)]
struct PendingTx {
    end_to_end_id: Option<String>,
    amount: Option<Decimal>,
    currency: Option<String>,
    creditor_name: Option<String>,
    creditor_id: Option<String>,
    creditor_iban: Option<String>,
    ustrd: Vec<String>,
}

impl ReadFormat for Pain001 {
    type Output = PaymentInstruction;

    fn read<R: BufRead>(r: R) -> Result<Self::Output> {
        let mut reader = Reader::from_reader(r);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut path: Vec<String> = Vec::new();

        let mut header = PendingHeader::default();
        let mut blocks: Vec<PaymentInfoBlock> = Vec::new();
        let mut block: Option<PendingBlock> = None;
        let mut tx: Option<PendingTx> = None;
        let mut tx_index = 0usize;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    path.push(name);

                    if ends(&path, &["PmtInf"]) {
                        block = Some(PendingBlock::default());
                    } else if ends(&path, &["CdtTrfTxInf"]) {
                        tx = Some(PendingTx::default());
                    } else if ends(&path, &["Amt", "InstdAmt"]) {
                        if let Some(t) = tx.as_mut() {
                            t.currency = e
                                .attributes()
                                .flatten()
                                .find(|a| a.key.as_ref() == b"Ccy")
                                .and_then(|a| String::from_utf8(a.value.into_owned()).ok());
                        }
                    }
                }
                Ok(Event::Text(t)) => {
                    let text = t.unescape().map_err(xml)?.into_owned();
                    if tx.is_some() {
                        read_tx_field(&path, text, tx.as_mut().unwrap())?;
                    } else if block.is_some() {
                        read_block_field(&path, text, block.as_mut().unwrap())?;
                    } else {
                        read_header_field(&path, text, &mut header)?;
                    }
                }
                Ok(Event::End(_)) => {
                    if ends(&path, &["CdtTrfTxInf"]) {
                        let pending = tx.take().unwrap_or_default();
                        let record = finish_tx(pending, tx_index)?;
                        if let Some(b) = block.as_mut() {
                            b.transactions.push(record);
                        }
                        tx_index += 1;
                    } else if ends(&path, &["PmtInf"]) {
                        if let Some(pending) = block.take() {
                            blocks.push(finish_block(pending)?);
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

        finish_instruction(header, blocks)
    }
}

fn read_header_field(path: &[String], text: String, h: &mut PendingHeader) -> Result<()> {
    if ends(path, &["GrpHdr", "MsgId"]) {
        h.message_id = Some(text);
    } else if ends(path, &["GrpHdr", "CreDtTm"]) {
        h.creation_datetime = Some(parse_datetime(&text)?);
    } else if ends(path, &["InitgPty", "Nm"]) {
        h.initiating_name = Some(text);
    } else if ends(path, &["InitgPty", "Id", "OrgId", "Othr", "Id"]) {
        h.initiating_id = Some(text);
    }
    Ok(())
}

fn read_block_field(path: &[String], text: String, b: &mut PendingBlock) -> Result<()> {
    if ends(path, &["PmtInf", "PmtInfId"]) {
        b.payment_id = Some(text);
    } else if ends(path, &["PmtInf", "ReqdExctnDt"]) {
        b.requested_execution_date = Some(parse_date(&text)?);
    } else if ends(path, &["Dbtr", "Nm"]) {
        b.debtor_name = Some(text);
    } else if ends(path, &["Dbtr", "Id", "OrgId", "Othr", "Id"]) {
        b.debtor_id = Some(text);
    } else if ends(path, &["DbtrAcct", "Id", "IBAN"])
        || ends(path, &["DbtrAcct", "Id", "Othr", "Id"])
    {
        b.debtor_iban.get_or_insert(text);
    }
    Ok(())
}

fn read_tx_field(path: &[String], text: String, t: &mut PendingTx) -> Result<()> {
    if ends(path, &["PmtId", "EndToEndId"]) {
        t.end_to_end_id = Some(text);
    } else if ends(path, &["Amt", "InstdAmt"]) {
        t.amount = Some(parse_amount(&text)?);
    } else if ends(path, &["Cdtr", "Nm"]) {
        t.creditor_name = Some(text);
    } else if ends(path, &["Cdtr", "Id", "OrgId", "Othr", "Id"]) {
        t.creditor_id = Some(text);
    } else if ends(path, &["CdtrAcct", "Id", "IBAN"])
        || ends(path, &["CdtrAcct", "Id", "Othr", "Id"])
    {
        t.creditor_iban.get_or_insert(text);
    } else if ends(path, &["RmtInf", "Ustrd"]) {
        t.ustrd.push(text);
    }
    Ok(())
}

fn finish_tx(p: PendingTx, index: usize) -> Result<CreditTransferTransaction> {
    let missing = |field| SepioError::IncompleteEntry { index, field };
    let remittance_info = if p.ustrd.is_empty() {
        None
    } else {
        Some(p.ustrd.join(" "))
    };
    Ok(CreditTransferTransaction {
        end_to_end_id: p.end_to_end_id.ok_or_else(|| missing("EndToEndId"))?,
        amount: p.amount.ok_or_else(|| missing("InstdAmt"))?,
        currency: p.currency.ok_or_else(|| missing("Ccy"))?,
        creditor: PartyInfo {
            name: p.creditor_name.ok_or_else(|| missing("Cdtr/Nm"))?,
            identifier: p.creditor_id,
        },
        creditor_account_iban: p.creditor_iban.ok_or_else(|| missing("CdtrAcct"))?,
        remittance_info,
    })
}

fn finish_block(p: PendingBlock) -> Result<PaymentInfoBlock> {
    let missing = |field: &str| SepioError::Parse(format!("PmtInf without <{field}>"));
    let block = PaymentInfoBlock {
        payment_id: p.payment_id.ok_or_else(|| missing("PmtInfId"))?,
        requested_execution_date: p
            .requested_execution_date
            .ok_or_else(|| missing("ReqdExctnDt"))?,
        debtor: PartyInfo {
            name: p.debtor_name.ok_or_else(|| missing("Dbtr/Nm"))?,
            identifier: p.debtor_id,
        },
        debtor_account_iban: p.debtor_iban.ok_or_else(|| missing("DbtrAcct"))?,
        transactions: p.transactions,
    };
    if block.transactions.is_empty() {
        return Err(SepioError::Parse(format!(
            "payment {} has no transactions",
            block.payment_id
        )));
    }
    Ok(block)
}

fn finish_instruction(
    h: PendingHeader,
    blocks: Vec<PaymentInfoBlock>,
) -> Result<PaymentInstruction> {
    let missing = |field: &str| SepioError::Parse(format!("GrpHdr without <{field}>"));
    Ok(PaymentInstruction {
        message_id: h.message_id.ok_or_else(|| missing("MsgId"))?,
        creation_datetime: h.creation_datetime.ok_or_else(|| missing("CreDtTm"))?,
        initiating_party: PartyInfo {
            name: h.initiating_name.ok_or_else(|| missing("InitgPty/Nm"))?,
            identifier: h.initiating_id,
        },
        payment_info: blocks,
    })
}

fn ends(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

fn emit<E: std::fmt::Display>(e: E) -> SepioError {
    SepioError::Parse(format!("xml write: {e}"))
}

fn xml<E: std::fmt::Display>(e: E) -> SepioError {
    SepioError::MalformedXml(e.to_string())
}
