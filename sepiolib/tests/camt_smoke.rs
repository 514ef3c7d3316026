use rust_decimal::Decimal;
use sepiolib::{
    formats::csv::EntryCsv,
    model::{BalanceCode, CreditDebit, EntryStatus},
    parser::CamtParser,
    schema::SchemaRegistry,
    traits::{ReadFormat, WriteFormat},
};
use std::io::Cursor;

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.02">
  <BkToCstmrStmt>
    <GrpHdr>
      <MsgId>MSG-2025-001</MsgId>
      <CreDtTm>2025-10-31T18:00:00</CreDtTm>
    </GrpHdr>
    <Stmt>
      <Id>STMT-2025-10</Id>
      <CreDtTm>2025-10-31T18:00:00</CreDtTm>
      <Acct>
        <Id><IBAN>DE89370400440532013000</IBAN></Id>
        <Ccy>EUR</Ccy>
      </Acct>
      <Bal>
        <Tp><CdOrPrtry><Cd>OPBD</Cd></CdOrPrtry></Tp>
        <Amt Ccy="EUR">1000.00</Amt>
        <CdtDbtInd>CRDT</CdtDbtInd>
        <Dt><Dt>2025-10-01</Dt></Dt>
      </Bal>
      <Bal>
        <Tp><CdOrPrtry><Cd>CLBD</Cd></CdOrPrtry></Tp>
        <Amt Ccy="EUR">1074.50</Amt>
        <CdtDbtInd>CRDT</CdtDbtInd>
        <Dt><Dt>2025-10-31</Dt></Dt>
      </Bal>
      <Ntry>
        <Amt Ccy="EUR">100.00</Amt>
        <CdtDbtInd>CRDT</CdtDbtInd>
        <Sts>BOOK</Sts>
        <BookgDt><Dt>2025-10-02</Dt></BookgDt>
        <ValDt><Dt>2025-10-02</Dt></ValDt>
        <BkTxCd><Prtry><Cd>NTRF</Cd></Prtry></BkTxCd>
        <NtryDtls>
          <TxDtls>
            <Refs><EndToEndId>E2E-1</EndToEndId></Refs>
            <RltdPties>
              <Dbtr><Nm>ACME GmbH</Nm></Dbtr>
              <DbtrAcct><Id><IBAN>DE02120300000000202051</IBAN></Id></DbtrAcct>
            </RltdPties>
            <RmtInf><Ustrd>Salary October</Ustrd></RmtInf>
          </TxDtls>
        </NtryDtls>
      </Ntry>
      <Ntry>
        <Amt Ccy="EUR">25.50</Amt>
        <CdtDbtInd>DBIT</CdtDbtInd>
        <Sts>BOOK</Sts>
        <BookgDt><Dt>2025-10-03</Dt></BookgDt>
        <ValDt><Dt>2025-10-04</Dt></ValDt>
        <BkTxCd><Prtry><Cd>NTRF</Cd></Prtry></BkTxCd>
        <NtryDtls>
          <TxDtls>
            <RltdPties>
              <Cdtr><Nm>Stadtwerke Berlin</Nm></Cdtr>
              <CdtrAcct><Id><IBAN>DE75512108001245126199</IBAN></Id></CdtrAcct>
            </RltdPties>
            <RmtInf><Ustrd>Electricity 10/2025</Ustrd></RmtInf>
          </TxDtls>
        </NtryDtls>
      </Ntry>
    </Stmt>
  </BkToCstmrStmt>
</Document>
"#;

#[test]
fn camt_extracts_entries_in_source_order() {
    let registry = SchemaRegistry::new();
    let statements = CamtParser::new(&registry).parse(SAMPLE).expect("parse camt");

    assert_eq!(statements.len(), 1);
    let st = &statements[0];
    assert_eq!(st.statement_id, "STMT-2025-10");
    assert_eq!(st.account_iban, "DE89370400440532013000");
    assert_eq!(st.entries.len(), 2);

    let first = &st.entries[0];
    assert_eq!(first.credit_debit, CreditDebit::Credit);
    assert_eq!(first.amount, Decimal::new(10000, 2));
    assert_eq!(first.currency, "EUR");
    assert_eq!(first.status, EntryStatus::Booked);
    assert_eq!(first.remittance_info.as_deref(), Some("Salary October"));
    // для кредита контрагент — плательщик
    assert_eq!(first.counterparty_name.as_deref(), Some("ACME GmbH"));
    assert_eq!(
        first.counterparty_iban.as_deref(),
        Some("DE02120300000000202051")
    );

    let second = &st.entries[1];
    assert_eq!(second.credit_debit, CreditDebit::Debit);
    assert_eq!(second.amount, Decimal::new(2550, 2));
    assert_eq!(second.counterparty_name.as_deref(), Some("Stadtwerke Berlin"));
}

#[test]
fn camt_balances_and_stats() {
    let registry = SchemaRegistry::new();
    let statements = CamtParser::new(&registry).parse(SAMPLE).expect("parse camt");
    let st = &statements[0];

    assert_eq!(st.balances.len(), 2);
    assert_eq!(st.balances[0].code, BalanceCode::Opbd);
    assert_eq!(st.balances[0].amount, Decimal::new(100000, 2));
    assert_eq!(st.balances[1].code, BalanceCode::Clbd);

    let stats = st.stats();
    assert_eq!(stats.entry_count, 2);
    // 100.00 кредит - 25.50 дебет
    assert_eq!(stats.net_amount, Decimal::new(7450, 2));
}

#[test]
fn camt_to_csv_is_deterministic() {
    let registry = SchemaRegistry::new();
    let statements = CamtParser::new(&registry).parse(SAMPLE).expect("parse camt");
    let entries = &statements[0].entries;

    let mut out = Vec::new();
    EntryCsv::write(&mut out, entries).expect("write csv");
    let text = String::from_utf8(out).expect("utf8");

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3, "header + 2 rows");
    assert!(text.ends_with('\n'));
    assert_eq!(
        lines[0],
        "booking_date,value_date,amount,currency,credit_debit,status,remittance_info,counterparty_name,counterparty_iban"
    );
    assert_eq!(
        lines[1],
        "2025-10-02,2025-10-02,100.00,EUR,CRDT,BOOK,Salary October,ACME GmbH,DE02120300000000202051"
    );
    assert_eq!(
        lines[2],
        "2025-10-03,2025-10-04,25.50,EUR,DBIT,BOOK,Electricity 10/2025,Stadtwerke Berlin,DE75512108001245126199"
    );

    // обратный читатель восстанавливает суммы и даты без потерь
    let restored = EntryCsv::read(Cursor::new(text.into_bytes())).expect("read csv");
    assert_eq!(&restored, entries);
}
