use rust_decimal::Decimal;
use sepiolib::{
    formats::csv::PaymentCsv, parser::Pain001Parser, schema::SchemaRegistry, traits::WriteFormat,
};

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pain.001.001.03">
  <CstmrCdtTrfInitn>
    <GrpHdr>
      <MsgId>MSG-PAY-9</MsgId>
      <CreDtTm>2025-11-10T12:00:00</CreDtTm>
      <NbOfTxs>2</NbOfTxs>
      <CtrlSum>1500.00</CtrlSum>
      <InitgPty>
        <Nm>Fenster und Tueren AG</Nm>
        <Id><OrgId><Othr><Id>FT-AG-7</Id></Othr></OrgId></Id>
      </InitgPty>
    </GrpHdr>
    <PmtInf>
      <PmtInfId>PMT-9-1</PmtInfId>
      <PmtMtd>TRF</PmtMtd>
      <NbOfTxs>2</NbOfTxs>
      <CtrlSum>1500.00</CtrlSum>
      <ReqdExctnDt>2025-11-12</ReqdExctnDt>
      <Dbtr>
        <Nm>Fenster und Tueren AG</Nm>
      </Dbtr>
      <DbtrAcct>
        <Id><IBAN>DE89370400440532013000</IBAN></Id>
      </DbtrAcct>
      <DbtrAgt>
        <FinInstnId><BIC>COBADEFFXXX</BIC></FinInstnId>
      </DbtrAgt>
      <CdtTrfTxInf>
        <PmtId><EndToEndId>E2E-9-1</EndToEndId></PmtId>
        <Amt><InstdAmt Ccy="EUR">1000.00</InstdAmt></Amt>
        <Cdtr><Nm>Holz GmbH</Nm></Cdtr>
        <CdtrAcct><Id><IBAN>DE02120300000000202051</IBAN></Id></CdtrAcct>
        <RmtInf><Ustrd>Order 2025-88</Ustrd><Ustrd>Pallet A</Ustrd></RmtInf>
      </CdtTrfTxInf>
      <CdtTrfTxInf>
        <PmtId><EndToEndId>E2E-9-2</EndToEndId></PmtId>
        <Amt><InstdAmt Ccy="EUR">500.00</InstdAmt></Amt>
        <Cdtr><Nm>Glas KG</Nm></Cdtr>
        <CdtrAcct><Id><Othr><Id>ACCT-99</Id></Othr></Id></CdtrAcct>
      </CdtTrfTxInf>
    </PmtInf>
  </CstmrCdtTrfInitn>
</Document>
"#;

#[test]
fn pain_parse_reconstructs_model() {
    let registry = SchemaRegistry::new();
    let instruction = Pain001Parser::new(&registry)
        .parse(SAMPLE)
        .expect("parse pain");

    assert_eq!(instruction.message_id, "MSG-PAY-9");
    assert_eq!(instruction.initiating_party.name, "Fenster und Tueren AG");
    assert_eq!(
        instruction.initiating_party.identifier.as_deref(),
        Some("FT-AG-7")
    );
    assert_eq!(instruction.payment_info.len(), 1);

    let block = &instruction.payment_info[0];
    assert_eq!(block.payment_id, "PMT-9-1");
    assert_eq!(block.debtor_account_iban, "DE89370400440532013000");
    assert_eq!(block.transactions.len(), 2);

    let first = &block.transactions[0];
    assert_eq!(first.end_to_end_id, "E2E-9-1");
    assert_eq!(first.amount, Decimal::new(100000, 2));
    // несколько Ustrd склеиваются через пробел
    assert_eq!(first.remittance_info.as_deref(), Some("Order 2025-88 Pallet A"));

    let second = &block.transactions[1];
    // счёт без IBAN берётся из Othr/Id
    assert_eq!(second.creditor_account_iban, "ACCT-99");
    assert_eq!(second.remittance_info, None);

    assert_eq!(instruction.transaction_count(), 2);
    assert_eq!(instruction.control_sum(), Decimal::new(150000, 2));
}

#[test]
fn pain_transactions_flatten_to_csv() {
    let registry = SchemaRegistry::new();
    let instruction = Pain001Parser::new(&registry)
        .parse(SAMPLE)
        .expect("parse pain");

    let mut out = Vec::new();
    PaymentCsv::write(&mut out, &instruction).expect("write csv");
    let text = String::from_utf8(out).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3, "header + 2 transactions");
    assert_eq!(
        lines[0],
        "payment_id,end_to_end_id,execution_date,amount,currency,debtor_name,debtor_iban,creditor_name,creditor_iban,remittance_info"
    );
    assert!(lines[1].contains("1000.00"));
    assert!(lines[2].contains("ACCT-99"));
}
