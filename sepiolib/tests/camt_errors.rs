use sepiolib::{
    error::SepioError, formats::camt053::Camt053, parser::CamtParser, schema::SchemaRegistry,
    traits::ReadFormat,
};
use std::io::Cursor;

// вторая запись без <Amt>
const MISSING_AMT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.02">
  <BkToCstmrStmt>
    <GrpHdr>
      <MsgId>MSG-2025-002</MsgId>
      <CreDtTm>2025-11-01T08:00:00</CreDtTm>
    </GrpHdr>
    <Stmt>
      <Id>STMT-2025-11</Id>
      <CreDtTm>2025-11-01T08:00:00</CreDtTm>
      <Acct>
        <Id><IBAN>DE89370400440532013000</IBAN></Id>
      </Acct>
      <Bal>
        <Tp><CdOrPrtry><Cd>OPBD</Cd></CdOrPrtry></Tp>
        <Amt Ccy="EUR">500.00</Amt>
        <CdtDbtInd>CRDT</CdtDbtInd>
        <Dt><Dt>2025-11-01</Dt></Dt>
      </Bal>
      <Ntry>
        <Amt Ccy="EUR">10.00</Amt>
        <CdtDbtInd>CRDT</CdtDbtInd>
        <Sts>BOOK</Sts>
        <BookgDt><Dt>2025-11-01</Dt></BookgDt>
        <ValDt><Dt>2025-11-01</Dt></ValDt>
        <BkTxCd><Prtry><Cd>NTRF</Cd></Prtry></BkTxCd>
      </Ntry>
      <Ntry>
        <CdtDbtInd>DBIT</CdtDbtInd>
        <Sts>BOOK</Sts>
        <BookgDt><Dt>2025-11-02</Dt></BookgDt>
        <ValDt><Dt>2025-11-02</Dt></ValDt>
        <BkTxCd><Prtry><Cd>NTRF</Cd></Prtry></BkTxCd>
      </Ntry>
    </Stmt>
  </BkToCstmrStmt>
</Document>
"#;

#[test]
fn missing_amount_fails_validation_with_named_element() {
    let registry = SchemaRegistry::new();
    let err = CamtParser::new(&registry)
        .parse(MISSING_AMT)
        .expect_err("must fail");
    match err {
        SepioError::SchemaValidation(result) => {
            assert!(!result.valid);
            assert!(result
                .violations
                .iter()
                .any(|v| v.message.contains("Amt") && v.line > 0));
        }
        other => panic!("expected SchemaValidation, got {other}"),
    }
}

#[test]
fn missing_amount_fails_whole_extraction_naming_entry_index() {
    // извлекатель напрямую: никакой частичной выписки, индекс записи в ошибке
    let err = Camt053::read(Cursor::new(MISSING_AMT)).expect_err("must fail");
    match err {
        SepioError::IncompleteEntry { index, field } => {
            assert_eq!(index, 1);
            assert_eq!(field, "Amt");
        }
        other => panic!("expected IncompleteEntry, got {other}"),
    }
}

#[test]
fn truncated_document_is_malformed() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.02">
  <BkToCstmrStmt>
    <GrpHdr>
"#;
    let registry = SchemaRegistry::new();
    let err = CamtParser::new(&registry).parse(xml).expect_err("must fail");
    assert!(matches!(err, SepioError::MalformedXml(_)), "got {err}");
}

#[test]
fn unknown_family_namespace_is_unrecognized() {
    let xml = r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.054.001.02"><BkToCstmrDbtCdtNtfctn/></Document>"#;
    let registry = SchemaRegistry::new();
    let err = CamtParser::new(&registry).parse(xml).expect_err("must fail");
    assert!(matches!(err, SepioError::UnrecognizedNamespace(_)), "got {err}");
}

#[test]
fn unlisted_version_of_known_family_is_unsupported() {
    let xml = r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.09"><BkToCstmrStmt/></Document>"#;
    let registry = SchemaRegistry::new();
    let err = CamtParser::new(&registry).parse(xml).expect_err("must fail");
    match err {
        SepioError::UnsupportedVersion { version, .. } => assert_eq!(version, "053.001.09"),
        other => panic!("expected UnsupportedVersion, got {other}"),
    }
}

#[test]
fn pain_namespace_is_not_a_camt_document() {
    let xml = r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pain.001.001.03"><CstmrCdtTrfInitn/></Document>"#;
    let registry = SchemaRegistry::new();
    let err = CamtParser::new(&registry).parse(xml).expect_err("must fail");
    assert!(matches!(err, SepioError::UnrecognizedNamespace(_)), "got {err}");
}

#[test]
fn bad_date_facet_is_reported_with_position() {
    let xml = MISSING_AMT.replace("2025-11-02", "2025-13-40");
    let registry = SchemaRegistry::new();
    let err = CamtParser::new(&registry).parse(&xml).expect_err("must fail");
    match err {
        SepioError::SchemaValidation(result) => {
            assert!(result
                .violations
                .iter()
                .any(|v| v.message.contains("ISO date") && v.line > 1));
        }
        other => panic!("expected SchemaValidation, got {other}"),
    }
}
