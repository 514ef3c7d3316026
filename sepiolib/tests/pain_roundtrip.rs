use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sepiolib::{
    error::SepioError,
    model::{CreditTransferTransaction, PartyInfo, PaymentInfoBlock, PaymentInstruction},
    parser::Pain001Parser,
    schema::SchemaRegistry,
};

fn sample_instruction() -> PaymentInstruction {
    PaymentInstruction {
        message_id: "MSG-PAY-2025-7".into(),
        creation_datetime: NaiveDateTime::parse_from_str("2025-11-03T09:30:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap(),
        initiating_party: PartyInfo {
            name: "ACME GmbH".into(),
            identifier: Some("ACME-001".into()),
        },
        payment_info: vec![PaymentInfoBlock {
            payment_id: "PMT-2025-7-1".into(),
            requested_execution_date: NaiveDate::from_ymd_opt(2025, 11, 5).unwrap(),
            debtor: PartyInfo {
                name: "ACME GmbH".into(),
                identifier: None,
            },
            debtor_account_iban: "DE89370400440532013000".into(),
            transactions: vec![
                CreditTransferTransaction {
                    end_to_end_id: "E2E-A1".into(),
                    amount: Decimal::new(12550, 2),
                    currency: "EUR".into(),
                    creditor: PartyInfo {
                        name: "Stadtwerke Berlin".into(),
                        identifier: None,
                    },
                    creditor_account_iban: "DE75512108001245126199".into(),
                    remittance_info: Some("Invoice 4711".into()),
                },
                CreditTransferTransaction {
                    end_to_end_id: "E2E-A2".into(),
                    amount: Decimal::new(9900, 2),
                    currency: "EUR".into(),
                    creditor: PartyInfo {
                        name: "Muster AG".into(),
                        identifier: Some("MUSTER-42".into()),
                    },
                    creditor_account_iban: "DE02120300000000202051".into(),
                    remittance_info: None,
                },
            ],
        }],
    }
}

#[test]
fn build_then_parse_is_identity() {
    let registry = SchemaRegistry::new();
    let parser = Pain001Parser::new(&registry);
    let instruction = sample_instruction();

    let mut out = Vec::new();
    parser.build(&mut out, &instruction).expect("build pain");
    let xml = String::from_utf8(out).expect("utf8");
    assert!(xml.contains("urn:iso:std:iso:20022:tech:xsd:pain.001.001.03"));
    assert!(xml.contains("<CstmrCdtTrfInitn>"));

    let parsed = parser.parse(&xml).expect("parse pain");
    assert_eq!(parsed, instruction);
}

#[test]
fn built_document_has_derived_totals() {
    let registry = SchemaRegistry::new();
    let parser = Pain001Parser::new(&registry);

    let mut out = Vec::new();
    parser.build(&mut out, &sample_instruction()).expect("build");
    let xml = String::from_utf8(out).unwrap();
    // NbOfTxs и CtrlSum считаются из транзакций
    assert!(xml.contains("<NbOfTxs>2</NbOfTxs>"));
    assert!(xml.contains("<CtrlSum>224.50</CtrlSum>"));
}

#[test]
fn zero_amount_is_rejected_before_emission() {
    let registry = SchemaRegistry::new();
    let parser = Pain001Parser::new(&registry);
    let mut instruction = sample_instruction();
    instruction.payment_info[0].transactions[0].amount = Decimal::ZERO;

    let mut out = Vec::new();
    let err = parser
        .build(&mut out, &instruction)
        .expect_err("must fail");
    assert!(matches!(err, SepioError::InvalidInstruction(_)), "got {err}");
    assert!(out.is_empty(), "no bytes may be emitted");
}

#[test]
fn empty_transaction_list_is_rejected() {
    let registry = SchemaRegistry::new();
    let parser = Pain001Parser::new(&registry);
    let mut instruction = sample_instruction();
    instruction.payment_info[0].transactions.clear();

    let mut out = Vec::new();
    let err = parser.build(&mut out, &instruction).expect_err("must fail");
    assert!(matches!(err, SepioError::InvalidInstruction(_)), "got {err}");
    assert!(out.is_empty());
}

#[test]
fn missing_debtor_account_is_rejected() {
    let registry = SchemaRegistry::new();
    let parser = Pain001Parser::new(&registry);
    let mut instruction = sample_instruction();
    instruction.payment_info[0].debtor_account_iban.clear();

    let mut out = Vec::new();
    let err = parser.build(&mut out, &instruction).expect_err("must fail");
    assert!(matches!(err, SepioError::InvalidInstruction(_)), "got {err}");
}
