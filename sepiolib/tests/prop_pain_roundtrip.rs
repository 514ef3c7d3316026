use chrono::{NaiveDate, NaiveDateTime};
use proptest::collection::vec;
use proptest::prelude::*;
use rust_decimal::Decimal;
use sepiolib::{
    model::{CreditTransferTransaction, PartyInfo, PaymentInfoBlock, PaymentInstruction},
    parser::Pain001Parser,
    schema::SchemaRegistry,
};

fn identifier() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z0-9]{1,20}").unwrap()
}

fn party_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9]([A-Za-z0-9 ]{0,18}[A-Za-z0-9])?").unwrap()
}

fn iban() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z]{2}[0-9]{2}[A-Z0-9]{10,16}").unwrap()
}

fn currency() -> impl Strategy<Value = String> {
    prop_oneof![Just("EUR".to_string()), Just("USD".to_string()), Just("GBP".to_string())]
}

fn amount() -> impl Strategy<Value = Decimal> {
    // строго положительные суммы, не больше двух знаков после запятой
    (1i64..10_000_000, 0u32..=2).prop_map(|(n, scale)| Decimal::new(n, scale))
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2031, 1u32..13, 1u32..29)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn datetime() -> impl Strategy<Value = NaiveDateTime> {
    (date(), 0u32..24, 0u32..60, 0u32..60)
        .prop_map(|(d, h, m, s)| d.and_hms_opt(h, m, s).unwrap())
}

fn party() -> impl Strategy<Value = PartyInfo> {
    (party_name(), prop::option::of(identifier()))
        .prop_map(|(name, identifier)| PartyInfo { name, identifier })
}

fn transaction() -> impl Strategy<Value = CreditTransferTransaction> {
    (
        identifier(),
        amount(),
        currency(),
        party(),
        iban(),
        prop::option::of(party_name()),
    )
        .prop_map(
            |(end_to_end_id, amount, currency, creditor, creditor_account_iban, remittance_info)| {
                CreditTransferTransaction {
                    end_to_end_id,
                    amount,
                    currency,
                    creditor,
                    creditor_account_iban,
                    remittance_info,
                }
            },
        )
}

fn block() -> impl Strategy<Value = PaymentInfoBlock> {
    (identifier(), date(), party(), iban(), vec(transaction(), 1..4)).prop_map(
        |(payment_id, requested_execution_date, debtor, debtor_account_iban, transactions)| {
            PaymentInfoBlock {
                payment_id,
                requested_execution_date,
                debtor,
                debtor_account_iban,
                transactions,
            }
        },
    )
}

fn instruction() -> impl Strategy<Value = PaymentInstruction> {
    (identifier(), datetime(), party(), vec(block(), 1..3)).prop_map(
        |(message_id, creation_datetime, initiating_party, payment_info)| PaymentInstruction {
            message_id,
            creation_datetime,
            initiating_party,
            payment_info,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Закон симметрии: parse(build(x)) == x, оба направления через фасад,
    // то есть каждый сгенерированный документ ещё и проходит валидацию.
    #[test]
    fn pain_roundtrip_law(instr in instruction()) {
        let registry = SchemaRegistry::new();
        let parser = Pain001Parser::new(&registry);

        let mut out = Vec::new();
        parser.build(&mut out, &instr).expect("build");
        let xml = String::from_utf8(out).expect("utf8");
        let parsed = parser.parse(&xml).expect("parse");
        prop_assert_eq!(parsed, instr);
    }
}
