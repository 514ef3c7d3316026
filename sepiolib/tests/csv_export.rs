use chrono::NaiveDate;
use rust_decimal::Decimal;
use sepiolib::{
    formats::csv::EntryCsv,
    model::{CreditDebit, EntryRecord, EntryStatus},
    traits::{ReadFormat, WriteFormat},
};
use std::io::Cursor;

fn entry(amount: Decimal, dc: CreditDebit) -> EntryRecord {
    EntryRecord {
        booking_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
        value_date: NaiveDate::from_ymd_opt(2025, 10, 2).unwrap(),
        amount,
        currency: "EUR".into(),
        credit_debit: dc,
        status: EntryStatus::Booked,
        remittance_info: None,
        counterparty_name: None,
        counterparty_iban: None,
    }
}

#[test]
fn empty_export_is_header_only() {
    let mut out = Vec::new();
    EntryCsv::write(&mut out, &[]).expect("write");
    let text = String::from_utf8(out).unwrap();
    assert_eq!(
        text,
        "booking_date,value_date,amount,currency,credit_debit,status,remittance_info,counterparty_name,counterparty_iban\n"
    );
}

#[test]
fn line_count_is_entries_plus_header() {
    let entries = vec![
        entry(Decimal::new(100, 2), CreditDebit::Credit),
        entry(Decimal::new(7, 0), CreditDebit::Debit),
        entry(Decimal::new(12345, 2), CreditDebit::Credit),
    ];
    let mut out = Vec::new();
    EntryCsv::write(&mut out, &entries).expect("write");
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), entries.len() + 1);
    assert!(!text.ends_with("\n\n"), "no trailing blank line");
}

#[test]
fn amounts_always_render_two_decimal_places() {
    // целое "7" обязано стать "7.00"
    let entries = vec![entry(Decimal::new(7, 0), CreditDebit::Debit)];
    let mut out = Vec::new();
    EntryCsv::write(&mut out, &entries).expect("write");
    let text = String::from_utf8(out).unwrap();
    assert!(text.lines().nth(1).unwrap().contains(",7.00,"));
}

#[test]
fn read_back_recovers_amounts_and_dates_exactly() {
    let entries = vec![
        entry(Decimal::new(999999, 2), CreditDebit::Credit),
        entry(Decimal::new(1, 2), CreditDebit::Debit),
    ];
    let mut out = Vec::new();
    EntryCsv::write(&mut out, &entries).expect("write");

    let restored = EntryCsv::read(Cursor::new(out)).expect("read");
    assert_eq!(restored, entries);
}
