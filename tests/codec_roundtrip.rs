//! End-to-end codec properties: lexing, escaping, renumbering, sizing,
//! sign preservation, and acknowledgement classification.

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use hbci::domain::{AccountConnection, Amount, Balance, BankId};
use hbci::element::groups::{balance_elem, parse_balance};
use hbci::element::types::AlphaNumeric;
use hbci::extractor::{extract_elements, split_segments};
use hbci::message::bank::finalize;
use hbci::message::{BankMessage, BodySegment, ClientMessage};
use hbci::security::{PinTanCryptoProvider, PinTanSignatureProvider};
use hbci::segment::account::BalanceRequest;
use hbci::segment::registry::BankSegment;
use hbci::segment::RawSegment;

fn bank() -> BankId {
    BankId::new(280, "10090000").unwrap()
}

fn account() -> AccountConnection {
    AccountConnection {
        account_id: "1234567890".into(),
        sub_account_characteristics: String::new(),
        country_code: 280,
        bank_id: "10090000".into(),
    }
}

#[test]
fn lex_simple_segment() {
    let segments = split_segments(b"HNHBK:1:3+000000000100+220+0+1'").unwrap();
    assert_eq!(segments.len(), 1);
    let raw = RawSegment::parse(segments[0]).unwrap();
    assert_eq!(raw.header.id, "HNHBK");
    assert_eq!(raw.header.number, 1);
    assert_eq!(raw.header.version, 3);
    let elements: Vec<&[u8]> = raw.elements.iter().map(Vec::as_slice).collect();
    assert_eq!(elements, vec![&b"000000000100"[..], b"220", b"0", b"1"]);
}

#[test]
fn escape_round_trip() {
    let value = AlphaNumeric::new("A+B?C'D", 20).unwrap();
    let mut wire = Vec::new();
    value.marshal(&mut wire);
    assert_eq!(wire, b"A?+B??C?'D");
    let back = AlphaNumeric::unmarshal(&wire).unwrap();
    assert_eq!(back.as_str(), "A+B?C'D");
}

#[test]
fn message_size_equals_emitted_length() {
    let body: Vec<BodySegment> = vec![Box::new(BalanceRequest::new(account(), false))];
    let mut message = ClientMessage::new(220, "0", 1, body).unwrap();
    let bytes = message.marshal();

    let parsed = BankMessage::parse(&bytes, None).unwrap();
    let header = parsed.message_header().unwrap();
    assert_eq!(header.size, bytes.len() as u64);
    assert_eq!(header.dialog_id, "0");
    assert_eq!(header.message_number, 1);
}

#[test]
fn signature_envelope_renumbers_sequentially() {
    let signer = PinTanSignatureProvider::new(bank(), "user1", "secret");
    let body: Vec<BodySegment> = vec![
        Box::new(BalanceRequest::new(account(), false)),
        Box::new(BalanceRequest::new(account(), false)),
    ];
    let mut message = ClientMessage::new(220, "0", 1, body).unwrap();
    message.sign(&signer).unwrap();
    let bytes = message.marshal();

    // [H, SH, B1, B2, SE, E] with ordinal numbers 1..=6.
    let numbers: Vec<u32> = split_segments(&bytes)
        .unwrap()
        .iter()
        .map(|s| RawSegment::parse(s).unwrap().header.number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    let ids: Vec<String> = split_segments(&bytes)
        .unwrap()
        .iter()
        .map(|s| RawSegment::parse(s).unwrap().header.id)
        .collect();
    assert_eq!(ids, vec!["HNHBK", "HNSHK", "HKSAL", "HKSAL", "HNSHA", "HNHBS"]);
}

#[test]
fn encrypted_message_round_trips_through_bank_parser() {
    let signer = PinTanSignatureProvider::new(bank(), "user1", "secret");
    let crypter = PinTanCryptoProvider::new(bank(), "user1");
    let body: Vec<BodySegment> = vec![Box::new(BalanceRequest::new(account(), false))];
    let mut message = ClientMessage::new(220, "0", 1, body).unwrap();
    let wire = finalize(&mut message, &signer, &crypter).unwrap();

    // The wire form is [HNHBK, HNVSK, HNVSD, HNHBS]; decrypting restores
    // the signed span in place of the envelope.
    let parsed = BankMessage::parse(&wire, Some(&crypter)).unwrap();
    let ids: Vec<&str> = parsed.segments.iter().map(|s| s.segment_id()).collect();
    assert_eq!(
        ids,
        vec!["HNHBK", "HNVSK", "HNSHK", "HKSAL", "HNSHA", "HNHBS"]
    );
    assert_eq!(parsed.message_header().unwrap().size, wire.len() as u64);
}

#[test]
fn balance_sign_survives_round_trip() {
    for value in [dec!(-9876.54), dec!(0), dec!(123.45)] {
        let balance = Balance {
            amount: Amount::new(value, "EUR").unwrap(),
            transmission_date: NaiveDate::from_ymd_opt(2023, 4, 12).unwrap(),
            transmission_time: None,
        };
        let mut wire = Vec::new();
        balance_elem(&balance).marshal_into(&mut wire);
        let parsed = parse_balance(&wire).unwrap();
        assert_eq!(parsed.amount.value, value);
        assert_eq!(parsed.amount.currency, "EUR");
    }
}

#[test]
fn acknowledgement_outcome_is_worst_class() {
    let response = b"HNHBK:1:3+000000000170+220+82410923+2'\
HIRMG:2:2+0010::Nachricht entgegengenommen.'\
HIRMS:3:2:3+0020::Auftrag ausgef\xFChrt.+3040::Es liegen weitere Informationen vor:point'\
HIRMS:4:2:4+9210::Auftrag abgelehnt.'\
HNHBS:5:1+2'";
    let parsed = BankMessage::parse(response, None).unwrap();
    assert!(parsed.has_error());
    assert_eq!(parsed.acknowledgements().len(), 4);
    // HIRMS entries are attributable to the referenced request segment.
    assert_eq!(parsed.acknowledgements_for(4)[0].code, 9210);
    let continuation = &parsed.acknowledgements_for(3)[1];
    assert_eq!(continuation.code, 3040);
    assert_eq!(continuation.params, vec!["point"]);
}

#[test]
fn unknown_segments_do_not_fail_the_message() {
    let response = b"HNHBK:1:3+000000000140+220+82410923+2'\
HIRMG:2:2+0010::ok'\
HIFOO:3:9:4+some+future+layout'\
HNHBS:4:1+2'";
    let parsed = BankMessage::parse(response, None).unwrap();
    let unknown: Vec<_> = parsed.unknown_segments().collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].header.id, "HIFOO");
    assert_eq!(unknown[0].header.version, 9);
    // Siblings are still decoded.
    assert!(matches!(parsed.segments[1], BankSegment::MessageAck(_)));
}

#[test]
fn binary_runs_pass_through_the_full_stack() {
    // An HIKAZ carrying a blob full of separators must survive message
    // lexing untouched.
    let blob = b":20:REF'+:@\r\n:25:10090000/1234567890\r\n";
    let mut segment = Vec::new();
    segment.extend_from_slice(b"HIKAZ:3:5:4+@");
    segment.extend_from_slice(blob.len().to_string().as_bytes());
    segment.extend_from_slice(b"@");
    segment.extend_from_slice(blob);
    segment.push(b'\'');

    let mut response = Vec::new();
    response.extend_from_slice(b"HNHBK:1:3+000000000200+220+82410923+2'HIRMG:2:2+0010::ok'");
    response.extend_from_slice(&segment);
    response.extend_from_slice(b"HNHBS:4:1+2'");

    let parsed = BankMessage::parse(&response, None).unwrap();
    let transactions: Vec<_> = parsed.transactions().collect();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].booked, blob);
}

#[test]
fn elements_with_escapes_extract_cleanly() {
    let elements = extract_elements(b"HIRMG:2:2+0010::Freigabe mit ?+49-Nummer'").unwrap();
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[1], b"0010::Freigabe mit ?+49-Nummer");
}
