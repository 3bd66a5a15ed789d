//! Report construction checked through a real MIME parser

mod common;

use common::{create_raw_message, create_report_builder, ABUSE_DESK, OWNER};
use gmail_spam_reporter::report::AttachmentEncoding;
use gmail_spam_reporter::token::{self, Alphabet, BOUNDARY_LENGTH};
use mailparse::body::Body;
use mailparse::{parse_mail, MailHeaderMap};
use proptest::prelude::*;

#[test]
fn test_report_parses_as_two_part_multipart() {
    let raw = create_raw_message("r1");
    let boundary = token::boundary();
    let report = create_report_builder().build(&raw, &boundary);

    let parsed = parse_mail(&report).unwrap();
    assert_eq!(parsed.ctype.mimetype, "multipart/mixed");
    assert_eq!(parsed.ctype.params.get("boundary"), Some(&boundary));
    assert_eq!(parsed.headers.get_first_value("To").as_deref(), Some(ABUSE_DESK));
    assert_eq!(parsed.headers.get_first_value("From").as_deref(), Some(OWNER));
    assert_eq!(
        parsed.headers.get_first_value("Subject").as_deref(),
        Some("Spam report")
    );

    assert_eq!(parsed.subparts.len(), 2);

    let note = &parsed.subparts[0];
    assert_eq!(note.ctype.mimetype, "text/plain");
    assert_eq!(note.get_body().unwrap().trim_end(), "Spam report");

    let attachment = &parsed.subparts[1];
    assert_eq!(attachment.ctype.mimetype, "message/rfc822");
    let disposition = attachment.get_content_disposition();
    assert_eq!(disposition.params.get("filename").map(String::as_str), Some("email.txt"));
    assert_eq!(attachment.get_body_raw().unwrap(), raw);
}

#[test]
fn test_custom_subject_note_and_attachment_name() {
    let raw = create_raw_message("r2");
    let report = create_report_builder()
        .subject("[SPAM] forwarded")
        .note("Received in my spam folder.")
        .attachment_name("spam.eml")
        .build(&raw, "b0undary");

    let parsed = parse_mail(&report).unwrap();
    assert_eq!(
        parsed.headers.get_first_value("Subject").as_deref(),
        Some("[SPAM] forwarded")
    );
    assert_eq!(
        parsed.subparts[0].get_body().unwrap().trim_end(),
        "Received in my spam folder."
    );
    assert_eq!(
        parsed.subparts[1].ctype.params.get("name").map(String::as_str),
        Some("spam.eml")
    );
}

#[test]
fn test_verbatim_report_embeds_original_untouched() {
    let raw = create_raw_message("r3");
    let report = create_report_builder()
        .encoding(AttachmentEncoding::Verbatim)
        .build(&raw, "BOUNDARY");

    assert!(report.ends_with(b"--BOUNDARY--"));

    let parsed = parse_mail(&report).unwrap();
    assert_eq!(parsed.subparts.len(), 2);

    let attachment = &parsed.subparts[1];
    assert_eq!(attachment.ctype.mimetype, "message/rfc822");
    // Raw bytes sit under a base64 label, so read the undecoded body
    let body = match attachment.get_body_encoded() {
        Body::Base64(encoded) => encoded.get_raw().to_vec(),
        _ => panic!("attachment should be labelled base64"),
    };
    // The closing delimiter follows the body directly and claims its line break
    assert_eq!(trim_line_end(&body), trim_line_end(&raw));
}

fn trim_line_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| *b != b'\r' && *b != b'\n')
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

#[test]
fn test_boundaries_are_fresh_and_alphanumeric() {
    let first = token::boundary();
    let second = token::boundary();

    assert_eq!(first.len(), BOUNDARY_LENGTH);
    assert!(first.chars().all(|c| Alphabet::Alphanumeric.contains(c)));
    assert_ne!(first, second);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_attachment_round_trips_any_bytes(raw in proptest::collection::vec(any::<u8>(), 1..2048)) {
        let boundary = token::boundary();
        let report = create_report_builder().build(&raw, &boundary);

        let parsed = parse_mail(&report).unwrap();
        prop_assert_eq!(parsed.subparts.len(), 2);
        prop_assert_eq!(parsed.subparts[1].get_body_raw().unwrap(), raw);
    }

    #[test]
    fn prop_report_lines_stay_short(raw in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let report = create_report_builder().build(&raw, &token::boundary());
        let text = String::from_utf8(report).unwrap();
        prop_assert!(text.lines().all(|line| line.len() <= 998));
    }
}
