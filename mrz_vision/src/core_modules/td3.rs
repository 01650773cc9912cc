// THEORY:
// TD3 is the passport layout: two lines of 44 characters. Line 1 carries the
// document code, issuing state and the full name. Line 2 carries the document
// number, nationality, dates, sex, the personal number and a composite check
// digit covering most of line 2. The composite is what separates a passport from
// an MRVA visa of identical shape.

use crate::core_modules::document_checker::{shaped, DocumentChecker, FieldReport, Verdict};
use crate::core_modules::fields::{DocumentType, Field};
use crate::core_modules::line_set::LineSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct Td3Checker;

impl DocumentChecker for Td3Checker {
    fn document_type(&self) -> DocumentType {
        DocumentType::Td3
    }

    fn check(&self, lines: &LineSet) -> Verdict {
        let raw = match shaped(lines, DocumentType::Td3) {
            Ok(raw) => raw,
            Err(reason) => return Verdict::structural(reason),
        };
        let (l1, l2) = (raw[0], raw[1]);

        let mut report = FieldReport::new();
        report.document_code(&l1[0..2], b"P");
        report.text(Field::IssuingState, &l1[2..5]);
        report.names(&l1[5..44]);
        report.checked(Field::DocumentNumber, &l2[0..9], l2[9]);
        report.text(Field::Nationality, &l2[10..13]);
        report.date(Field::DateOfBirth, &l2[13..19], l2[19]);
        report.sex(l2[20]);
        report.date(Field::DateOfExpiry, &l2[21..27], l2[27]);
        report.checked(Field::OptionalData, &l2[28..42], l2[42]);
        report.composite(&[&l2[0..10], &l2[13..20], &l2[21..43]], l2[43]);
        report.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::document_checker::RejectReason;
    use crate::core_modules::fields::ValidationStatus;

    const LINE1: &str = "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "L898902C36UTO7408122F1204159ZE184226B<<<<<10";

    #[test]
    fn parses_icao_specimen() {
        let verdict = Td3Checker.check(&LineSet::new([LINE1, LINE2]));
        let Verdict::Matched(fields) = verdict else { panic!("specimen must match: {verdict:?}") };
        assert_eq!(fields.value(Field::DocumentCode), Some("P"));
        assert_eq!(fields.value(Field::IssuingState), Some("UTO"));
        assert_eq!(fields.value(Field::DocumentNumber), Some("L898902C3"));
        assert_eq!(fields.value(Field::Surname), Some("ERIKSSON"));
        assert_eq!(fields.value(Field::GivenNames), Some("ANNA MARIA"));
        assert_eq!(fields.value(Field::Nationality), Some("UTO"));
        assert_eq!(fields.value(Field::DateOfBirth), Some("740812"));
        assert_eq!(fields.value(Field::Sex), Some("F"));
        assert_eq!(fields.value(Field::DateOfExpiry), Some("120415"));
        assert_eq!(fields.value(Field::OptionalData), Some("ZE184226B"));
        assert_eq!(fields.status(Field::FinalCheck), Some(ValidationStatus::Valid));
    }

    fn flip_digit(line: &str, i: usize) -> Option<String> {
        let mut bytes = line.as_bytes().to_vec();
        if !bytes[i].is_ascii_digit() {
            return None;
        }
        bytes[i] = b'0' + (bytes[i] - b'0' + 1) % 10;
        Some(String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn every_guarded_digit_flips_its_status() {
        let guarded = [
            (Field::DocumentNumber, 0..10),
            (Field::DateOfBirth, 13..20),
            (Field::DateOfExpiry, 21..28),
            (Field::OptionalData, 28..43),
        ];
        let clean = Td3Checker.check(&LineSet::new([LINE1, LINE2]));
        for (field, _) in &guarded {
            assert_eq!(clean.fields().unwrap().status(*field), Some(ValidationStatus::Valid));
        }

        for (field, span) in guarded {
            for i in span {
                let Some(line2) = flip_digit(LINE2, i) else { continue };
                let verdict = Td3Checker.check(&LineSet::new([LINE1, line2.as_str()]));
                assert!(!verdict.is_match(), "flip at {i} matched");
                let fields = verdict.fields().expect("fields extracted");
                assert_eq!(fields.status(field), Some(ValidationStatus::Failed), "{field:?} missed flip at {i}");
                assert_eq!(
                    fields.status(Field::FinalCheck),
                    Some(ValidationStatus::Failed),
                    "composite missed flip at {i}"
                );
            }
        }
    }

    #[test]
    fn composite_digit_flip_fails_only_final_check() {
        let line2 = flip_digit(LINE2, 43).unwrap();
        let verdict = Td3Checker.check(&LineSet::new([LINE1, line2.as_str()]));
        let Verdict::Rejected(rejection) = verdict else { panic!("corrupted composite must not match") };
        assert_eq!(rejection.reason, RejectReason::ChecksumMismatch { field: Field::FinalCheck });
        let fields = rejection.fields.unwrap();
        assert_eq!(fields.status(Field::FinalCheck), Some(ValidationStatus::Failed));
        assert_eq!(fields.status(Field::DocumentNumber), Some(ValidationStatus::Valid));
        assert_eq!(fields.status(Field::OptionalData), Some(ValidationStatus::Valid));
    }

    #[test]
    fn visa_shaped_zone_fails_composite() {
        let verdict = Td3Checker.check(&LineSet::new([
            "V<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<",
            "L8988901C4XXX4009078F96121096ZE184226B<<<<<<",
        ]));
        let Verdict::Rejected(rejection) = verdict else { panic!("visa must not match TD3") };
        assert_eq!(rejection.reason, RejectReason::DocumentCode { found: "V".into() });
        let fields = rejection.fields.unwrap();
        assert_eq!(fields.status(Field::FinalCheck), Some(ValidationStatus::Failed));
    }

    #[test]
    fn id_card_shape_rejected_structurally() {
        let verdict = Td3Checker.check(&LineSet::new([
            "I<UTOD231458907<<<<<<<<<<<<<<<",
            "7408122F1204159UTO<<<<<<<<<<<6",
            "ERIKSSON<<ANNA<MARIA<<<<<<<<<<",
        ]));
        let Verdict::Rejected(rejection) = verdict else { panic!("TD1 shape must not match TD3") };
        assert!(rejection.reason.is_structural());
        assert!(rejection.fields.is_none());
    }
}
