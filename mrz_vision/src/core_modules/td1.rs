// THEORY:
// TD1 is the three-line, 30-character ID card layout and the only three-line
// layout, so any 3x30 line set is either a TD1 or nothing at all.
//
// Line 1: document code, issuing state, document number + check, optional data.
// Line 2: birth date + check, sex, expiry + check, nationality, optional data,
//         composite check over lines 1 and 2.
// Line 3: the full name.
//
// Document numbers longer than nine characters overflow into the optional data.
// A filler in the number's check position signals the overflow; the extension
// then runs to the first filler and its last character is the real check digit.

use crate::core_modules::checksum::checksum::FILLER;
use crate::core_modules::document_checker::{clean, shaped, DocumentChecker, FieldReport, Verdict};
use crate::core_modules::fields::{DocumentType, Field};
use crate::core_modules::line_set::LineSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct Td1Checker;

impl DocumentChecker for Td1Checker {
    fn document_type(&self) -> DocumentType {
        DocumentType::Td1
    }

    fn check(&self, lines: &LineSet) -> Verdict {
        let raw = match shaped(lines, DocumentType::Td1) {
            Ok(raw) => raw,
            Err(reason) => return Verdict::structural(reason),
        };
        let (l1, l2, l3) = (raw[0], raw[1], raw[2]);

        let mut report = FieldReport::new();
        report.document_code(&l1[0..2], b"IAC");
        report.text(Field::IssuingState, &l1[2..5]);

        match long_number_end(l1) {
            Some(end) => {
                let extension = &l1[15..end - 1];
                let value = format!("{}{}", clean(&l1[5..14]), String::from_utf8_lossy(extension));
                report.checked_value(Field::DocumentNumber, value, &[&l1[5..14], extension], l1[end - 1]);
                report.text(Field::OptionalData, &l1[end..30]);
            }
            None => {
                report.checked(Field::DocumentNumber, &l1[5..14], l1[14]);
                report.text(Field::OptionalData, &l1[15..30]);
            }
        }

        report.date(Field::DateOfBirth, &l2[0..6], l2[6]);
        report.sex(l2[7]);
        report.date(Field::DateOfExpiry, &l2[8..14], l2[14]);
        report.text(Field::Nationality, &l2[15..18]);
        report.text(Field::OptionalData2, &l2[18..29]);
        report.composite(&[&l1[5..30], &l2[0..7], &l2[8..15], &l2[18..29]], l2[29]);
        report.names(l3);
        report.finish()
    }
}

/// End (exclusive) of an overflowing document number's extension, if line 1
/// uses the long-number form.
fn long_number_end(l1: &[u8]) -> Option<usize> {
    if l1[14] != FILLER || l1[15] == FILLER {
        return None;
    }
    let end = l1[15..30]
        .iter()
        .position(|&c| c == FILLER)
        .map(|i| 15 + i)
        .unwrap_or(30);
    // At least one extension character plus the check digit.
    (end - 15 >= 2).then_some(end)
}
