// THEORY:
// TD2 is the two-line, 36-character ID card layout. It shares its shape with the
// MRVB visa; the document code letter and the composite check digit on line 2
// tell them apart.

use crate::core_modules::document_checker::{shaped, DocumentChecker, FieldReport, Verdict};
use crate::core_modules::fields::{DocumentType, Field};
use crate::core_modules::line_set::LineSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct Td2Checker;

impl DocumentChecker for Td2Checker {
    fn document_type(&self) -> DocumentType {
        DocumentType::Td2
    }

    fn check(&self, lines: &LineSet) -> Verdict {
        let raw = match shaped(lines, DocumentType::Td2) {
            Ok(raw) => raw,
            Err(reason) => return Verdict::structural(reason),
        };
        let (l1, l2) = (raw[0], raw[1]);

        let mut report = FieldReport::new();
        report.document_code(&l1[0..2], b"IAC");
        report.text(Field::IssuingState, &l1[2..5]);
        report.names(&l1[5..36]);
        report.checked(Field::DocumentNumber, &l2[0..9], l2[9]);
        report.text(Field::Nationality, &l2[10..13]);
        report.date(Field::DateOfBirth, &l2[13..19], l2[19]);
        report.sex(l2[20]);
        report.date(Field::DateOfExpiry, &l2[21..27], l2[27]);
        report.text(Field::OptionalData, &l2[28..35]);
        report.composite(&[&l2[0..10], &l2[13..20], &l2[21..35]], l2[35]);
        report.finish()
    }
}
