// THEORY:
// The two machine-readable visa layouts differ only in line width: MRVA uses 44
// characters, MRVB 36. Neither carries a composite check digit, and the
// optional data after the expiry date has no check digit either. Because MRVA
// shares its shape with TD3 and MRVB shares its shape with TD2, the classifier
// tries the visa checkers last.

use crate::core_modules::document_checker::{shaped, DocumentChecker, FieldReport, Verdict};
use crate::core_modules::fields::{DocumentType, Field};
use crate::core_modules::line_set::LineSet;

/// Checker for a visa layout. Construct through `mrva()` or `mrvb()`.
#[derive(Debug, Clone, Copy)]
pub struct VisaChecker {
    layout: DocumentType,
}

impl VisaChecker {
    pub const fn mrva() -> Self {
        Self { layout: DocumentType::Mrva }
    }

    pub const fn mrvb() -> Self {
        Self { layout: DocumentType::Mrvb }
    }
}

impl DocumentChecker for VisaChecker {
    fn document_type(&self) -> DocumentType {
        self.layout
    }

    fn check(&self, lines: &LineSet) -> Verdict {
        let raw = match shaped(lines, self.layout) {
            Ok(raw) => raw,
            Err(reason) => return Verdict::structural(reason),
        };
        let (l1, l2) = (raw[0], raw[1]);
        let width = self.layout.line_length();

        let mut report = FieldReport::new();
        report.document_code(&l1[0..2], b"V");
        report.text(Field::IssuingState, &l1[2..5]);
        report.names(&l1[5..width]);
        report.checked(Field::DocumentNumber, &l2[0..9], l2[9]);
        report.text(Field::Nationality, &l2[10..13]);
        report.date(Field::DateOfBirth, &l2[13..19], l2[19]);
        report.sex(l2[20]);
        report.date(Field::DateOfExpiry, &l2[21..27], l2[27]);
        report.text(Field::OptionalData, &l2[28..width]);
        report.finish()
    }
}
