// THEORY:
// The `document_checker` module is the contract shared by the five layout
// checkers (TD1, TD2, TD3, MRVA, MRVB). A checker is a pure function from a
// `LineSet` to a `Verdict`. Not matching is a normal outcome, so it is a value
// (`Verdict::Rejected`) and never an error or a panic.
//
// Key architectural principles:
// 1.  **Cheap Rejection First**: `shaped` checks line count, line length and
//     character set before any field is sliced. A wrong-shaped line set costs a
//     couple of comparisons.
// 2.  **Field-by-Field Reporting**: the `FieldReport` builder validates one field
//     at a time and records every value with its status. The first failure becomes
//     the rejection reason, but the remaining fields are still extracted.
// 3.  **Nothing Silently Dropped**: a rejection caused by a checksum, date or sex
//     failure carries the full `FieldMap`, so FAILED values stay inspectable.

use crate::core_modules::checksum::checksum::{self, FILLER};
use crate::core_modules::fields::{DocumentType, Field, FieldMap, ValidationStatus};
use crate::core_modules::line_set::LineSet;
use serde::Serialize;
use std::fmt;

/// Why a checker declined a line set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    LineCount { expected: usize, found: usize },
    LineLength { line: usize, expected: usize, found: usize },
    IllegalCharacter { line: usize },
    DocumentCode { found: String },
    ChecksumMismatch { field: Field },
    MalformedDate { field: Field },
    MalformedSex,
}

impl RejectReason {
    /// Shape rejections happen before any field is read.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RejectReason::LineCount { .. }
                | RejectReason::LineLength { .. }
                | RejectReason::IllegalCharacter { .. }
        )
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::LineCount { expected, found } => {
                write!(f, "expected {expected} lines, found {found}")
            }
            RejectReason::LineLength { line, expected, found } => {
                write!(f, "line {} has {found} characters, expected {expected}", line + 1)
            }
            RejectReason::IllegalCharacter { line } => {
                write!(f, "line {} contains non-ASCII characters", line + 1)
            }
            RejectReason::DocumentCode { found } => write!(f, "document code {found:?} does not fit layout"),
            RejectReason::ChecksumMismatch { field } => write!(f, "check digit mismatch on {field:?}"),
            RejectReason::MalformedDate { field } => write!(f, "malformed date in {field:?}"),
            RejectReason::MalformedSex => f.write_str("malformed sex field"),
        }
    }
}

/// A declined line set, with whatever fields were extracted before declining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectReason,
    /// `None` for structural rejections, where no field was read.
    pub fields: Option<FieldMap>,
}

/// The outcome of running one checker against one line set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Matched(FieldMap),
    Rejected(Rejection),
}

impl Verdict {
    pub fn structural(reason: RejectReason) -> Self {
        Verdict::Rejected(Rejection { reason, fields: None })
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Matched(_))
    }

    /// The extracted fields, whether or not the layout matched.
    pub fn fields(&self) -> Option<&FieldMap> {
        match self {
            Verdict::Matched(fields) => Some(fields),
            Verdict::Rejected(rejection) => rejection.fields.as_ref(),
        }
    }
}

/// A validator and field extractor for exactly one MRZ layout.
pub trait DocumentChecker: Send + Sync {
    fn document_type(&self) -> DocumentType;

    fn check(&self, lines: &LineSet) -> Verdict;
}

/// Confirms the line set has the layout's shape and returns the raw line bytes.
pub(crate) fn shaped(lines: &LineSet, layout: DocumentType) -> Result<Vec<&[u8]>, RejectReason> {
    let expected_count = layout.line_count();
    if lines.len() != expected_count {
        return Err(RejectReason::LineCount { expected: expected_count, found: lines.len() });
    }
    let expected_len = layout.line_length();
    let mut raw = Vec::with_capacity(expected_count);
    for (i, line) in lines.lines().iter().enumerate() {
        let found = line.chars().count();
        if found != expected_len {
            return Err(RejectReason::LineLength { line: i, expected: expected_len, found });
        }
        if !line.is_ascii() {
            return Err(RejectReason::IllegalCharacter { line: i });
        }
        raw.push(line.as_bytes());
    }
    Ok(raw)
}

/// Strips filler padding from a raw field.
pub(crate) fn clean(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end_matches(FILLER as char).to_string()
}

fn is_mrz_char(c: u8) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == FILLER
}

/// Accumulates fields for one checker run and remembers the first failure.
pub(crate) struct FieldReport {
    fields: FieldMap,
    failure: Option<RejectReason>,
}

impl FieldReport {
    pub fn new() -> Self {
        Self { fields: FieldMap::new(), failure: None }
    }

    fn fail(&mut self, reason: RejectReason) {
        if self.failure.is_none() {
            self.failure = Some(reason);
        }
    }

    /// The two-character document code. Its first letter must be one of `allowed`.
    pub fn document_code(&mut self, raw: &[u8], allowed: &[u8]) {
        let value = clean(raw);
        let fits = allowed.contains(&raw[0]) && is_mrz_char(raw[1]);
        let status = if fits { ValidationStatus::Valid } else { ValidationStatus::Failed };
        if !fits {
            self.fail(RejectReason::DocumentCode { found: value.clone() });
        }
        self.fields.insert(Field::DocumentCode, value, status);
    }

    /// A field with no check digit. Odd characters mark it failed but never reject.
    pub fn text(&mut self, field: Field, raw: &[u8]) {
        let value = clean(raw);
        let status = if !raw.iter().all(|&c| is_mrz_char(c)) {
            ValidationStatus::Failed
        } else if value.is_empty() {
            ValidationStatus::Absent
        } else {
            ValidationStatus::Valid
        };
        self.fields.insert(field, value, status);
    }

    /// The name field: surname and given names separated by the first `<<`.
    pub fn names(&mut self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_end_matches(FILLER as char);
        let (primary, secondary) = match text.find("<<") {
            Some(i) => (&text[..i], &text[i + 2..]),
            None => (text, ""),
        };

        let surname = primary.replace(FILLER as char, " ").trim().to_string();
        let given = secondary
            .split(FILLER as char)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let letters_only = raw.iter().all(|&c| c.is_ascii_uppercase() || c == FILLER);
        for (field, value) in [(Field::Surname, surname), (Field::GivenNames, given)] {
            let status = if value.is_empty() {
                ValidationStatus::Absent
            } else if letters_only {
                ValidationStatus::Valid
            } else {
                ValidationStatus::Failed
            };
            self.fields.insert(field, value, status);
        }
    }

    /// A field guarded by its own check digit.
    pub fn checked(&mut self, field: Field, raw: &[u8], check: u8) -> bool {
        self.checked_value(field, clean(raw), &[raw], check)
    }

    /// A checked field whose displayed value differs from the covered spans,
    /// as with TD1 document numbers that overflow into the optional data.
    pub fn checked_value(&mut self, field: Field, value: String, spans: &[&[u8]], check: u8) -> bool {
        let ok = checksum::verify(spans, check);
        let status = if !ok {
            self.fail(RejectReason::ChecksumMismatch { field });
            ValidationStatus::Failed
        } else if value.is_empty() {
            ValidationStatus::Absent
        } else {
            ValidationStatus::Valid
        };
        self.fields.insert(field, value, status);
        ok
    }

    /// A YYMMDD date and its check digit. Only the digit-sextet shape is
    /// validated; calendar validity is not.
    pub fn date(&mut self, field: Field, raw: &[u8], check: u8) {
        let value = clean(raw);
        if raw.len() != 6 || !raw.iter().all(u8::is_ascii_digit) {
            self.fail(RejectReason::MalformedDate { field });
            self.fields.insert(field, value, ValidationStatus::Failed);
            return;
        }
        self.checked_value(field, value, &[raw], check);
    }

    pub fn sex(&mut self, raw: u8) {
        let valid = matches!(raw, b'M' | b'F' | b'X' | FILLER);
        if !valid {
            self.fail(RejectReason::MalformedSex);
        }
        let status = if valid { ValidationStatus::Valid } else { ValidationStatus::Failed };
        self.fields.insert(Field::Sex, (raw as char).to_string(), status);
    }

    /// The composite check digit over several discontiguous spans.
    pub fn composite(&mut self, spans: &[&[u8]], check: u8) {
        let ok = checksum::verify(spans, check);
        if !ok {
            self.fail(RejectReason::ChecksumMismatch { field: Field::FinalCheck });
        }
        let status = if ok { ValidationStatus::Valid } else { ValidationStatus::Failed };
        self.fields.insert(Field::FinalCheck, (check as char).to_string(), status);
    }

    pub fn finish(self) -> Verdict {
        match self.failure {
            None => Verdict::Matched(self.fields),
            Some(reason) => Verdict::Rejected(Rejection { reason, fields: Some(self.fields) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_rejects_wrong_count_before_length() {
        let lines = LineSet::new(["ABC"]);
        assert_eq!(
            shaped(&lines, DocumentType::Td3),
            Err(RejectReason::LineCount { expected: 2, found: 1 })
        );
    }

    #[test]
    fn shape_reports_offending_line() {
        let lines = LineSet::new(["<".repeat(44), "<".repeat(43)]);
        assert_eq!(
            shaped(&lines, DocumentType::Td3),
            Err(RejectReason::LineLength { line: 1, expected: 44, found: 43 })
        );
    }

    #[test]
    fn names_split_on_double_filler() {
        let mut report = FieldReport::new();
        report.names(b"ERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<");
        let Verdict::Matched(fields) = report.finish() else { panic!("names never reject") };
        assert_eq!(fields.value(Field::Surname), Some("ERIKSSON"));
        assert_eq!(fields.value(Field::GivenNames), Some("ANNA MARIA"));
    }

    #[test]
    fn names_without_given_part_are_absent() {
        let mut report = FieldReport::new();
        report.names(b"VAN<DER<BERG<<<<<<<<");
        let Verdict::Matched(fields) = report.finish() else { panic!("names never reject") };
        assert_eq!(fields.value(Field::Surname), Some("VAN DER BERG"));
        assert_eq!(fields.status(Field::GivenNames), Some(ValidationStatus::Absent));
    }

    #[test]
    fn first_failure_wins_but_all_fields_survive() {
        let mut report = FieldReport::new();
        report.sex(b'Q');
        report.checked(Field::DocumentNumber, b"L898902C3", b'0');
        let Verdict::Rejected(rejection) = report.finish() else { panic!("expected rejection") };
        assert_eq!(rejection.reason, RejectReason::MalformedSex);
        let fields = rejection.fields.expect("fields kept");
        assert_eq!(fields.value(Field::DocumentNumber), Some("L898902C3"));
        assert_eq!(fields.status(Field::DocumentNumber), Some(ValidationStatus::Failed));
    }

    #[test]
    fn non_digit_date_is_malformed() {
        let mut report = FieldReport::new();
        report.date(Field::DateOfBirth, b"74O812", b'2');
        let Verdict::Rejected(rejection) = report.finish() else { panic!("expected rejection") };
        assert_eq!(rejection.reason, RejectReason::MalformedDate { field: Field::DateOfBirth });
    }
}
