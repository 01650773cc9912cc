// THEORY:
// The `classifier` is the cascade that turns a `LineSet` into a `Classification`.
// It owns no state. It walks the five checkers in a fixed priority order and
// returns the first match.
//
// Key architectural principles:
// 1.  **Fixed Priority**: TD1 -> TD2 -> TD3 -> MRVA -> MRVB. Shapes overlap
//     (TD2/MRVB are both 2x36, TD3/MRVA both 2x44), so a line set can pass more
//     than one shape check. Trying the layouts with a composite check digit first
//     means the stricter layout wins when both would accept.
// 2.  **Explicit Cascade**: each checker returns a `Verdict` value. A rejection is
//     logged at debug level and the next checker runs. Nothing unwinds.
// 3.  **Purity**: no globals, no caches, no interior mutability. The same line set
//     always yields the same classification, and the checkers can be called from
//     any number of threads at once.

use crate::core_modules::document_checker::{DocumentChecker, RejectReason, Verdict};
use crate::core_modules::fields::{DocumentType, FieldMap};
use crate::core_modules::line_set::LineSet;
use crate::core_modules::td1::Td1Checker;
use crate::core_modules::td2::Td2Checker;
use crate::core_modules::td3::Td3Checker;
use crate::core_modules::visa::VisaChecker;
use serde::Serialize;

/// The checkers in the order they are tried.
pub static CHECKERS: [&dyn DocumentChecker; 5] = [
    &Td1Checker,
    &Td2Checker,
    &Td3Checker,
    &VisaChecker::mrva(),
    &VisaChecker::mrvb(),
];

/// The outcome of classifying one line set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    Matched {
        document_type: DocumentType,
        fields: FieldMap,
    },
    NoMatch,
}

impl Classification {
    pub fn document_type(&self) -> Option<DocumentType> {
        match self {
            Classification::Matched { document_type, .. } => Some(*document_type),
            Classification::NoMatch => None,
        }
    }

    pub fn fields(&self) -> Option<&FieldMap> {
        match self {
            Classification::Matched { fields, .. } => Some(fields),
            Classification::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Classification::Matched { .. })
    }
}

/// A layout whose shape and document code fit but whose fields did not
/// validate. Kept so callers can still show what was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialMatch {
    pub document_type: DocumentType,
    pub reason: RejectReason,
    pub fields: FieldMap,
}

/// A classification plus, when nothing matched, the closest rejected layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub classification: Classification,
    pub closest: Option<PartialMatch>,
}

/// Runs the cascade and keeps the first rejection that got past the shape and
/// document-code checks.
pub fn assess(lines: &LineSet) -> Assessment {
    let mut closest = None;
    for checker in CHECKERS.iter() {
        match checker.check(lines) {
            Verdict::Matched(fields) => {
                return Assessment {
                    classification: Classification::Matched {
                        document_type: checker.document_type(),
                        fields,
                    },
                    closest: None,
                };
            }
            Verdict::Rejected(rejection) => {
                log::debug!(
                    "[CLASSIFY] {} rejected: {}",
                    checker.document_type(),
                    rejection.reason
                );
                if closest.is_some() || matches!(rejection.reason, RejectReason::DocumentCode { .. }) {
                    continue;
                }
                if let Some(fields) = rejection.fields {
                    closest = Some(PartialMatch {
                        document_type: checker.document_type(),
                        reason: rejection.reason,
                        fields,
                    });
                }
            }
        }
    }
    Assessment {
        classification: Classification::NoMatch,
        closest,
    }
}

/// Classifies a line set against every known layout.
pub fn classify(lines: &LineSet) -> Classification {
    assess(lines).classification
}

/// Convenience over raw strings, as they come from a recognizer.
pub fn classify_lines<S: AsRef<str>>(lines: &[S]) -> Classification {
    classify(&LineSet::new(lines))
}
