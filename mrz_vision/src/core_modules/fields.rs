// THEORY:
// The `fields` module defines the vocabulary every document checker speaks: the
// closed set of document layouts, the named fields a layout can carry, and the
// validation status attached to each extracted value.
//
// Key architectural principles:
// 1.  **Closed Enumerations**: `DocumentType` and `Field` are plain enums, so a
//     consumer can match exhaustively and the compiler catches missing cases.
// 2.  **Values Never Vanish**: a `FieldValue` always keeps its raw text, even when
//     its status is `Failed`. Downstream consumers decide how to flag it; the
//     engine never drops data on their behalf.
// 3.  **Ordered Maps**: `FieldMap` is backed by a `BTreeMap`, so iteration and
//     serialization order are stable and two identical inputs always produce
//     byte-identical output.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The five standardized MRZ layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    /// ID card, 3 lines of 30 characters.
    Td1,
    /// ID card, 2 lines of 36 characters.
    Td2,
    /// Passport, 2 lines of 44 characters.
    Td3,
    /// Visa, 2 lines of 44 characters.
    Mrva,
    /// Visa, 2 lines of 36 characters.
    Mrvb,
}

impl DocumentType {
    pub fn line_count(self) -> usize {
        match self {
            DocumentType::Td1 => 3,
            _ => 2,
        }
    }

    pub fn line_length(self) -> usize {
        match self {
            DocumentType::Td1 => 30,
            DocumentType::Td2 | DocumentType::Mrvb => 36,
            DocumentType::Td3 | DocumentType::Mrva => 44,
        }
    }

    /// Index of the line that holds `field` (or its check digit).
    pub fn line_of(self, field: Field) -> usize {
        use Field::*;
        match (self, field) {
            (DocumentType::Td1, DocumentCode | IssuingState | DocumentNumber | OptionalData) => 0,
            (DocumentType::Td1, Surname | GivenNames) => 2,
            (DocumentType::Td1, _) => 1,
            (_, DocumentCode | IssuingState | Surname | GivenNames) => 0,
            (_, _) => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Td1 => "TD1",
            DocumentType::Td2 => "TD2",
            DocumentType::Td3 => "TD3",
            DocumentType::Mrva => "MRVA",
            DocumentType::Mrvb => "MRVB",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every field a checker may extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    DocumentCode,
    IssuingState,
    DocumentNumber,
    Surname,
    GivenNames,
    Nationality,
    DateOfBirth,
    Sex,
    DateOfExpiry,
    OptionalData,
    /// The second optional-data block, present only on TD1 line 2.
    OptionalData2,
    /// The composite check digit over the whole zone.
    FinalCheck,
}

/// Validation outcome attached to a single extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Valid,
    Failed,
    Absent,
}

/// One extracted field: its cleaned value and how it validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub value: String,
    pub status: ValidationStatus,
}

/// The fields extracted from one line set, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldMap {
    entries: BTreeMap<Field, FieldValue>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, value: String, status: ValidationStatus) {
        self.entries.insert(field, FieldValue { value, status });
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.entries.get(&field)
    }

    /// The field's value, regardless of status.
    pub fn value(&self, field: Field) -> Option<&str> {
        self.entries.get(&field).map(|v| v.value.as_str())
    }

    pub fn status(&self, field: Field) -> Option<ValidationStatus> {
        self.entries.get(&field).map(|v| v.status)
    }

    /// The field's value only if it validated; this is what gets shown to users.
    pub fn valid_value(&self, field: Field) -> Option<&str> {
        self.entries
            .get(&field)
            .filter(|v| v.status == ValidationStatus::Valid)
            .map(|v| v.value.as_str())
    }

    /// Fields that failed validation but still carry their raw value.
    pub fn failed(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.entries
            .iter()
            .filter(|(_, v)| v.status == ValidationStatus::Failed)
            .map(|(k, v)| (*k, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
