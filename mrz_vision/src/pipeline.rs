// THEORY:
// The `pipeline` module is the synchronous top-level API of the engine. It
// takes one image through the whole stack: hash it, hand it to the recognizer,
// group the recognized lines into candidate regions, classify each region and,
// for passports, resolve the portrait zone from the artifacts the recognizer
// recorded on the side.
//
// Key architectural principles:
// 1.  **One Result Per Region**: a frame can hold several MRZs. Every candidate
//     region yields a `ScanResult`, matched or not, so callers see what was read
//     even when it did not validate.
// 2.  **Shared Resolution**: the bounded capture pipeline reuses `MrzScanner`
//     for recognition and resolution. Only the store-clearing policy differs
//     between the two, and each caller owns that decision.

use crate::core_modules::artifacts::Artifact;
use crate::core_modules::classifier::{assess, classify, Classification, PartialMatch};
use crate::core_modules::correlation_store::FrameCorrelationStore;
use crate::core_modules::fields::{DocumentType, Field, FieldMap};
use crate::core_modules::frame::{Frame, FrameHash, FrameId};
use crate::core_modules::geometry::Quad;
use crate::core_modules::grouping::group_line_sets;
use crate::core_modules::portrait::{GeometricPortraitLocator, PortraitLocator};
use crate::core_modules::recognizer::{ArtifactSink, LineItem, TextLineRecognizer};
use crate::error::RecognizerError;
use image::RgbImage;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// What was read from one MRZ region of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub classification: Classification,
    /// When nothing matched: the layout that read the region but failed validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest: Option<PartialMatch>,
    pub raw_lines: Vec<String>,
    pub location: Quad,
    pub portrait_zone: Option<Quad>,
}

impl ScanResult {
    pub fn document_type(&self) -> Option<DocumentType> {
        self.classification.document_type()
    }

    /// The matched layout, or failing that the closest one.
    pub fn read_as(&self) -> Option<(DocumentType, &FieldMap)> {
        match (&self.classification, &self.closest) {
            (Classification::Matched { document_type, fields }, _) => Some((*document_type, fields)),
            (Classification::NoMatch, Some(closest)) => Some((closest.document_type, &closest.fields)),
            (Classification::NoMatch, None) => None,
        }
    }

    /// A field's value, only if it validated.
    fn shown(&self, field: Field) -> &str {
        self.read_as()
            .and_then(|(_, fields)| fields.valid_value(field))
            .unwrap_or("")
    }

    /// Indices of the lines holding a failed field. Every line when no layout
    /// could read the region.
    pub fn failed_lines(&self) -> BTreeSet<usize> {
        match self.read_as() {
            Some((document_type, fields)) => fields.failed().map(|(field, _)| document_type.line_of(field)).collect(),
            None => (0..self.raw_lines.len()).collect(),
        }
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Raw Text:")?;
        let failed = self.failed_lines();
        for (index, line) in self.raw_lines.iter().enumerate() {
            if failed.contains(&index) {
                writeln!(f, "\tLine {}: {} [Validation Failed]", index + 1, line)?;
            } else {
                writeln!(f, "\tLine {}: {}", index + 1, line)?;
            }
        }
        writeln!(f, "Parsed Information:")?;
        let document_type = self.read_as().map(|(t, _)| t.as_str()).unwrap_or("");
        writeln!(f, "\tDocumentType: {document_type}")?;
        writeln!(f, "\tDocumentID: {}", self.shown(Field::DocumentNumber))?;
        writeln!(f, "\tSurname: {}", self.shown(Field::Surname))?;
        writeln!(f, "\tGivenName: {}", self.shown(Field::GivenNames))?;
        writeln!(f, "\tNationality: {}", self.shown(Field::Nationality))?;
        writeln!(f, "\tIssuingCountryorOrganization: {}", self.shown(Field::IssuingState))?;
        writeln!(f, "\tGender: {}", self.shown(Field::Sex))?;
        writeln!(f, "\tDateofBirth(YYMMDD): {}", self.shown(Field::DateOfBirth))?;
        writeln!(f, "\tExpirationDate(YYMMDD): {}", self.shown(Field::DateOfExpiry))
    }
}

/// Every result produced for one captured frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub frame_id: FrameId,
    pub frame_hash: FrameHash,
    pub results: Vec<ScanResult>,
}

impl FrameReport {
    pub fn matched(&self) -> impl Iterator<Item = &ScanResult> {
        self.results.iter().filter(|r| r.classification.is_match())
    }
}

/// One-shot scanner: recognizer, correlation store and portrait locator.
#[derive(Clone)]
pub struct MrzScanner {
    recognizer: Arc<dyn TextLineRecognizer>,
    store: Arc<FrameCorrelationStore>,
    locator: Option<Arc<dyn PortraitLocator>>,
}

impl MrzScanner {
    pub fn new(recognizer: Arc<dyn TextLineRecognizer>) -> Self {
        Self {
            recognizer,
            store: Arc::new(FrameCorrelationStore::new()),
            locator: Some(Arc::new(GeometricPortraitLocator::default())),
        }
    }

    pub fn with_locator(mut self, locator: Arc<dyn PortraitLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Skip portrait resolution; artifacts are not recorded at all.
    pub fn without_portraits(mut self) -> Self {
        self.locator = None;
        self
    }

    pub fn store(&self) -> &Arc<FrameCorrelationStore> {
        &self.store
    }

    pub fn scan(&self, image: RgbImage) -> Result<Vec<ScanResult>, RecognizerError> {
        self.scan_frame(&Frame::new(image))
    }

    pub fn scan_frame(&self, frame: &Frame) -> Result<Vec<ScanResult>, RecognizerError> {
        self.store.clear();
        let _bundle = self.store.evict_on_drop(frame.hash());
        let lines = self.recognize(frame)?;
        Ok(self.resolve(frame.hash(), lines))
    }

    /// Runs the recognizer. Blocking.
    pub(crate) fn recognize(&self, frame: &Frame) -> Result<Vec<LineItem>, RecognizerError> {
        let sink = match self.locator {
            Some(_) => ArtifactSink::new(Arc::clone(&self.store)),
            None => ArtifactSink::discard(),
        };
        self.recognizer.recognize(frame, &sink)
    }

    /// Groups, classifies and correlates the recognizer's output for one frame.
    pub(crate) fn resolve(&self, hash: &FrameHash, lines: Vec<LineItem>) -> Vec<ScanResult> {
        let regions = group_line_sets(&lines, |set| classify(set).is_match());
        if self.locator.is_some() {
            self.store.record(hash, Artifact::RecognizedLines(lines));
        }
        log::debug!("[SCAN] {} candidate region(s) in {hash}", regions.len());

        regions
            .into_iter()
            .map(|region| {
                let assessment = assess(&region.lines);
                let classification = assessment.classification;
                let portrait_zone = match (classification.document_type(), &self.locator) {
                    (Some(DocumentType::Td3), Some(locator)) => self.store.query(hash, locator.as_ref()),
                    _ => None,
                };
                ScanResult {
                    classification,
                    closest: assessment.closest,
                    raw_lines: region.lines.lines().to_vec(),
                    location: region.location,
                    portrait_zone,
                }
            })
            .collect()
    }
}

impl fmt::Debug for MrzScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MrzScanner")
            .field("store", &self.store)
            .field("locate_portraits", &self.locator.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::artifacts::{DeskewedImage, ScaledColourImage};

    const TD3: [&str; 2] = [
        "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<",
        "L898902C36UTO7408122F1204159ZE184226B<<<<<10",
    ];

    fn passport_recognizer(frame: &Frame, sink: &ArtifactSink) -> Result<Vec<LineItem>, RecognizerError> {
        let hash = frame.hash();
        sink.emit(hash, Artifact::LocalizedLines(vec![Quad::rect(40, 520, 900, 40)]));
        sink.emit(
            hash,
            Artifact::DeskewedImage(DeskewedImage { width: 900, height: 90, source_quad: Quad::rect(0, 0, 1000, 700) }),
        );
        sink.emit(hash, Artifact::ScaledColourImage(ScaledColourImage { width: 500, height: 350, scale: 0.5 }));
        sink.emit(hash, Artifact::DetectedQuads(vec![Quad::rect(0, 0, 500, 350)]));
        Ok(vec![
            LineItem::new(TD3[0], Quad::rect(40, 520, 900, 40)),
            LineItem::new(TD3[1], Quad::rect(40, 570, 900, 40)),
        ])
    }

    #[test]
    fn scan_resolves_passport_and_portrait() {
        let scanner = MrzScanner::new(Arc::new(passport_recognizer));
        let results = scanner.scan(RgbImage::new(8, 8)).expect("scan");
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.document_type(), Some(DocumentType::Td3));
        assert_eq!(result.location, Quad::rect(40, 520, 900, 90));
        assert!(result.portrait_zone.is_some());
        assert!(scanner.store().is_empty());
    }

    #[test]
    fn no_portrait_without_locator() {
        let scanner = MrzScanner::new(Arc::new(passport_recognizer)).without_portraits();
        let results = scanner.scan(RgbImage::new(8, 8)).expect("scan");
        assert_eq!(results[0].portrait_zone, None);
    }

    #[test]
    fn recognizer_errors_propagate() {
        let failing = |_: &Frame, _: &ArtifactSink| -> Result<Vec<LineItem>, RecognizerError> {
            Err(RecognizerError::Failed("engine offline".into()))
        };
        let scanner = MrzScanner::new(Arc::new(failing));
        assert!(matches!(scanner.scan(RgbImage::new(1, 1)), Err(RecognizerError::Failed(_))));
    }

    #[test]
    fn display_matches_result_block() {
        let scanner = MrzScanner::new(Arc::new(passport_recognizer));
        let text = scanner.scan(RgbImage::new(8, 8)).expect("scan")[0].to_string();
        assert!(text.starts_with("Raw Text:\n\tLine 1: P<UTOERIKSSON"));
        assert!(text.contains("\tDocumentType: TD3\n"));
        assert!(text.contains("\tDocumentID: L898902C3\n"));
        assert!(text.contains("\tGivenName: ANNA MARIA\n"));
        assert!(text.contains("\tIssuingCountryorOrganization: UTO\n"));
        assert!(text.ends_with("\tExpirationDate(YYMMDD): 120415\n"));
        assert!(!text.contains("[Validation Failed]"));
    }

    #[test]
    fn failed_passport_still_shows_what_validated() {
        let corrupted = |_: &Frame, _: &ArtifactSink| -> Result<Vec<LineItem>, RecognizerError> {
            Ok(vec![
                LineItem::new(TD3[0], Quad::rect(0, 0, 10, 1)),
                LineItem::new("L898902C37UTO7408122F1204159ZE184226B<<<<<10", Quad::rect(0, 1, 10, 1)),
            ])
        };
        let results = MrzScanner::new(Arc::new(corrupted)).scan(RgbImage::new(2, 2)).expect("scan");
        let result = &results[0];
        assert_eq!(result.classification, Classification::NoMatch);
        assert_eq!(result.closest.as_ref().map(|c| c.document_type), Some(DocumentType::Td3));
        assert_eq!(result.failed_lines().into_iter().collect::<Vec<_>>(), vec![1]);

        let text = result.to_string();
        assert!(text.contains("\tLine 1: P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<\n"));
        assert!(text.contains("\tLine 2: L898902C37UTO7408122F1204159ZE184226B<<<<<10 [Validation Failed]\n"));
        assert!(text.contains("\tDocumentType: TD3\n"));
        assert!(text.contains("\tSurname: ERIKSSON\n"));
        assert!(text.contains("\tDocumentID: \n"));
        assert!(text.contains("\tDateofBirth(YYMMDD): 740812\n"));
    }

    #[test]
    fn unreadable_region_flags_every_line() {
        let foreign = |_: &Frame, _: &ArtifactSink| -> Result<Vec<LineItem>, RecognizerError> {
            Ok(vec![
                LineItem::new("X<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<", Quad::rect(0, 0, 10, 1)),
                LineItem::new(TD3[1], Quad::rect(0, 1, 10, 1)),
            ])
        };
        let results = MrzScanner::new(Arc::new(foreign)).scan(RgbImage::new(2, 2)).expect("scan");
        assert!(results[0].closest.is_none());
        let text = results[0].to_string();
        assert_eq!(text.matches("[Validation Failed]").count(), 2);
        assert!(text.contains("\tDocumentType: \n"));
    }

    #[test]
    fn noise_line_of_mrz_width_does_not_hide_the_passport() {
        let with_noise = |_: &Frame, _: &ArtifactSink| -> Result<Vec<LineItem>, RecognizerError> {
            Ok(vec![
                LineItem::new("ERIKSSON ANNA MARIA UTOPIA PASSPORT L898902C", Quad::rect(0, 0, 10, 1)),
                LineItem::new(TD3[0], Quad::rect(0, 1, 10, 1)),
                LineItem::new(TD3[1], Quad::rect(0, 2, 10, 1)),
            ])
        };
        let results = MrzScanner::new(Arc::new(with_noise)).scan(RgbImage::new(2, 2)).expect("scan");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_type(), Some(DocumentType::Td3));
        assert_eq!(results[0].location, Quad::rect(0, 1, 10, 2));
    }
}
