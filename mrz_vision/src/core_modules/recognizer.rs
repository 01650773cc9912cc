// THEORY:
// The recognizer is the external text-recognition engine. The engine itself is
// not part of this crate; this module defines the seam it plugs into.
//
// Key architectural principles:
// 1.  **Blocking Contract**: `recognize` is a plain synchronous call. The
//     pipeline runs it on the blocking pool so a slow engine never stalls the
//     producer loop or the async runtime.
// 2.  **Artifacts On The Side**: intermediate products are not part of the
//     return value. The engine pushes them through an `ArtifactSink` tagged with
//     the frame hash, the same way an engine with independent async stages would
//     call back per stage.

use crate::core_modules::artifacts::Artifact;
use crate::core_modules::correlation_store::FrameCorrelationStore;
use crate::core_modules::frame::{Frame, FrameHash};
use crate::core_modules::geometry::Quad;
use crate::error::RecognizerError;
use serde::Serialize;
use std::sync::Arc;

/// One recognized text line and where it sits in the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub text: String,
    pub location: Quad,
}

impl LineItem {
    pub fn new(text: impl Into<String>, location: Quad) -> Self {
        Self { text: text.into(), location }
    }
}

/// Where a recognizer sends its intermediate artifacts.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSink {
    store: Option<Arc<FrameCorrelationStore>>,
}

impl ArtifactSink {
    pub fn new(store: Arc<FrameCorrelationStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A sink that drops everything.
    pub fn discard() -> Self {
        Self { store: None }
    }

    pub fn emit(&self, hash: &FrameHash, artifact: Artifact) {
        if let Some(store) = &self.store {
            store.record(hash, artifact);
        }
    }
}

pub trait TextLineRecognizer: Send + Sync {
    fn recognize(&self, frame: &Frame, artifacts: &ArtifactSink) -> Result<Vec<LineItem>, RecognizerError>;
}

impl<F> TextLineRecognizer for F
where
    F: Fn(&Frame, &ArtifactSink) -> Result<Vec<LineItem>, RecognizerError> + Send + Sync,
{
    fn recognize(&self, frame: &Frame, artifacts: &ArtifactSink) -> Result<Vec<LineItem>, RecognizerError> {
        self(frame, artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn closures_are_recognizers() {
        let recognizer = |_: &Frame, _: &ArtifactSink| -> Result<Vec<LineItem>, RecognizerError> {
            Ok(vec![LineItem::new("ABC", Quad::rect(0, 0, 3, 1))])
        };
        let lines = recognizer
            .recognize(&Frame::new(RgbImage::new(1, 1)), &ArtifactSink::discard())
            .expect("recognize");
        assert_eq!(lines[0].text, "ABC");
    }

    #[test]
    fn sink_records_into_store() {
        let store = Arc::new(FrameCorrelationStore::new());
        let sink = ArtifactSink::new(Arc::clone(&store));
        let hash = FrameHash::from("sha256:aa");
        sink.emit(&hash, Artifact::DetectedQuads(vec![Quad::rect(0, 0, 5, 5)]));
        assert_eq!(store.len(), 1);
        ArtifactSink::discard().emit(&hash, Artifact::DetectedQuads(vec![]));
        assert_eq!(store.len(), 1);
    }
}
