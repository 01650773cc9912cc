// THEORY:
// This file is the entry point for the `mrz_vision` library crate. It exposes
// two layers:
//
// - The classification engine: pure, synchronous functions that decide whether
//   a set of text lines is a TD1, TD2, TD3, MRVA or MRVB machine-readable zone
//   and extract its validated fields (`classify`, `Classification`, `FieldMap`).
// - The capture stack: the synchronous `MrzScanner` for one-shot images and the
//   bounded asynchronous `CapturePipeline` for live video, both built around a
//   pluggable `TextLineRecognizer` and the `FrameCorrelationStore` that
//   reassembles per-frame artifacts.
//
// The building blocks live in `core_modules`; the most used types are
// re-exported here so consumers rarely need to reach into it.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::PipelineConfig;
pub use core_modules::artifacts::{Artifact, ArtifactBundle, DeskewedImage, ScaledColourImage};
pub use core_modules::classifier::{assess, classify, classify_lines, Assessment, Classification, PartialMatch};
pub use core_modules::correlation_store::FrameCorrelationStore;
pub use core_modules::document_checker::{DocumentChecker, RejectReason, Rejection, Verdict};
pub use core_modules::fields::{DocumentType, Field, FieldMap, FieldValue, ValidationStatus};
pub use core_modules::frame::{Frame, FrameHash, FrameId, FrameSource, ImageSequenceSource};
pub use core_modules::geometry::{Point, Quad};
pub use core_modules::line_set::LineSet;
pub use core_modules::portrait::{GeometricPortraitLocator, PortraitLocator};
pub use core_modules::recognizer::{ArtifactSink, LineItem, TextLineRecognizer};
pub use error::{ConfigError, PipelineError, RecognizerError, SourceError};
pub use parallel_pipeline::{
    CapturePipeline, PipelineEvent, PipelineStats, ResultListener, StopReport, SubmitOutcome,
};
pub use pipeline::{FrameReport, MrzScanner, ScanResult};
