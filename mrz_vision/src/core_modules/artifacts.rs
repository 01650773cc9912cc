// THEORY:
// Artifacts are the intermediate products a recognition engine emits while it
// works on one frame: where the MRZ lines were localized, the deskewed crop,
// the downscaled colour image used for document detection, the detected
// document quads and the recognized lines. They arrive from independent stages,
// in any order, and are merged per frame into an `ArtifactBundle`.
//
// Key architectural principles:
// 1.  **Merge, Never Replace the Bundle**: list-valued artifacts extend what is
//     already there; image-valued artifacts overwrite only their own slot.
// 2.  **Completeness Is Explicit**: a bundle either has all five kinds or it
//     does not. `complete()` returns a borrowed view that guarantees every part
//     is present, so consumers never unwrap optionals one by one.

use crate::core_modules::geometry::Quad;
use crate::core_modules::recognizer::LineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    LocalizedLines,
    DeskewedImage,
    ScaledColourImage,
    DetectedQuads,
    RecognizedLines,
}

/// The deskewed MRZ crop. `source_quad` is where it was cut from, in frame
/// coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskewedImage {
    pub width: u32,
    pub height: u32,
    pub source_quad: Quad,
}

/// The resized colour frame used for document detection. Quads detected on it
/// are in its coordinates; divide by `scale` to return to frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledColourImage {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    LocalizedLines(Vec<Quad>),
    DeskewedImage(DeskewedImage),
    ScaledColourImage(ScaledColourImage),
    DetectedQuads(Vec<Quad>),
    RecognizedLines(Vec<LineItem>),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::LocalizedLines(_) => ArtifactKind::LocalizedLines,
            Artifact::DeskewedImage(_) => ArtifactKind::DeskewedImage,
            Artifact::ScaledColourImage(_) => ArtifactKind::ScaledColourImage,
            Artifact::DetectedQuads(_) => ArtifactKind::DetectedQuads,
            Artifact::RecognizedLines(_) => ArtifactKind::RecognizedLines,
        }
    }
}

/// Everything recorded so far for one frame hash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactBundle {
    localized_lines: Option<Vec<Quad>>,
    deskewed_image: Option<DeskewedImage>,
    scaled_colour_image: Option<ScaledColourImage>,
    detected_quads: Option<Vec<Quad>>,
    recognized_lines: Option<Vec<LineItem>>,
}

/// A bundle with every artifact kind present.
#[derive(Debug, Clone, Copy)]
pub struct CompleteBundle<'a> {
    pub localized_lines: &'a [Quad],
    pub deskewed_image: &'a DeskewedImage,
    pub scaled_colour_image: &'a ScaledColourImage,
    pub detected_quads: &'a [Quad],
    pub recognized_lines: &'a [LineItem],
}

impl ArtifactBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, artifact: Artifact) {
        match artifact {
            Artifact::LocalizedLines(quads) => {
                self.localized_lines.get_or_insert_with(Vec::new).extend(quads)
            }
            Artifact::DeskewedImage(image) => self.deskewed_image = Some(image),
            Artifact::ScaledColourImage(image) => self.scaled_colour_image = Some(image),
            Artifact::DetectedQuads(quads) => {
                self.detected_quads.get_or_insert_with(Vec::new).extend(quads)
            }
            Artifact::RecognizedLines(lines) => {
                self.recognized_lines.get_or_insert_with(Vec::new).extend(lines)
            }
        }
    }

    pub fn has(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::LocalizedLines => self.localized_lines.is_some(),
            ArtifactKind::DeskewedImage => self.deskewed_image.is_some(),
            ArtifactKind::ScaledColourImage => self.scaled_colour_image.is_some(),
            ArtifactKind::DetectedQuads => self.detected_quads.is_some(),
            ArtifactKind::RecognizedLines => self.recognized_lines.is_some(),
        }
    }

    pub fn detected_quads(&self) -> Option<&[Quad]> {
        self.detected_quads.as_deref()
    }

    pub fn complete(&self) -> Option<CompleteBundle<'_>> {
        Some(CompleteBundle {
            localized_lines: self.localized_lines.as_deref()?,
            deskewed_image: self.deskewed_image.as_ref()?,
            scaled_colour_image: self.scaled_colour_image.as_ref()?,
            detected_quads: self.detected_quads.as_deref()?,
            recognized_lines: self.recognized_lines.as_deref()?,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.complete().is_some()
    }
}
