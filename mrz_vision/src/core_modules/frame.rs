// THEORY:
// A `Frame` is one captured image plus the content hash that keys every
// artifact derived from it. The hash is computed once at construction so all
// stages agree on it without recomputing.
//
// Key architectural principles:
// 1.  **Content Addressing**: `FrameHash` is a SHA-256 over the dimensions and
//     pixels. Two frames with identical content share a hash; within one frame's
//     processing window that is harmless, and the pipeline clears or evicts
//     bundles so a stale one is never read.
// 2.  **Sources Are Pull-Based**: a `FrameSource` is polled by the producer loop.
//     `Ok(None)` means "no frame right now" for live devices and "finished" for
//     finite sources, which report it through `is_finite`.

use crate::error::SourceError;
use image::RgbImage;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Monotonic id assigned by the pipeline at capture time.
pub type FrameId = u64;

/// Correlation key shared by every artifact derived from one source image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FrameHash(String);

impl FrameHash {
    pub fn of_pixels(width: u32, height: u32, pixels: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(width.to_le_bytes());
        hasher.update(height.to_le_bytes());
        hasher.update(pixels);
        FrameHash(format!("sha256:{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameHash {
    fn from(value: &str) -> Self {
        FrameHash(value.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    hash: FrameHash,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        let hash = FrameHash::of_pixels(image.width(), image.height(), image.as_raw());
        Self { image, hash }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn hash(&self) -> &FrameHash {
        &self.hash
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Something the producer loop can pull frames from.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<(), SourceError>;

    /// Next frame, or `None` when nothing is available.
    fn read(&mut self) -> Result<Option<Frame>, SourceError>;

    fn close(&mut self);

    /// Whether `Ok(None)` from `read` means the source is exhausted.
    fn is_finite(&self) -> bool {
        false
    }
}

/// Decodes a fixed list of image files in order.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    opened: bool,
}

impl ImageSequenceSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            next: 0,
            opened: false,
        }
    }

    /// Every regular file in `dir`, sorted by name.
    pub fn from_dir(dir: &Path) -> Result<Self, SourceError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(Self::new(paths))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.paths.is_empty() {
            return Err(SourceError::Unavailable("no image files to read".into()));
        }
        if let Some(missing) = self.paths.iter().find(|p| !p.is_file()) {
            return Err(SourceError::Unavailable(format!("{} does not exist", missing.display())));
        }
        self.next = 0;
        self.opened = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.opened {
            return Err(SourceError::Read("source is not open".into()));
        }
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        let image = image::open(path)
            .map_err(|source| SourceError::Decode { path: path.clone(), source })?
            .to_rgb8();
        Ok(Some(Frame::new(image)))
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn is_finite(&self) -> bool {
        true
    }
}
