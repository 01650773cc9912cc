// THEORY:
// The portrait locator is the dependent result the correlation store exists to
// produce. On a TD3 data page the holder's photo sits in a fixed band on the
// left, between the header and the MRZ. Given where the document is and where
// the MRZ starts, the photo region follows by proportion.
//
// Key architectural principles:
// 1.  **Pure Geometry**: the locator reads a `CompleteBundle` and returns a quad.
//     It never touches pixels and holds no state.
// 2.  **One Coordinate Space**: quads detected on the downscaled colour image are
//     mapped back to frame coordinates before anything is combined with them.
// 3.  **Refuse Implausible Layouts**: if the MRZ does not sit in the lower part
//     of the document the locator returns `None` instead of guessing.

use crate::core_modules::artifacts::CompleteBundle;
use crate::core_modules::geometry::{Point, Quad};

pub trait PortraitLocator: Send + Sync {
    fn locate(&self, bundle: &CompleteBundle<'_>) -> Option<Quad>;
}

/// Proportions of the photo band on a TD3 data page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricPortraitLocator {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    /// Gap kept between the bottom of the photo and the top of the MRZ.
    pub mrz_margin: f64,
    /// The MRZ must start below this fraction of the document height.
    pub min_mrz_top: f64,
}

impl Default for GeometricPortraitLocator {
    fn default() -> Self {
        Self {
            left: 0.03,
            right: 0.32,
            top: 0.15,
            mrz_margin: 0.03,
            min_mrz_top: 0.3,
        }
    }
}

impl GeometricPortraitLocator {
    fn document_quad(bundle: &CompleteBundle<'_>) -> Quad {
        let scale = bundle.scaled_colour_image.scale;
        bundle
            .detected_quads
            .iter()
            .max_by(|a, b| a.area().total_cmp(&b.area()))
            .map(|q| q.unscaled(scale))
            .unwrap_or(bundle.deskewed_image.source_quad)
    }

    /// Fraction along the document's left edge at which `p` projects.
    fn vertical_position(document: &Quad, p: Point) -> Option<f64> {
        let (tl, bl) = (document.top_left(), document.bottom_left());
        let edge = ((bl.x - tl.x) as f64, (bl.y - tl.y) as f64);
        let length_sq = edge.0 * edge.0 + edge.1 * edge.1;
        if length_sq == 0.0 {
            return None;
        }
        let rel = ((p.x - tl.x) as f64, (p.y - tl.y) as f64);
        Some((rel.0 * edge.0 + rel.1 * edge.1) / length_sq)
    }
}

impl PortraitLocator for GeometricPortraitLocator {
    fn locate(&self, bundle: &CompleteBundle<'_>) -> Option<Quad> {
        let document = Self::document_quad(bundle);
        let mrz_top = bundle
            .localized_lines
            .iter()
            .map(Quad::top_left)
            .min_by_key(|p| (p.y, p.x))?;
        let v_mrz = Self::vertical_position(&document, mrz_top)?;
        if v_mrz <= self.min_mrz_top || v_mrz > 1.0 {
            log::debug!("[PORTRAIT] MRZ at {v_mrz:.2} of document height, skipping");
            return None;
        }
        let bottom = v_mrz - self.mrz_margin;
        if bottom <= self.top {
            return None;
        }
        Some(document.sub_quad(self.left, self.right, self.top, bottom))
    }
}
