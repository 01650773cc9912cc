// THEORY:
// Minimal integer geometry shared by the recognizer seam, the correlation store
// and the portrait locator. Points are in pixel coordinates of whichever image
// produced them; a `Quad` lists its corners clockwise from the top-left.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Four corners: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Quad {
    pub points: [Point; 4],
}

impl Quad {
    pub const fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// An axis-aligned rectangle.
    pub const fn rect(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new([
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ])
    }

    pub fn top_left(&self) -> Point {
        self.points[0]
    }
    pub fn top_right(&self) -> Point {
        self.points[1]
    }
    pub fn bottom_right(&self) -> Point {
        self.points[2]
    }
    pub fn bottom_left(&self) -> Point {
        self.points[3]
    }

    /// Shoelace area in square pixels.
    pub fn area(&self) -> f64 {
        let mut twice = 0i64;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            twice += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        (twice as f64 / 2.0).abs()
    }

    /// Divides every coordinate by `scale`, mapping a quad found on a resized
    /// image back onto the original.
    pub fn unscaled(&self, scale: f64) -> Quad {
        if scale <= 0.0 || !scale.is_finite() {
            return *self;
        }
        let map = |p: Point| {
            Point::new(
                (p.x as f64 / scale).round() as i32,
                (p.y as f64 / scale).round() as i32,
            )
        };
        Quad::new(self.points.map(map))
    }

    /// Bilinear interpolation across the quad; (0,0) is top-left and (1,1)
    /// bottom-right.
    pub fn interpolate(&self, u: f64, v: f64) -> (f64, f64) {
        let [tl, tr, br, bl] = self.points.map(|p| (p.x as f64, p.y as f64));
        let x = (1.0 - u) * (1.0 - v) * tl.0 + u * (1.0 - v) * tr.0 + u * v * br.0 + (1.0 - u) * v * bl.0;
        let y = (1.0 - u) * (1.0 - v) * tl.1 + u * (1.0 - v) * tr.1 + u * v * br.1 + (1.0 - u) * v * bl.1;
        (x, y)
    }

    /// The quad spanning the region `[u0,u1] x [v0,v1]` of this one.
    pub fn sub_quad(&self, u0: f64, u1: f64, v0: f64, v1: f64) -> Quad {
        let at = |u, v| {
            let (x, y) = self.interpolate(u, v);
            Point::new(x.round() as i32, y.round() as i32)
        };
        Quad::new([at(u0, v0), at(u1, v0), at(u1, v1), at(u0, v1)])
    }

    /// Joins the top edge of `top` with the bottom edge of `bottom`.
    pub fn spanning(top: &Quad, bottom: &Quad) -> Quad {
        Quad::new([
            top.top_left(),
            top.top_right(),
            bottom.bottom_right(),
            bottom.bottom_left(),
        ])
    }
}
