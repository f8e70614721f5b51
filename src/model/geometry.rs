//! Geometry primitives shared by every level of the page tree.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in page-local pixel space (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BBox {
    /// Create a box from its four edges.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Union of a sequence of boxes, or `None` when the sequence is empty.
    pub fn union_all<'a, I>(boxes: I) -> Option<BBox>
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BBox>, b| match acc {
                Some(a) => Some(a.union(b)),
                None => Some(*b),
            })
    }
}

/// Page dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dims {
    pub width: f64,
    pub height: f64,
}

impl Dims {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Line baseline as `y = slope * x + intercept`, relative to the bottom-left
/// corner of the owning line's box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Baseline {
    pub slope: f64,
    pub intercept: f64,
}

impl Baseline {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Exact two-point fit through `(x0, y0)` and `(x1, y1)`.
    ///
    /// A vertical baseline (`x0 == x1`) does not divide by zero: the slope
    /// saturates at `±f64::MAX` (sign of the y delta) and the intercept is
    /// the first point's y. Two coincident points give a flat baseline.
    /// Non-finite inputs give the zero baseline.
    pub fn from_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return Self::default();
        }

        let dx = x1 - x0;
        let dy = y1 - y0;

        if dx == 0.0 {
            let slope = if dy == 0.0 {
                0.0
            } else {
                f64::MAX.copysign(dy)
            };
            return Self {
                slope,
                intercept: y0,
            };
        }

        let slope = dy / dx;
        let intercept = y0 - slope * x0;

        // Tiny but nonzero dx can still overflow the product above.
        if !slope.is_finite() || !intercept.is_finite() {
            return Self {
                slope: f64::MAX.copysign(dy * dx),
                intercept: y0,
            };
        }

        Self { slope, intercept }
    }

    /// Whether the fit came from a degenerate (vertical) baseline.
    pub fn is_degenerate(&self) -> bool {
        self.slope.abs() == f64::MAX
    }

    /// Evaluate the baseline at box-local `x`.
    pub fn y_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fit_reproduces_endpoints() {
        let cases = [
            (0.0, -3.0, 120.0, -5.0),
            (2.0, -1.5, 48.0, 0.25),
            (-10.0, 4.0, 10.0, 4.0),
            (5.0, -20.0, 900.0, -2.0),
        ];
        for (x0, y0, x1, y1) in cases {
            let b = Baseline::from_points(x0, y0, x1, y1);
            assert!(close(b.y_at(x0), y0), "start of {:?}", (x0, y0, x1, y1));
            assert!(close(b.y_at(x1), y1), "end of {:?}", (x0, y0, x1, y1));
            assert!(!b.is_degenerate());
        }
    }

    #[test]
    fn test_vertical_baseline_saturates() {
        let up = Baseline::from_points(7.0, -2.0, 7.0, -30.0);
        assert_eq!(up.slope, -f64::MAX);
        assert_eq!(up.intercept, -2.0);
        assert!(up.is_degenerate());

        let down = Baseline::from_points(7.0, -30.0, 7.0, -2.0);
        assert_eq!(down.slope, f64::MAX);
    }

    #[test]
    fn test_coincident_points_are_flat() {
        let b = Baseline::from_points(3.0, -4.0, 3.0, -4.0);
        assert_eq!(b.slope, 0.0);
        assert_eq!(b.intercept, -4.0);
    }

    #[test]
    fn test_non_finite_input() {
        let b = Baseline::from_points(f64::NAN, 0.0, 1.0, 1.0);
        assert_eq!(b, Baseline::default());
    }

    #[test]
    fn test_bbox_union_all() {
        let boxes = [BBox::new(10.0, 5.0, 20.0, 15.0), BBox::new(2.0, 8.0, 12.0, 30.0)];
        let u = BBox::union_all(boxes.iter()).unwrap();
        assert_eq!(u, BBox::new(2.0, 5.0, 20.0, 30.0));
        assert!(BBox::union_all(std::iter::empty()).is_none());
        assert_eq!(u.width(), 18.0);
        assert_eq!(u.height(), 25.0);
    }
}
