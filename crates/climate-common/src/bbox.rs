//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in longitude/latitude degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box enclosing every `(x, y)` pair, or `None` for an empty input.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = coords.into_iter();
        let (x0, y0) = iter.next()?;
        let mut bbox = Self::new(x0, y0, x0, y0);
        for (x, y) in iter {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }

    /// Grow the box by `dx` horizontally and `dy` vertically on every side.
    pub fn expanded(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.min_x - dx,
            self.min_y - dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coords() {
        let bbox = BoundingBox::from_coords([(-7.5, 33.0), (-5.0, 35.5), (-6.0, 30.0)]).unwrap();
        assert_eq!(bbox, BoundingBox::new(-7.5, 30.0, -5.0, 35.5));
        assert!(BoundingBox::from_coords(Vec::new()).is_none());
    }

    #[test]
    fn test_expanded_contains() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).expanded(0.25, 0.5);
        assert!(bbox.contains_point(-0.25, -0.5));
        assert!(bbox.contains_point(1.25, 1.5));
        assert!(!bbox.contains_point(1.3, 0.0));
    }
}
