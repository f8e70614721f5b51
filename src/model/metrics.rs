//! Page-level metrics shared across engines.

use serde::{Deserialize, Serialize};

use super::Dims;

/// Document-level facts about one page, seeded from the main data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    /// Source image dimensions
    pub dims: Dims,
    /// Detected skew angle in degrees
    pub angle: f64,
}

impl PageMetrics {
    pub fn new(dims: Dims) -> Self {
        Self { dims, angle: 0.0 }
    }
}
